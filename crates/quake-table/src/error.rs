use crate::types::{DType, Scalar};
use quake_geodesy::GeodesyError;
use std::fmt;

pub type TableResult<T> = Result<T, TableError>;

/// Which extent of an array disagreed with the table's expectation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Rows,
    Columns,
    Arrays,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Rows => "rows",
            Dimension::Columns => "columns",
            Dimension::Arrays => "arrays",
        })
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("shape mismatch for {column}: expected {expected} {dimension}, got {actual}")]
    ShapeMismatch {
        column: String,
        dimension: Dimension,
        expected: usize,
        actual: usize,
    },

    #[error("new capacity {requested} is too small to hold the current {nrows} rows")]
    CapacityViolation { requested: usize, nrows: usize },

    #[error("duplicate column name: {name}")]
    DuplicateColumnName { name: String },

    #[error("unknown column: {0}")]
    ColumnNotFound(String),

    #[error("recipe {recipe} requires column {column}, which the table does not provide")]
    DependencyMissing { recipe: String, column: String },

    #[error("element type mismatch for {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: DType,
        actual: DType,
    },

    #[error("value {value} cannot be represented exactly as {dtype}")]
    LossyCast { value: Scalar, dtype: DType },

    #[error("derived column {0} is not materialized; call get_column or materialize first")]
    DerivedColumnStale(String),

    #[error("column handle from generation {issued} used at generation {current}")]
    StaleHandle { issued: u64, current: u64 },

    #[error("row index {index} out of range for {nrows} rows")]
    RowOutOfRange { index: usize, nrows: usize },

    #[error("table invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Geodesy(#[from] GeodesyError),
}
