use crate::array::{Array, ColumnData, Shape};
use crate::error::{TableError, TableResult};
use crate::types::{DType, Scalar};
use std::collections::HashSet;

/// Descriptor of a single named column (or sub-column of a group).
#[derive(Clone, Debug, PartialEq)]
pub struct SubHeader {
    name: String,
    label: Option<String>,
    unit: Option<String>,
    dtype: DType,
    default: Scalar,
}

impl SubHeader {
    /// `f64` column defaulting to `0.0`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            unit: None,
            dtype: DType::F64,
            default: DType::F64.zero(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Change the element type; the default resets to that type's zero.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self.default = dtype.zero();
        self
    }

    /// Set the default value; the element type follows the value.
    pub fn with_default(mut self, value: impl Into<Scalar>) -> Self {
        let value = value.into();
        self.dtype = value.dtype();
        self.default = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn default_value(&self) -> Scalar {
        self.default
    }
}

/// Schema descriptor for one table column, flat or grouped.
///
/// A header without sub-headers describes a 1-D column. With sub-headers it
/// describes a 2-D column holding one sub-column per entry; each sub-column is
/// addressable by its own name. All sub-columns share the header's element type.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    column: SubHeader,
    sub_headers: Vec<SubHeader>,
}

impl Header {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            column: SubHeader::new(name),
            sub_headers: Vec::new(),
        }
    }

    /// Grouped header. Sub-header names must be distinct from each other and
    /// from `name`, and sub-headers must agree on their element type, which
    /// becomes the header's.
    pub fn grouped(name: impl Into<String>, sub_headers: Vec<SubHeader>) -> TableResult<Self> {
        let name = name.into();

        let mut seen = HashSet::with_capacity(sub_headers.len() + 1);
        seen.insert(name.as_str());
        for sub in &sub_headers {
            if !seen.insert(sub.name()) {
                return Err(TableError::DuplicateColumnName {
                    name: sub.name().to_owned(),
                });
            }
        }

        let dtype = sub_headers.first().map_or(DType::F64, SubHeader::dtype);
        if let Some(sub) = sub_headers.iter().find(|s| s.dtype() != dtype) {
            return Err(TableError::TypeMismatch {
                column: sub.name().to_owned(),
                expected: dtype,
                actual: sub.dtype(),
            });
        }

        Ok(Self {
            column: SubHeader::new(name).with_dtype(dtype),
            sub_headers,
        })
    }

    /// Grouped header from sub-headers known to satisfy the rules of
    /// [`Header::grouped`].
    pub(crate) fn grouped_unchecked(name: &str, sub_headers: Vec<SubHeader>) -> Self {
        debug_assert!(Self::grouped(name, sub_headers.clone()).is_ok());
        let dtype = sub_headers.first().map_or(DType::F64, SubHeader::dtype);
        Self {
            column: SubHeader::new(name).with_dtype(dtype),
            sub_headers,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.column = self.column.with_label(label);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.column = self.column.with_unit(unit);
        self
    }

    /// Change the element type of the header and every sub-header; defaults
    /// reset to zero.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.column = self.column.with_dtype(dtype);
        self.sub_headers = self
            .sub_headers
            .into_iter()
            .map(|s| s.with_dtype(dtype))
            .collect();
        self
    }

    /// Set the default of the header and every sub-header.
    pub fn with_default(mut self, value: impl Into<Scalar>) -> Self {
        let value = value.into();
        self.column = self.column.with_default(value);
        self.sub_headers = self
            .sub_headers
            .into_iter()
            .map(|s| s.with_default(value))
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        self.column.name()
    }

    pub fn label(&self) -> Option<&str> {
        self.column.label()
    }

    pub fn unit(&self) -> Option<&str> {
        self.column.unit()
    }

    pub fn dtype(&self) -> DType {
        self.column.dtype()
    }

    pub fn default_value(&self) -> Scalar {
        self.column.default_value()
    }

    pub fn sub_headers(&self) -> &[SubHeader] {
        &self.sub_headers
    }

    pub fn is_grouped(&self) -> bool {
        !self.sub_headers.is_empty()
    }

    pub fn ncols(&self) -> usize {
        self.sub_headers.len().max(1)
    }

    /// The header's own name followed by every sub-header name.
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.name()).chain(self.sub_headers.iter().map(SubHeader::name))
    }

    /// Names a reader of this header's data resolves: the sub-column names for
    /// a grouped header, otherwise the header's own name.
    pub fn leaf_names(&self) -> Vec<&str> {
        if self.is_grouped() {
            self.sub_headers.iter().map(SubHeader::name).collect()
        } else {
            vec![self.name()]
        }
    }

    /// Shape of this header's data for `nrows` rows.
    pub fn shape(&self, nrows: usize) -> Shape {
        if self.is_grouped() {
            Shape::Grid {
                rows: nrows,
                cols: self.ncols(),
            }
        } else {
            Shape::Flat(nrows)
        }
    }

    /// `nrows` rows of default values, per sub-column for grouped headers.
    pub fn default_array(&self, nrows: usize) -> TableResult<Array> {
        let shape = self.shape(nrows);
        if !self.is_grouped() {
            let value = self.cast_default(self.default_value(), self.name())?;
            return Ok(Array::full(value, shape));
        }

        let defaults: Vec<Scalar> = self
            .sub_headers
            .iter()
            .map(|s| self.cast_default(s.default_value(), s.name()))
            .collect::<TableResult<_>>()?;
        let row = ColumnData::from_scalars(self.dtype(), &defaults)?;
        Ok(Array::from_parts(row.repeat(nrows), shape))
    }

    fn cast_default(&self, value: Scalar, column: &str) -> TableResult<Scalar> {
        value.cast(self.dtype()).ok_or_else(|| TableError::TypeMismatch {
            column: column.to_owned(),
            expected: self.dtype(),
            actual: value.dtype(),
        })
    }
}
