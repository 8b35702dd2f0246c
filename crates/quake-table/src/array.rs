use crate::error::{TableError, TableResult};
use crate::types::{DType, Element, Scalar};

/// Type-erased, row-major element storage.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    Bool(Vec<bool>),
}

/// Applies `$body` to the inner `Vec` of every variant, binding it as `$v`.
macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ColumnData::F64($v) => $body,
            ColumnData::F32($v) => $body,
            ColumnData::I64($v) => $body,
            ColumnData::I32($v) => $body,
            ColumnData::Bool($v) => $body,
        }
    };
}

impl ColumnData {
    pub fn filled(value: Scalar, len: usize) -> Self {
        match value {
            Scalar::F64(v) => ColumnData::F64(vec![v; len]),
            Scalar::F32(v) => ColumnData::F32(vec![v; len]),
            Scalar::I64(v) => ColumnData::I64(vec![v; len]),
            Scalar::I32(v) => ColumnData::I32(vec![v; len]),
            Scalar::Bool(v) => ColumnData::Bool(vec![v; len]),
        }
    }

    pub fn zeros(dtype: DType, len: usize) -> Self {
        Self::filled(dtype.zero(), len)
    }

    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::F64(_) => DType::F64,
            ColumnData::F32(_) => DType::F32,
            ColumnData::I64(_) => DType::I64,
            ColumnData::I32(_) => DType::I32,
            ColumnData::Bool(_) => DType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<Scalar> {
        each_variant!(self, v => v.get(idx).map(|x| x.into_scalar()))
    }

    /// Storage holding `values`, each converted exactly to `dtype`.
    pub(crate) fn from_scalars(dtype: DType, values: &[Scalar]) -> TableResult<Self> {
        let mut out = ColumnData::zeros(dtype, values.len());
        for (idx, &value) in values.iter().enumerate() {
            let cast = value
                .cast(dtype)
                .ok_or(TableError::LossyCast { value, dtype })?;
            out.set(idx, cast);
        }
        Ok(out)
    }

    /// `self` repeated `n` times back to back.
    pub(crate) fn repeat(&self, n: usize) -> Self {
        each_variant!(self, v => Element::wrap(v.repeat(n)))
    }

    /// Copy of this storage resized to `len` elements: a prefix of the original,
    /// zero-padded when growing.
    pub(crate) fn resized(&self, len: usize) -> Self {
        each_variant!(self, v => {
            let mut out = vec![Default::default(); len];
            let keep = v.len().min(len);
            out[..keep].copy_from_slice(&v[..keep]);
            Element::wrap(out)
        })
    }

    /// Overwrite `self[offset..offset + src.len()]` with `src`.
    ///
    /// Callers guarantee matching element types and bounds.
    pub(crate) fn write_at(&mut self, offset: usize, src: &ColumnData) {
        match (self, src) {
            (ColumnData::F64(dst), ColumnData::F64(src)) => {
                dst[offset..offset + src.len()].copy_from_slice(src)
            }
            (ColumnData::F32(dst), ColumnData::F32(src)) => {
                dst[offset..offset + src.len()].copy_from_slice(src)
            }
            (ColumnData::I64(dst), ColumnData::I64(src)) => {
                dst[offset..offset + src.len()].copy_from_slice(src)
            }
            (ColumnData::I32(dst), ColumnData::I32(src)) => {
                dst[offset..offset + src.len()].copy_from_slice(src)
            }
            (ColumnData::Bool(dst), ColumnData::Bool(src)) => {
                dst[offset..offset + src.len()].copy_from_slice(src)
            }
            (dst, src) => debug_assert!(
                false,
                "element type mismatch: {} <- {}",
                dst.dtype(),
                src.dtype()
            ),
        }
    }

    /// Gather `width`-element rows by index; with `pick`, only that column of
    /// every gathered row.
    pub(crate) fn gather(&self, rows: &[usize], width: usize, pick: Option<usize>) -> Self {
        each_variant!(self, v => {
            let mut out = Vec::with_capacity(rows.len() * pick.map_or(width, |_| 1));
            for &row in rows {
                let start = row * width;
                match pick {
                    Some(col) => out.push(v[start + col]),
                    None => out.extend_from_slice(&v[start..start + width]),
                }
            }
            Element::wrap(out)
        })
    }

    /// Exact element-wise conversion; fails on the first lossy element.
    pub fn cast(&self, dtype: DType) -> TableResult<Self> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        let values: Vec<Scalar> = (0..self.len()).filter_map(|idx| self.get(idx)).collect();
        Self::from_scalars(dtype, &values)
    }

    fn set(&mut self, idx: usize, value: Scalar) {
        match (self, value) {
            (ColumnData::F64(v), Scalar::F64(x)) => v[idx] = x,
            (ColumnData::F32(v), Scalar::F32(x)) => v[idx] = x,
            (ColumnData::I64(v), Scalar::I64(x)) => v[idx] = x,
            (ColumnData::I32(v), Scalar::I32(x)) => v[idx] = x,
            (ColumnData::Bool(v), Scalar::Bool(x)) => v[idx] = x,
            _ => debug_assert!(false, "element type mismatch in set"),
        }
    }
}

/// Logical shape of an [`Array`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Rank 1: `n` rows.
    Flat(usize),
    /// Rank 2: `rows x cols`, row-major.
    Grid { rows: usize, cols: usize },
}

impl Shape {
    pub fn nrows(self) -> usize {
        match self {
            Shape::Flat(n) => n,
            Shape::Grid { rows, .. } => rows,
        }
    }

    pub fn ncols(self) -> usize {
        match self {
            Shape::Flat(_) => 1,
            Shape::Grid { cols, .. } => cols,
        }
    }

    pub fn rank(self) -> usize {
        match self {
            Shape::Flat(_) => 1,
            Shape::Grid { .. } => 2,
        }
    }
}

/// An owned dense rank-1 or rank-2 array with an explicit element type.
///
/// This is the currency of the table's input/output boundary: initial column
/// data, row batches, masked selections and recipe outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    data: ColumnData,
    shape: Shape,
}

impl Array {
    pub fn flat<T: Element>(values: Vec<T>) -> Self {
        let n = values.len();
        Self {
            data: T::wrap(values),
            shape: Shape::Flat(n),
        }
    }

    /// Rank-2 array from fixed-width rows.
    pub fn grid<T: Element, const N: usize>(rows: Vec<[T; N]>) -> Self {
        let nrows = rows.len();
        let values: Vec<T> = rows.into_iter().flatten().collect();
        Self {
            data: T::wrap(values),
            shape: Shape::Grid {
                rows: nrows,
                cols: N,
            },
        }
    }

    /// Rank-2 array from row-major values; `values.len()` must be a multiple of `ncols`.
    pub fn from_row_major<T: Element>(values: Vec<T>, ncols: usize) -> TableResult<Self> {
        Self::from_data(T::wrap(values), ncols)
    }

    pub(crate) fn from_data(data: ColumnData, ncols: usize) -> TableResult<Self> {
        let len = data.len();
        if ncols == 0 || len % ncols != 0 {
            return Err(TableError::ShapeMismatch {
                column: "array".to_owned(),
                dimension: crate::error::Dimension::Columns,
                expected: ncols,
                actual: len,
            });
        }
        Ok(Self {
            data,
            shape: Shape::Grid {
                rows: len / ncols,
                cols: ncols,
            },
        })
    }

    pub(crate) fn from_parts(data: ColumnData, shape: Shape) -> Self {
        debug_assert_eq!(data.len(), shape.nrows() * shape.ncols());
        Self { data, shape }
    }

    /// Array of `shape` with every element set to `value`.
    pub fn full(value: Scalar, shape: Shape) -> Self {
        Self {
            data: ColumnData::filled(value, shape.nrows() * shape.ncols()),
            shape,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn nrows(&self) -> usize {
        self.shape.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.shape.ncols()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn into_data(self) -> ColumnData {
        self.data
    }

    /// Row-major element slice, if the element type is `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Scalar> {
        if row >= self.nrows() || col >= self.ncols() {
            return None;
        }
        self.data.get(row * self.ncols() + col)
    }

    /// Explicit lossless conversion to another element type.
    pub fn cast(&self, dtype: DType) -> TableResult<Self> {
        Ok(Self {
            data: self.data.cast(dtype)?,
            shape: self.shape,
        })
    }
}

impl<T: Element> From<Vec<T>> for Array {
    fn from(values: Vec<T>) -> Self {
        Self::flat(values)
    }
}
