use crate::array::{Array, Shape};
use crate::buffer::ColumnBuffer;
use crate::error::{TableError, TableResult};
use crate::types::{DType, Element, Scalar};

/// Borrowed window over the first `nrows` rows of a column buffer.
///
/// A view of a grouped header is 2-D; a view of a flat header or of a single
/// sub-column is 1-D (strided over the group's buffer, never copied). Views
/// borrow the table, so they cannot outlive the next mutation.
#[derive(Clone, Copy, Debug)]
pub struct ColumnView<'a> {
    name: &'a str,
    buffer: &'a ColumnBuffer,
    nrows: usize,
    sub: Option<usize>,
    grouped: bool,
    generation: u64,
}

impl<'a> ColumnView<'a> {
    pub(crate) fn new(
        name: &'a str,
        buffer: &'a ColumnBuffer,
        nrows: usize,
        sub: Option<usize>,
        grouped: bool,
        generation: u64,
    ) -> Self {
        Self {
            name,
            buffer,
            nrows,
            sub,
            grouped,
            generation,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn len(&self) -> usize {
        self.nrows
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    /// True for a whole grouped header (rank 2).
    pub fn is_grid(&self) -> bool {
        self.grouped && self.sub.is_none()
    }

    pub fn ncols(&self) -> usize {
        if self.is_grid() {
            self.buffer.width()
        } else {
            1
        }
    }

    pub fn shape(&self) -> Shape {
        if self.is_grid() {
            Shape::Grid {
                rows: self.nrows,
                cols: self.ncols(),
            }
        } else {
            Shape::Flat(self.nrows)
        }
    }

    /// Buffer generation this view was derived under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn prefix<T: Element>(&self) -> Option<&'a [T]> {
        let all = T::slice(self.buffer.data())?;
        Some(&all[..self.nrows * self.buffer.width()])
    }

    /// Contiguous elements (row-major for a grid), if the element type is `T`
    /// and the view is not a strided sub-column.
    pub fn as_slice<T: Element>(&self) -> Option<&'a [T]> {
        match self.sub {
            Some(_) if self.buffer.width() > 1 => None,
            _ => self.prefix(),
        }
    }

    /// Element at `(row, col)`; `col` must be 0 for 1-D views.
    pub fn at<T: Element>(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.nrows || col >= self.ncols() {
            return None;
        }
        let offset = self.sub.unwrap_or(col);
        self.prefix::<T>()
            .map(|values| values[row * self.buffer.width() + offset])
    }

    /// Element at `row` of a 1-D view.
    pub fn get<T: Element>(&self, row: usize) -> Option<T> {
        if self.is_grid() {
            return None;
        }
        self.at(row, 0)
    }

    pub fn scalar(&self, row: usize, col: usize) -> Option<Scalar> {
        if row >= self.nrows || col >= self.ncols() {
            return None;
        }
        let offset = self.sub.unwrap_or(col);
        self.buffer
            .data()
            .get(row * self.buffer.width() + offset)
    }

    /// One row of a grid view.
    pub fn row<T: Element>(&self, row: usize) -> Option<&'a [T]> {
        if !self.is_grid() || row >= self.nrows {
            return None;
        }
        let width = self.buffer.width();
        self.prefix::<T>()
            .map(|values| &values[row * width..(row + 1) * width])
    }

    /// Elements of a 1-D view in row order (strided for sub-columns).
    pub fn iter<T: Element>(&self) -> Option<impl Iterator<Item = T> + 'a> {
        if self.is_grid() {
            return None;
        }
        let values = self.prefix::<T>()?;
        Some(
            values
                .iter()
                .skip(self.sub.unwrap_or(0))
                .step_by(self.buffer.width())
                .copied(),
        )
    }

    /// Owned copy of the viewed elements (row-major for a grid).
    pub fn to_vec<T: Element>(&self) -> TableResult<Vec<T>> {
        let mismatch = || TableError::TypeMismatch {
            column: self.name.to_owned(),
            expected: self.dtype(),
            actual: T::DTYPE,
        };
        if self.is_grid() {
            return self.prefix::<T>().map(<[T]>::to_vec).ok_or_else(mismatch);
        }
        self.iter::<T>()
            .map(Iterator::collect)
            .ok_or_else(mismatch)
    }

    pub fn to_array(&self) -> Array {
        let rows: Vec<usize> = (0..self.nrows).collect();
        self.gather(&rows)
    }

    /// Owned copy of the given rows, in the order given. Indices are checked
    /// by the caller.
    pub(crate) fn gather(&self, rows: &[usize]) -> Array {
        let data = self
            .buffer
            .data()
            .gather(rows, self.buffer.width(), self.sub.filter(|_| self.grouped));
        let shape = if self.is_grid() {
            Shape::Grid {
                rows: rows.len(),
                cols: self.ncols(),
            }
        } else {
            Shape::Flat(rows.len())
        };
        Array::from_parts(data, shape)
    }
}

/// Detached reference to a direct column, valid for one buffer generation.
///
/// Unlike a [`ColumnView`], a handle does not borrow the table. Resolving it
/// after the buffers were reallocated fails with
/// [`TableError::StaleHandle`] instead of reading from a dead allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColumnHandle {
    pub(crate) header: usize,
    pub(crate) sub: Option<usize>,
    pub(crate) generation: u64,
}

impl ColumnHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
