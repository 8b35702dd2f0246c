use crate::array::ColumnData;
use crate::types::DType;

/// Oversized row-major backing storage for one header.
///
/// Holds exactly `capacity * width` elements; rows at or beyond the table's row
/// count are zero.
#[derive(Clone, Debug)]
pub(crate) struct ColumnBuffer {
    data: ColumnData,
    width: usize,
}

impl ColumnBuffer {
    pub(crate) fn zeroed(dtype: DType, width: usize, capacity: usize) -> Self {
        Self {
            data: ColumnData::zeros(dtype, capacity * width),
            width,
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len() / self.width
    }

    pub(crate) fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Reallocate to `capacity` rows, keeping the first `nrows` rows.
    pub(crate) fn reallocate(&mut self, capacity: usize, nrows: usize) {
        debug_assert!(nrows <= capacity);
        // Anything past `nrows` is zero already, so a resized copy keeps the
        // tail zero-filled as well.
        self.data = self.data.resized(capacity * self.width);
        debug_assert!(self.data.len() >= nrows * self.width);
    }

    /// Copy `rows` (row-major, same width and element type) into place
    /// starting at row `at`.
    pub(crate) fn write_rows(&mut self, at: usize, rows: &ColumnData) {
        self.data.write_at(at * self.width, rows);
    }
}
