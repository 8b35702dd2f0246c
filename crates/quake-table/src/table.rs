use crate::array::Array;
use crate::buffer::ColumnBuffer;
use crate::description::Description;
use crate::error::{Dimension, TableError, TableResult};
use crate::header::Header;
use crate::recipe::Recipe;
use crate::types::DType;
use crate::view::{ColumnHandle, ColumnView};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub name: Option<String>,
    /// Initial row capacity; raised to `nrows_capacity_min` if smaller.
    pub nrows_capacity: Option<usize>,
    /// Floor applied whenever the table grows its buffers.
    pub nrows_capacity_min: usize,
}

/// Row selection for [`Table::get_column_masked`].
#[derive(Clone, Copy, Debug, Default)]
pub enum RowMask<'a> {
    #[default]
    All,
    /// One flag per row.
    Bool(&'a [bool]),
    /// Row indices, in output order.
    Indices(&'a [usize]),
    /// Name of a flat boolean column of the same table.
    Column(&'a str),
}

/// Append-optimized columnar table.
///
/// Every header owns one oversized buffer of `nrows_capacity` rows; only the
/// first `row_count` rows are visible. Buffers grow to the next power of two
/// (floored by the configured minimum), so appending rows one batch at a time
/// costs amortized O(1) reallocation per row.
///
/// Columns a table does not store itself can be provided by attached
/// [`Recipe`]s, which compute them on first access and cache them until the
/// next row append.
#[derive(Debug)]
pub struct Table {
    name: Option<String>,
    headers: Vec<Arc<Header>>,
    buffers: Vec<ColumnBuffer>,
    nrows: usize,
    capacity: usize,
    capacity_min: usize,
    generation: u64,
    name_index: HashMap<String, (usize, Option<usize>)>,
    recipes: Vec<Box<dyn Recipe>>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    pub fn with_options(options: TableOptions) -> Self {
        let capacity = options
            .nrows_capacity
            .map_or(0, |cap| cap.max(options.nrows_capacity_min));
        Self {
            name: options.name,
            headers: Vec::new(),
            buffers: Vec::new(),
            nrows: 0,
            capacity,
            capacity_min: options.nrows_capacity_min,
            generation: 0,
            name_index: HashMap::new(),
            recipes: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::with_options(TableOptions {
            name: Some(name.into()),
            ..TableOptions::default()
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "table".to_owned())
    }

    pub fn row_count(&self) -> usize {
        self.nrows
    }

    /// Number of headers (a grouped header counts once).
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn nrows_capacity(&self) -> usize {
        self.capacity
    }

    pub fn nrows_capacity_min(&self) -> usize {
        self.capacity_min
    }

    /// Incremented on every buffer reallocation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn headers(&self) -> &[Arc<Header>] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&Header> {
        match self.name_index.get(name) {
            Some(&(idx, None)) => Some(&self.headers[idx]),
            _ => None,
        }
    }

    pub fn recipes(&self) -> impl Iterator<Item = &dyn Recipe> + '_ {
        self.recipes.iter().map(|r| r.as_ref())
    }

    pub fn recipe_for_column(&self, name: &str) -> Option<&dyn Recipe> {
        self.recipes().find(|r| r.provides(name))
    }

    /// True if the table stores `name` itself (header or sub-column).
    pub fn has_direct_column(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// True if `name` is stored by the table or provided by an attached recipe.
    pub fn has_column(&self, name: &str) -> bool {
        self.has_direct_column(name) || self.recipe_for_column(name).is_some()
    }

    /// Every resolvable name: headers and their sub-columns in column order,
    /// then recipe-provided names in attachment order.
    pub fn column_names(&self) -> Vec<&str> {
        let direct = self.headers.iter().flat_map(|h| h.column_names());
        let derived = self
            .recipes
            .iter()
            .flat_map(|r| r.computed_headers().iter().flat_map(Header::column_names));
        direct.chain(derived).collect()
    }

    /// Reallocate every buffer to exactly `nrows_capacity` rows.
    ///
    /// Fails without touching any buffer if the table holds more rows. The
    /// capacity may be set below `nrows_capacity_min`; the floor applies again
    /// on the next growth.
    pub fn set_nrows_capacity(&mut self, nrows_capacity: usize) -> TableResult<()> {
        if nrows_capacity == self.capacity {
            return Ok(());
        }
        if nrows_capacity < self.nrows {
            return Err(TableError::CapacityViolation {
                requested: nrows_capacity,
                nrows: self.nrows,
            });
        }
        self.reallocate(nrows_capacity);
        Ok(())
    }

    fn reallocate(&mut self, capacity: usize) {
        log::debug!(
            "{}: reallocating {} buffers from {} to {} rows",
            self.label(),
            self.buffers.len(),
            self.capacity,
            capacity
        );
        for buffer in &mut self.buffers {
            buffer.reallocate(capacity, self.nrows);
        }
        self.capacity = capacity;
        self.generation += 1;
    }

    /// Make room for `nrows` rows using the power-of-two growth policy.
    ///
    /// The capacity floor is only enforced while growing, or while the table
    /// has no buffers yet, so a capacity set explicitly below the floor stays
    /// until rows no longer fit.
    fn reserve_rows(&mut self, nrows: usize) {
        let below_floor = self.capacity < self.capacity_min && self.buffers.is_empty();
        if nrows <= self.capacity && !below_floor {
            return;
        }
        let target = nrows.next_power_of_two().max(self.capacity_min);
        if target != self.capacity {
            self.reallocate(target);
        }
    }

    fn check_name_free(&self, name: &str) -> TableResult<()> {
        if self.has_column(name) {
            return Err(TableError::DuplicateColumnName {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn check_array(header: &Header, array: &Array, nrows: Option<usize>) -> TableResult<()> {
        if array.dtype() != header.dtype() {
            return Err(TableError::TypeMismatch {
                column: header.name().to_owned(),
                expected: header.dtype(),
                actual: array.dtype(),
            });
        }
        if array.ncols() != header.ncols() {
            return Err(TableError::ShapeMismatch {
                column: header.name().to_owned(),
                dimension: Dimension::Columns,
                expected: header.ncols(),
                actual: array.ncols(),
            });
        }
        if let Some(expected) = nrows.filter(|&n| n != array.nrows()) {
            return Err(TableError::ShapeMismatch {
                column: header.name().to_owned(),
                dimension: Dimension::Rows,
                expected,
                actual: array.nrows(),
            });
        }
        Ok(())
    }

    /// Add a column described by `header`, filled from `data` or with the
    /// header's defaults.
    ///
    /// The first column establishes the row count; later columns must match it.
    pub fn add_column(&mut self, header: Header, data: Option<Array>) -> TableResult<()> {
        for name in header.column_names() {
            self.check_name_free(name)?;
        }
        let data = match data {
            Some(data) => data,
            None => header.default_array(self.nrows)?,
        };
        let first = self.headers.is_empty();
        Self::check_array(&header, &data, (!first).then_some(self.nrows))?;

        if first {
            self.nrows = data.nrows();
        }
        self.reserve_rows(self.nrows);
        if first && self.nrows > 0 {
            // Recipes without inputs may have cached zero rows.
            for recipe in &mut self.recipes {
                recipe.invalidate(self.nrows);
            }
        }

        let mut buffer = ColumnBuffer::zeroed(header.dtype(), header.ncols(), self.capacity);
        buffer.write_rows(0, data.data());

        let idx = self.headers.len();
        self.name_index.insert(header.name().to_owned(), (idx, None));
        for (sub_idx, sub) in header.sub_headers().iter().enumerate() {
            self.name_index
                .insert(sub.name().to_owned(), (idx, Some(sub_idx)));
        }
        log::trace!("{}: added column {} ({})", self.label(), header.name(), header.dtype());
        self.headers.push(Arc::new(header));
        self.buffers.push(buffer);
        Ok(())
    }

    /// [`Table::add_column`] for each header in order. Not atomic: columns
    /// added before a failing one stay.
    pub fn add_columns(&mut self, headers: Vec<Header>, data: Option<Vec<Array>>) -> TableResult<()> {
        let Some(arrays) = data else {
            for header in headers {
                self.add_column(header, None)?;
            }
            return Ok(());
        };

        if arrays.len() != headers.len() {
            return Err(TableError::ShapeMismatch {
                column: self.label(),
                dimension: Dimension::Arrays,
                expected: headers.len(),
                actual: arrays.len(),
            });
        }
        for (header, array) in headers.into_iter().zip(arrays) {
            self.add_column(header, Some(array))?;
        }
        Ok(())
    }

    /// Append a batch of rows: one array per column, in column order, all with
    /// the same row count.
    ///
    /// Either every buffer receives the batch or, on error, none does.
    /// Attached recipes are invalidated afterwards.
    pub fn add_rows(&mut self, arrays: &[Array]) -> TableResult<()> {
        if arrays.len() != self.headers.len() {
            return Err(TableError::ShapeMismatch {
                column: self.label(),
                dimension: Dimension::Arrays,
                expected: self.headers.len(),
                actual: arrays.len(),
            });
        }
        let added = arrays.first().map_or(0, Array::nrows);
        for (header, array) in self.headers.iter().zip(arrays) {
            Self::check_array(header, array, Some(added))?;
        }

        let nrows_new = self.nrows + added;
        self.reserve_rows(nrows_new);
        for (buffer, array) in self.buffers.iter_mut().zip(arrays) {
            buffer.write_rows(self.nrows, array.data());
        }
        self.nrows = nrows_new;

        for recipe in &mut self.recipes {
            recipe.invalidate(added);
        }
        Ok(())
    }

    fn direct_view(&self, idx: usize, sub: Option<usize>) -> ColumnView<'_> {
        let header = &self.headers[idx];
        let name = match sub {
            Some(sub_idx) => header.sub_headers()[sub_idx].name(),
            None => header.name(),
        };
        ColumnView::new(
            name,
            &self.buffers[idx],
            self.nrows,
            sub,
            header.is_grouped(),
            self.generation,
        )
    }

    /// View of a column without computing anything.
    ///
    /// Recipe-provided columns resolve only while their cached value is fresh;
    /// otherwise this returns [`TableError::DerivedColumnStale`].
    pub fn column(&self, name: &str) -> TableResult<ColumnView<'_>> {
        if let Some(&(idx, sub)) = self.name_index.get(name) {
            return Ok(self.direct_view(idx, sub));
        }
        let recipe = self
            .recipe_for_column(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_owned()))?;
        if !recipe.is_fresh(name) {
            return Err(TableError::DerivedColumnStale(name.to_owned()));
        }
        recipe.cache().column(name)
    }

    /// Bring a recipe-provided column up to date. Direct columns are a no-op.
    ///
    /// Inputs the recipe takes from other recipes are materialized first.
    pub fn materialize(&mut self, name: &str) -> TableResult<()> {
        if self.has_direct_column(name) {
            return Ok(());
        }
        let idx = self
            .recipes
            .iter()
            .position(|r| r.provides(name))
            .ok_or_else(|| TableError::ColumnNotFound(name.to_owned()))?;
        if self.recipes[idx].is_fresh(name) {
            return Ok(());
        }

        let inputs: Vec<String> = self.recipes[idx]
            .required_headers()
            .iter()
            .flat_map(Header::leaf_names)
            .map(str::to_owned)
            .collect();
        for input in &inputs {
            let derived = !self.has_direct_column(input)
                && self
                    .recipes
                    .iter()
                    .enumerate()
                    .any(|(i, r)| i != idx && r.provides(input));
            if derived {
                self.materialize(input)?;
            }
        }

        // The recipe reads the host while writing its own cache, so detach it
        // for the duration of the update.
        let mut recipe = self.recipes.remove(idx);
        log::trace!("{}: materializing {name} via {}", self.label(), recipe.name());
        let result = recipe.update(self, name);
        self.recipes.insert(idx, recipe);
        result
    }

    /// View of `name`, computing it first if a recipe provides it.
    pub fn get_column(&mut self, name: &str) -> TableResult<ColumnView<'_>> {
        self.materialize(name)?;
        self.column(name)
    }

    /// Owned copy of the rows of `name` selected by `mask`.
    pub fn get_column_masked(&mut self, name: &str, mask: RowMask<'_>) -> TableResult<Array> {
        self.materialize(name)?;
        if let RowMask::Column(mask_name) = mask {
            self.materialize(mask_name)?;
        }
        self.column_masked(name, mask)
    }

    /// Like [`Table::get_column_masked`] but without computing anything.
    pub fn column_masked(&self, name: &str, mask: RowMask<'_>) -> TableResult<Array> {
        let view = self.column(name)?;
        let rows = self.mask_rows(mask)?;
        Ok(view.gather(&rows))
    }

    fn mask_rows(&self, mask: RowMask<'_>) -> TableResult<Vec<usize>> {
        match mask {
            RowMask::All => Ok((0..self.nrows).collect()),
            RowMask::Bool(flags) => self.flagged_rows("mask", flags.iter().copied(), flags.len()),
            RowMask::Indices(indices) => {
                if let Some(&index) = indices.iter().find(|&&i| i >= self.nrows) {
                    return Err(TableError::RowOutOfRange {
                        index,
                        nrows: self.nrows,
                    });
                }
                Ok(indices.to_vec())
            }
            RowMask::Column(mask_name) => {
                let view = self.column(mask_name)?;
                if view.is_grid() {
                    return Err(TableError::ShapeMismatch {
                        column: mask_name.to_owned(),
                        dimension: Dimension::Columns,
                        expected: 1,
                        actual: view.ncols(),
                    });
                }
                let flags = view.iter::<bool>().ok_or_else(|| TableError::TypeMismatch {
                    column: mask_name.to_owned(),
                    expected: DType::Bool,
                    actual: view.dtype(),
                })?;
                self.flagged_rows(mask_name, flags, view.len())
            }
        }
    }

    fn flagged_rows(
        &self,
        column: &str,
        flags: impl Iterator<Item = bool>,
        len: usize,
    ) -> TableResult<Vec<usize>> {
        if len != self.nrows {
            return Err(TableError::ShapeMismatch {
                column: column.to_owned(),
                dimension: Dimension::Rows,
                expected: self.nrows,
                actual: len,
            });
        }
        Ok(flags
            .enumerate()
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect())
    }

    /// Detached, generation-checked reference to a direct column.
    pub fn handle(&self, name: &str) -> TableResult<ColumnHandle> {
        let &(header, sub) = self
            .name_index
            .get(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_owned()))?;
        Ok(ColumnHandle {
            header,
            sub,
            generation: self.generation,
        })
    }

    /// Resolve a handle; fails once the buffers were reallocated since it was
    /// issued.
    pub fn view(&self, handle: ColumnHandle) -> TableResult<ColumnView<'_>> {
        if handle.generation != self.generation {
            return Err(TableError::StaleHandle {
                issued: handle.generation,
                current: self.generation,
            });
        }
        let in_range = self.headers.get(handle.header).is_some_and(|h| {
            handle
                .sub
                .map_or(true, |sub| sub < h.sub_headers().len())
        });
        if !in_range {
            return Err(TableError::ColumnNotFound(format!(
                "#{}/{:?}",
                handle.header, handle.sub
            )));
        }
        Ok(self.direct_view(handle.header, handle.sub))
    }

    /// Attach a recipe.
    ///
    /// Names the recipe computes must be new to the table. Required columns
    /// the table lacks are added with their header defaults. Nothing is
    /// modified if validation fails.
    pub fn add_recipe<R: Recipe + 'static>(&mut self, recipe: R) -> TableResult<()> {
        let required: HashSet<&str> = recipe
            .required_headers()
            .iter()
            .flat_map(Header::column_names)
            .collect();
        let mut computed = HashSet::new();
        for header in recipe.computed_headers() {
            for name in header.column_names() {
                self.check_name_free(name)?;
                if required.contains(name) || !computed.insert(name) {
                    return Err(TableError::DuplicateColumnName {
                        name: name.to_owned(),
                    });
                }
            }
        }

        let mut missing = Vec::new();
        let mut claimed = HashSet::new();
        for header in recipe.required_headers() {
            let satisfied = self.has_column(header.name())
                || (header.is_grouped()
                    && header.leaf_names().iter().all(|n| self.has_column(n)));
            if satisfied {
                continue;
            }
            for name in header.column_names() {
                self.check_name_free(name)?;
                if !claimed.insert(name) {
                    return Err(TableError::DuplicateColumnName {
                        name: name.to_owned(),
                    });
                }
            }
            missing.push(header.clone());
        }

        for header in missing {
            log::debug!(
                "{}: recipe {} adds missing column {}",
                self.label(),
                recipe.name(),
                header.name()
            );
            self.add_column(header, None)?;
        }
        self.recipes.push(Box::new(recipe));
        Ok(())
    }

    pub fn description(&self) -> Description {
        Description::new(self)
    }

    /// Re-verify the structural invariants of the table.
    pub fn check_invariants(&self) -> TableResult<()> {
        let fail = |msg: String| Err(TableError::InvariantViolation(msg));

        if self.capacity < self.nrows {
            return fail(format!(
                "capacity {} below row count {}",
                self.capacity, self.nrows
            ));
        }
        if self.buffers.len() != self.headers.len() {
            return fail(format!(
                "{} buffers for {} headers",
                self.buffers.len(),
                self.headers.len()
            ));
        }

        let mut expected = HashMap::new();
        for (idx, (header, buffer)) in self.headers.iter().zip(&self.buffers).enumerate() {
            if buffer.width() != header.ncols() {
                return fail(format!(
                    "buffer of {} is {} wide, header has {} columns",
                    header.name(),
                    buffer.width(),
                    header.ncols()
                ));
            }
            if buffer.capacity() != self.capacity {
                return fail(format!(
                    "buffer of {} holds {} rows, capacity is {}",
                    header.name(),
                    buffer.capacity(),
                    self.capacity
                ));
            }
            if buffer.dtype() != header.dtype() {
                return fail(format!(
                    "buffer of {} holds {}, header declares {}",
                    header.name(),
                    buffer.dtype(),
                    header.dtype()
                ));
            }
            expected.insert(header.name().to_owned(), (idx, None));
            for (sub_idx, sub) in header.sub_headers().iter().enumerate() {
                expected.insert(sub.name().to_owned(), (idx, Some(sub_idx)));
            }
        }
        if expected != self.name_index {
            return fail("name index does not match the headers".to_owned());
        }

        let mut seen: HashSet<&str> = self.name_index.keys().map(String::as_str).collect();
        for recipe in &self.recipes {
            for header in recipe.computed_headers() {
                for name in header.column_names() {
                    if !seen.insert(name) {
                        return fail(format!("column name {name} is claimed twice"));
                    }
                    if recipe.is_fresh(name) && recipe.cache().row_count() != self.nrows {
                        return fail(format!(
                            "cached {name} has {} rows, table has {}",
                            recipe.cache().row_count(),
                            self.nrows
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn growth_policy_is_power_of_two_floored_by_minimum() {
        let mut table = Table::with_options(TableOptions {
            nrows_capacity_min: 8,
            ..TableOptions::default()
        });
        table
            .add_column(Header::new("t"), Some(Array::flat(vec![1.0, 2.0, 3.0])))
            .unwrap();
        assert_eq!(table.nrows_capacity(), 8);

        table.add_rows(&[Array::flat(vec![0.0; 6])]).unwrap();
        assert_eq!(table.row_count(), 9);
        assert_eq!(table.nrows_capacity(), 16);
    }

    #[test]
    fn capacity_hint_is_floored_by_minimum() {
        let table = Table::with_options(TableOptions {
            nrows_capacity: Some(2),
            nrows_capacity_min: 4,
            ..TableOptions::default()
        });
        assert_eq!(table.nrows_capacity(), 4);
    }

    #[test]
    fn reallocation_bumps_generation() {
        let mut table = Table::new();
        table
            .add_column(
                Header::new("t").with_dtype(DType::I64),
                Some(Array::flat(vec![1i64, 2])),
            )
            .unwrap();
        let before = table.generation();
        table.add_rows(&[Array::flat(vec![3i64])]).unwrap();
        assert!(table.generation() > before);
        assert_eq!(
            table.column("t").unwrap().to_vec::<i64>().unwrap(),
            vec![1, 2, 3]
        );
        table.check_invariants().unwrap();
    }

    #[test]
    fn capacity_below_floor_is_kept_until_growth() {
        let mut table = Table::with_options(TableOptions {
            nrows_capacity_min: 8,
            ..TableOptions::default()
        });
        table
            .add_column(Header::new("t"), Some(Array::flat(vec![1.0, 2.0])))
            .unwrap();
        assert_eq!(table.nrows_capacity(), 8);

        table.set_nrows_capacity(2).unwrap();
        let handle = table.handle("t").unwrap();
        let generation = table.generation();

        table.add_column(Header::new("u"), None).unwrap();
        assert_eq!(table.nrows_capacity(), 2);
        assert_eq!(table.generation(), generation);
        assert_eq!(table.view(handle).unwrap().len(), 2);
        table.check_invariants().unwrap();

        table
            .add_rows(&[Array::flat(vec![3.0]), Array::flat(vec![0.0])])
            .unwrap();
        assert_eq!(table.nrows_capacity(), 8);
        assert!(table.view(handle).is_err());
    }
}
