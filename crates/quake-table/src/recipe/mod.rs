//! Derived columns.
//!
//! A recipe declares the columns it reads from its host table and the columns
//! it can compute from them. Computed columns live in a private cache table
//! owned by the recipe and are recomputed lazily after the host grows.

mod location;

pub use location::{EventRecipe, LocationRecipe};

use crate::array::Array;
use crate::error::{Dimension, TableError, TableResult};
use crate::header::Header;
use crate::table::{Table, TableOptions};
use std::fmt;

/// Computes one computed header's data from the host table.
pub type Updater = Box<dyn Fn(&Table) -> TableResult<Array>>;

/// Provider of derived columns.
///
/// Implementors hold a [`RecipeCore`] and expose it through `core`/`core_mut`;
/// the remaining methods have defaults built on it. Override `update` or
/// `invalidate` to change how the cache is refreshed.
pub trait Recipe: fmt::Debug {
    fn core(&self) -> &RecipeCore;
    fn core_mut(&mut self) -> &mut RecipeCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Columns read from the host table.
    fn required_headers(&self) -> &[Header] {
        self.core().required_headers()
    }

    /// Columns this recipe can produce.
    fn computed_headers(&self) -> &[Header] {
        self.core().computed_headers()
    }

    fn provides(&self, name: &str) -> bool {
        self.core().provides(name)
    }

    /// True if `name` is cached and no rows were appended to the host since.
    fn is_fresh(&self, name: &str) -> bool {
        self.core().is_fresh(name)
    }

    fn cache(&self) -> &Table {
        self.core().cache()
    }

    /// Recompute the header containing `name` against `host`, unless fresh.
    fn update(&mut self, host: &Table, name: &str) -> TableResult<()> {
        self.core_mut().update(host, name)
    }

    /// Called by the host after `rows_added` rows were appended.
    fn invalidate(&mut self, rows_added: usize) {
        self.core_mut().invalidate(rows_added);
    }
}

/// Bookkeeping shared by recipes: declared headers, updaters and the cache.
pub struct RecipeCore {
    name: String,
    required: Vec<Header>,
    computed: Vec<Header>,
    updaters: Vec<Updater>,
    cache: Table,
}

impl fmt::Debug for RecipeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeCore")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("computed", &self.computed)
            .field("cached_columns", &self.cache.column_count())
            .finish_non_exhaustive()
    }
}

impl RecipeCore {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let cache = Self::empty_cache(&name);
        Self {
            name,
            required: Vec::new(),
            computed: Vec::new(),
            updaters: Vec::new(),
            cache,
        }
    }

    fn empty_cache(name: &str) -> Table {
        Table::with_options(TableOptions {
            name: Some(format!("{name} cache")),
            ..TableOptions::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_required(&mut self, headers: impl IntoIterator<Item = Header>) {
        self.required.extend(headers);
    }

    /// Declare `header` as computable by `updater`, which must return an array
    /// of the header's shape with one row per host row.
    pub fn register_computed<F>(&mut self, header: Header, updater: F)
    where
        F: Fn(&Table) -> TableResult<Array> + 'static,
    {
        self.computed.push(header);
        self.updaters.push(Box::new(updater));
    }

    pub fn required_headers(&self) -> &[Header] {
        &self.required
    }

    pub fn computed_headers(&self) -> &[Header] {
        &self.computed
    }

    fn group_of(&self, name: &str) -> Option<usize> {
        self.computed
            .iter()
            .position(|h| h.column_names().any(|n| n == name))
    }

    pub fn provides(&self, name: &str) -> bool {
        self.group_of(name).is_some()
    }

    pub fn is_fresh(&self, name: &str) -> bool {
        self.provides(name) && self.cache.has_direct_column(name)
    }

    pub fn cache(&self) -> &Table {
        &self.cache
    }

    pub fn update(&mut self, host: &Table, name: &str) -> TableResult<()> {
        let group = self
            .group_of(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_owned()))?;
        let header = &self.computed[group];
        if self.cache.has_direct_column(header.name()) {
            return Ok(());
        }

        for required in &self.required {
            for column in required.leaf_names() {
                if !host.has_column(column) {
                    return Err(self.missing(column));
                }
            }
        }

        let array = (self.updaters[group])(host).map_err(|err| match err {
            TableError::ColumnNotFound(column) => self.missing(&column),
            other => other,
        })?;
        if array.nrows() != host.row_count() {
            return Err(TableError::ShapeMismatch {
                column: header.name().to_owned(),
                dimension: Dimension::Rows,
                expected: host.row_count(),
                actual: array.nrows(),
            });
        }

        let header = header.clone();
        self.cache.add_column(header, Some(array))
    }

    fn missing(&self, column: &str) -> TableError {
        TableError::DependencyMissing {
            recipe: self.name.clone(),
            column: column.to_owned(),
        }
    }

    /// Drop every cached column. Cached columns are row-aligned with the host,
    /// so any append makes all of them stale.
    pub fn invalidate(&mut self, rows_added: usize) {
        if rows_added == 0 || self.cache.column_count() == 0 {
            return;
        }
        log::debug!(
            "recipe {}: {rows_added} rows appended, dropping {} cached columns",
            self.name,
            self.cache.column_count()
        );
        self.cache = Self::empty_cache(&self.name);
    }
}
