//! Append-optimized columnar tables for earthquake catalogs.
//!
//! This crate focuses on:
//! - Typed, optionally grouped columns described by [`Header`]s.
//! - Amortized O(1) row appends into oversized buffers that grow by powers of two.
//! - Zero-copy [`ColumnView`]s bounded by the live row count.
//! - Derived columns computed lazily by attached [`Recipe`]s and cached until the next append.

#![forbid(unsafe_code)]

mod array;
mod buffer;
mod description;
mod error;
mod header;
mod recipe;
mod table;
mod types;
mod view;

pub use crate::array::{Array, ColumnData, Shape};
pub use crate::description::Description;
pub use crate::error::{Dimension, TableError, TableResult};
pub use crate::header::{Header, SubHeader};
pub use crate::recipe::{EventRecipe, LocationRecipe, Recipe, RecipeCore, Updater};
pub use crate::table::{RowMask, Table, TableOptions};
pub use crate::types::{DType, Element, Scalar};
pub use crate::view::{ColumnHandle, ColumnView};
