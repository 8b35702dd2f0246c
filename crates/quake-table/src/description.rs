use crate::error::{TableError, TableResult};
use crate::header::Header;
use crate::table::Table;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Schema and shape of a table at one point in time.
///
/// Headers are shared with the table, not copied. A description stays valid
/// for a table that has only grown since: more rows, or columns appended after
/// the described ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Description {
    name: Option<String>,
    headers: Vec<Arc<Header>>,
    nrows: usize,
    ncols: usize,
}

impl Description {
    pub fn new(table: &Table) -> Self {
        Self {
            name: table.name().map(str::to_owned),
            headers: table.headers().to_vec(),
            nrows: table.row_count(),
            ncols: table.column_count(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn headers(&self) -> &[Arc<Header>] {
        &self.headers
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Check the snapshot on its own: one header per column, unique names.
    pub fn validate(&self) -> TableResult<()> {
        if self.ncols != self.headers.len() {
            return Err(TableError::InvariantViolation(format!(
                "description lists {} headers for {} columns",
                self.headers.len(),
                self.ncols
            )));
        }
        let mut seen = HashSet::new();
        for name in self.headers.iter().flat_map(|h| h.column_names()) {
            if !seen.insert(name) {
                return Err(TableError::DuplicateColumnName {
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Check the snapshot against `table`, which must be internally consistent
    /// and must still start with the described columns and rows.
    pub fn validate_against(&self, table: &Table) -> TableResult<()> {
        self.validate()?;
        table.check_invariants()?;

        if self.nrows > table.row_count() {
            return Err(TableError::InvariantViolation(format!(
                "described {} rows, table has {}",
                self.nrows,
                table.row_count()
            )));
        }
        if self.ncols > table.column_count() {
            return Err(TableError::InvariantViolation(format!(
                "described {} columns, table has {}",
                self.ncols,
                table.column_count()
            )));
        }
        for (described, live) in self.headers.iter().zip(table.headers()) {
            if !Arc::ptr_eq(described, live) && described != live {
                return Err(TableError::InvariantViolation(format!(
                    "described column {} is {} in the table",
                    described.name(),
                    live.name()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name.as_deref().unwrap_or("~"))?;
        writeln!(f, "nrows: {}", self.nrows)?;
        writeln!(f, "ncols: {}", self.ncols)?;
        write!(f, "headers:")?;
        for header in &self.headers {
            write!(f, "\n  - {} ({}", header.name(), header.dtype())?;
            if let Some(unit) = header.unit() {
                write!(f, ", {unit}")?;
            }
            write!(f, ")")?;
            if header.is_grouped() {
                let subs: Vec<&str> = header.sub_headers().iter().map(|s| s.name()).collect();
                write!(f, " [{}]", subs.join(", "))?;
            }
        }
        Ok(())
    }
}
