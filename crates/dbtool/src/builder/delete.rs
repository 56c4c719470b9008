use super::traits::{Filtered, StatementBuilder, join_tables, require_table};
use super::where_builder::WhereBuilder;
use crate::error::DbtoolResult;
use crate::handle::{DatabaseHandle, delete_sql};

/// DELETE builder.
///
/// Without any WHERE fragment every row of the table is deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteBuilder {
    table: String,
    filter: WhereBuilder,
}

impl DeleteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table to delete from.
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self
    }

    /// Several tables joined with `", "`. SQLite itself rejects this form,
    /// so it only serves handles that accept it.
    pub fn from_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table = join_tables(tables);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Filtered for DeleteBuilder {
    fn filter(&self) -> &WhereBuilder {
        &self.filter
    }

    fn filter_mut(&mut self) -> &mut WhereBuilder {
        &mut self.filter
    }
}

impl StatementBuilder for DeleteBuilder {
    /// Affected row count.
    type Output = usize;

    fn to_sql(&self) -> String {
        delete_sql(&self.table, self.filter.clause().as_deref())
    }

    fn validate(&self) -> DbtoolResult<()> {
        require_table(&self.table, "DELETE")
    }

    fn execute(&self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<usize> {
        let clause = self.filter.clause();
        handle.delete(&self.table, clause.as_deref(), self.filter.args())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
