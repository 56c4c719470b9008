use super::traits::{Filtered, StatementBuilder, join_tables, require_table};
use super::where_builder::WhereBuilder;
use crate::error::DbtoolResult;
use crate::handle::{DatabaseHandle, update_sql};
use crate::record::Record;
use crate::value::Value;

/// UPDATE builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    table: String,
    values: Record,
    filter: WhereBuilder,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target table. Replaces any previous table.
    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self
    }

    /// Target several tables, joined with `", "`.
    pub fn tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table = join_tables(tables);
        self
    }

    /// The target table expression, empty until set.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Set one column value (last write wins).
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.set(column, value);
        self
    }

    /// Merge a record into the pending values.
    pub fn values(&mut self, values: &Record) -> &mut Self {
        self.values.extend(values);
        self
    }

    /// Column values for the SET clause, in insertion order.
    pub fn pending_values(&self) -> &Record {
        &self.values
    }
}

impl Filtered for UpdateBuilder {
    fn filter(&self) -> &WhereBuilder {
        &self.filter
    }

    fn filter_mut(&mut self) -> &mut WhereBuilder {
        &mut self.filter
    }
}

impl StatementBuilder for UpdateBuilder {
    /// Affected row count.
    type Output = usize;

    fn to_sql(&self) -> String {
        update_sql(&self.table, &self.values, self.filter.clause().as_deref())
    }

    fn validate(&self) -> DbtoolResult<()> {
        require_table(&self.table, "UPDATE")
    }

    fn execute(&self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<usize> {
        let clause = self.filter.clause();
        handle.update(
            &self.table,
            &self.values,
            clause.as_deref(),
            self.filter.args(),
        )
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
