use super::where_builder::WhereBuilder;
use crate::error::DbtoolResult;
use crate::handle::DatabaseHandle;
use crate::value::Value;

/// Base trait for statement builders.
///
/// A builder accumulates state, validates it, hands it to a
/// [`DatabaseHandle`] primitive and then resets itself.
pub trait StatementBuilder {
    /// What the primitive returns (rows, row ids, affected counts).
    type Output;

    /// Render the statement this builder would execute, for logging and tests.
    fn to_sql(&self) -> String;

    /// Validate builder state.
    fn validate(&self) -> DbtoolResult<()> {
        Ok(())
    }

    /// Invoke the handle primitive without touching builder state.
    fn execute(&self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<Self::Output>;

    /// Clear all accumulated state.
    fn reset(&mut self);

    /// Validate, execute, then reset whether or not execution succeeded.
    fn run(&mut self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<Self::Output> {
        let result = self.validate().and_then(|_| self.execute(handle));
        self.reset();
        result
    }
}

/// Builders that carry a WHERE clause (SELECT, UPDATE, DELETE).
///
/// Every helper appends to the shared [`WhereBuilder`] and returns the builder
/// for chaining.
pub trait Filtered: Sized {
    fn filter(&self) -> &WhereBuilder;

    fn filter_mut(&mut self) -> &mut WhereBuilder;

    /// Append a raw fragment.
    ///
    /// # Safety
    ///
    /// This directly concatenates SQL. The caller must ensure safety.
    fn where_raw(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.filter_mut().push(fragment);
        self
    }

    fn where_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter_mut().equals(field, value);
        self
    }

    fn where_not_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter_mut().not_equals(field, value);
        self
    }

    fn where_less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter_mut().less_than(field, value);
        self
    }

    fn where_less_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter_mut().less_than_or_equals(field, value);
        self
    }

    fn where_greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter_mut().greater_than(field, value);
        self
    }

    fn where_greater_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filter_mut().greater_than_or_equals(field, value);
        self
    }

    fn where_like(&mut self, field: &str, pattern: impl Into<Value>) -> &mut Self {
        self.filter_mut().like(field, pattern);
        self
    }

    fn and(&mut self) -> &mut Self {
        self.filter_mut().and();
        self
    }

    fn or(&mut self) -> &mut Self {
        self.filter_mut().or();
        self
    }

    /// Positional arguments for `?` placeholders in raw fragments.
    fn where_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_mut().set_args(args);
        self
    }
}

/// Split a comma separated column list (`"id, name"`) into column names.
pub fn split_columns(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join several table names into one FROM target.
pub fn join_tables<I, S>(tables: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tables
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn require_table(table: &str, statement: &str) -> DbtoolResult<()> {
    if table.trim().is_empty() {
        return Err(crate::error::DbtoolError::validation(format!(
            "{} requires a table",
            statement
        )));
    }
    Ok(())
}
