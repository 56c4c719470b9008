use super::column::ColumnDefinition;
use std::fmt;

/// A `CREATE TABLE IF NOT EXISTS` statement built from columns and raw
/// definitions, in insertion order.
///
/// Like [`ColumnDefinition`], the statement compiles once; definitions added
/// after [`TableDefinition::build`] are kept but not emitted.
///
/// # Example
///
/// ```rust
/// use dbtool::schema::{ColumnDefinition, TableDefinition};
///
/// let mut users = TableDefinition::new("users")
///     .column(ColumnDefinition::new("id").type_int().primary_key().not_null())
///     .column(ColumnDefinition::new("name").type_text().unique());
/// assert_eq!(
///     users.build(),
///     "CREATE TABLE IF NOT EXISTS users( id INTEGER PRIMARY KEY NOT NULL, name TEXT UNIQUE);"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDefinition {
    name: String,
    definitions: Vec<String>,
    compiled: Option<String>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a column, compiling it if needed.
    pub fn column(mut self, mut column: ColumnDefinition) -> Self {
        let fragment = column.build().to_string();
        self.push_definition(fragment);
        self
    }

    /// Append a raw column definition such as `"age INTEGER DEFAULT 0"`.
    pub fn column_sql(mut self, definition: impl Into<String>) -> Self {
        self.push_definition(definition.into());
        self
    }

    /// Append a table-level constraint such as `"PRIMARY KEY (a, b)"`.
    pub fn constraint(mut self, definition: impl Into<String>) -> Self {
        self.push_definition(definition.into());
        self
    }

    fn push_definition(&mut self, definition: String) {
        if !definition.trim().is_empty() {
            self.definitions.push(definition);
        }
    }

    pub fn definitions(&self) -> &[String] {
        &self.definitions
    }

    pub fn is_built(&self) -> bool {
        self.compiled.is_some()
    }

    /// Compile the statement, or return the one compiled earlier.
    pub fn build(&mut self) -> &str {
        if self.compiled.is_none() {
            self.compiled = Some(format!(
                "CREATE TABLE IF NOT EXISTS {}( {});",
                self.name,
                self.definitions.join(", ")
            ));
        }
        self.compiled.as_deref().unwrap_or("")
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }
}

impl fmt::Display for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.compiled.as_deref().unwrap_or(""))
    }
}
