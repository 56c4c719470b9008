//! Database handle abstraction.
//!
//! The builders never talk to a storage engine directly. Everything goes
//! through [`DatabaseHandle`], which exposes the handful of primitives an
//! embedded relational store offers (`execute`, `query`, `insert`, `update`,
//! `delete`) plus a scoped open/close lifecycle. [`DatabaseProvider`] is the
//! environment that creates, lists and drops named databases.

use crate::error::{DbtoolError, DbtoolResult};
use crate::record::{Record, RecordSet};
use crate::value::Value;
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

/// Every argument a read primitive accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub distinct: bool,
    pub table: String,
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
    /// WHERE clause without the `WHERE` keyword.
    pub selection: Option<String>,
    /// Positional arguments bound to `?` placeholders in `selection`.
    pub selection_args: Vec<String>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<String>,
}

impl QuerySpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    /// Render the SELECT statement described by this spec.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        match &self.columns {
            Some(cols) if !cols.is_empty() => sql.push_str(&cols.join(", ")),
            _ => sql.push('*'),
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        push_clause(&mut sql, "WHERE", self.selection.as_deref());
        push_clause(&mut sql, "GROUP BY", self.group_by.as_deref());
        push_clause(&mut sql, "HAVING", self.having.as_deref());
        push_clause(&mut sql, "ORDER BY", self.order_by.as_deref());
        push_clause(&mut sql, "LIMIT", self.limit.as_deref());
        sql
    }
}

fn push_clause(sql: &mut String, keyword: &str, body: Option<&str>) {
    if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
        sql.push(' ');
        sql.push_str(keyword);
        sql.push(' ');
        sql.push_str(body);
    }
}

/// Render `INSERT` with one `?` placeholder per column.
pub fn insert_sql(table: &str, values: &Record) -> String {
    if values.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", table);
    }
    let columns: Vec<&str> = values.field_names().collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    )
}

/// Render `UPDATE ... SET col = ?` followed by an optional WHERE clause.
pub fn update_sql(table: &str, values: &Record, where_clause: Option<&str>) -> String {
    let sets: Vec<String> = values.field_names().map(|c| format!("{} = ?", c)).collect();
    let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
    push_clause(&mut sql, "WHERE", where_clause);
    sql
}

/// Render `DELETE FROM` with an optional WHERE clause.
pub fn delete_sql(table: &str, where_clause: Option<&str>) -> String {
    let mut sql = format!("DELETE FROM {}", table);
    push_clause(&mut sql, "WHERE", where_clause);
    sql
}

/// Raw result of a read: column names plus value rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with `NULL`, long rows truncated.
    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(values);
    }

    pub fn with_row(mut self, values: Vec<Value>) -> Self {
        self.push_row(values);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Materialize every row into a [`Record`].
    pub fn to_record_set(&self) -> RecordSet {
        self.iter().map(|row| row.to_record()).collect()
    }
}

/// Borrowed view of one row in [`Rows`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    pub fn get_index(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        for (column, value) in self.columns.iter().zip(self.values) {
            record.set(column.as_str(), value.clone());
        }
        record
    }
}

/// Primitives of an embedded relational store.
///
/// Implementations are single-threaded and blocking; a failing call surfaces
/// synchronously as an error.
pub trait DatabaseHandle {
    /// Name the database is stored under.
    fn name(&self) -> &str;

    fn open(&mut self) -> DbtoolResult<()>;

    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Execute one or more statements that return no rows.
    fn execute(&mut self, sql: &str) -> DbtoolResult<()>;

    fn query(&mut self, spec: &QuerySpec) -> DbtoolResult<Rows>;

    /// Insert one row and return its row id.
    fn insert(&mut self, table: &str, values: &Record) -> DbtoolResult<i64>;

    /// Update matching rows and return how many were affected.
    fn update(
        &mut self,
        table: &str,
        values: &Record,
        where_clause: Option<&str>,
        where_args: &[String],
    ) -> DbtoolResult<usize>;

    /// Delete matching rows and return how many were affected.
    fn delete(
        &mut self,
        table: &str,
        where_clause: Option<&str>,
        where_args: &[String],
    ) -> DbtoolResult<usize>;

    /// Names of the databases that exist alongside this one.
    fn list_database_names(&self) -> DbtoolResult<BTreeSet<String>>;

    /// Number of rows in `table`. Fails if the table does not exist.
    fn count_rows(&mut self, table: &str) -> DbtoolResult<i64> {
        let rows = self.query(&QuerySpec::new(table).columns(["COUNT(*)"]))?;
        rows.row(0)
            .and_then(|r| r.get_index(0))
            .and_then(Value::as_i64)
            .ok_or_else(|| DbtoolError::execution(format!("COUNT(*) on {} returned no rows", table)))
    }
}

/// Callback run against the handle when the database is created or opened.
pub type HandleCallback = Box<dyn FnMut(&mut dyn DatabaseHandle) -> DbtoolResult<()>>;

/// Callback run when the stored schema version is older than the requested one.
pub type UpgradeCallback = Box<dyn FnMut(&mut dyn DatabaseHandle, i32, i32) -> DbtoolResult<()>>;

/// Lifecycle hooks passed as ordinary closures.
#[derive(Default)]
pub struct OpenCallbacks {
    pub on_create: Option<HandleCallback>,
    pub on_upgrade: Option<UpgradeCallback>,
    pub on_open: Option<HandleCallback>,
}

impl OpenCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut dyn DatabaseHandle) -> DbtoolResult<()> + 'static,
    {
        self.on_create = Some(Box::new(f));
        self
    }

    pub fn on_upgrade<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut dyn DatabaseHandle, i32, i32) -> DbtoolResult<()> + 'static,
    {
        self.on_upgrade = Some(Box::new(f));
        self
    }

    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut dyn DatabaseHandle) -> DbtoolResult<()> + 'static,
    {
        self.on_open = Some(Box::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_create.is_none() && self.on_upgrade.is_none() && self.on_open.is_none()
    }
}

impl std::fmt::Debug for OpenCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenCallbacks")
            .field("on_create", &self.on_create.is_some())
            .field("on_upgrade", &self.on_upgrade.is_some())
            .field("on_open", &self.on_open.is_some())
            .finish()
    }
}

/// How a provider should open a named database.
#[derive(Debug)]
pub struct OpenOptions {
    /// Schema version; must be at least 1.
    pub version: i32,
    pub callbacks: OpenCallbacks,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            version: 1,
            callbacks: OpenCallbacks::default(),
        }
    }
}

impl OpenOptions {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            callbacks: OpenCallbacks::default(),
        }
    }

    pub fn callbacks(mut self, callbacks: OpenCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

/// Environment that owns named databases.
pub trait DatabaseProvider {
    /// Open (creating if needed) the database `name` and return an open handle.
    fn open_database(&self, name: &str, options: OpenOptions)
    -> DbtoolResult<Box<dyn DatabaseHandle>>;

    fn list_database_names(&self) -> DbtoolResult<BTreeSet<String>>;

    /// Remove the database. Returns `false` when it did not exist.
    fn drop_database(&self, name: &str) -> DbtoolResult<bool>;
}

/// Keeps a handle open for the length of one logical operation.
///
/// If the handle was closed when acquired, it is closed again on drop, on
/// every exit path including early returns and panics.
pub struct OpenGuard<'a> {
    handle: &'a mut dyn DatabaseHandle,
    close_on_drop: bool,
}

impl<'a> OpenGuard<'a> {
    pub fn acquire(handle: &'a mut dyn DatabaseHandle) -> DbtoolResult<Self> {
        let was_open = handle.is_open();
        if !was_open {
            handle.open()?;
        }
        Ok(Self {
            handle,
            close_on_drop: !was_open,
        })
    }
}

impl<'a> Deref for OpenGuard<'a> {
    type Target = dyn DatabaseHandle + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.handle
    }
}

impl<'a> DerefMut for OpenGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.handle
    }
}

impl Drop for OpenGuard<'_> {
    fn drop(&mut self) {
        if self.close_on_drop {
            self.handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_spec_renders_all_clauses() {
        let spec = QuerySpec {
            distinct: true,
            table: "users".into(),
            columns: Some(vec!["name".into(), "COUNT(*)".into()]),
            selection: Some("age>18".into()),
            selection_args: vec![],
            group_by: Some("name".into()),
            having: Some("COUNT(*) > 1".into()),
            order_by: Some("name DESC".into()),
            limit: Some("10".into()),
        };
        assert_eq!(
            spec.to_sql(),
            "SELECT DISTINCT name, COUNT(*) FROM users WHERE age>18 GROUP BY name \
             HAVING COUNT(*) > 1 ORDER BY name DESC LIMIT 10"
        );
    }

    #[test]
    fn query_spec_defaults_to_star() {
        assert_eq!(QuerySpec::new("t").to_sql(), "SELECT * FROM t");
        let empty_where = QuerySpec::new("t").selection("");
        assert_eq!(empty_where.to_sql(), "SELECT * FROM t");
    }

    #[test]
    fn insert_update_delete_sql() {
        let values = Record::new().with("name", "x").with("age", 3);
        assert_eq!(
            insert_sql("users", &values),
            "INSERT INTO users (name, age) VALUES (?, ?)"
        );
        assert_eq!(
            insert_sql("users", &Record::new()),
            "INSERT INTO users DEFAULT VALUES"
        );
        assert_eq!(
            update_sql("users", &values, Some("id = 1")),
            "UPDATE users SET name = ?, age = ? WHERE id = 1"
        );
        assert_eq!(delete_sql("users", None), "DELETE FROM users");
    }

    #[test]
    fn rows_materialize_records() {
        let rows = Rows::new(["id", "name"])
            .with_row(vec![Value::Integer(1), Value::Text("a".into())])
            .with_row(vec![Value::Integer(2)]);
        let set = rows.to_record_set();
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].get_string("name").as_deref(), Some("a"));
        assert_eq!(set[1].get("name"), Some(&Value::Null));
    }
}
