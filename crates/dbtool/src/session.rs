//! Session controller: the chainable façade over a stack of action units.

use crate::action::{ActionUnit, Outcome};
use crate::config::DbtoolConfig;
use crate::error::{DbtoolError, DbtoolResult};
use crate::handle::{DatabaseHandle, DatabaseProvider, OpenCallbacks, OpenGuard, OpenOptions};
use crate::record::{Record, RecordSet};
use crate::schema::TableDefinition;
use crate::sqlite::SqliteProvider;
use crate::value::Value;
use std::fmt;

/// A chainable SQL session bound to at most one database.
///
/// Verb calls (`get_all`, `select`, `update`, `insert_into`, `delete_from`,
/// ...) push a new [`ActionUnit`]. Every other chain call configures the unit
/// on top of the stack and does nothing when the stack is empty; use
/// [`Session::has_pending_unit`] to detect that. [`Session::run`] pops the
/// top unit and executes it, so units run in LIFO order.
///
/// The bound handle is opened for the length of each operation and closed
/// afterwards if it was closed before.
///
/// # Example
///
/// ```rust
/// use dbtool::{Session, SqliteProvider};
///
/// let mut db = Session::with_provider(SqliteProvider::in_memory());
/// db.create_db("app.db")?;
/// db.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")?;
///
/// db.insert_into("users").set("name", "Bo").set("age", 31).run()?;
/// let name = db
///     .get_string("name")
///     .from("users")
///     .where_greater_than("age", 18)
///     .run()?
///     .into_scalar();
/// assert_eq!(name.as_ref().and_then(|s| s.as_str()), Some("Bo"));
/// # Ok::<(), dbtool::DbtoolError>(())
/// ```
pub struct Session {
    provider: Option<Box<dyn DatabaseProvider>>,
    handle: Option<Box<dyn DatabaseHandle>>,
    db_name: Option<String>,
    db_version: i32,
    stack: Vec<ActionUnit>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("db_name", &self.db_name)
            .field("db_version", &self.db_version)
            .field("has_provider", &self.provider.is_some())
            .field("bound", &self.handle.is_some())
            .field("pending_units", &self.stack.len())
            .finish()
    }
}

macro_rules! modifier {
    ($(#[$meta:meta])* $name:ident($($arg:ident: $ty:ty),*)) => {
        $(#[$meta])*
        pub fn $name(&mut self, $($arg: $ty),*) -> &mut Self {
            if let Some(unit) = self.top() {
                unit.$name($($arg),*);
            }
            self
        }
    };
}

impl Session {
    /// A session with no provider and no bound database.
    pub fn new() -> Self {
        Self {
            provider: None,
            handle: None,
            db_name: None,
            db_version: 1,
            stack: Vec::new(),
        }
    }

    /// A session that creates and opens databases through `provider`.
    pub fn with_provider(provider: impl DatabaseProvider + 'static) -> Self {
        Self {
            provider: Some(Box::new(provider)),
            ..Self::new()
        }
    }

    /// A session bound to an existing handle.
    pub fn with_handle(handle: Box<dyn DatabaseHandle>) -> Self {
        let mut session = Self::new();
        session.bind(handle);
        session
    }

    /// A file-backed SQLite session configured from `config`.
    pub fn from_config(config: &DbtoolConfig) -> DbtoolResult<Self> {
        config.validate()?;
        let mut session = Self::with_provider(SqliteProvider::from_config(config));
        session.db_version = config.version;
        Ok(session)
    }

    // ==================== Database management ====================

    /// Bind an already opened (or openable) handle and adopt its name.
    pub fn bind(&mut self, handle: Box<dyn DatabaseHandle>) -> &mut Self {
        self.db_name = Some(handle.name().to_string());
        self.handle = Some(handle);
        self
    }

    /// Set the database name to work with.
    ///
    /// Does not open anything, unless a handle for a different database is
    /// already bound: that handle is then replaced by one for `name`.
    pub fn set_db(&mut self, name: &str) -> DbtoolResult<()> {
        self.db_name = Some(name.to_string());
        let mismatched = self.handle.as_ref().is_some_and(|h| h.name() != name);
        if mismatched {
            tracing::debug!(target: "dbtool", database = name, "re-pointing session handle");
            self.create_or_open(name, OpenCallbacks::default())?;
        }
        Ok(())
    }

    pub fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    pub fn db_version(&self) -> i32 {
        self.db_version
    }

    /// Version used by the next database creation.
    pub fn set_db_version(&mut self, version: i32) -> &mut Self {
        self.db_version = version;
        self
    }

    pub fn handle(&self) -> Option<&dyn DatabaseHandle> {
        self.handle.as_deref()
    }

    fn provider(&self) -> DbtoolResult<&dyn DatabaseProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| DbtoolError::Config("no database provider configured".to_string()))
    }

    fn create_or_open(&mut self, name: &str, callbacks: OpenCallbacks) -> DbtoolResult<()> {
        let options = OpenOptions::new(self.db_version).callbacks(callbacks);
        let handle = self.provider()?.open_database(name, options)?;
        if let Some(mut previous) = self.handle.take() {
            previous.close();
        }
        self.db_name = Some(name.to_string());
        self.handle = Some(handle);
        Ok(())
    }

    /// Create (or open) the database `name` and bind it.
    pub fn create_db(&mut self, name: &str) -> DbtoolResult<()> {
        self.create_or_open(name, OpenCallbacks::default())
    }

    /// Create the database and every table in `tables`.
    ///
    /// Returns `false` as soon as one table fails to create.
    pub fn create_db_with_tables(
        &mut self,
        name: &str,
        tables: &mut [TableDefinition],
    ) -> DbtoolResult<bool> {
        self.create_db(name)?;
        for table in tables.iter_mut() {
            if !self.create_table(table)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Create the database with lifecycle callbacks.
    pub fn create_db_with_callbacks(
        &mut self,
        name: &str,
        callbacks: OpenCallbacks,
    ) -> DbtoolResult<()> {
        self.create_or_open(name, callbacks)
    }

    /// Open the bound database, or open the named one through the provider.
    pub fn open_db(&mut self) -> DbtoolResult<()> {
        let bound_name = self.handle.as_ref().map(|h| h.name().to_string());
        match (bound_name, self.db_name.clone()) {
            (Some(bound), Some(name)) if bound != name => self.create_db(&name),
            (Some(_), _) => self.bound_handle_raw()?.open(),
            (None, Some(name)) if self.provider.is_some() => self.create_db(&name),
            (None, _) => Err(DbtoolError::NoDatabaseBound),
        }
    }

    pub fn close_db(&mut self) {
        if let Some(handle) = self.handle.as_mut().filter(|h| h.is_open()) {
            handle.close();
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_open())
    }

    /// Whether a database called `name` exists.
    pub fn db_exists(&self, name: &str) -> DbtoolResult<bool> {
        let names = match (&self.provider, &self.handle) {
            (Some(provider), _) => provider.list_database_names()?,
            (None, Some(handle)) => handle.list_database_names()?,
            (None, None) => return Err(DbtoolError::NoDatabaseBound),
        };
        Ok(names.contains(name))
    }

    /// Delete the database `name`. Failures are reported as `false`.
    pub fn drop_db(&mut self, name: &str) -> bool {
        if self.handle.as_ref().is_some_and(|h| h.name() == name) {
            if let Some(mut handle) = self.handle.take() {
                handle.close();
            }
        }
        match self.provider().and_then(|p| p.drop_database(name)) {
            Ok(dropped) => dropped,
            Err(e) => {
                tracing::warn!(target: "dbtool", database = name, error = %e, "drop database failed");
                false
            }
        }
    }

    /// Close and release the bound handle and discard pending units.
    pub fn destroy(&mut self) {
        self.close_db();
        self.handle = None;
        self.stack.clear();
    }

    // ==================== Table management ====================

    fn bound_handle_raw(&mut self) -> DbtoolResult<&mut dyn DatabaseHandle> {
        match self.handle.as_deref_mut() {
            Some(handle) => Ok(handle),
            None => Err(DbtoolError::NoDatabaseBound),
        }
    }

    fn bound_handle(&mut self) -> DbtoolResult<OpenGuard<'_>> {
        OpenGuard::acquire(self.bound_handle_raw()?)
    }

    /// Whether `table` exists. Failed lookups count as "does not exist".
    pub fn table_exists(&mut self, table: &str) -> DbtoolResult<bool> {
        let mut db = self.bound_handle()?;
        match db.count_rows(table) {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(target: "dbtool", table, error = %e, "table lookup failed");
                Ok(false)
            }
        }
    }

    /// Whether `table` has no rows.
    ///
    /// Errors with [`DbtoolError::TableNotFound`] when the table does not exist.
    pub fn table_is_empty(&mut self, table: &str) -> DbtoolResult<bool> {
        if !self.table_exists(table)? {
            return Err(DbtoolError::TableNotFound(table.to_string()));
        }
        let mut db = self.bound_handle()?;
        match db.count_rows(table) {
            Ok(count) => Ok(count < 1),
            Err(e) => {
                tracing::warn!(target: "dbtool", table, error = %e, "row count failed");
                Ok(false)
            }
        }
    }

    /// Execute `table`'s CREATE statement, compiling it first if needed.
    pub fn create_table(&mut self, table: &mut TableDefinition) -> DbtoolResult<bool> {
        let sql = table.build().to_string();
        self.create_table_sql(&sql)
    }

    /// Execute a raw CREATE TABLE statement; failures are reported as `false`.
    pub fn create_table_sql(&mut self, sql: &str) -> DbtoolResult<bool> {
        match self.exec(sql) {
            Ok(()) => Ok(true),
            Err(DbtoolError::NoDatabaseBound) => Err(DbtoolError::NoDatabaseBound),
            Err(e) => {
                tracing::warn!(target: "dbtool", error = %e, "create table failed");
                Ok(false)
            }
        }
    }

    /// Drop `table` if it exists, then create it.
    pub fn create_new_table(&mut self, table: &mut TableDefinition) -> DbtoolResult<bool> {
        self.drop_table(table.name())?;
        self.create_table(table)
    }

    pub fn drop_table(&mut self, table: &str) -> DbtoolResult<()> {
        self.exec(&format!("DROP TABLE IF EXISTS {}", table))
    }

    /// Execute raw SQL against the bound database.
    pub fn exec(&mut self, sql: &str) -> DbtoolResult<()> {
        let mut db = self.bound_handle()?;
        db.execute(sql)
    }

    // ==================== Stack ====================

    fn push(&mut self, unit: ActionUnit) -> &mut Self {
        tracing::debug!(target: "dbtool", action = ?unit.action(), depth = self.stack.len() + 1, "push unit");
        self.stack.push(unit);
        self
    }

    fn top(&mut self) -> Option<&mut ActionUnit> {
        self.stack.last_mut()
    }

    fn push_with(&mut self, f: impl FnOnce(&mut ActionUnit)) -> &mut Self {
        let mut unit = ActionUnit::new();
        f(&mut unit);
        self.push(unit)
    }

    pub fn has_pending_unit(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn pending_units(&self) -> usize {
        self.stack.len()
    }

    /// The unit chain calls currently configure.
    pub fn current_unit(&self) -> Option<&ActionUnit> {
        self.stack.last()
    }

    // ==================== Verbs ====================

    pub fn get_all(&mut self) -> &mut Self {
        self.push_with(|u| {
            u.get_all();
        })
    }

    pub fn get<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_with(|u| {
            u.get(columns);
        })
    }

    pub fn select_all(&mut self) -> &mut Self {
        self.push_with(|u| {
            u.select_all();
        })
    }

    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_with(|u| {
            u.select(columns);
        })
    }

    pub fn get_string(&mut self, column: &str) -> &mut Self {
        self.push_with(|u| {
            u.get_string(column);
        })
    }

    pub fn get_int(&mut self, column: &str) -> &mut Self {
        self.push_with(|u| {
            u.get_int(column);
        })
    }

    pub fn get_float(&mut self, column: &str) -> &mut Self {
        self.push_with(|u| {
            u.get_float(column);
        })
    }

    pub fn get_double(&mut self, column: &str) -> &mut Self {
        self.push_with(|u| {
            u.get_double(column);
        })
    }

    pub fn update(&mut self, table: &str) -> &mut Self {
        self.push_with(|u| {
            u.update(table);
        })
    }

    pub fn update_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_with(|u| {
            u.update_tables(tables);
        })
    }

    /// Start an INSERT of `values`; name the table with [`Session::into_table`].
    pub fn insert(&mut self, values: &Record) -> &mut Self {
        self.push_with(|u| {
            u.insert(values);
        })
    }

    pub fn insert_into(&mut self, table: &str) -> &mut Self {
        self.push_with(|u| {
            u.insert_into(table);
        })
    }

    pub fn delete_from(&mut self, table: &str) -> &mut Self {
        self.push_with(|u| {
            u.delete_from(table);
        })
    }

    pub fn delete_from_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_with(|u| {
            u.delete_from_tables(tables);
        })
    }

    // ==================== Modifiers ====================

    modifier!(
        /// Target table of the pending INSERT.
        into_table(table: &str)
    );
    modifier!(from(table: &str));
    modifier!(values(values: &Record));
    modifier!(record_set(records: RecordSet));
    modifier!(
        /// Raw WHERE fragment, concatenated as-is.
        where_raw(fragment: &str)
    );
    modifier!(and());
    modifier!(or());
    modifier!(distinct());
    modifier!(group_by(group_by: &str));
    modifier!(having(having: &str));
    modifier!(order_by(order_by: &str));
    modifier!(limit(limit: u64));
    modifier!(limit_offset(limit: u64, offset: u64));

    pub fn from_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(unit) = self.top() {
            unit.from_tables(tables);
        }
        self
    }

    /// Alias for [`Session::values`].
    pub fn record(&mut self, record: &Record) -> &mut Self {
        self.values(record)
    }

    /// Alias for [`Session::values`].
    pub fn row(&mut self, record: &Record) -> &mut Self {
        self.values(record)
    }

    /// Alias for [`Session::record_set`].
    pub fn rows(&mut self, records: RecordSet) -> &mut Self {
        self.record_set(records)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.set(column, value);
        }
        self
    }

    pub fn where_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_equals(field, value);
        }
        self
    }

    pub fn where_not_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_not_equals(field, value);
        }
        self
    }

    pub fn where_less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_less_than(field, value);
        }
        self
    }

    pub fn where_less_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_less_than_or_equals(field, value);
        }
        self
    }

    pub fn where_greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_greater_than(field, value);
        }
        self
    }

    pub fn where_greater_than_or_equals(
        &mut self,
        field: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_greater_than_or_equals(field, value);
        }
        self
    }

    pub fn where_like(&mut self, field: &str, pattern: impl Into<Value>) -> &mut Self {
        if let Some(unit) = self.top() {
            unit.where_like(field, pattern);
        }
        self
    }

    pub fn where_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(unit) = self.top() {
            unit.where_args(args);
        }
        self
    }

    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(unit) = self.top() {
            unit.columns(columns);
        }
        self
    }

    // ==================== Execution ====================

    /// Pop the top unit and execute it.
    ///
    /// An empty stack yields [`Outcome::Nothing`]. The unit is only popped
    /// once the database is open: without a bound database, or when opening
    /// it fails, the unit stays on the stack and the error is returned.
    pub fn run(&mut self) -> DbtoolResult<Outcome> {
        if self.stack.is_empty() {
            return Ok(Outcome::Nothing);
        }
        let Some(handle) = self.handle.as_deref_mut() else {
            return Err(DbtoolError::NoDatabaseBound);
        };
        let mut db = OpenGuard::acquire(handle)?;
        let Some(mut unit) = self.stack.pop() else {
            return Ok(Outcome::Nothing);
        };
        tracing::debug!(target: "dbtool", action = ?unit.action(), depth = self.stack.len(), "pop unit");
        unit.run(&mut *db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Rows;
    use crate::mock::{Call, MockHandle};
    use crate::schema::ColumnDefinition;
    use crate::value::Scalar;

    fn bound(mock: &MockHandle) -> Session {
        Session::with_handle(mock.boxed())
    }

    #[test]
    fn modifiers_on_empty_stack_are_ignored() {
        let mut db = Session::new();
        db.from("users").where_equals("id", 1).limit(2).set("a", 1);
        assert!(!db.has_pending_unit());
        assert!(db.run().unwrap().is_nothing());
    }

    #[test]
    fn run_without_database_keeps_unit() {
        let mut db = Session::new();
        db.get_all().from("users");
        let err = db.run().unwrap_err();
        assert!(err.is_no_database());
        assert_eq!(db.pending_units(), 1);
    }

    #[test]
    fn units_run_last_in_first_out() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        db.delete_from("a");
        db.delete_from("b");
        assert_eq!(db.pending_units(), 2);

        db.run().unwrap();
        db.run().unwrap();
        assert!(db.run().unwrap().is_nothing());

        let tables: Vec<String> = mock
            .statements()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { table, .. } => Some(table),
                _ => None,
            })
            .collect();
        assert_eq!(tables, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn modifiers_configure_top_unit_only() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        db.update("first").set("a", 1);
        db.update("second").set("b", 2).where_equals("id", 3);
        assert_eq!(
            db.current_unit().and_then(ActionUnit::to_sql).as_deref(),
            Some("UPDATE second SET b = ? WHERE id = 3")
        );
        db.run().unwrap();
        assert_eq!(
            db.current_unit().and_then(ActionUnit::to_sql).as_deref(),
            Some("UPDATE first SET a = ?")
        );
    }

    #[test]
    fn delete_issues_primitive_and_returns_count() {
        let mock = MockHandle::new("app.db");
        mock.set_affected(1);
        let mut db = bound(&mock);
        let outcome = db.delete_from("users").where_equals("id", 5).run().unwrap();
        assert_eq!(outcome.affected(), Some(1));
        assert_eq!(
            mock.statements(),
            vec![Call::Delete {
                table: "users".into(),
                where_clause: Some("id = 5".into()),
                args: vec![],
            }]
        );
    }

    #[test]
    fn insert_then_into_names_table() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        let values = Record::new().with("name", "Bo");
        let outcome = db.insert(&values).into_table("users").run().unwrap();
        assert_eq!(outcome.row_id(), Some(1));
        assert_eq!(db.pending_units(), 0);
        assert_eq!(
            mock.statements(),
            vec![Call::Insert {
                table: "users".into(),
                values,
            }]
        );
    }

    #[test]
    fn scalar_read_on_empty_table_is_absent() {
        let mock = MockHandle::new("app.db");
        mock.push_rows(Rows::new(["name"]));
        let mut db = bound(&mock);
        let value = db.get_string("name").from("users").run().unwrap();
        assert_eq!(value, Outcome::Scalar(None));
    }

    #[test]
    fn scalar_read_converts_first_row() {
        let mock = MockHandle::new("app.db");
        mock.push_rows(Rows::new(["price"]).with_row(vec![Value::Real(2.5)]));
        let mut db = bound(&mock);
        let value = db.get_double("price").from("items").run().unwrap().into_scalar();
        assert_eq!(value, Some(Scalar::Double(2.5)));
    }

    #[test]
    fn handle_is_opened_and_closed_around_run() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        db.delete_from("users").run().unwrap();
        let calls = mock.calls();
        assert_eq!(calls.first(), Some(&Call::Open));
        assert_eq!(calls.last(), Some(&Call::Close));
        assert!(!db.is_open());
    }

    #[test]
    fn already_open_handle_stays_open() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        db.open_db().unwrap();
        db.exec("VACUUM").unwrap();
        assert!(db.is_open());
        assert!(!mock.calls().contains(&Call::Close));
    }

    #[test]
    fn table_management_requires_database() {
        let mut db = Session::new();
        assert!(db.table_exists("users").unwrap_err().is_no_database());
        assert!(db.exec("SELECT 1").unwrap_err().is_no_database());
        assert!(db.drop_table("users").unwrap_err().is_no_database());
        let mut table = TableDefinition::new("t").column(ColumnDefinition::new("a"));
        assert!(db.create_table(&mut table).unwrap_err().is_no_database());
    }

    #[test]
    fn table_exists_follows_count_query() {
        let mock = MockHandle::new("app.db");
        mock.push_rows(Rows::new(["COUNT(*)"]).with_row(vec![Value::Integer(0)]));
        mock.push_query_error("no such table: ghosts");
        let mut db = bound(&mock);
        assert!(db.table_exists("users").unwrap());
        assert!(!db.table_exists("ghosts").unwrap());
    }

    #[test]
    fn table_is_empty_reports_missing_table() {
        let mock = MockHandle::new("app.db");
        mock.push_query_error("no such table: ghosts");
        let mut db = bound(&mock);
        let err = db.table_is_empty("ghosts").unwrap_err();
        assert!(matches!(err, DbtoolError::TableNotFound(ref t) if t == "ghosts"));
    }

    #[test]
    fn table_is_empty_counts_rows() {
        let mock = MockHandle::new("app.db");
        mock.push_rows(Rows::new(["COUNT(*)"]).with_row(vec![Value::Integer(2)]));
        mock.push_rows(Rows::new(["COUNT(*)"]).with_row(vec![Value::Integer(2)]));
        let mut db = bound(&mock);
        assert!(!db.table_is_empty("users").unwrap());
    }

    #[test]
    fn create_table_failure_is_false() {
        let mock = MockHandle::new("app.db");
        mock.fail_execute(true);
        let mut db = bound(&mock);
        let mut table = TableDefinition::new("t").column(ColumnDefinition::new("a"));
        assert!(!db.create_table(&mut table).unwrap());
    }

    #[test]
    fn create_new_table_drops_first() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        let mut table = TableDefinition::new("t").column(ColumnDefinition::new("a").type_text());
        assert!(db.create_new_table(&mut table).unwrap());
        assert_eq!(
            mock.statements(),
            vec![
                Call::Execute("DROP TABLE IF EXISTS t".into()),
                Call::Execute("CREATE TABLE IF NOT EXISTS t( a TEXT);".into()),
            ]
        );
    }

    #[test]
    fn db_exists_without_provider_asks_handle() {
        let mock = MockHandle::new("app.db");
        let db = bound(&mock);
        assert!(db.db_exists("app.db").unwrap());
        assert!(!db.db_exists("other.db").unwrap());
        assert!(Session::new().db_exists("app.db").unwrap_err().is_no_database());
    }

    #[test]
    fn create_db_needs_provider() {
        let mut db = Session::new();
        let err = db.create_db("app.db").unwrap_err();
        assert!(matches!(err, DbtoolError::Config(_)));
        assert!(!db.drop_db("app.db"));
    }

    #[test]
    fn destroy_discards_pending_units() {
        let mock = MockHandle::new("app.db");
        let mut db = bound(&mock);
        db.get_all().from("a");
        db.destroy();
        assert!(!db.has_pending_unit());
        assert!(db.handle().is_none());
    }
}
