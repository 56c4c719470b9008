//! SQLite-backed handle and provider.

use crate::config::DbtoolConfig;
use crate::error::{DbtoolError, DbtoolResult};
use crate::handle::{
    DatabaseHandle, DatabaseProvider, OpenCallbacks, OpenOptions, QuerySpec, Rows, delete_sql,
    insert_sql, update_sql,
};
use crate::record::Record;
use crate::sql_log::{SqlLogConfig, SqlLogger};
use crate::value::Value;
use rusqlite::{Connection, OpenFlags, ToSql, params_from_iter};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Files SQLite keeps next to a database; never reported as databases.
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

static NEXT_MEMORY_STORE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    /// Private in-memory database owned by the handle.
    Memory,
    /// Named shared-cache in-memory database, addressed by URI.
    Shared(String),
}

fn shared_open_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

/// A named SQLite database, opened and closed around each operation.
///
/// On every `open` the stored `PRAGMA user_version` is compared with the
/// requested version: a fresh database (version 0) runs `on_create`, an older
/// one runs `on_upgrade`, and `on_open` runs last. Create/upgrade and the
/// version bump share one transaction.
///
/// An in-memory handle keeps its connection across `close` so the data
/// survives; only the open flag changes.
pub struct SqliteHandle {
    name: String,
    location: Location,
    conn: Option<Connection>,
    open: bool,
    version: i32,
    callbacks: OpenCallbacks,
    logger: SqlLogger,
}

impl SqliteHandle {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_location(name.into(), Location::File(path.into()))
    }

    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::with_location(name.into(), Location::Memory)
    }

    fn shared(name: impl Into<String>, uri: String) -> Self {
        Self::with_location(name.into(), Location::Shared(uri))
    }

    fn with_location(name: String, location: Location) -> Self {
        Self {
            name,
            location,
            conn: None,
            open: false,
            version: 1,
            callbacks: OpenCallbacks::default(),
            logger: SqlLogger::default(),
        }
    }

    pub fn with_options(mut self, options: OpenOptions) -> Self {
        self.version = options.version;
        self.callbacks = options.callbacks;
        self
    }

    pub fn with_sql_log(mut self, config: SqlLogConfig) -> Self {
        self.logger = SqlLogger::new(config);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory | Location::Shared(_) => None,
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    fn conn(&self) -> DbtoolResult<&Connection> {
        match (&self.conn, self.open) {
            (Some(conn), true) => Ok(conn),
            _ => Err(DbtoolError::NotOpen(self.name.clone())),
        }
    }

    /// The schema version stored in the database file.
    pub fn user_version(&self) -> DbtoolResult<i32> {
        let version = self
            .conn()?
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn run_lifecycle(&mut self) -> DbtoolResult<()> {
        if self.version < 1 {
            return Err(DbtoolError::validation(format!(
                "version must be at least 1, got {}",
                self.version
            )));
        }
        let current = self.user_version()?;
        let target = self.version;
        if current > target {
            return Err(DbtoolError::validation(format!(
                "cannot downgrade database {} from version {} to {}",
                self.name, current, target
            )));
        }

        // Callbacks receive `self`, so they are taken out while they run.
        let mut callbacks = std::mem::take(&mut self.callbacks);
        let result = self.apply_callbacks(&mut callbacks, current, target);
        self.callbacks = callbacks;
        result
    }

    fn apply_callbacks(
        &mut self,
        callbacks: &mut OpenCallbacks,
        current: i32,
        target: i32,
    ) -> DbtoolResult<()> {
        if current < target {
            self.execute("BEGIN")?;
            match self.migrate(callbacks, current, target) {
                Ok(()) => self.execute("COMMIT")?,
                Err(e) => {
                    if let Err(rollback) = self.execute("ROLLBACK") {
                        tracing::warn!(
                            target: "dbtool",
                            database = %self.name,
                            error = %rollback,
                            "rollback after failed migration failed"
                        );
                    }
                    return Err(e);
                }
            }
        }

        if let Some(on_open) = callbacks.on_open.as_mut() {
            let handle: &mut dyn DatabaseHandle = &mut *self;
            on_open(handle)?;
        }
        Ok(())
    }

    fn migrate(&mut self, callbacks: &mut OpenCallbacks, current: i32, target: i32) -> DbtoolResult<()> {
        if current == 0 {
            if let Some(on_create) = callbacks.on_create.as_mut() {
                tracing::debug!(target: "dbtool", database = %self.name, version = target, "creating schema");
                let handle: &mut dyn DatabaseHandle = &mut *self;
                on_create(handle)?;
            }
        } else if let Some(on_upgrade) = callbacks.on_upgrade.as_mut() {
            tracing::debug!(
                target: "dbtool",
                database = %self.name,
                from = current,
                to = target,
                "upgrading schema"
            );
            let handle: &mut dyn DatabaseHandle = &mut *self;
            on_upgrade(handle, current, target)?;
        }
        self.conn()?.pragma_update(None, "user_version", target)?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteHandle")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("open", &self.open)
            .field("version", &self.version)
            .finish()
    }
}

impl DatabaseHandle for SqliteHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> DbtoolResult<()> {
        if self.open {
            return Ok(());
        }
        if self.conn.is_none() {
            let conn = match &self.location {
                Location::File(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    Connection::open(path)?
                }
                Location::Memory => Connection::open_in_memory()?,
                Location::Shared(uri) => Connection::open_with_flags(uri, shared_open_flags())?,
            };
            self.conn = Some(conn);
        }
        self.open = true;

        if let Err(e) = self.run_lifecycle() {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        if matches!(self.location, Location::Memory) {
            return;
        }
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(target: "dbtool", database = %self.name, error = %e, "close failed");
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn execute(&mut self, sql: &str) -> DbtoolResult<()> {
        self.logger.log(&self.name, sql, 0);
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn query(&mut self, spec: &QuerySpec) -> DbtoolResult<Rows> {
        let sql = spec.to_sql();
        self.logger.log(&self.name, &sql, spec.selection_args.len());

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let mut rows = Rows::new(columns);
        let column_count = rows.column_count();

        let mut cursor = stmt.query(params_from_iter(spec.selection_args.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(Value::from(row.get_ref(idx)?));
            }
            rows.push_row(values);
        }
        Ok(rows)
    }

    fn insert(&mut self, table: &str, values: &Record) -> DbtoolResult<i64> {
        let sql = insert_sql(table, values);
        self.logger.log(&self.name, &sql, values.len());

        let conn = self.conn()?;
        conn.execute(&sql, params_from_iter(values.field_values()))?;
        Ok(conn.last_insert_rowid())
    }

    fn update(
        &mut self,
        table: &str,
        values: &Record,
        where_clause: Option<&str>,
        where_args: &[String],
    ) -> DbtoolResult<usize> {
        if values.is_empty() {
            return Err(DbtoolError::validation(format!(
                "UPDATE {} has no values to set",
                table
            )));
        }
        let sql = update_sql(table, values, where_clause);
        let params: Vec<&dyn ToSql> = values
            .field_values()
            .map(|v| v as &dyn ToSql)
            .chain(where_args.iter().map(|a| a as &dyn ToSql))
            .collect();
        self.logger.log(&self.name, &sql, params.len());

        Ok(self.conn()?.execute(&sql, params.as_slice())?)
    }

    fn delete(
        &mut self,
        table: &str,
        where_clause: Option<&str>,
        where_args: &[String],
    ) -> DbtoolResult<usize> {
        let sql = delete_sql(table, where_clause);
        self.logger.log(&self.name, &sql, where_args.len());

        Ok(self.conn()?.execute(&sql, params_from_iter(where_args.iter()))?)
    }

    fn list_database_names(&self) -> DbtoolResult<BTreeSet<String>> {
        match &self.location {
            Location::File(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                list_database_files(dir)
            }
            Location::Memory | Location::Shared(_) => Ok(BTreeSet::from([self.name.clone()])),
        }
    }
}

fn list_database_files(dir: &Path) -> DbtoolResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if SIDECAR_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }
        names.insert(name);
    }
    Ok(names)
}

/// In-memory databases of one provider.
///
/// Each name maps to a shared-cache database kept alive by one idle
/// connection, so reopening a name sees the same data until it is dropped.
#[derive(Debug)]
struct MemoryStores {
    id: u64,
    keepers: RefCell<BTreeMap<String, Connection>>,
}

impl MemoryStores {
    fn new() -> Self {
        Self {
            id: NEXT_MEMORY_STORE.fetch_add(1, Ordering::Relaxed),
            keepers: RefCell::new(BTreeMap::new()),
        }
    }

    fn uri(&self, name: &str) -> String {
        let encoded: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
            .collect();
        format!("file:dbtool-{}-{}?mode=memory&cache=shared", self.id, encoded)
    }

    /// URI for `name`, creating the backing store on first use.
    fn acquire(&self, name: &str) -> DbtoolResult<String> {
        let uri = self.uri(name);
        let mut keepers = self.keepers.borrow_mut();
        if !keepers.contains_key(name) {
            let keeper = Connection::open_with_flags(&uri, shared_open_flags())?;
            keepers.insert(name.to_string(), keeper);
        }
        Ok(uri)
    }
}

#[derive(Debug)]
enum Storage {
    Directory(PathBuf),
    Memory(MemoryStores),
}

/// Creates, lists and drops SQLite databases.
///
/// A directory provider stores each database as a file named after it. An
/// in-memory provider is meant for tests: its databases live as long as the
/// provider, and opening a name again reaches the same data until
/// `drop_database` discards it.
#[derive(Debug)]
pub struct SqliteProvider {
    storage: Storage,
    sql_log: SqlLogConfig,
}

impl SqliteProvider {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::Directory(data_dir.into()),
            sql_log: SqlLogConfig::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            storage: Storage::Memory(MemoryStores::new()),
            sql_log: SqlLogConfig::default(),
        }
    }

    pub fn from_config(config: &DbtoolConfig) -> Self {
        Self::new(config.data_dir.clone()).with_sql_log(config.sql_log.clone())
    }

    pub fn with_sql_log(mut self, config: SqlLogConfig) -> Self {
        self.sql_log = config;
        self
    }

    pub fn data_dir(&self) -> Option<&Path> {
        match &self.storage {
            Storage::Directory(dir) => Some(dir),
            Storage::Memory(_) => None,
        }
    }

    /// File backing `name`, for directory providers.
    pub fn database_path(&self, name: &str) -> Option<PathBuf> {
        self.data_dir().map(|dir| dir.join(name))
    }
}

impl DatabaseProvider for SqliteProvider {
    fn open_database(
        &self,
        name: &str,
        options: OpenOptions,
    ) -> DbtoolResult<Box<dyn DatabaseHandle>> {
        if name.trim().is_empty() {
            return Err(DbtoolError::validation("database name must not be empty"));
        }
        let handle = match &self.storage {
            Storage::Directory(dir) => SqliteHandle::file(name, dir.join(name)),
            Storage::Memory(stores) => SqliteHandle::shared(name, stores.acquire(name)?),
        };
        let mut handle = handle
            .with_options(options)
            .with_sql_log(self.sql_log.clone());
        tracing::debug!(target: "dbtool", database = name, version = handle.version(), "opening database");
        handle.open()?;
        Ok(Box::new(handle))
    }

    fn list_database_names(&self) -> DbtoolResult<BTreeSet<String>> {
        match &self.storage {
            Storage::Directory(dir) => list_database_files(dir),
            Storage::Memory(stores) => Ok(stores.keepers.borrow().keys().cloned().collect()),
        }
    }

    fn drop_database(&self, name: &str) -> DbtoolResult<bool> {
        match &self.storage {
            Storage::Directory(dir) => {
                let path = dir.join(name);
                if !path.is_file() {
                    return Ok(false);
                }
                std::fs::remove_file(&path)?;
                for suffix in SIDECAR_SUFFIXES {
                    let sidecar = dir.join(format!("{}{}", name, suffix));
                    if sidecar.is_file() {
                        std::fs::remove_file(sidecar)?;
                    }
                }
                tracing::debug!(target: "dbtool", database = name, "dropped database");
                Ok(true)
            }
            Storage::Memory(stores) => Ok(stores.keepers.borrow_mut().remove(name).is_some()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn closed_handle_rejects_statements() {
        let mut handle = SqliteHandle::in_memory("mem");
        let err = handle.execute("SELECT 1").unwrap_err();
        assert!(matches!(err, DbtoolError::NotOpen(ref n) if n == "mem"));
    }

    #[test]
    fn in_memory_data_survives_close() {
        let mut handle = SqliteHandle::in_memory("mem");
        handle.open().unwrap();
        handle.execute("CREATE TABLE t (a INTEGER)").unwrap();
        handle.insert("t", &Record::new().with("a", 7)).unwrap();
        handle.close();
        assert!(!handle.is_open());

        handle.open().unwrap();
        assert_eq!(handle.count_rows("t").unwrap(), 1);
    }

    #[test]
    fn lifecycle_runs_create_once_then_open_each_time() {
        let created = Rc::new(Cell::new(0));
        let opened = Rc::new(Cell::new(0));
        let (c, o) = (created.clone(), opened.clone());
        let callbacks = OpenCallbacks::new()
            .on_create(move |db| {
                c.set(c.get() + 1);
                db.execute("CREATE TABLE t (a INTEGER)")
            })
            .on_open(move |_| {
                o.set(o.get() + 1);
                Ok(())
            });

        let mut handle = SqliteHandle::in_memory("mem").with_options(OpenOptions::new(2).callbacks(callbacks));
        handle.open().unwrap();
        assert_eq!(handle.user_version().unwrap(), 2);
        handle.close();
        handle.open().unwrap();

        assert_eq!(created.get(), 1);
        assert_eq!(opened.get(), 2);
    }

    #[test]
    fn failed_create_rolls_back_and_closes() {
        let callbacks = OpenCallbacks::new().on_create(|db| {
            db.execute("CREATE TABLE t (a INTEGER)")?;
            Err(DbtoolError::execution("boom"))
        });
        let mut handle = SqliteHandle::in_memory("mem").with_options(OpenOptions::new(1).callbacks(callbacks));
        let err = handle.open().unwrap_err();
        assert!(err.is_execution());
        assert!(!handle.is_open());
    }

    #[test]
    fn update_without_values_is_rejected() {
        let mut handle = SqliteHandle::in_memory("mem");
        handle.open().unwrap();
        handle.execute("CREATE TABLE t (a INTEGER)").unwrap();
        let err = handle.update("t", &Record::new(), None, &[]).unwrap_err();
        assert!(matches!(err, DbtoolError::Validation(_)));
    }

    #[test]
    fn memory_provider_tracks_names() {
        let provider = SqliteProvider::in_memory();
        let handle = provider.open_database("a.db", OpenOptions::default()).unwrap();
        assert!(handle.is_open());
        assert!(provider.list_database_names().unwrap().contains("a.db"));
        assert!(provider.drop_database("a.db").unwrap());
        assert!(!provider.drop_database("a.db").unwrap());
    }

    #[test]
    fn memory_provider_reopens_same_data() {
        let provider = SqliteProvider::in_memory();
        let mut first = provider.open_database("a.db", OpenOptions::default()).unwrap();
        first.execute("CREATE TABLE t (a INTEGER)").unwrap();
        first.insert("t", &Record::new().with("a", 1)).unwrap();
        first.close();
        drop(first);

        let mut again = provider.open_database("a.db", OpenOptions::default()).unwrap();
        assert_eq!(again.count_rows("t").unwrap(), 1);

        let mut other = provider.open_database("b.db", OpenOptions::default()).unwrap();
        assert!(other.count_rows("t").is_err());

        let fresh = SqliteProvider::in_memory();
        let mut unrelated = fresh.open_database("a.db", OpenOptions::default()).unwrap();
        assert!(unrelated.count_rows("t").is_err());

        again.close();
        drop(again);
        assert!(provider.drop_database("a.db").unwrap());
        let mut recreated = provider.open_database("a.db", OpenOptions::default()).unwrap();
        assert!(recreated.count_rows("t").is_err());
    }

    #[test]
    fn provider_rejects_empty_name() {
        let provider = SqliteProvider::in_memory();
        assert!(provider.open_database(" ", OpenOptions::default()).is_err());
    }
}
