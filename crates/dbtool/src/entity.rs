//! Per-table CRUD helper over a [`Session`].
//!
//! An [`EntityTable`] owns the schema of one table in one database and wraps
//! the common row operations. Every call opens the database, runs, and closes
//! it again unless the session already had it open. Failures are logged and
//! reported as `false`.

use crate::error::{DbtoolError, DbtoolResult};
use crate::record::Record;
use crate::schema::TableDefinition;
use crate::session::Session;
use crate::value::Value;

/// Primary key column every entity table is addressed by.
pub const COL_ID: &str = "id";

#[derive(Debug, Clone)]
pub struct EntityTable {
    db_name: String,
    schema: TableDefinition,
    /// Label attached to logged failures.
    tag: String,
    last_created_id: i64,
}

impl EntityTable {
    /// The tag defaults to the table name.
    pub fn new(db_name: impl Into<String>, schema: TableDefinition) -> Self {
        let tag = schema.name().to_string();
        Self {
            db_name: db_name.into(),
            schema,
            tag,
            last_created_id: 0,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn table(&self) -> &str {
        self.schema.name()
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Row id of the last successful [`create`](Self::create), `0` before any.
    pub fn last_created_id(&self) -> i64 {
        self.last_created_id
    }

    /// Create the table, dropping it first when `drop_table` is set.
    pub fn create_schema(&mut self, session: &mut Session, drop_table: bool) -> bool {
        let result = scoped(session, &self.db_name, |s| {
            if drop_table {
                s.create_new_table(&mut self.schema)
            } else {
                s.create_table(&mut self.schema)
            }
        });
        self.report("create schema", result).unwrap_or(false)
    }

    /// Insert `record` and remember its row id.
    pub fn create(&mut self, session: &mut Session, record: &Record) -> bool {
        let table = self.schema.name().to_string();
        let result = scoped(session, &self.db_name, |s| {
            let outcome = s.insert(record).into_table(&table).run()?;
            outcome
                .row_id()
                .ok_or_else(|| DbtoolError::execution("insert returned no row id"))
        });
        match self.report("create", result) {
            Some(id) => {
                self.last_created_id = id;
                id > 0
            }
            None => false,
        }
    }

    /// Update the row with `id`. `false` when no row matched.
    pub fn update(&self, session: &mut Session, id: i64, record: &Record) -> bool {
        let result = scoped(session, &self.db_name, |s| {
            s.update(self.table())
                .values(record)
                .where_equals(COL_ID, id)
                .run()
        });
        self.affected_any("update", result)
    }

    pub fn delete(&self, session: &mut Session, id: i64) -> bool {
        self.delete_where(session, COL_ID, id)
    }

    /// Delete every row whose `field` equals `value`.
    pub fn delete_where(&self, session: &mut Session, field: &str, value: impl Into<Value>) -> bool {
        let result = scoped(session, &self.db_name, |s| {
            s.delete_from(self.table()).where_equals(field, value).run()
        });
        self.affected_any("delete", result)
    }

    /// Delete the rows matching every field of `record`.
    ///
    /// An empty record is rejected rather than clearing the table.
    pub fn delete_matching(&self, session: &mut Session, record: &Record) -> bool {
        let result = scoped(session, &self.db_name, |s| {
            if record.is_empty() {
                return Err(DbtoolError::validation("refusing to delete with an empty record"));
            }
            s.delete_from(self.table());
            for (field, value) in record.iter() {
                s.where_equals(field, value.clone()).and();
            }
            s.run()
        });
        self.affected_any("delete", result)
    }

    /// Whether the table holds at least one row.
    pub fn has_items(&self, session: &mut Session) -> bool {
        let result = scoped(session, &self.db_name, |s| {
            s.get([COL_ID]).from(self.table()).limit(1).run()
        });
        self.report("has items", result)
            .and_then(|outcome| outcome.into_records())
            .is_some_and(|records| !records.is_empty())
    }

    fn affected_any(&self, op: &str, result: DbtoolResult<crate::Outcome>) -> bool {
        self.report(op, result)
            .and_then(|outcome| outcome.affected())
            .is_some_and(|n| n > 0)
    }

    fn report<T>(&self, op: &str, result: DbtoolResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    target: "dbtool",
                    tag = %self.tag,
                    table = self.schema.name(),
                    op,
                    error = %e,
                    "entity operation failed"
                );
                None
            }
        }
    }
}

/// Run `f` with `db_name` open, closing it afterwards if it was closed before.
fn scoped<T>(
    session: &mut Session,
    db_name: &str,
    f: impl FnOnce(&mut Session) -> DbtoolResult<T>,
) -> DbtoolResult<T> {
    let was_open = session.is_open() && session.db_name() == Some(db_name);
    let result = session
        .set_db(db_name)
        .and_then(|()| session.open_db())
        .and_then(|()| f(session));
    if !was_open {
        session.close_db();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDefinition;
    use crate::sqlite::SqliteProvider;

    fn notes() -> EntityTable {
        let schema = TableDefinition::new("notes")
            .column(ColumnDefinition::new(COL_ID).type_int().primary_key().auto_increment())
            .column(ColumnDefinition::new("title").type_text().not_null())
            .column(ColumnDefinition::new("pinned").type_int().default_value(0));
        EntityTable::new("notes.db", schema).with_tag("NoteStore")
    }

    fn session() -> Session {
        Session::with_provider(SqliteProvider::in_memory())
    }

    fn count(session: &mut Session) -> usize {
        session.set_db("notes.db").unwrap();
        session.open_db().unwrap();
        let n = session
            .get_all()
            .from("notes")
            .run()
            .unwrap()
            .into_records()
            .map_or(0, |r| r.len());
        session.close_db();
        n
    }

    #[test]
    fn create_remembers_row_id_and_closes_database() {
        let mut session = session();
        let mut notes = notes();
        assert_eq!(notes.tag(), "NoteStore");
        assert!(notes.create_schema(&mut session, false));
        assert!(!session.is_open());
        assert!(!notes.has_items(&mut session));

        assert!(notes.create(&mut session, &Record::new().with("title", "milk")));
        assert_eq!(notes.last_created_id(), 1);
        assert!(notes.create(&mut session, &Record::new().with("title", "eggs")));
        assert_eq!(notes.last_created_id(), 2);

        assert!(notes.has_items(&mut session));
        assert!(!session.is_open());
    }

    #[test]
    fn update_and_delete_by_id() {
        let mut session = session();
        let mut notes = notes();
        notes.create_schema(&mut session, false);
        notes.create(&mut session, &Record::new().with("title", "milk"));
        let id = notes.last_created_id();

        assert!(notes.update(&mut session, id, &Record::new().with("pinned", 1)));
        assert!(!notes.update(&mut session, id + 10, &Record::new().with("pinned", 1)));

        assert!(notes.delete(&mut session, id));
        assert!(!notes.delete(&mut session, id));
        assert!(!notes.has_items(&mut session));
    }

    #[test]
    fn delete_by_field_and_by_record() {
        let mut session = session();
        let mut notes = notes();
        notes.create_schema(&mut session, false);
        for (title, pinned) in [("a", 0), ("b", 1), ("c", 1), ("c", 0)] {
            notes.create(&mut session, &Record::new().with("title", title).with("pinned", pinned));
        }

        assert!(notes.delete_matching(
            &mut session,
            &Record::new().with("title", "c").with("pinned", 1)
        ));
        assert_eq!(count(&mut session), 3);

        assert!(notes.delete_where(&mut session, "pinned", 0));
        assert_eq!(count(&mut session), 1);

        assert!(!notes.delete_matching(&mut session, &Record::new()));
        assert_eq!(count(&mut session), 1);
    }

    #[test]
    fn failures_are_reported_as_false() {
        let mut session = session();
        let mut notes = notes();
        notes.create_schema(&mut session, false);
        notes.create(&mut session, &Record::new().with("title", "milk"));

        assert!(!notes.create(&mut session, &Record::new().with("pinned", 1)));
        assert!(!notes.create(&mut session, &Record::new().with("colour", "red")));
        assert_eq!(notes.last_created_id(), 1);
        assert!(!session.is_open());
        assert!(!session.has_pending_unit());

        let mut unbound = Session::new();
        assert!(!notes.has_items(&mut unbound));
        assert!(!notes.create_schema(&mut unbound, false));
    }

    #[test]
    fn recreating_schema_drops_rows() {
        let mut session = session();
        let mut notes = notes();
        notes.create_schema(&mut session, false);
        notes.create(&mut session, &Record::new().with("title", "milk"));

        assert!(notes.create_schema(&mut session, false));
        assert!(notes.has_items(&mut session));

        assert!(notes.create_schema(&mut session, true));
        assert!(!notes.has_items(&mut session));
    }

    #[test]
    fn open_session_stays_open() {
        let mut session = session();
        session.create_db("notes.db").unwrap();
        assert!(session.is_open());

        let mut notes = notes();
        assert!(notes.create_schema(&mut session, false));
        assert!(notes.create(&mut session, &Record::new().with("title", "milk")));
        assert!(session.is_open());
    }
}
