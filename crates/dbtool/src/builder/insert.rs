use super::traits::{StatementBuilder, require_table};
use crate::error::DbtoolResult;
use crate::handle::{DatabaseHandle, insert_sql};
use crate::record::{Record, RecordSet};
use crate::value::Value;

/// Savepoint wrapping a record-set insert so it applies all-or-nothing.
const RECORD_SET_SAVEPOINT: &str = "dbtool_record_set";

/// INSERT builder for one value map or a whole record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertBuilder {
    table: String,
    values: Record,
    /// When present, each record is inserted and `values` is ignored.
    records: Option<RecordSet>,
}

impl InsertBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target table.
    pub fn into_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self
    }

    /// The target table, empty until [`into_table`](Self::into_table).
    pub fn table(&self) -> &str {
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

    /// Insert every record of `records` instead of the pending values.
    ///
    /// The inserts share one savepoint: when any of them fails, the ones
    /// before it are rolled back and the error is returned.
    pub fn record_set(&mut self, records: RecordSet) -> &mut Self {
        self.records = Some(records);
        self
    }

    /// Values for the single-row insert.
    pub fn pending_values(&self) -> &Record {
        &self.values
    }

    pub fn has_record_set(&self) -> bool {
        self.records.is_some()
    }
}

impl StatementBuilder for InsertBuilder {
    /// Row ids in insertion order.
    type Output = Vec<i64>;

    fn to_sql(&self) -> String {
        match self.records.as_ref().and_then(RecordSet::first) {
            Some(first) => insert_sql(&self.table, first),
            None => insert_sql(&self.table, &self.values),
        }
    }

    fn validate(&self) -> DbtoolResult<()> {
        require_table(&self.table, "INSERT")
    }

    fn execute(&self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<Vec<i64>> {
        match &self.records {
            Some(records) => insert_all(handle, &self.table, records),
            None => Ok(vec![handle.insert(&self.table, &self.values)?]),
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Insert every record inside one savepoint; a failure rolls back the rows
/// already written.
fn insert_all(
    handle: &mut dyn DatabaseHandle,
    table: &str,
    records: &RecordSet,
) -> DbtoolResult<Vec<i64>> {
    handle.execute(&format!("SAVEPOINT {}", RECORD_SET_SAVEPOINT))?;
    let inserted: DbtoolResult<Vec<i64>> = records
        .iter()
        .map(|record| handle.insert(table, record))
        .collect();
    match inserted {
        Ok(ids) => {
            handle.execute(&format!("RELEASE SAVEPOINT {}", RECORD_SET_SAVEPOINT))?;
            Ok(ids)
        }
        Err(e) => {
            let rollback = handle
                .execute(&format!("ROLLBACK TO SAVEPOINT {}", RECORD_SET_SAVEPOINT))
                .and_then(|()| handle.execute(&format!("RELEASE SAVEPOINT {}", RECORD_SET_SAVEPOINT)));
            if let Err(rollback) = rollback {
                tracing::warn!(
                    target: "dbtool",
                    table,
                    error = %rollback,
                    "rollback of record set insert failed"
                );
            }
            Err(e)
        }
    }
}
