//! Recording handle for unit tests.

use crate::error::{DbtoolError, DbtoolResult};
use crate::handle::{DatabaseHandle, QuerySpec, Rows};
use crate::record::Record;
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open,
    Close,
    Execute(String),
    Query(QuerySpec),
    Insert {
        table: String,
        values: Record,
    },
    Update {
        table: String,
        values: Record,
        where_clause: Option<String>,
        args: Vec<String>,
    },
    Delete {
        table: String,
        where_clause: Option<String>,
        args: Vec<String>,
    },
}

#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub open: bool,
    pub results: VecDeque<DbtoolResult<Rows>>,
    pub next_row_id: i64,
    pub affected: usize,
    pub fail_execute: bool,
    /// Inserts succeed this many times, then fail.
    pub fail_insert_after: Option<usize>,
    pub databases: BTreeSet<String>,
}

/// A [`DatabaseHandle`] that records every primitive call.
///
/// Cloning shares the state, so a test can keep one copy after boxing the
/// other into a session.
#[derive(Debug, Clone)]
pub struct MockHandle {
    name: String,
    state: Rc<RefCell<MockState>>,
}

impl MockHandle {
    pub fn new(name: &str) -> Self {
        let state = MockState {
            next_row_id: 1,
            affected: 1,
            databases: BTreeSet::from([name.to_string()]),
            ..MockState::default()
        };
        Self {
            name: name.to_string(),
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Queue the result of the next `query` call.
    pub fn push_rows(&self, rows: Rows) {
        self.state.borrow_mut().results.push_back(Ok(rows));
    }

    pub fn push_query_error(&self, message: &str) {
        self.state
            .borrow_mut()
            .results
            .push_back(Err(DbtoolError::execution(message)));
    }

    pub fn set_affected(&self, affected: usize) {
        self.state.borrow_mut().affected = affected;
    }

    pub fn fail_execute(&self, fail: bool) {
        self.state.borrow_mut().fail_execute = fail;
    }

    pub fn fail_insert_after(&self, successes: usize) {
        self.state.borrow_mut().fail_insert_after = Some(successes);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Calls other than open/close.
    pub fn statements(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Open | Call::Close))
            .collect()
    }

    pub fn boxed(&self) -> Box<dyn DatabaseHandle> {
        Box::new(self.clone())
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl DatabaseHandle for MockHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> DbtoolResult<()> {
        self.record(Call::Open);
        self.state.borrow_mut().open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.record(Call::Close);
        self.state.borrow_mut().open = false;
    }

    fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    fn execute(&mut self, sql: &str) -> DbtoolResult<()> {
        self.record(Call::Execute(sql.to_string()));
        if self.state.borrow().fail_execute {
            return Err(DbtoolError::execution(format!("rejected: {}", sql)));
        }
        Ok(())
    }

    fn query(&mut self, spec: &QuerySpec) -> DbtoolResult<Rows> {
        self.record(Call::Query(spec.clone()));
        self.state
            .borrow_mut()
            .results
            .pop_front()
            .unwrap_or_else(|| Ok(Rows::default()))
    }

    fn insert(&mut self, table: &str, values: &Record) -> DbtoolResult<i64> {
        self.record(Call::Insert {
            table: table.to_string(),
            values: values.clone(),
        });
        let mut state = self.state.borrow_mut();
        if let Some(left) = state.fail_insert_after.as_mut() {
            if *left == 0 {
                return Err(DbtoolError::execution(format!("UNIQUE constraint failed: {}", table)));
            }
            *left -= 1;
        }
        let id = state.next_row_id;
        state.next_row_id += 1;
        Ok(id)
    }

    fn update(
        &mut self,
        table: &str,
        values: &Record,
        where_clause: Option<&str>,
        where_args: &[String],
    ) -> DbtoolResult<usize> {
        self.record(Call::Update {
            table: table.to_string(),
            values: values.clone(),
            where_clause: where_clause.map(str::to_string),
            args: where_args.to_vec(),
        });
        Ok(self.state.borrow().affected)
    }

    fn delete(
        &mut self,
        table: &str,
        where_clause: Option<&str>,
        where_args: &[String],
    ) -> DbtoolResult<usize> {
        self.record(Call::Delete {
            table: table.to_string(),
            where_clause: where_clause.map(str::to_string),
            args: where_args.to_vec(),
        });
        Ok(self.state.borrow().affected)
    }

    fn list_database_names(&self) -> DbtoolResult<BTreeSet<String>> {
        Ok(self.state.borrow().databases.clone())
    }
}
