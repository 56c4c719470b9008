//! One pending statement and the rules for shaping its result.

use crate::builder::{
    DeleteBuilder, Filtered, InsertBuilder, SelectBuilder, StatementBuilder, UpdateBuilder,
};
use crate::error::{DbtoolError, DbtoolResult};
use crate::handle::{DatabaseHandle, Rows};
use crate::record::{Record, RecordSet};
use crate::value::{Scalar, ScalarKind, Value};

/// Statement kind a unit dispatches to on `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

/// How a SELECT result is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Materialize every row into a [`RecordSet`].
    #[default]
    Records,
    /// Return the raw [`Rows`] untouched.
    Raw,
    /// Return the first row's only column, converted to the tagged type.
    Scalar(ScalarKind),
}

/// Result of running one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The unit never had a verb.
    Nothing,
    Rows(Rows),
    Records(RecordSet),
    /// `None` when the read produced no rows or a `NULL` cell.
    Scalar(Option<Scalar>),
    RowId(i64),
    RowIds(Vec<i64>),
    /// Rows affected by UPDATE or DELETE.
    Affected(usize),
}

impl Outcome {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Outcome::Nothing)
    }

    pub fn into_rows(self) -> Option<Rows> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_records(self) -> Option<RecordSet> {
        match self {
            Outcome::Records(records) => Some(records),
            _ => None,
        }
    }

    /// The scalar value, flattened: absent and `NULL` both give `None`.
    pub fn into_scalar(self) -> Option<Scalar> {
        match self {
            Outcome::Scalar(scalar) => scalar,
            _ => None,
        }
    }

    pub fn row_id(&self) -> Option<i64> {
        match self {
            Outcome::RowId(id) => Some(*id),
            Outcome::RowIds(ids) => ids.last().copied(),
            _ => None,
        }
    }

    pub fn row_ids(&self) -> Option<&[i64]> {
        match self {
            Outcome::RowId(id) => Some(std::slice::from_ref(id)),
            Outcome::RowIds(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn affected(&self) -> Option<usize> {
        match self {
            Outcome::Affected(n) => Some(*n),
            _ => None,
        }
    }
}

/// The mutable state of one not-yet-executed statement.
///
/// The first verb call sets the action; later verb calls on the same unit
/// configure their builder lazily and the most recent one decides dispatch.
/// WHERE helpers go to the builder of the current action and are ignored for
/// INSERT or before any verb.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionUnit {
    action: Option<Action>,
    output: OutputMode,
    select: Option<SelectBuilder>,
    insert: Option<InsertBuilder>,
    update: Option<UpdateBuilder>,
    delete: Option<DeleteBuilder>,
}

impl ActionUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    pub fn wants_raw_result(&self) -> bool {
        self.output == OutputMode::Raw
    }

    pub fn wants_single_scalar(&self) -> bool {
        matches!(self.output, OutputMode::Scalar(_))
    }

    fn select_builder(&mut self) -> &mut SelectBuilder {
        self.select.get_or_insert_with(SelectBuilder::new)
    }

    fn insert_builder(&mut self) -> &mut InsertBuilder {
        self.insert.get_or_insert_with(InsertBuilder::new)
    }

    fn update_builder(&mut self) -> &mut UpdateBuilder {
        self.update.get_or_insert_with(UpdateBuilder::new)
    }

    fn delete_builder(&mut self) -> &mut DeleteBuilder {
        self.delete.get_or_insert_with(DeleteBuilder::new)
    }

    /// Builder that receives WHERE helpers for the current action.
    fn filtered(&mut self) -> Option<&mut dyn FilterTarget> {
        match self.action {
            Some(Action::Select) => Some(self.select_builder() as &mut dyn FilterTarget),
            Some(Action::Update) => Some(self.update_builder() as &mut dyn FilterTarget),
            Some(Action::Delete) => Some(self.delete_builder() as &mut dyn FilterTarget),
            Some(Action::Insert) | None => None,
        }
    }

    fn begin_select(&mut self, output: OutputMode) -> &mut SelectBuilder {
        self.action = Some(Action::Select);
        self.output = output;
        self.select_builder()
    }

    // ==================== Verbs: SELECT ====================

    /// Read every column and materialize a [`RecordSet`].
    pub fn get_all(&mut self) -> &mut Self {
        self.begin_select(OutputMode::Records).all_columns();
        self
    }

    /// Read the given columns and materialize a [`RecordSet`].
    pub fn get<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.begin_select(OutputMode::Records).columns(columns);
        self
    }

    /// Read every column and return the raw rows.
    pub fn select_all(&mut self) -> &mut Self {
        self.begin_select(OutputMode::Raw).all_columns();
        self
    }

    /// Read the given columns and return the raw rows.
    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.begin_select(OutputMode::Raw).columns(columns);
        self
    }

    /// Read one column of the first row as `kind`.
    pub fn get_scalar(&mut self, column: &str, kind: ScalarKind) -> &mut Self {
        self.begin_select(OutputMode::Scalar(kind)).columns([column]);
        self
    }

    pub fn get_string(&mut self, column: &str) -> &mut Self {
        self.get_scalar(column, ScalarKind::Text)
    }

    pub fn get_int(&mut self, column: &str) -> &mut Self {
        self.get_scalar(column, ScalarKind::Int)
    }

    pub fn get_float(&mut self, column: &str) -> &mut Self {
        self.get_scalar(column, ScalarKind::Float)
    }

    pub fn get_double(&mut self, column: &str) -> &mut Self {
        self.get_scalar(column, ScalarKind::Double)
    }

    // ==================== Verbs: INSERT / UPDATE / DELETE ====================

    /// Start an INSERT seeded with `values`.
    pub fn insert(&mut self, values: &Record) -> &mut Self {
        self.action = Some(Action::Insert);
        self.insert_builder().values(values);
        self
    }

    pub fn insert_into(&mut self, table: &str) -> &mut Self {
        self.action = Some(Action::Insert);
        self.insert_builder().into_table(table);
        self
    }

    /// Alias for [`ActionUnit::insert_into`].
    pub fn into_table(&mut self, table: &str) -> &mut Self {
        self.insert_into(table)
    }

    pub fn update(&mut self, table: &str) -> &mut Self {
        self.action = Some(Action::Update);
        self.update_builder().table(table);
        self
    }

    pub fn update_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.action = Some(Action::Update);
        self.update_builder().tables(tables);
        self
    }

    pub fn delete_from(&mut self, table: &str) -> &mut Self {
        self.action = Some(Action::Delete);
        self.delete_builder().from(table);
        self
    }

    pub fn delete_from_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.action = Some(Action::Delete);
        self.delete_builder().from_tables(tables);
        self
    }

    // ==================== Modifiers ====================

    /// Source table for SELECT and DELETE.
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.select_builder().from(table);
        self.delete_builder().from(table);
        self
    }

    pub fn from_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tables: Vec<String> = tables.into_iter().map(|t| t.as_ref().to_string()).collect();
        self.select_builder().from_tables(&tables);
        self.delete_builder().from_tables(&tables);
        self
    }

    /// Merge values into both the INSERT and UPDATE builders.
    pub fn values(&mut self, values: &Record) -> &mut Self {
        self.insert_builder().values(values);
        self.update_builder().values(values);
        self
    }

    pub fn record_set(&mut self, records: RecordSet) -> &mut Self {
        self.insert_builder().record_set(records);
        self
    }

    /// Set one column value on both the INSERT and UPDATE builders.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        self.insert_builder().set(column, value.clone());
        self.update_builder().set(column, value);
        self
    }

    pub fn where_raw(&mut self, fragment: impl Into<String>) -> &mut Self {
        let fragment = fragment.into();
        if let Some(target) = self.filtered() {
            target.push_fragment(fragment);
        }
        self
    }

    pub fn where_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::equals(field, value))
    }

    pub fn where_not_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::not_equals(field, value))
    }

    pub fn where_less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::less_than(field, value))
    }

    pub fn where_less_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::less_than_or_equals(field, value))
    }

    pub fn where_greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::greater_than(field, value))
    }

    pub fn where_greater_than_or_equals(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::greater_than_or_equals(field, value))
    }

    pub fn where_like(&mut self, field: &str, pattern: impl Into<Value>) -> &mut Self {
        self.where_raw(crate::builder::predicate::like(field, pattern))
    }

    pub fn and(&mut self) -> &mut Self {
        if let Some(target) = self.filtered() {
            target.connect_and();
        }
        self
    }

    pub fn or(&mut self) -> &mut Self {
        if let Some(target) = self.filtered() {
            target.connect_or();
        }
        self
    }

    /// Positional `?` arguments, shared by SELECT, UPDATE and DELETE.
    pub fn where_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.select_builder().where_args(args.clone());
        self.update_builder().where_args(args.clone());
        self.delete_builder().where_args(args);
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.select_builder().distinct(true);
        self
    }

    /// Replace the SELECT column list.
    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_builder().columns(columns);
        self
    }

    pub fn group_by(&mut self, group_by: &str) -> &mut Self {
        self.select_builder().group_by(group_by);
        self
    }

    pub fn having(&mut self, having: &str) -> &mut Self {
        self.select_builder().having(having);
        self
    }

    pub fn order_by(&mut self, order_by: &str) -> &mut Self {
        self.select_builder().order_by(order_by);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.select_builder().limit(limit);
        self
    }

    pub fn limit_offset(&mut self, limit: u64, offset: u64) -> &mut Self {
        self.select_builder().limit_offset(limit, offset);
        self
    }

    /// SQL the unit would run, for diagnostics.
    pub fn to_sql(&self) -> Option<String> {
        match self.action? {
            Action::Select => self.select.as_ref().map(StatementBuilder::to_sql),
            Action::Insert => self.insert.as_ref().map(StatementBuilder::to_sql),
            Action::Update => self.update.as_ref().map(StatementBuilder::to_sql),
            Action::Delete => self.delete.as_ref().map(StatementBuilder::to_sql),
        }
    }

    // ==================== Execution ====================

    /// Dispatch to the builder for the current action and shape the result.
    pub fn run(&mut self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<Outcome> {
        let Some(action) = self.action else {
            return Ok(Outcome::Nothing);
        };
        match action {
            Action::Select => {
                let output = self.output;
                let rows = self.select_builder().run(handle)?;
                shape_rows(rows, output)
            }
            Action::Insert => {
                let builder = self.insert_builder();
                let many = builder.has_record_set();
                let ids = builder.run(handle)?;
                if !many && ids.len() == 1 {
                    Ok(Outcome::RowId(ids[0]))
                } else {
                    Ok(Outcome::RowIds(ids))
                }
            }
            Action::Update => Ok(Outcome::Affected(self.update_builder().run(handle)?)),
            Action::Delete => Ok(Outcome::Affected(self.delete_builder().run(handle)?)),
        }
    }
}

fn shape_rows(rows: Rows, output: OutputMode) -> DbtoolResult<Outcome> {
    match output {
        OutputMode::Raw => Ok(Outcome::Rows(rows)),
        OutputMode::Records => Ok(Outcome::Records(rows.to_record_set())),
        OutputMode::Scalar(kind) => {
            if rows.column_count() != 1 {
                return Err(DbtoolError::validation(format!(
                    "scalar read needs exactly one column, got {}",
                    rows.column_count()
                )));
            }
            let column = rows.columns()[0].clone();
            match rows.row(0).and_then(|row| row.get_index(0)) {
                Some(value) => Ok(Outcome::Scalar(Scalar::convert(&column, kind, value)?)),
                None => Ok(Outcome::Scalar(None)),
            }
        }
    }
}

/// Object-safe view over the WHERE-carrying builders.
trait FilterTarget {
    fn push_fragment(&mut self, fragment: String);
    fn connect_and(&mut self);
    fn connect_or(&mut self);
}

impl<T: Filtered> FilterTarget for T {
    fn push_fragment(&mut self, fragment: String) {
        self.filter_mut().push(fragment);
    }

    fn connect_and(&mut self) {
        self.filter_mut().and();
    }

    fn connect_or(&mut self) {
        self.filter_mut().or();
    }
}
