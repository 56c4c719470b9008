use super::traits::{Filtered, StatementBuilder, join_tables, require_table};
use super::where_builder::WhereBuilder;
use crate::error::DbtoolResult;
use crate::handle::{DatabaseHandle, QuerySpec, Rows};

/// Which read call the handle receives.
///
/// `distinct` only reaches the handle together with a `limit`; on its own it
/// is dropped, matching the store's historical read overloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadShape {
    /// table, columns, where, args, group by, having, order by
    Base,
    /// base arguments plus a limit
    Limited,
    /// every argument, including the distinct flag
    DistinctLimited,
}

/// Structured SELECT query builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectBuilder {
    /// Table expression (comma joined for multi-table reads)
    table: String,
    /// `None` reads every column
    columns: Option<Vec<String>>,
    filter: WhereBuilder,
    distinct: bool,
    group_by: Option<String>,
    having: Option<String>,
    order_by: Option<String>,
    limit: Option<String>,
}

impl SelectBuilder {
    /// An empty builder reading every column of no table yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table to read from, replacing any previous table.
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self
    }

    /// Read from several tables at once.
    ///
    /// The names are joined with `", "` into a single table expression, so
    /// the join condition belongs in the WHERE clause:
    ///
    /// ```
    /// use dbtool::builder::{Filtered, SelectBuilder, StatementBuilder};
    ///
    /// let mut select = SelectBuilder::new();
    /// select.from_tables(["users", "orders"]);
    /// select.where_raw("users.id = orders.user_id");
    /// assert_eq!(
    ///     select.to_sql(),
    ///     "SELECT * FROM users, orders WHERE users.id = orders.user_id"
    /// );
    /// ```
    pub fn from_tables<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table = join_tables(tables);
        self
    }

    /// The table expression, empty until `from` or `from_tables` is called.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Set the requested columns. An empty list reads every column.
    pub fn columns<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.columns = Some(columns).filter(|c| !c.is_empty());
        self
    }

    /// Drop any column list and read `*`.
    pub fn all_columns(&mut self) -> &mut Self {
        self.columns = None;
        self
    }

    /// `None` when every column is read.
    pub fn requested_columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Request `SELECT DISTINCT`.
    ///
    /// The flag is only sent to the handle when a limit is also set; see
    /// [`ReadShape`].
    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    /// GROUP BY expression, passed through verbatim.
    pub fn group_by(&mut self, group_by: impl Into<String>) -> &mut Self {
        self.group_by = Some(group_by.into());
        self
    }

    /// HAVING expression. Only meaningful together with [`group_by`](Self::group_by).
    pub fn having(&mut self, having: impl Into<String>) -> &mut Self {
        self.having = Some(having.into());
        self
    }

    /// ORDER BY expression, e.g. `"age DESC, name"`.
    pub fn order_by(&mut self, order_by: impl Into<String>) -> &mut Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Cap the number of rows. Replaces any earlier limit or offset.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit.to_string());
        self
    }

    /// `LIMIT limit OFFSET offset`.
    pub fn limit_offset(&mut self, limit: u64, offset: u64) -> &mut Self {
        self.limit = Some(format!("{} OFFSET {}", limit, offset));
        self
    }

    /// Pick the read overload from the limit and distinct settings.
    pub fn read_shape(&self) -> ReadShape {
        match (self.limit.is_some(), self.distinct) {
            (true, true) => ReadShape::DistinctLimited,
            (true, false) => ReadShape::Limited,
            (false, _) => ReadShape::Base,
        }
    }

    /// The read call this builder dispatches to the handle.
    pub fn query_spec(&self) -> QuerySpec {
        let shape = self.read_shape();
        QuerySpec {
            distinct: shape == ReadShape::DistinctLimited,
            table: self.table.clone(),
            columns: self.columns.clone(),
            selection: self.filter.clause(),
            selection_args: self.filter.args().to_vec(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            limit: match shape {
                ReadShape::Base => None,
                ReadShape::Limited | ReadShape::DistinctLimited => self.limit.clone(),
            },
        }
    }
}

impl Filtered for SelectBuilder {
    fn filter(&self) -> &WhereBuilder {
        &self.filter
    }

    fn filter_mut(&mut self) -> &mut WhereBuilder {
        &mut self.filter
    }
}

impl StatementBuilder for SelectBuilder {
    type Output = Rows;

    fn to_sql(&self) -> String {
        self.query_spec().to_sql()
    }

    fn validate(&self) -> DbtoolResult<()> {
        require_table(&self.table, "SELECT")
    }

    fn execute(&self, handle: &mut dyn DatabaseHandle) -> DbtoolResult<Rows> {
        handle.query(&self.query_spec())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
