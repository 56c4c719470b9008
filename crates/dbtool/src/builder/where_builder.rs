//! Shared WHERE clause builder for SELECT, UPDATE, DELETE.

use crate::value::Value;
use regex::Regex;
use std::sync::OnceLock;

/// Logical connector placed between two WHERE fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

fn dangling_connector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|\s)(?:AND|OR|LIKE)\s*$").expect("valid dangling connector regex")
    })
}

/// Join `fragments` with `connectors` into a single WHERE body.
///
/// `connectors[i]` sits between `fragments[i]` and `fragments[i + 1]`; a
/// missing connector defaults to `AND` and surplus connectors are ignored.
/// Any trailing `AND`/`OR`/`LIKE` token is stripped from the result.
pub fn assemble(fragments: &[String], connectors: &[Connector]) -> String {
    let mut clause = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        if i > 0 {
            let connector = connectors.get(i - 1).copied().unwrap_or(Connector::And);
            clause.push(' ');
            clause.push_str(connector.as_str());
            clause.push(' ');
        }
        clause.push_str(fragment.trim());
    }
    strip_dangling_connector(&clause)
}

fn strip_dangling_connector(clause: &str) -> String {
    let re = dangling_connector_regex();
    let mut out = clause.trim_end();
    while let Some(m) = re.find(out) {
        out = out[..m.start()].trim_end();
    }
    out.to_string()
}

/// Reusable WHERE clause builder.
///
/// Fragments are pushed in order; `and()`/`or()` record the connector for the
/// gap before the next fragment. A connector with no fragment before it is
/// dropped, a second connector in a row replaces the first, and two adjacent
/// fragments are joined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereBuilder {
    fragments: Vec<String>,
    /// Either `fragments.len() - 1` entries, or `fragments.len()` when a
    /// connector is pending.
    connectors: Vec<Connector>,
    args: Vec<String>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any fragments have been added.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    fn has_pending_connector(&self) -> bool {
        !self.fragments.is_empty() && self.connectors.len() == self.fragments.len()
    }

    /// Append a raw fragment. Blank fragments are ignored.
    ///
    /// The fragment is concatenated into the SQL as-is.
    pub fn push(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        if fragment.trim().is_empty() {
            return;
        }
        if !self.fragments.is_empty() && !self.has_pending_connector() {
            self.connectors.push(Connector::And);
        }
        self.fragments.push(fragment);
    }

    /// Record the connector for the next gap.
    pub fn connect(&mut self, connector: Connector) {
        if self.fragments.is_empty() {
            return;
        }
        if self.has_pending_connector() {
            if let Some(last) = self.connectors.last_mut() {
                *last = connector;
            }
        } else {
            self.connectors.push(connector);
        }
    }

    pub fn and(&mut self) {
        self.connect(Connector::And);
    }

    pub fn or(&mut self) {
        self.connect(Connector::Or);
    }

    pub fn equals(&mut self, field: &str, value: impl Into<Value>) {
        self.push(predicate::equals(field, value));
    }

    pub fn not_equals(&mut self, field: &str, value: impl Into<Value>) {
        self.push(predicate::not_equals(field, value));
    }

    pub fn less_than(&mut self, field: &str, value: impl Into<Value>) {
        self.push(predicate::less_than(field, value));
    }

    pub fn less_than_or_equals(&mut self, field: &str, value: impl Into<Value>) {
        self.push(predicate::less_than_or_equals(field, value));
    }

    pub fn greater_than(&mut self, field: &str, value: impl Into<Value>) {
        self.push(predicate::greater_than(field, value));
    }

    pub fn greater_than_or_equals(&mut self, field: &str, value: impl Into<Value>) {
        self.push(predicate::greater_than_or_equals(field, value));
    }

    pub fn like(&mut self, field: &str, pattern: impl Into<Value>) {
        self.push(predicate::like(field, pattern));
    }

    /// Replace the positional arguments bound to `?` placeholders.
    pub fn set_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build the WHERE clause string (without "WHERE" prefix).
    pub fn build_clause(&self) -> String {
        assemble(&self.fragments, &self.connectors)
    }

    /// The clause, or `None` when it renders empty.
    pub fn clause(&self) -> Option<String> {
        Some(self.build_clause()).filter(|c| !c.is_empty())
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.connectors.clear();
        self.args.clear();
    }
}

/// Fragment renderers for the comparison helpers.
///
/// Values are inlined with [`Value::to_literal`]. A `NULL` compared for
/// (in)equality renders as `IS NULL` / `IS NOT NULL`.
pub mod predicate {
    use crate::value::Value;

    fn compare(field: &str, op: &str, value: impl Into<Value>) -> String {
        format!("{} {} {}", field, op, value.into().to_literal())
    }

    pub fn equals(field: &str, value: impl Into<Value>) -> String {
        let value = value.into();
        if value.is_null() {
            return format!("{} IS NULL", field);
        }
        format!("{} = {}", field, value.to_literal())
    }

    pub fn not_equals(field: &str, value: impl Into<Value>) -> String {
        let value = value.into();
        if value.is_null() {
            return format!("{} IS NOT NULL", field);
        }
        format!("{} != {}", field, value.to_literal())
    }

    pub fn less_than(field: &str, value: impl Into<Value>) -> String {
        compare(field, "<", value)
    }

    pub fn less_than_or_equals(field: &str, value: impl Into<Value>) -> String {
        compare(field, "<=", value)
    }

    pub fn greater_than(field: &str, value: impl Into<Value>) -> String {
        compare(field, ">", value)
    }

    pub fn greater_than_or_equals(field: &str, value: impl Into<Value>) -> String {
        compare(field, ">=", value)
    }

    pub fn like(field: &str, pattern: impl Into<Value>) -> String {
        format!("{} LIKE {}", field, pattern.into().to_literal())
    }
}
