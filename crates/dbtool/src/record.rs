//! Records and record sets exchanged with callers.

use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::ops::Index;

/// One row: column name to value, in insertion order.
///
/// Setting a column that already exists overwrites its value in place, so the
/// column keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value (last write wins).
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Consuming variant of [`Record::set`] for building literals.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn get_string(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Value::as_text)
    }

    pub fn get_int(&self, column: &str) -> Option<i32> {
        self.get_long(column).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_long(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn get_double(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn get_float(&self, column: &str) -> Option<f32> {
        self.get_double(column).map(|v| v as f32)
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Value::as_bool)
    }

    pub fn get_bytes(&self, column: &str) -> Option<&[u8]> {
        self.get(column).and_then(Value::as_bytes)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.shift_remove(column)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn field_values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Merge another record into this one, column by column (last write wins).
    pub fn extend(&mut self, other: &Record) {
        for (k, v) in other.iter() {
            self.values.insert(k.to_string(), v.clone());
        }
    }

    /// Serialize to a JSON object (column order preserved).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

/// An ordered sequence of records materialized from a read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<Record> {
        self.records
    }
}

impl Index<usize> for RecordSet {
    type Output = Record;

    fn index(&self, index: usize) -> &Record {
        &self.records[index]
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_position_and_last_value() {
        let mut r = Record::new();
        r.set("a", 1).set("b", "x").set("a", 2);
        let names: Vec<_> = r.field_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(r.get_long("a"), Some(2));
        assert_eq!(r.get_string("b").as_deref(), Some("x"));
    }

    #[test]
    fn typed_getters() {
        let r = Record::new()
            .with("n", "7")
            .with("f", 1.5)
            .with("ok", true)
            .with("raw", vec![1u8, 2]);
        assert_eq!(r.get_int("n"), Some(7));
        assert_eq!(r.get_float("f"), Some(1.5));
        assert_eq!(r.get_bool("ok"), Some(true));
        assert_eq!(r.get_bytes("raw"), Some(&[1u8, 2][..]));
        assert_eq!(r.get_int("missing"), None);
    }

    #[test]
    fn to_json_preserves_order() {
        let r = Record::new().with("z", 1).with("a", "x");
        assert_eq!(r.to_json().to_string(), r#"{"z":1,"a":"x"}"#);
    }

    #[test]
    fn record_set_sequence_ops() {
        let mut set = RecordSet::new();
        set.push(Record::new().with("id", 1));
        set.push(Record::new().with("id", 2));
        assert_eq!(set.len(), 2);
        assert_eq!(set[1].get_long("id"), Some(2));
        let ids: Vec<_> = set.iter().filter_map(|r| r.get_long("id")).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
