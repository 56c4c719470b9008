//! Table and column DDL builders.
//!
//! Both builders compile to a string once and then freeze.

pub mod column;
pub mod table;

pub use column::{ColumnDefinition, SqlType};
pub use table::TableDefinition;
