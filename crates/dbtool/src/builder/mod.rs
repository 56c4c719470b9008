//! Fluent statement builders.
//!
//! Each builder accumulates the state of one statement (table, columns or
//! values, WHERE fragments, read modifiers), hands it to a
//! [`DatabaseHandle`](crate::handle::DatabaseHandle) primitive on `run` and
//! resets itself afterwards.
//!
//! ## Design
//!
//! - WHERE fragments are inlined literals joined by explicit `AND`/`OR`
//!   connectors; raw fragments may use `?` placeholders bound through
//!   `where_args`.
//! - Values for INSERT/UPDATE live in one ordered [`Record`](crate::Record)
//!   and are always bound as parameters.
//! - Nothing is escaped or validated beyond "a table was named".

pub mod delete;
pub mod insert;
pub mod select;
pub mod traits;
pub mod update;
pub mod where_builder;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::{ReadShape, SelectBuilder};
pub use traits::{Filtered, StatementBuilder, join_tables, split_columns};
pub use update::UpdateBuilder;
pub use where_builder::{Connector, WhereBuilder, assemble, predicate};
