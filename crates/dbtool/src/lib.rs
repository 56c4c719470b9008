//! # dbtool
//!
//! A fluent, chainable SQL builder over an embedded SQLite store.
//!
//! ## Features
//!
//! - **Chainable sessions**: verbs push statements onto a stack, modifiers configure the top one
//! - **WHERE assembly**: predicates joined with AND/OR, dangling connectors trimmed
//! - **DDL builders**: column and table definitions compiled to `CREATE TABLE` text
//! - **Scalar reads**: `get_string` / `get_int` / `get_float` / `get_double`
//! - **Versioned databases**: create/upgrade/open callbacks driven by `PRAGMA user_version`
//! - **Entity tables**: per-table create/update/delete helpers keyed by `id`
//! - **SQL logging**: every executed statement is emitted as a `tracing` event
//!
//! ## Session
//!
//! ```rust
//! use dbtool::{ColumnDefinition, Record, Session, SqliteProvider, TableDefinition};
//!
//! let mut db = Session::with_provider(SqliteProvider::in_memory());
//! db.create_db("shop.db")?;
//!
//! let mut items = TableDefinition::new("items")
//!     .column(ColumnDefinition::new("id").type_int().primary_key().auto_increment())
//!     .column(ColumnDefinition::new("name").type_text().not_null())
//!     .column(ColumnDefinition::new("price").type_float());
//! assert!(db.create_table(&mut items)?);
//!
//! db.insert(&Record::new().with("name", "pen").with("price", 1.5))
//!     .into_table("items")
//!     .run()?;
//!
//! let cheap = db
//!     .get_all()
//!     .from("items")
//!     .where_less_than("price", 2)
//!     .run()?
//!     .into_records()
//!     .unwrap_or_default();
//! assert_eq!(cheap.len(), 1);
//! # Ok::<(), dbtool::DbtoolError>(())
//! ```

pub mod action;
pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod handle;
pub mod record;
pub mod registry;
pub mod schema;
pub mod session;
pub mod sql_log;
pub mod sqlite;
pub mod value;

#[cfg(test)]
mod mock;

pub use action::{Action, ActionUnit, Outcome, OutputMode};
pub use config::DbtoolConfig;
pub use entity::{COL_ID, EntityTable};
pub use error::{DbtoolError, DbtoolResult};
pub use handle::{DatabaseHandle, DatabaseProvider, OpenCallbacks, OpenGuard, OpenOptions, QuerySpec, Rows};
pub use record::{Record, RecordSet};
pub use registry::{ContextId, SessionRegistry};
pub use schema::{ColumnDefinition, SqlType, TableDefinition};
pub use session::Session;
pub use sql_log::{LogLevel, SqlLogConfig};
pub use sqlite::{SqliteHandle, SqliteProvider};
pub use value::{Scalar, ScalarKind, Value};
