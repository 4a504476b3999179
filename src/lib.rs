//! Asynchronous PostgreSQL wire protocol (v3.0) client core: byte codec,
//! authentication, statement pipeline, transaction tree, and parameter
//! marshalling. The host event loop, TLS engine, connection pooling, and
//! ORM-level conveniences are deliberately left to callers.
pub mod auth;
pub mod command;
pub(crate) mod common;
pub mod connection;
pub mod encode;
pub(crate) mod ext;
mod error;
pub mod io;
pub mod net;
pub mod postgres;
pub mod query;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod types;

pub use connection::{Connection, PgOptions};
pub use error::{Error, Result};
pub use row::{FromRow, Row};
pub use statement::StatementError;
pub use transaction::{Savepoint, Transaction};
