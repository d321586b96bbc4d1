//! Pooled query execution against the book catalog store.
//!
//! Every statement runs on a connection checked out from a bounded pool and
//! the connection goes back to the pool before the result is handed to the
//! caller, whether the statement succeeded or not.

pub mod error;
pub mod executor;
pub mod row;

pub use error::DbError;
pub use executor::{connection_url, Param, QueryExecutor};
pub use row::{row_to_json, rows_to_json};
