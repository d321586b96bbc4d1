//! Error type for store access

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open connection pool: {0}")]
    Pool(#[source] sqlx::Error),

    #[error("timed out after {0:?} waiting for a pooled connection")]
    AcquireTimeout(Duration),

    #[error("statement expects {expected} parameters but {actual} were supplied")]
    ParameterCount { expected: usize, actual: usize },

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

impl DbError {
    /// True when the pool could not hand out a connection in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::AcquireTimeout(_))
            || matches!(self, DbError::Query(sqlx::Error::PoolTimedOut))
    }
}
