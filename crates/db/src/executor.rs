//! Query Executor: one parameterized statement per pooled connection checkout

use std::sync::Arc;
use std::time::Duration;

use booksearch_kernel::settings::DatabaseSettings;
use serde_json::{Map, Value};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool, Connection, Executor};

use crate::error::DbError;
use crate::row::rows_to_json;

/// Positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Text(String),
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

/// Executes read statements against a bounded connection pool.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone, Debug)]
pub struct QueryExecutor {
    pool: AnyPool,
    acquire_timeout: Duration,
}

impl QueryExecutor {
    /// Open a pool from the database settings.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let url = connection_url(settings)?;
        let session = session_statement(&url, settings.timezone.as_deref())?;

        Self::open(
            &url,
            settings.max_connections,
            Duration::from_millis(settings.acquire_timeout_ms),
            session,
        )
        .await
    }

    /// Open a pool for an explicit connection URL.
    pub async fn connect_url(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DbError> {
        Self::open(url, max_connections, acquire_timeout, None).await
    }

    async fn open(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        session: Option<Arc<str>>,
    ) -> Result<Self, DbError> {
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(acquire_timeout);

        if let Some(statement) = session {
            options = options.after_connect(move |conn, _meta| {
                let statement = statement.clone();
                Box::pin(async move {
                    conn.execute(&*statement).await?;
                    Ok(())
                })
            });
        }

        // Connections are opened lazily so a cold store surfaces on first use or ping.
        let pool = options.connect_lazy(url).map_err(DbError::Pool)?;

        tracing::info!(
            target: "booksearch-db",
            max_connections = max_connections.max(1),
            acquire_timeout_ms = acquire_timeout.as_millis() as u64,
            "connection pool configured"
        );

        Ok(Self {
            pool,
            acquire_timeout,
        })
    }

    /// Underlying pool, exposed for diagnostics.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Run one statement and return its rows.
    ///
    /// The connection is returned to the pool before this function returns,
    /// on success and on failure alike.
    pub async fn execute(&self, statement: &str, params: &[Param]) -> Result<Vec<AnyRow>, DbError> {
        let expected = count_placeholders(statement);
        if expected != params.len() {
            return Err(DbError::ParameterCount {
                expected,
                actual: params.len(),
            });
        }

        let mut conn = self.acquire().await?;

        let mut query = sqlx::query(statement);
        for param in params {
            query = match param {
                Param::Int(value) => query.bind(*value),
                Param::Text(value) => query.bind(value.clone()),
            };
        }

        let result = query.fetch_all(&mut *conn).await;
        drop(conn);

        result.map_err(|err| {
            tracing::warn!(target: "booksearch-db", error = %err, "statement failed");
            DbError::Query(err)
        })
    }

    /// Run one statement and decode each row into a JSON object.
    pub async fn fetch_json(
        &self,
        statement: &str,
        params: &[Param],
    ) -> Result<Vec<Map<String, Value>>, DbError> {
        let rows = self.execute(statement, params).await?;
        Ok(rows_to_json(&rows))
    }

    /// Check out a connection and ping the store.
    pub async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.acquire().await?;
        let result = conn.ping().await;
        drop(conn);
        result.map_err(DbError::Query)
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn acquire(&self) -> Result<PoolConnection<Any>, DbError> {
        match tokio::time::timeout(self.acquire_timeout, self.pool.acquire()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(sqlx::Error::PoolTimedOut)) | Err(_) => {
                tracing::warn!(
                    target: "booksearch-db",
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "connection pool exhausted"
                );
                Err(DbError::AcquireTimeout(self.acquire_timeout))
            }
            Ok(Err(err)) => Err(DbError::Query(err)),
        }
    }
}

/// Build the store URL from settings, percent-encoding credentials.
pub fn connection_url(settings: &DatabaseSettings) -> Result<String, DbError> {
    if let Some(url) = settings.url.as_deref().filter(|url| !url.trim().is_empty()) {
        return Ok(url.trim().to_string());
    }

    if settings.host.trim().is_empty() {
        return Err(DbError::InvalidConfig("database host is empty".to_string()));
    }

    let credentials = match (&settings.user, &settings.password) {
        (Some(user), Some(password)) => format!(
            "{}:{}@",
            urlencoding::encode(user),
            urlencoding::encode(password)
        ),
        (Some(user), None) => format!("{}@", urlencoding::encode(user)),
        (None, _) => String::new(),
    };

    Ok(format!(
        "mysql://{}{}:{}/{}",
        credentials,
        settings.host.trim(),
        settings.port,
        urlencoding::encode(&settings.name)
    ))
}

fn session_statement(url: &str, timezone: Option<&str>) -> Result<Option<Arc<str>>, DbError> {
    let Some(timezone) = timezone.map(str::trim).filter(|tz| !tz.is_empty()) else {
        return Ok(None);
    };
    if !url.starts_with("mysql:") {
        return Ok(None);
    }

    let valid = timezone
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | ':' | '_' | '/'));
    if !valid {
        return Err(DbError::InvalidConfig(format!(
            "unsupported timezone value '{}'",
            timezone
        )));
    }

    Ok(Some(Arc::from(format!("SET time_zone = '{}'", timezone))))
}

/// Counts `?` placeholders that sit outside quoted literals and identifiers.
fn count_placeholders(statement: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    for ch in statement.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '?' => count += 1,
                _ => {}
            },
        }
    }
    count
}
