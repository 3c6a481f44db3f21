//! Single-connection SQLite handle.
//!
//! The handle owns at most one live [`SqliteConnection`], opens it lazily on
//! first use and serializes every statement through an async mutex. Foreign
//! key enforcement and WAL journaling are switched on as part of opening.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteQueryResult,
    SqliteRow, SqliteSynchronous,
};
use sqlx::{ConnectOptions, Connection, Executor, Row, Sqlite};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid database location: {0}")]
    InvalidLocation(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
    #[error("Timed out after {0:?} opening database")]
    OpenTimeout(Duration),
    #[error("A transaction is already open on this connection")]
    TransactionAlreadyOpen,
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
    #[error("Failed to decode column value: {0}")]
    Decode(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

impl DatabaseLocation {
    pub const MEMORY_MARKER: &'static str = ":memory:";

    /// Parse a configured path. Accepts bare paths, `sqlite:` URLs and the
    /// `:memory:` marker.
    pub fn parse(raw: &str) -> Self {
        let path = raw
            .strip_prefix("sqlite://")
            .or_else(|| raw.strip_prefix("sqlite:"))
            .unwrap_or(raw);

        if path == Self::MEMORY_MARKER || path.is_empty() {
            Self::Memory
        } else {
            Self::File(PathBuf::from(path))
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Memory => None,
        }
    }
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(Self::MEMORY_MARKER),
        }
    }
}

/// Timeouts applied when the connection is opened.
#[derive(Debug, Clone)]
pub struct HandleConfig {
    pub open_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

/// Quote an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Default)]
struct HandleState {
    conn: Option<SqliteConnection>,
    in_transaction: bool,
    /// Set while [`DatabaseHandle::transaction`] owns the open transaction.
    scoped: bool,
}

/// Owner of the one physical connection to a SQLite database.
pub struct DatabaseHandle {
    location: DatabaseLocation,
    config: HandleConfig,
    state: Mutex<HandleState>,
}

impl DatabaseHandle {
    pub fn new(location: DatabaseLocation) -> Self {
        Self::with_config(location, HandleConfig::default())
    }

    pub fn with_config(location: DatabaseLocation, config: HandleConfig) -> Self {
        Self {
            location,
            config,
            state: Mutex::new(HandleState::default()),
        }
    }

    /// Handle to a private in-memory database.
    pub fn in_memory() -> Self {
        Self::new(DatabaseLocation::Memory)
    }

    pub const fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.conn.is_some()
    }

    /// Open the connection if it is not open yet.
    pub async fn connect(&self) -> DatabaseResult<()> {
        let mut state = self.state.lock().await;
        self.ensure_open(&mut state).await?;
        Ok(())
    }

    /// Close the connection. Calling this on a closed handle does nothing.
    pub async fn disconnect(&self) -> DatabaseResult<()> {
        let mut state = self.state.lock().await;
        state.in_transaction = false;
        state.scoped = false;
        if let Some(conn) = state.conn.take() {
            conn.close().await?;
            info!(location = %self.location, "Database connection closed");
        }
        Ok(())
    }

    pub async fn execute(&self, query: &str, params: &[SqlValue]) -> DatabaseResult<SqliteQueryResult> {
        let mut state = self.state.lock().await;
        let conn = self.ensure_open(&mut state).await?;
        let result = bind_params(sqlx::query(query), params).execute(&mut *conn).await?;
        Ok(result)
    }

    /// Run one statement once per parameter set. Returns total rows affected.
    pub async fn execute_many(&self, query: &str, param_sets: &[Vec<SqlValue>]) -> DatabaseResult<u64> {
        let mut state = self.state.lock().await;
        let conn = self.ensure_open(&mut state).await?;
        let mut affected = 0;
        for params in param_sets {
            affected += bind_params(sqlx::query(query), params)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }
        Ok(affected)
    }

    /// Run a script of one or more statements without parameters.
    pub async fn execute_batch(&self, sql: &str) -> DatabaseResult<SqliteQueryResult> {
        let mut state = self.state.lock().await;
        let conn = self.ensure_open(&mut state).await?;
        let result = Executor::execute(&mut *conn, sql).await?;
        Ok(result)
    }

    pub async fn fetch_one(&self, query: &str, params: &[SqlValue]) -> DatabaseResult<Option<SqliteRow>> {
        let mut state = self.state.lock().await;
        let conn = self.ensure_open(&mut state).await?;
        let row = bind_params(sqlx::query(query), params)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn fetch_all(&self, query: &str, params: &[SqlValue]) -> DatabaseResult<Vec<SqliteRow>> {
        let mut state = self.state.lock().await;
        let conn = self.ensure_open(&mut state).await?;
        let rows = bind_params(sqlx::query(query), params)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Start an explicit transaction.
    pub async fn begin(&self) -> DatabaseResult<()> {
        let mut state = self.state.lock().await;
        if state.in_transaction {
            return Err(DatabaseError::TransactionAlreadyOpen);
        }
        let conn = self.ensure_open(&mut state).await?;
        sqlx::query("BEGIN").execute(&mut *conn).await?;
        state.in_transaction = true;
        debug!("Transaction started");
        Ok(())
    }

    /// Commit the open transaction. Outside a transaction every statement
    /// has already been committed, so this is a no-op. Inside
    /// [`transaction`](Self::transaction) the commit is left to the scope.
    pub async fn commit(&self) -> DatabaseResult<()> {
        let mut state = self.state.lock().await;
        if !state.in_transaction {
            return Ok(());
        }
        if state.scoped {
            debug!("Commit deferred to the enclosing transaction scope");
            return Ok(());
        }
        self.finish(&mut state, true).await
    }

    /// Roll back the open transaction, if any. Inside
    /// [`transaction`](Self::transaction) the scope decides.
    pub async fn rollback(&self) -> DatabaseResult<()> {
        let mut state = self.state.lock().await;
        if !state.in_transaction {
            return Ok(());
        }
        if state.scoped {
            debug!("Rollback deferred to the enclosing transaction scope");
            return Ok(());
        }
        self.finish(&mut state, false).await
    }

    pub async fn in_transaction(&self) -> bool {
        self.state.lock().await.in_transaction
    }

    /// Run `f` inside `BEGIN … COMMIT`. Any error from `f` (or from the
    /// commit) rolls the transaction back and is returned unchanged.
    pub async fn transaction<'a, T, E, F>(&'a self, f: F) -> Result<T, E>
    where
        F: FnOnce(&'a Self) -> BoxFuture<'a, Result<T, E>>,
        E: From<DatabaseError> + fmt::Display,
    {
        self.begin().await?;
        self.state.lock().await.scoped = true;

        let outcome = match f(self).await {
            Ok(value) => self.end_scope(true).await.map(|()| value).map_err(E::from),
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            warn!(error = %err, "Transaction failed, rolling back");
            if let Err(rollback_err) = self.end_scope(false).await {
                warn!(error = %rollback_err, "Rollback after failed transaction also failed");
            }
        }

        outcome
    }

    pub async fn table_exists(&self, name: &str) -> DatabaseResult<bool> {
        let row = self
            .fetch_one(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[name.into()],
            )
            .await?;
        Ok(row.is_some())
    }

    /// Row count of `table`. Fails with the engine's error when the table
    /// does not exist.
    pub async fn get_table_count(&self, table: &str) -> DatabaseResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let row = self.fetch_one(&sql, &[]).await?;
        let count = row.map(|r| r.try_get::<i64, _>(0)).transpose()?;
        Ok(count.unwrap_or(0))
    }

    async fn end_scope(&self, commit: bool) -> DatabaseResult<()> {
        let mut state = self.state.lock().await;
        state.scoped = false;
        if !state.in_transaction {
            return Ok(());
        }
        self.finish(&mut state, commit).await
    }

    /// Issue `COMMIT` or `ROLLBACK`. A failed commit leaves the transaction
    /// open so the caller can still roll it back.
    async fn finish(&self, state: &mut HandleState, commit: bool) -> DatabaseResult<()> {
        let statement = if commit { "COMMIT" } else { "ROLLBACK" };
        let conn = self.ensure_open(state).await?;
        let result = sqlx::query(statement).execute(&mut *conn).await;
        if result.is_ok() || !commit {
            state.in_transaction = false;
        }
        result?;
        debug!(statement, "Transaction finished");
        Ok(())
    }

    async fn ensure_open<'s>(&self, state: &'s mut HandleState) -> DatabaseResult<&'s mut SqliteConnection> {
        let conn = match state.conn.take() {
            Some(conn) => conn,
            None => {
                let conn = self.open().await?;
                state.in_transaction = false;
                state.scoped = false;
                info!(location = %self.location, "Connected to database");
                conn
            }
        };
        Ok(state.conn.insert(conn))
    }

    async fn open(&self) -> DatabaseResult<SqliteConnection> {
        let options = match &self.location {
            DatabaseLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DatabaseError::InvalidLocation(e.to_string()))?,
            DatabaseLocation::File(path) => {
                ensure_parent_directory(path)?;
                SqliteConnectOptions::new().filename(path).create_if_missing(true)
            }
        }
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(self.config.busy_timeout);

        tokio::time::timeout(self.config.open_timeout, options.connect())
            .await
            .map_err(|_| DatabaseError::OpenTimeout(self.config.open_timeout))?
            .map_err(DatabaseError::ConnectionFailed)
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("location", &self.location)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn ensure_parent_directory(path: &Path) -> DatabaseResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| DatabaseError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
