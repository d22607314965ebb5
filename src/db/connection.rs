use std::fmt;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{debug, error};
use url::Url;

use super::rows::{Row, row_to_json};
use super::DbError;

const DEFAULT_PORT: u16 = 5432;

/// Discrete connection parameters taken apart from a `postgresql://` URL.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ConnectionSettings {
    pub fn from_url(raw: &str) -> Result<Self, DbError> {
        let url = Url::parse(raw).map_err(|e| DbError::InvalidUrl(e.to_string()))?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DbError::InvalidUrl(format!(
                "unsupported scheme '{}', expected postgresql://",
                url.scheme()
            )));
        }

        let database = url.path().trim_start_matches('/');
        let user = url.username();

        Ok(Self {
            host: url.host_str().unwrap_or("localhost").to_string(),
            port: url.port().unwrap_or(DEFAULT_PORT),
            database: (!database.is_empty()).then(|| database.to_string()),
            user: (!user.is_empty()).then(|| user.to_string()),
            password: url.password().map(str::to_string),
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new().host(&self.host).port(self.port);
        if let Some(database) = &self.database {
            options = options.database(database);
        }
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        options
    }
}

// Never print the password.
impl fmt::Display for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={}, port={}, database={}, user={}",
            self.host,
            self.port,
            self.database.as_deref().unwrap_or("-"),
            self.user.as_deref().unwrap_or("-"),
        )
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Opens one fresh connection per call. There is no pooling.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn QueryConnection>, DbError>;
}

/// A single open connection. Callers must `close` it on every exit path.
#[async_trait]
pub trait QueryConnection: Send {
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>, DbError>;

    async fn close(self: Box<Self>) -> Result<(), DbError>;
}

pub struct PgConnectionProvider {
    settings: ConnectionSettings,
    read_only: bool,
}

impl PgConnectionProvider {
    /// Query connections run every statement in a read-only transaction unless
    /// switched off with [`PgConnectionProvider::with_read_only`].
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            read_only: true,
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Connects and hands back the raw sqlx connection, for the bulk loader.
    pub async fn connect(&self) -> Result<PgConnection, DbError> {
        debug!("Connecting to PostgreSQL: {}", self.settings);
        PgConnection::connect_with(&self.settings.connect_options())
            .await
            .map_err(|e| {
                error!("Database connection failed ({}): {}", self.settings, e);
                DbError::Connection(e.to_string())
            })
    }
}

#[async_trait]
impl ConnectionProvider for PgConnectionProvider {
    async fn open(&self) -> Result<Box<dyn QueryConnection>, DbError> {
        let conn = self.connect().await?;
        Ok(Box::new(PgQueryConnection {
            conn,
            read_only: self.read_only,
        }))
    }
}

struct PgQueryConnection {
    conn: PgConnection,
    read_only: bool,
}

fn query_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::Database(db) => DbError::Query(db.to_string()),
        sqlx::Error::Io(io) => DbError::Connection(io.to_string()),
        other => DbError::Query(other.to_string()),
    }
}

#[async_trait]
impl QueryConnection for PgQueryConnection {
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>, DbError> {
        // The connection is thrown away after one statement, so skip the statement cache.
        let rows = if self.read_only {
            let mut tx = self.conn.begin().await.map_err(query_error)?;
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(query_error)?;
            let rows = sqlx::query(sql)
                .persistent(false)
                .fetch_all(&mut *tx)
                .await
                .map_err(query_error)?;
            tx.rollback().await.map_err(query_error)?;
            rows
        } else {
            sqlx::query(sql)
                .persistent(false)
                .fetch_all(&mut self.conn)
                .await
                .map_err(query_error)?
        };

        rows.iter().map(row_to_json).collect()
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn
            .close()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))
    }
}
