//! MySQL session over a single sqlx connection.
//!
//! Statements are passed to sqlx without bind arguments, which keeps them on
//! the text protocol, so DDL and other statements the prepared-statement
//! protocol rejects work as written in the files.

use super::SqlConnection;
use crate::Result;
use crate::connection::ConnectionParams;
use crate::error::DbSetupError;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::{debug, info};

/// One open MySQL connection used for a whole batch.
pub struct MySqlSession {
    connection: Option<MySqlConnection>,
    target: String,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession")
            .field("target", &self.target)
            .field("open", &self.connection.is_some())
            .finish()
    }
}

impl MySqlSession {
    /// Opens a connection.
    ///
    /// # Errors
    /// Returns a connection error if the server cannot be reached or rejects
    /// the credentials. The password never appears in the error.
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        let connection = connect_options(params)
            .connect()
            .await
            .map_err(|e| {
                DbSetupError::connection_failed(format!("Cannot connect to {}", params), e)
            })?;

        info!("Connected to {}", params);
        Ok(Self {
            connection: Some(connection),
            target: params.to_string(),
        })
    }

    fn connection(&mut self) -> Result<&mut MySqlConnection> {
        self.connection.as_mut().ok_or_else(|| {
            DbSetupError::transaction_failed("use", "connection is already closed")
        })
    }

    async fn run_control(&mut self, operation: &str, sql: &str) -> Result<()> {
        let conn = self.connection()?;
        sqlx::Executor::execute(&mut *conn, sql)
            .await
            .map(|_| ())
            .map_err(|e| DbSetupError::transaction_failed(operation, driver_message(&e)))
    }
}

/// Builds sqlx connect options; the database is only set when non-empty.
pub fn connect_options(params: &ConnectionParams) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&params.host)
        .port(params.port)
        .username(&params.user)
        .password(params.password.as_str())
        .charset(&params.charset);

    if params.database.is_empty() {
        options
    } else {
        options.database(&params.database)
    }
}

fn driver_message(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db_error) => db_error.message().to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SqlConnection for MySqlSession {
    async fn begin(&mut self) -> Result<()> {
        self.run_control("begin", "START TRANSACTION").await
    }

    async fn execute(&mut self, statement: &str) -> Result<()> {
        let conn = self.connection()?;
        sqlx::Executor::execute(&mut *conn, statement)
            .await
            .map(|result| debug!("{} rows affected", result.rows_affected()))
            .map_err(|e| DbSetupError::statement_failed(0, driver_message(&e)))
    }

    async fn commit(&mut self) -> Result<()> {
        self.run_control("commit", "COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run_control("rollback", "ROLLBACK").await
    }

    async fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(connection) => connection.close().await.map_err(|e| {
                DbSetupError::connection_failed(format!("Closing connection to {}", self.target), e)
            }),
            None => Ok(()),
        }
    }
}
