pub mod customer;
pub mod memory;

use std::str::FromStr;

use sqlx::{
    migrate::{MigrateError, Migrator},
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::{domain::DataAccessError, Database};

pub use self::customer::*;
pub use self::memory::*;

pub static MIGRATOR: Migrator = sqlx::migrate!();

impl From<sqlx::Error> for DataAccessError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::ConnectionError(Box::new(value)),
            sqlx::Error::Database(ref e) if e.is_unique_violation() => {
                Self::UniqueViolation(e.message().to_owned())
            }
            sqlx::Error::Database(_) => Self::QueryError(Box::new(value)),
            sqlx::Error::RowNotFound
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => Self::ReadError(Box::new(value)),
            _ => Self::ClientSideError(Box::new(value)),
        }
    }
}

impl From<MigrateError> for DataAccessError {
    fn from(value: MigrateError) -> Self {
        Self::ConnectionError(Box::new(value))
    }
}

/// 接続プールを作成し、customerテーブルを用意する
pub async fn connect(database: &Database) -> Result<SqlitePool, DataAccessError> {
    let options = SqliteConnectOptions::from_str(&database.url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(database.connections)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    info!("データベースに接続しました: {}", database.url);
    Ok(pool)
}
