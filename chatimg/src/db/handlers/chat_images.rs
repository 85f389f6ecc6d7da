use crate::config::DatabaseConfig;
use crate::db::{
    errors::{DbError, Result},
    models::chat_images::{ChatImageCreateDBRequest, ChatImageDBResponse},
};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Filter for listing image records
#[derive(Debug, Clone)]
pub struct ChatImageFilter {
    pub filename: Option<String>,
    pub limit: i64,
    pub order_desc: bool,
}

impl Default for ChatImageFilter {
    fn default() -> Self {
        Self {
            filename: None,
            limit: 1000,
            order_desc: true, // Newest first
        }
    }
}

impl ChatImageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn order_desc(mut self, desc: bool) -> Self {
        self.order_desc = desc;
        self
    }
}

/// Repository for the `chat_images` table
pub struct ChatImages<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ChatImages<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(filename = %request.filename), err)]
    pub async fn create(&mut self, request: &ChatImageCreateDBRequest) -> Result<ChatImageDBResponse> {
        let record = sqlx::query_as::<_, ChatImageDBResponse>(
            r#"
            INSERT INTO chat_images (filename, url)
            VALUES ($1, $2)
            RETURNING id, filename, url, created_at
            "#,
        )
        .bind(&request.filename)
        .bind(&request.url)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(record)
    }

    /// Most recent record for a stored filename. Filenames are not unique, so several rows may
    /// share one.
    pub async fn get_by_filename(&mut self, filename: &str) -> Result<Option<ChatImageDBResponse>> {
        let record = sqlx::query_as::<_, ChatImageDBResponse>(
            r#"
            SELECT id, filename, url, created_at
            FROM chat_images
            WHERE filename = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(filename)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(record)
    }

    pub async fn list(&mut self, filter: &ChatImageFilter) -> Result<Vec<ChatImageDBResponse>> {
        let order = if filter.order_desc { "DESC" } else { "ASC" };
        let query = format!(
            r#"
            SELECT id, filename, url, created_at
            FROM chat_images
            WHERE ($1::TEXT IS NULL OR filename = $1)
            ORDER BY id {order}
            LIMIT $2
            "#
        );

        let records = sqlx::query_as::<_, ChatImageDBResponse>(&query)
            .bind(filter.filename.as_deref())
            .bind(filter.limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(records)
    }
}

/// Writes image records over a fresh connection per call. There is no pool: each upload opens
/// its own connection, inserts one row and closes it again.
#[derive(Debug, Clone)]
pub struct ChatImageStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl ChatImageStore {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let options =
            PgConnectOptions::from_str(&config.url).map_err(|e| DbError::Other(anyhow::anyhow!("Invalid database URL: {}", e)))?;
        Ok(Self::from_options(options, config.connect_timeout))
    }

    pub fn from_options(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self { options, connect_timeout }
    }

    pub async fn connect(&self) -> Result<PgConnection> {
        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| DbError::ConnectTimeout {
                timeout: self.connect_timeout,
            })??;
        Ok(conn)
    }

    /// Insert one record and close the connection
    pub async fn record(&self, request: &ChatImageCreateDBRequest) -> Result<ChatImageDBResponse> {
        let mut conn = self.connect().await?;
        let record = ChatImages::new(&mut conn).create(request).await;

        if let Err(e) = conn.close().await {
            debug!(error = %e, "Failed to close database connection cleanly");
        }

        record
    }
}
