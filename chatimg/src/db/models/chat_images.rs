use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database request for recording an uploaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatImageCreateDBRequest {
    /// Name of the stored file inside the upload directory
    pub filename: String,
    /// Absolute URL returned to the client
    pub url: String,
}

/// A row of the `chat_images` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatImageDBResponse {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}
