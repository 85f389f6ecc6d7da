use crate::api::models::upload::UploadResponse;
use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The request carried no `image` file part
    #[error("No image file received")]
    MissingFile,

    /// The multipart body could not be read to the end
    #[error("Failed to read upload: {message}")]
    MalformedUpload { message: String },

    /// The uploaded bytes could not be written to the upload directory
    #[error("Failed to move uploaded file")]
    WriteFailed {
        #[source]
        source: std::io::Error,
    },

    /// The file was written but its record could not be inserted
    #[error(transparent)]
    StoreWriteFailed(#[from] DbError),

    /// Configuration failed validation at startup
    #[error("{message}")]
    InvalidConfig { message: String },
}

impl Error {
    /// Every failure answers 500; clients get no per-kind status to branch on.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// The message placed in the `error` field of the failure body
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::WriteFailed { source } => {
                tracing::error!(error = %source, "Upload write failed: {}", self);
            }
            Error::StoreWriteFailed(_) | Error::InvalidConfig { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::MissingFile | Error::MalformedUpload { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(UploadResponse::failure(self.user_message()))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
