//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! The only endpoint is the image upload (`POST /server/upload` by default). Uploaded images
//! are served back read-only under the upload directory next to it.

pub mod handlers;
pub mod models;
