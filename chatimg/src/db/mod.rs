//! Database layer for image records, plus the filesystem storage the upload writes to.
//!
//! ```text
//! ┌──────────────────┐
//! │  upload handler  │
//! └───┬──────────┬───┘
//!     │          │
//!     ↓          ↓
//! ┌────────┐ ┌────────────────┐
//! │ storage│ │ ChatImageStore │  (one connection per insert)
//! └────────┘ └───────┬────────┘
//!                    ↓
//!            ┌────────────────┐
//!            │   ChatImages   │  (repository over a PgConnection)
//!            └───────┬────────┘
//!                    ↓
//!            ┌────────────────┐
//!            │   PostgreSQL   │
//!            └────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: the `chat_images` repository and image storage backends
//! - [`models`]: database record structures matching table schemas
//! - [`errors`]: database-specific error types
//!
//! # Migrations
//!
//! The schema lives in the crate's `migrations/` directory and is applied with
//! [`crate::migrator`]:
//!
//! ```ignore
//! chatimg::migrator().run(&mut conn).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
