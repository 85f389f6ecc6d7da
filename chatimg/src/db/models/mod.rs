//! Database record structures matching table schemas.

pub mod chat_images;
