//! Data access for uploaded images: the `chat_images` repository and the on-disk image storage.

pub mod chat_images;
pub mod image_storage;

pub use chat_images::{ChatImageFilter, ChatImageStore, ChatImages};
pub use image_storage::{ImageStorage, LocalImageStorage};
