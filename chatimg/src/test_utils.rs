//! Test utilities for building the service against temporary directories and test databases.

use crate::config::{Config, DatabaseConfig, UploadsConfig};
use crate::db::handlers::{ChatImageStore, LocalImageStorage};
use crate::{AppState, build_router};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const UPLOAD_ROUTE: &str = "/server/upload";
pub const UPLOAD_DIR: &str = "uploads/chat_images";

/// Default configuration with uploads rooted at `root`
pub fn test_config(root: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig {
            // Tests build their store directly; this is never dialed
            url: "postgres://unused@localhost/unused".to_string(),
            connect_timeout: Duration::from_secs(5),
            run_migrations: false,
        },
        uploads: UploadsConfig {
            root: root.to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Store pointing at the `#[sqlx::test]` database
pub fn store_for(pool: &PgPool) -> ChatImageStore {
    ChatImageStore::from_options(pool.connect_options().as_ref().clone(), Duration::from_secs(5))
}

/// Store whose connections are refused (nothing listens on port 1)
pub fn unreachable_store() -> ChatImageStore {
    let options = PgConnectOptions::new()
        .host("127.0.0.1")
        .port(1)
        .username("nobody")
        .database("nothing");
    ChatImageStore::from_options(options, Duration::from_secs(5))
}

pub fn test_state(config: Config, store: ChatImageStore) -> AppState {
    let storage = Arc::new(LocalImageStorage::new(config.uploads.storage_dir()));
    AppState::builder().config(config).storage(storage).store(store).build()
}

pub fn create_test_server(state: AppState) -> TestServer {
    let router = build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Multipart body with a single `image` file part
pub fn image_form(content: &'static [u8], filename: &str) -> MultipartForm {
    MultipartForm::new().add_part("image", Part::bytes(content).file_name(filename.to_string()))
}

/// Names of the files in the upload directory under `root`
pub fn stored_files(root: &Path) -> Vec<String> {
    let dir = root.join(UPLOAD_DIR);
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
