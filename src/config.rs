//! Layered application configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional config
//! file, then `ECM_`-prefixed environment variables using `__` between
//! section and key (e.g. `ECM_SERVER__BIND_ADDRESS=0.0.0.0:8080`).

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`.
    pub database_path: String,
    pub max_connections: u32,
    /// Identity recorded as creator and last modifier of new documents.
    pub principal: String,
    /// Accepted document classes. Empty accepts any well-formed class name.
    pub document_classes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    /// Custom endpoint for MinIO / LocalStack.
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub force_path_style: bool,
    /// Prepended to the document id to form the object key.
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl AppConfig {
    /// Load configuration from defaults, `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder()
            .set_default("server.bind_address", "127.0.0.1:8080")?
            .set_default("server.max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("store.database_path", "ecm.db")?
            .set_default("store.max_connections", 8)?
            .set_default("store.principal", "system")?
            .set_default("store.document_classes", vec!["Document"])?
            .set_default("storage.bucket", "ecm-content")?
            .set_default("storage.force_path_style", false)?
            .set_default("storage.key_prefix", "content/")?
            .set_default("logging.filter", "ecm_gateway=info,tower_http=info")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("ECM")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("store.document_classes")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
