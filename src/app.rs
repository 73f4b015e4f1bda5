use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::api::{documents, search};
use crate::config::AppConfig;
use crate::db::repository::DocumentStore;
use crate::storage::client::StorageClient;

/// Shared application state, available to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub document_store: Arc<dyn DocumentStore>,
    pub storage_client: Arc<dyn StorageClient>,
    /// Recorded as creator of documents created through the API.
    pub principal: String,
    /// Accepted document classes. Empty accepts any.
    pub document_classes: Arc<Vec<String>>,
    pub content_key_prefix: String,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        document_store: Arc<dyn DocumentStore>,
        storage_client: Arc<dyn StorageClient>,
    ) -> Self {
        Self {
            document_store,
            storage_client,
            principal: config.store.principal.clone(),
            document_classes: Arc::new(config.store.document_classes.clone()),
            content_key_prefix: config.storage.key_prefix.clone(),
        }
    }

    pub fn accepts_document_class(&self, class: &str) -> bool {
        self.document_classes.is_empty() || self.document_classes.iter().any(|c| c == class)
    }
}

/// Build the API router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/documents",
            post(documents::create_document_handler),
        )
        .route(
            "/api/documents/search",
            get(search::simple_search_handler).post(search::search_handler),
        )
        .route(
            "/api/documents/{id}",
            get(documents::get_document_handler).delete(documents::delete_document_handler),
        )
        .route(
            "/api/documents/{id}/content",
            get(documents::get_content_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::SqliteDocumentStore;
    use crate::error::AppError;
    use async_trait::async_trait;

    struct NoStorage;

    #[async_trait]
    impl StorageClient for NoStorage {
        async fn put_object(&self, _key: &str, _content: Vec<u8>, _ct: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn get_object(&self, _key: &str) -> Result<Option<Vec<u8>>, AppError> {
            Ok(None)
        }

        async fn delete_object(&self, _key: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[test]
    fn test_state_from_config() {
        let mut config = AppConfig::load(None).unwrap();
        let store = Arc::new(SqliteDocumentStore::in_memory().unwrap());
        let state = AppState::new(&config, store.clone(), Arc::new(NoStorage));

        assert_eq!(state.principal, "system");
        assert_eq!(state.content_key_prefix, "content/");
        assert!(state.accepts_document_class("Document"));
        assert!(!state.accepts_document_class("Invoice"));

        config.store.document_classes.clear();
        let state = AppState::new(&config, store, Arc::new(NoStorage));
        assert!(state.accepts_document_class("Invoice"));
    }
}
