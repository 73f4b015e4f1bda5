use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_test::multipart::{MultipartForm, Part};

use ecm_gateway::app::{build_router, AppState};
use ecm_gateway::db::repository::{DocumentStore, SqliteDocumentStore};
use ecm_gateway::error::AppError;
use ecm_gateway::storage::client::StorageClient;

/// In-memory object store standing in for S3.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), AppError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), content);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A router wired to an in-memory SQLite store and in-memory content storage.
pub struct TestEnv {
    pub router: Router,
    pub store: Arc<dyn DocumentStore>,
    pub storage: Arc<MemoryStorage>,
}

impl TestEnv {
    pub fn start() -> Self {
        let sqlite = SqliteDocumentStore::in_memory().expect("Failed to open in-memory store");
        sqlite.init_schema().expect("Failed to initialize schema");
        let store: Arc<dyn DocumentStore> = Arc::new(sqlite);
        let storage = Arc::new(MemoryStorage::default());

        let state = AppState {
            document_store: store.clone(),
            storage_client: storage.clone(),
            principal: "test-user".to_string(),
            document_classes: Arc::new(vec!["Document".to_string(), "Invoice".to_string()]),
            content_key_prefix: "content/".to_string(),
        };

        Self {
            router: build_router(state, 1024 * 1024),
            store,
            storage,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .build(self.router.clone())
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .build(self.router.clone())
    }

    /// Helper: upload a text document with the given custom properties.
    /// Returns the new document id.
    pub async fn upload(
        &self,
        server: &axum_test::TestServer,
        file_name: &str,
        class: &str,
        properties: &[(&str, &str)],
    ) -> String {
        let mut form = MultipartForm::new()
            .add_part(
                "file",
                Part::bytes(format!("content of {file_name}").into_bytes())
                    .file_name(file_name)
                    .mime_type("text/plain"),
            )
            .add_text("documentClass", class);
        for (name, value) in properties {
            form = form.add_text(name.to_string(), value.to_string());
        }

        server.post("/api/documents").multipart(form).await.text()
    }
}
