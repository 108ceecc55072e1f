use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use formdesk_cloud_storage::{CloudStorageClient, TokenStore};
use formdesk_core::documents::{FormStorageService, FormStorageServiceTrait};
use formdesk_core::errors::{Result, SyncError};
use formdesk_core::session::DocumentSession;
use formdesk_core::sync::{RemoteFile, RemoteStorage, SyncOrchestrator, SyncStatusBoard};
use formdesk_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, SqliteDocumentRepository,
};

use crate::config::Config;

pub struct AppState {
    pub storage_service: Arc<dyn FormStorageServiceTrait>,
    pub session: Arc<DocumentSession>,
    pub sync_status: Arc<SyncStatusBoard>,
    pub sync_orchestrator: Arc<SyncOrchestrator>,
    pub token_store: Arc<TokenStore>,
    pub cloud_configured: bool,
}

/// Stand-in remote used when no cloud API URL is configured.
struct UnconfiguredRemote;

impl UnconfiguredRemote {
    fn unavailable<T>() -> Result<T> {
        Err(SyncError::RemoteUnavailable("FORMDESK_CLOUD_API_URL is not configured".into()).into())
    }
}

#[async_trait]
impl RemoteStorage for UnconfiguredRemote {
    async fn list_files(&self, _folder: &str) -> Result<Vec<RemoteFile>> {
        Self::unavailable()
    }

    async fn upload_or_replace(
        &self,
        _folder: &str,
        _name: &str,
        _content: String,
    ) -> Result<RemoteFile> {
        Self::unavailable()
    }

    async fn download_content(&self, _file_id: &str) -> Result<String> {
        Self::unavailable()
    }

    async fn delete_file(&self, _file_id: &str) -> Result<()> {
        Self::unavailable()
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.data_dir)?;
    run_migrations(&db_path)?;
    let pool = create_pool(&db_path)?;
    let writer = spawn_writer(pool.as_ref().clone());

    let repository = Arc::new(SqliteDocumentRepository::new(pool, writer));
    let storage_service: Arc<dyn FormStorageServiceTrait> =
        Arc::new(FormStorageService::new(repository));
    let sync_status = Arc::new(SyncStatusBoard::new());
    let session = Arc::new(DocumentSession::new(
        storage_service.clone(),
        sync_status.clone(),
    ));

    let token_store = Arc::new(TokenStore::new(config.cloud_token.clone()));
    let remote: Arc<dyn RemoteStorage> = match &config.cloud_api_url {
        Some(url) => {
            info!("Cloud storage API: {}", url);
            Arc::new(CloudStorageClient::new(url, token_store.clone())?)
        }
        None => {
            warn!("FORMDESK_CLOUD_API_URL not set; cloud sync is disabled");
            Arc::new(UnconfiguredRemote)
        }
    };

    let sync_orchestrator = Arc::new(SyncOrchestrator::new(
        storage_service.clone(),
        remote,
        token_store.clone(),
        session.clone(),
        sync_status.clone(),
    ));

    Ok(Arc::new(AppState {
        storage_service,
        session,
        sync_status,
        sync_orchestrator,
        token_store,
        cloud_configured: config.cloud_api_url.is_some(),
    }))
}
