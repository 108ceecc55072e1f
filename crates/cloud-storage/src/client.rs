//! Cloud storage API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use formdesk_core::sync::{RemoteFile, RemoteStorage};

use crate::error::{CloudStorageError, Result};
use crate::token::TokenStore;
use crate::types::{ApiErrorResponse, FileEntry, FileListResponse};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct CloudStorageClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl CloudStorageClient {
    /// Create a new client.
    ///
    /// * `base_url` - root of the cloud API, e.g. `https://files.example.com`
    pub fn new(base_url: &str, tokens: Arc<TokenStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or_else(|| CloudStorageError::missing_credentials("No access token"))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| CloudStorageError::missing_credentials("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);
        Ok(headers)
    }

    /// Reads the body, turning non-2xx responses into `Rejected` errors.
    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(CloudStorageError::rejected(
                    status.as_u16(),
                    format!("{}: {}", error.code, error.message),
                ));
            }
            return Err(CloudStorageError::rejected(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }
        Ok(body)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let body = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body, e
            );
            CloudStorageError::from(e)
        })
    }

    fn require_segment<'a>(value: &'a str, what: &str) -> Result<&'a str> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CloudStorageError::invalid_request(format!(
                "{} must not be empty",
                what
            )));
        }
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Folders
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /api/v1/folders/{folder}/files
    pub async fn list_folder(&self, folder: &str) -> Result<Vec<FileEntry>> {
        let folder = Self::require_segment(folder, "folder")?;
        let url = format!(
            "{}/api/v1/folders/{}/files",
            self.base_url,
            urlencoding::encode(folder)
        );
        debug!("[Cloud] list_folder URL: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers().await?)
            .send()
            .await?;

        let listing: FileListResponse = Self::parse_response(response).await?;
        Ok(listing.files)
    }

    /// Creates the file or replaces the content of the file with the same name.
    ///
    /// PUT /api/v1/folders/{folder}/files/{name}
    pub async fn put_file(&self, folder: &str, name: &str, content: String) -> Result<FileEntry> {
        let folder = Self::require_segment(folder, "folder")?;
        let name = Self::require_segment(name, "file name")?;
        let url = format!(
            "{}/api/v1/folders/{}/files/{}",
            self.base_url,
            urlencoding::encode(folder),
            urlencoding::encode(name)
        );
        debug!("[Cloud] Uploading {} ({} bytes)", name, content.len());

        let response = self
            .client
            .put(&url)
            .headers(self.headers().await?)
            .body(content)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /api/v1/files/{id}/content
    pub async fn get_content(&self, file_id: &str) -> Result<String> {
        let file_id = Self::require_segment(file_id, "file id")?;
        let url = format!(
            "{}/api/v1/files/{}/content",
            self.base_url,
            urlencoding::encode(file_id)
        );

        let response = self
            .client
            .get(&url)
            .headers(self.headers().await?)
            .send()
            .await?;

        Self::read_body(response).await
    }

    /// DELETE /api/v1/files/{id}
    pub async fn remove_file(&self, file_id: &str) -> Result<()> {
        let file_id = Self::require_segment(file_id, "file id")?;
        let url = format!(
            "{}/api/v1/files/{}",
            self.base_url,
            urlencoding::encode(file_id)
        );

        let response = self
            .client
            .delete(&url)
            .headers(self.headers().await?)
            .send()
            .await?;

        Self::read_body(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStorage for CloudStorageClient {
    async fn list_files(&self, folder: &str) -> formdesk_core::Result<Vec<RemoteFile>> {
        let files = self.list_folder(folder).await?;
        Ok(files.into_iter().map(RemoteFile::from).collect())
    }

    async fn upload_or_replace(
        &self,
        folder: &str,
        name: &str,
        content: String,
    ) -> formdesk_core::Result<RemoteFile> {
        Ok(self.put_file(folder, name, content).await?.into())
    }

    async fn download_content(&self, file_id: &str) -> formdesk_core::Result<String> {
        Ok(self.get_content(file_id).await?)
    }

    async fn delete_file(&self, file_id: &str) -> formdesk_core::Result<()> {
        Ok(self.remove_file(file_id).await?)
    }
}
