use async_trait::async_trait;
use formdesk_core::sync::Authenticator;
use log::info;
use tokio::sync::RwLock;

/// In-memory bearer token for the cloud API.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: RwLock::new(initial.filter(|t| !t.trim().is_empty())),
        }
    }

    /// Stores a token. Blank tokens sign out.
    pub async fn set(&self, token: String) {
        let token = token.trim().to_string();
        let mut guard = self.token.write().await;
        if token.is_empty() {
            *guard = None;
            info!("[Cloud] Access token cleared");
        } else {
            *guard = Some(token);
            info!("[Cloud] Access token updated");
        }
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
        info!("[Cloud] Access token cleared");
    }

    pub async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

#[async_trait]
impl Authenticator for TokenStore {
    async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}
