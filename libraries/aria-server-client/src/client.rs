//! Main media server client.

use crate::auth::AuthClient;
use crate::download::DownloadClient;
use crate::error::{Result, ServerClientError};
use crate::library::LibraryClient;
use crate::sessions::SessionClient;
use crate::types::{LoginResponse, ServerConfig, ServerInfo};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Snapshot of what an authenticated request needs
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub url: String,
    pub token: String,
    pub user_id: String,
    pub device_id: String,
    pub natively_playable: Vec<String>,
    pub transcoding_codec: String,
}

/// Client for a Jellyfin-compatible media server.
///
/// Handles authentication and implements the engine's
/// [`RemoteMediaService`](aria_core::RemoteMediaService) and
/// [`CatalogRepository`](aria_core::CatalogRepository) seams.
///
/// # Example
///
/// ```no_run
/// use aria_server_client::{MediaServerClient, ServerConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MediaServerClient::new(ServerConfig::new("https://music.example.com"))?;
///
/// let info = client.test_connection().await?;
/// println!("Connected to {} v{}", info.server_name, info.version);
///
/// let login = client.login("user", "password").await?;
/// println!("Logged in as {}", login.user.name);
/// # Ok(())
/// # }
/// ```
pub struct MediaServerClient {
    http: Client,
    config: Arc<RwLock<ServerConfig>>,
}

impl MediaServerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Aria/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerClientError::Request)?;

        Ok(Self {
            http,
            config: Arc::new(RwLock::new(ServerConfig { url, ..config })),
        })
    }

    /// Get the server URL.
    pub async fn url(&self) -> String {
        self.config.read().await.url.clone()
    }

    /// Check if the client has an access token.
    pub async fn is_authenticated(&self) -> bool {
        let config = self.config.read().await;
        config.access_token.is_some() && config.user_id.is_some()
    }

    /// Test the connection to the server.
    ///
    /// This does not require authentication.
    pub async fn test_connection(&self) -> Result<ServerInfo> {
        let url = format!("{}/System/Info/Public", self.url().await);
        debug!(url = %url, "Testing server connection");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        if !response.status().is_success() {
            return Err(ServerClientError::from_response(response, "server info").await);
        }

        let info: ServerInfo = response.json().await.map_err(|e| {
            ServerClientError::ParseError(format!("Failed to parse server info: {e}"))
        })?;

        info!(name = %info.server_name, version = %info.version, "Connected to server");
        Ok(info)
    }

    /// Login with username and password.
    ///
    /// On success, the access token is stored for subsequent requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let (url, device_id) = {
            let config = self.config.read().await;
            (config.url.clone(), config.device_id.clone())
        };

        let response = AuthClient::new(&self.http, &url, &device_id)
            .login(username, password)
            .await?;

        let mut config = self.config.write().await;
        config.access_token = Some(response.access_token.clone());
        config.user_id = Some(response.user.id.clone());

        Ok(response)
    }

    /// Set the session directly (e.g., from stored credentials).
    pub async fn set_token(&self, access_token: String, user_id: String) {
        let mut config = self.config.write().await;
        config.access_token = Some(access_token);
        config.user_id = Some(user_id);
    }

    /// Current access token and user id.
    pub async fn get_token(&self) -> Option<(String, String)> {
        let config = self.config.read().await;
        config.access_token.clone().zip(config.user_id.clone())
    }

    /// Clear the stored session (logout).
    pub async fn logout(&self) {
        let mut config = self.config.write().await;
        config.access_token = None;
        config.user_id = None;
        info!("Logged out");
    }

    /// Validate the current access token.
    pub async fn validate_token(&self) -> Result<bool> {
        let (url, device_id, token) = {
            let config = self.config.read().await;
            let Some(token) = config.access_token.clone() else {
                return Ok(false);
            };
            (config.url.clone(), config.device_id.clone(), token)
        };

        AuthClient::new(&self.http, &url, &device_id)
            .validate_token(&token)
            .await
    }

    /// Credentials for an authenticated request.
    ///
    /// Returns an error if not authenticated.
    pub(crate) async fn credentials(&self) -> Result<Credentials> {
        let config = self.config.read().await;
        let (Some(token), Some(user_id)) = (&config.access_token, &config.user_id) else {
            return Err(ServerClientError::AuthRequired);
        };

        Ok(Credentials {
            url: config.url.clone(),
            token: token.clone(),
            user_id: user_id.clone(),
            device_id: config.device_id.clone(),
            natively_playable: config.natively_playable.clone(),
            transcoding_codec: config.transcoding_codec.clone(),
        })
    }

    pub(crate) fn library<'a>(&'a self, credentials: &'a Credentials) -> LibraryClient<'a> {
        LibraryClient::new(&self.http, credentials)
    }

    pub(crate) fn downloads<'a>(&'a self, credentials: &'a Credentials) -> DownloadClient<'a> {
        DownloadClient::new(&self.http, credentials)
    }

    pub(crate) fn sessions<'a>(&'a self, credentials: &'a Credentials) -> SessionClient<'a> {
        SessionClient::new(&self.http, credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(MediaServerClient::new(ServerConfig::new("https://example.com")).is_ok());
        assert!(MediaServerClient::new(ServerConfig::new("http://localhost:8096")).is_ok());

        assert!(MediaServerClient::new(ServerConfig::new("")).is_err());
        assert!(MediaServerClient::new(ServerConfig::new("not-a-url")).is_err());
        assert!(MediaServerClient::new(ServerConfig::new("ftp://example.com")).is_err());
    }

    #[tokio::test]
    async fn test_url_normalization() {
        let client =
            MediaServerClient::new(ServerConfig::new("https://example.com/")).expect("valid url");
        assert_eq!(client.url().await, "https://example.com");
    }

    #[tokio::test]
    async fn requests_need_a_session() {
        let client = MediaServerClient::new(ServerConfig::new("https://example.com")).unwrap();
        assert!(matches!(
            client.credentials().await,
            Err(ServerClientError::AuthRequired)
        ));

        client.set_token("t0ken".into(), "u1".into()).await;
        let credentials = client.credentials().await.unwrap();
        assert_eq!(credentials.token, "t0ken");
        assert_eq!(credentials.user_id, "u1");
    }
}
