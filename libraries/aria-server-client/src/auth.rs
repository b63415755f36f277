//! Authentication methods for the media server.

use crate::error::{Result, ServerClientError};
use crate::types::{LoginRequest, LoginResponse, UserInfo};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Header carrying the access token
pub(crate) const TOKEN_HEADER: &str = "X-Emby-Token";

/// Client identification the server requires on login
pub(crate) fn authorization_header(device_id: &str) -> String {
    format!(
        r#"MediaBrowser Client="Aria", Device="Aria", DeviceId="{device_id}", Version="{}""#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Authentication client for the media server.
pub struct AuthClient<'a> {
    http: &'a Client,
    base_url: &'a str,
    device_id: &'a str,
}

impl<'a> AuthClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str, device_id: &'a str) -> Self {
        Self {
            http,
            base_url,
            device_id,
        }
    }

    /// Login with username and password.
    ///
    /// Returns the access token and user on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/Users/AuthenticateByName", self.base_url);
        debug!(url = %url, username = %username, "Attempting login");

        let request = LoginRequest {
            username: username.to_string(),
            pw: password.to_string(),
        };

        let response = self
            .http
            .post(&url)
            .header("X-Emby-Authorization", authorization_header(self.device_id))
            .json(&request)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        let status = response.status();

        if status.is_success() {
            let login_response: LoginResponse = response.json().await.map_err(|e| {
                ServerClientError::ParseError(format!("Failed to parse login response: {e}"))
            })?;

            info!(
                username = %login_response.user.name,
                user_id = %login_response.user.id,
                "Login successful"
            );

            Ok(login_response)
        } else if status == StatusCode::UNAUTHORIZED {
            warn!(status = %status, "Login failed: invalid credentials");
            Err(ServerClientError::AuthFailed(
                "Invalid username or password".to_string(),
            ))
        } else {
            Err(ServerClientError::from_response(response, "login").await)
        }
    }

    /// Check whether an access token is still accepted.
    pub async fn validate_token(&self, access_token: &str) -> Result<bool> {
        Ok(self.current_user(access_token).await?.is_some())
    }

    /// User owning `access_token`, or `None` if the token was rejected.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<UserInfo>> {
        let url = format!("{}/Users/Me", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, access_token)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        let status = response.status();

        if status.is_success() {
            let user = response.json().await.map_err(|e| {
                ServerClientError::ParseError(format!("Failed to parse user: {e}"))
            })?;
            Ok(Some(user))
        } else if status == StatusCode::UNAUTHORIZED {
            debug!("Access token rejected");
            Ok(None)
        } else {
            Err(ServerClientError::from_response(response, "current user").await)
        }
    }
}
