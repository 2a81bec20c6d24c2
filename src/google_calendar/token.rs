use super::consent::{ConsentFlow, InteractiveConsent};
use crate::error::{auth_error, SyncResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Full read/write access to calendars and events
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Something that can authorize a Calendar API request
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// A bearer token valid for at least the next request
    async fn access_token(&self) -> SyncResult<String>;
}

/// OAuth token as persisted in the token file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl StoredToken {
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS > now
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert to a stored token, keeping the previous refresh token when none was issued
    pub fn into_stored(self, previous_refresh: Option<String>, now: i64) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + self.expires_in.unwrap_or(3600),
            scope: self.scope,
        }
    }
}

/// OAuth client from a Google client secret file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Read the "installed" (or "web") client from a downloaded client secret file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            auth_error(&format!("Failed to read client secret {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> SyncResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)
            .map_err(|e| auth_error(&format!("Failed to parse client secret: {}", e)))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| auth_error("Client secret has no 'installed' or 'web' section"))
    }
}

/// Post a grant to the token endpoint
pub(crate) async fn request_token(
    client: &Client,
    token_uri: &str,
    params: &[(&str, &str)],
) -> SyncResult<TokenResponse> {
    let response = client
        .post(token_uri)
        .form(params)
        .send()
        .await
        .map_err(|e| auth_error(&format!("Failed to reach token endpoint: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        return Err(auth_error(&format!(
            "Token request failed: HTTP {} - {}",
            status, error_body
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))
}

/// File-backed OAuth token with refresh and consent fallback
pub struct TokenManager {
    token_path: PathBuf,
    client_secret_path: PathBuf,
    client: Client,
    consent: Arc<dyn ConsentFlow>,
    cached: Mutex<Option<StoredToken>>,
}

impl TokenManager {
    pub fn new(token_path: impl Into<PathBuf>, client_secret_path: impl Into<PathBuf>) -> Self {
        let client = Client::new();
        Self {
            token_path: token_path.into(),
            client_secret_path: client_secret_path.into(),
            consent: Arc::new(InteractiveConsent::new(client.clone(), CALENDAR_SCOPE)),
            client,
            cached: Mutex::new(None),
        }
    }

    /// Replace the interactive consent flow
    pub fn with_consent(mut self, consent: Arc<dyn ConsentFlow>) -> Self {
        self.consent = consent;
        self
    }

    /// Read the token file, if there is one.
    ///
    /// A file in another layout counts as no token, so consent replaces it.
    pub fn read_token(&self) -> SyncResult<Option<StoredToken>> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.token_path)?;
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable token file {}: {}",
                    self.token_path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Write the token file
    pub fn save_token(&self, token: &StoredToken) -> SyncResult<()> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.token_path, serde_json::to_string_pretty(token)?)?;
        debug!("Token saved to {}", self.token_path.display());
        Ok(())
    }

    /// Run the consent flow regardless of any stored token
    pub async fn force_consent(&self) -> SyncResult<StoredToken> {
        let token = self.consent_and_save().await?;
        *self.cached.lock().await = Some(token.clone());
        Ok(token)
    }

    async fn consent_and_save(&self) -> SyncResult<StoredToken> {
        let secret = ClientSecret::load(&self.client_secret_path)?;
        info!("Starting interactive authorization");
        let token = self.consent.obtain_token(&secret).await?;
        self.save_token(&token)?;
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<StoredToken> {
        let secret = ClientSecret::load(&self.client_secret_path)?;
        let response = request_token(
            &self.client,
            &secret.token_uri,
            &[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await?;
        Ok(response.into_stored(Some(refresh_token.to_string()), Utc::now().timestamp()))
    }

    /// Move a stored (or missing) token to a valid one
    async fn obtain(&self, current: Option<StoredToken>, now: i64) -> SyncResult<StoredToken> {
        let token = match current {
            Some(token) if token.is_valid_at(now) => return Ok(token),
            Some(token) => token,
            None => {
                info!("No stored token at {}", self.token_path.display());
                return self.consent_and_save().await;
            }
        };

        let Some(refresh_token) = token.refresh_token else {
            info!("Stored token expired and has no refresh token");
            return self.consent_and_save().await;
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                info!("Refreshed access token");
                self.save_token(&refreshed)?;
                Ok(refreshed)
            }
            Err(e) => {
                warn!("Token refresh failed, falling back to consent: {}", e);
                self.consent_and_save().await
            }
        }
    }
}

#[async_trait]
impl Authorizer for TokenManager {
    async fn access_token(&self) -> SyncResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(now) {
                return Ok(token.access_token.clone());
            }
        }

        let current = match cached.take() {
            Some(token) => Some(token),
            None => self.read_token()?,
        };
        let token = self.obtain(current, now).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);

        Ok(access_token)
    }
}
