use super::token::{request_token, ClientSecret, StoredToken};
use crate::error::{auth_error, SyncResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

/// A way of getting a first token from the user
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn obtain_token(&self, secret: &ClientSecret) -> SyncResult<StoredToken>;
}

/// Browser consent with a loopback redirect
pub struct InteractiveConsent {
    client: Client,
    scope: String,
}

impl InteractiveConsent {
    pub fn new(client: Client, scope: &str) -> Self {
        Self {
            client,
            scope: scope.to_string(),
        }
    }
}

#[async_trait]
impl ConsentFlow for InteractiveConsent {
    async fn obtain_token(&self, secret: &ClientSecret) -> SyncResult<StoredToken> {
        // Generate random state for security
        let state = uuid::Uuid::new_v4().to_string();

        // Any free loopback port is accepted for installed apps
        let server = tiny_http::Server::http("127.0.0.1:0")
            .map_err(|e| auth_error(&format!("Failed to start callback server: {}", e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| auth_error("Callback server is not listening on TCP"))?;
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let auth_url = authorization_url(secret, &self.scope, &redirect_uri, &state)?;

        println!("Opening browser for Google Calendar authorization...");
        println!("If it does not open, visit:\n\n{}\n", auth_url);
        if let Err(e) = webbrowser::open(auth_url.as_str()) {
            warn!("Failed to open browser: {}", e);
        }

        info!("Waiting for authorization callback on {}", redirect_uri);
        let code = tokio::task::spawn_blocking(move || wait_for_code(&server, &state))
            .await
            .map_err(|e| auth_error(&format!("Callback task failed: {}", e)))??;

        let response = request_token(
            &self.client,
            &secret.token_uri,
            &[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ],
        )
        .await?;

        if response.refresh_token.is_none() {
            warn!("Authorization returned no refresh token; the next expiry will need consent again");
        }

        Ok(response.into_stored(None, Utc::now().timestamp()))
    }
}

/// Consent page URL for an offline-access token
pub fn authorization_url(
    secret: &ClientSecret,
    scope: &str,
    redirect_uri: &str,
    state: &str,
) -> SyncResult<Url> {
    Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("scope", scope),
            ("state", state),
        ],
    )
    .map_err(|e| auth_error(&format!("Invalid auth_uri '{}': {}", secret.auth_uri, e)))
}

/// Serve the loopback redirect until it carries a code or an error
fn wait_for_code(server: &tiny_http::Server, state: &str) -> SyncResult<String> {
    loop {
        let request = server.recv()?;
        let outcome = parse_callback(request.url(), state);

        let body = match &outcome {
            Ok(Some(_)) => "Authorization successful! You can close this window.",
            Ok(None) => "Waiting for authorization...",
            Err(_) => "Authorization failed. Check the terminal for details.",
        };
        if let Err(e) = request.respond(tiny_http::Response::from_string(body)) {
            warn!("Failed to answer browser: {}", e);
        }

        match outcome {
            Ok(Some(code)) => return Ok(code),
            // Browsers also ask for /favicon.ico and the like
            Ok(None) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Pull the authorization code out of a callback request path
pub fn parse_callback(path: &str, expected_state: &str) -> SyncResult<Option<String>> {
    let url = Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(path))
        .map_err(|e| auth_error(&format!("Malformed callback '{}': {}", path, e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => return Err(auth_error(&format!("Consent was not granted: {}", value))),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(code) = code else {
        return Ok(None);
    };
    if state.as_deref() != Some(expected_state) {
        return Err(auth_error("Callback state does not match the request"));
    }
    Ok(Some(code))
}
