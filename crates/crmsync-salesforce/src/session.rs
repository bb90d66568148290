//! Session management for the Salesforce REST API
//!
//! Owns the single bearer token of the process. Every remote operation asks
//! [`SessionManager::ensure_valid`] for a credential; the manager probes the
//! held token with a cheap authenticated call and re-runs the OAuth2
//! username-password grant when there is no token or the probe fails.
//!
//! ## Components
//!
//! - [`AccessToken`] - Opaque bearer credential with redacted `Debug`
//! - [`SessionManager`] - Token owner, probe and re-authentication gate

use std::sync::Arc;

use crmsync_core::config::SalesforceConfig;
use oauth2::{
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
    AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, StandardRevocableToken, TokenResponse,
    TokenUrl,
};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{client::SalesforceClient, SalesforceError};

/// Path of the capability probe under the versioned data API
const PROBE_PATH: &str = "/limits";

type TokenClient = Client<
    BasicErrorResponse,
    PasswordGrantResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

type UnconfiguredTokenClient = Client<
    BasicErrorResponse,
    PasswordGrantResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

// ============================================================================
// Token endpoint response
// ============================================================================

/// Body of a successful password grant
///
/// Only `access_token` is required; Salesforce orgs and proxies do not all
/// send `token_type`, and the rest of the body (`instance_url`, `signature`,
/// ...) is not used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordGrantResponse {
    access_token: oauth2::AccessToken,
    #[serde(default = "bearer")]
    token_type: BasicTokenType,
}

fn bearer() -> BasicTokenType {
    BasicTokenType::Bearer
}

impl TokenResponse for PasswordGrantResponse {
    type TokenType = BasicTokenType;

    fn access_token(&self) -> &oauth2::AccessToken {
        &self.access_token
    }

    fn token_type(&self) -> &BasicTokenType {
        &self.token_type
    }

    fn expires_in(&self) -> Option<std::time::Duration> {
        None
    }

    fn refresh_token(&self) -> Option<&RefreshToken> {
        None
    }

    fn scopes(&self) -> Option<&Vec<Scope>> {
        None
    }
}

// ============================================================================
// AccessToken
// ============================================================================

/// Bearer credential issued by the token endpoint
///
/// The raw value is only readable inside this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub(crate) fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

// ============================================================================
// SessionManager
// ============================================================================

/// Owner of the process-wide Salesforce session
///
/// The token sits behind an async mutex that [`ensure_valid`](Self::ensure_valid)
/// holds across the probe and any re-authentication, so concurrent callers
/// wait for one exchange instead of starting their own.
pub struct SessionManager {
    client: Arc<SalesforceClient>,
    oauth: TokenClient,
    username: ResourceOwnerUsername,
    password: ResourceOwnerPassword,
    token: Mutex<Option<AccessToken>>,
}

impl SessionManager {
    /// Creates a session manager with no token held
    ///
    /// The password sent on the grant is the configured password followed by
    /// the security token.
    ///
    /// # Errors
    /// Returns [`SalesforceError::Configuration`] if the login URL is not a valid URL.
    pub fn new(
        client: Arc<SalesforceClient>,
        config: &SalesforceConfig,
    ) -> Result<Self, SalesforceError> {
        let token_url = TokenUrl::new(config.login_url.clone())
            .map_err(|e| SalesforceError::Configuration(format!("login_url: {e}")))?;

        let oauth = UnconfiguredTokenClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        Ok(Self {
            client,
            oauth,
            username: ResourceOwnerUsername::new(config.username.clone()),
            password: ResourceOwnerPassword::new(format!(
                "{}{}",
                config.password, config.security_token
            )),
            token: Mutex::new(None),
        })
    }

    /// Returns a credential that the last probe accepted, or a fresh one
    ///
    /// Authenticates when no token is held; otherwise probes the held token
    /// and authenticates once if the probe fails.
    ///
    /// # Errors
    /// Returns [`SalesforceError::Authentication`] if the token exchange fails.
    pub async fn ensure_valid(&self) -> Result<AccessToken, SalesforceError> {
        let mut slot = self.token.lock().await;

        if let Some(token) = slot.as_ref() {
            if self.probe(token).await {
                return Ok(token.clone());
            }
            info!("Held session token was rejected, re-authenticating");
        }

        self.authenticate_locked(&mut slot).await
    }

    /// Discards any held token and runs the password grant
    ///
    /// # Errors
    /// Returns [`SalesforceError::Authentication`] if the exchange does not succeed.
    pub async fn authenticate(&self) -> Result<AccessToken, SalesforceError> {
        let mut slot = self.token.lock().await;
        self.authenticate_locked(&mut slot).await
    }

    /// Probes the held token
    ///
    /// Returns `false` without any remote call when no token is held. A failed
    /// probe clears the token so the next [`ensure_valid`](Self::ensure_valid)
    /// authenticates directly.
    pub async fn is_valid(&self) -> bool {
        let mut slot = self.token.lock().await;
        let Some(token) = slot.as_ref() else {
            return false;
        };

        let valid = self.probe(token).await;
        if !valid {
            *slot = None;
        }
        valid
    }

    /// Returns true if a token is currently held, without probing it
    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    async fn authenticate_locked(
        &self,
        slot: &mut Option<AccessToken>,
    ) -> Result<AccessToken, SalesforceError> {
        *slot = None;

        debug!(username = %self.username.as_str(), "Requesting Salesforce access token");

        let response = self
            .oauth
            .exchange_password(&self.username, &self.password)
            .request_async(self.client.http_client())
            .await
            .map_err(|e| {
                let message = error_chain(&e);
                warn!(error = %message, "Salesforce token exchange failed");
                SalesforceError::Authentication(message)
            })?;

        let token = AccessToken::new(response.access_token().secret().clone());
        *slot = Some(token.clone());

        info!("Authenticated with Salesforce");
        Ok(token)
    }

    /// Sends the capability probe; any failure counts as "invalid"
    async fn probe(&self, token: &AccessToken) -> bool {
        let result = self
            .client
            .request(Method::GET, PROBE_PATH, token)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Session probe accepted");
                true
            }
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                debug!("Session probe rejected with 401");
                false
            }
            Ok(response) => {
                warn!(status = %response.status(), "Session probe returned unexpected status");
                false
            }
            Err(e) => {
                warn!(error = %e, "Session probe failed");
                false
            }
        }
    }
}

/// Flattens an error and its sources into one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
