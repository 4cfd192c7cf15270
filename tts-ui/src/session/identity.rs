//! Hosted identity provider boundary
//!
//! The service consumes an OpenID Connect provider through its public HTTP
//! endpoints: discovery document, authorization endpoint (browser redirect),
//! token endpoint (code exchange and refresh), userinfo endpoint, and a hosted
//! logout endpoint. Tokens are opaque here; they are never decoded or verified.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use tts_common::config::IdentityConfig;

const USER_AGENT: &str = concat!("tts-ui/", env!("CARGO_PKG_VERSION"));
const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Identity provider errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Identity provider discovery failed: {0}")]
    Discovery(String),

    #[error("Identity provider metadata not loaded yet")]
    NotDiscovered,

    #[error("Identity provider unreachable: {0}")]
    Request(String),

    #[error("Token request failed (HTTP {status}): {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("Profile request failed: {0}")]
    Profile(String),

    #[error("Sign-in state mismatch")]
    StateMismatch,

    #[error("{0}")]
    Provider(String),

    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Request(err.to_string())
    }
}

/// Tokens returned by the token endpoint
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Profile claims from the userinfo endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileClaims {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Capability surface consumed from the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Load provider metadata; must succeed before any other call
    async fn discover(&self) -> Result<(), IdentityError>;

    /// Where to send the browser to sign in
    async fn sign_in_url(&self, state: &str) -> Result<Url, IdentityError>;

    /// Where to send the browser after the local session ended
    ///
    /// `None` when the provider offers no hosted logout.
    async fn sign_out_url(&self) -> Option<Url>;

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, IdentityError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileClaims, IdentityError>;
}

/// Subset of the OpenID Connect discovery document we use
#[derive(Debug, Clone, Deserialize)]
struct ProviderMetadata {
    authorization_endpoint: String,
    token_endpoint: String,
    #[serde(default)]
    userinfo_endpoint: Option<String>,
    #[serde(default)]
    end_session_endpoint: Option<String>,
}

/// OAuth error body (`{"error": "...", "error_description": "..."}`)
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

fn oauth_error_message(body: &str) -> String {
    serde_json::from_str::<OAuthErrorBody>(body)
        .ok()
        .and_then(|e| e.error_description.or(e.error))
        .unwrap_or_else(|| "no details".to_string())
}

/// OpenID Connect provider reached over HTTP
pub struct HostedIdentityProvider {
    http_client: reqwest::Client,
    config: IdentityConfig,
    metadata: RwLock<Option<ProviderMetadata>>,
}

impl HostedIdentityProvider {
    pub fn new(config: IdentityConfig, timeout: Duration) -> Result<Self, IdentityError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            metadata: RwLock::new(None),
        })
    }

    fn discovery_url(&self) -> String {
        format!("{}{}", self.config.authority.trim_end_matches('/'), DISCOVERY_PATH)
    }

    async fn metadata(&self) -> Result<ProviderMetadata, IdentityError> {
        self.metadata
            .read()
            .await
            .clone()
            .ok_or(IdentityError::NotDiscovered)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenSet, IdentityError> {
        let metadata = self.metadata().await?;

        let response = self
            .http_client
            .post(&metadata.token_endpoint)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::TokenEndpoint {
                status: status.as_u16(),
                message: oauth_error_message(&body),
            });
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| IdentityError::TokenEndpoint {
                status: status.as_u16(),
                message: format!("malformed token response: {}", e),
            })
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn discover(&self) -> Result<(), IdentityError> {
        let url = self.discovery_url();
        debug!(%url, "Fetching identity provider metadata");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| IdentityError::Discovery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::Discovery(format!(
                "HTTP {} from {}",
                response.status().as_u16(),
                url
            )));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| IdentityError::Discovery(e.to_string()))?;

        info!(
            authorization_endpoint = %metadata.authorization_endpoint,
            "Identity provider metadata loaded"
        );
        *self.metadata.write().await = Some(metadata);
        Ok(())
    }

    async fn sign_in_url(&self, state: &str) -> Result<Url, IdentityError> {
        let metadata = self.metadata().await?;
        Url::parse_with_params(
            &metadata.authorization_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("scope", self.config.scope.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| IdentityError::InvalidUrl(e.to_string()))
    }

    async fn sign_out_url(&self) -> Option<Url> {
        let endpoint = match &self.config.logout_endpoint {
            Some(endpoint) => Some(endpoint.clone()),
            None => self
                .metadata
                .read()
                .await
                .as_ref()
                .and_then(|m| m.end_session_endpoint.clone()),
        }?;

        match Url::parse_with_params(
            &endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("logout_uri", self.config.logout_uri.as_str()),
            ],
        ) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Ignoring invalid logout endpoint {:?}: {}", endpoint, e);
                None
            }
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, IdentityError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProfileClaims, IdentityError> {
        let metadata = self.metadata().await?;
        let Some(endpoint) = metadata.userinfo_endpoint else {
            return Ok(ProfileClaims::default());
        };

        let response = self
            .http_client
            .get(&endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::Profile(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Profile(e.to_string()))
    }
}
