//! Session provider
//!
//! Owns the one [`Session`] of this application instance. The session is
//! created at startup (status `Loading` while provider metadata is fetched),
//! changes only through [`SessionEvent`]s raised by identity provider
//! interactions, and is torn down on sign-out. Other components only ever see
//! cloned snapshots.

pub mod identity;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use identity::{HostedIdentityProvider, IdentityError, IdentityProvider, ProfileClaims, TokenSet};

const DEFAULT_DISPLAY_NAME: &str = "User";
const DEFAULT_AVATAR_URL: &str = "https://via.placeholder.com/40";

/// Authentication status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Loading,
    Authenticated,
    Error,
}

/// Signed-in user's display claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub avatar_url: String,
}

impl Profile {
    /// Map provider claims: name, then email, then a generic fallback
    pub fn from_claims(claims: &ProfileClaims) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            display_name: non_empty(&claims.name)
                .or_else(|| non_empty(&claims.email))
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            avatar_url: non_empty(&claims.picture)
                .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
        }
    }
}

/// Client-held record of the user's authentication state
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub profile: Option<Profile>,
    pub bearer_token: Option<String>,
    pub last_error: Option<String>,
}

impl Session {
    fn with_status(status: SessionStatus) -> Self {
        Self {
            status,
            profile: None,
            bearer_token: None,
            last_error: None,
        }
    }

    /// Fresh session while the provider bootstraps
    pub fn loading() -> Self {
        Self::with_status(SessionStatus::Loading)
    }

    pub fn unauthenticated() -> Self {
        Self::with_status(SessionStatus::Unauthenticated)
    }

    pub fn authenticated(profile: Profile, bearer_token: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            profile: Some(profile),
            bearer_token: Some(bearer_token.into()),
            last_error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            last_error: Some(message.into()),
            ..Self::with_status(SessionStatus::Error)
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Token usable for a request: authenticated and non-empty
    pub fn usable_token(&self) -> Option<&str> {
        if !self.is_authenticated() {
            return None;
        }
        self.bearer_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("profile", &self.profile)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Transitions raised by identity provider interactions
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Metadata discovery or code exchange in progress
    Bootstrapping,
    SignedIn { profile: Profile, token: String },
    TokenRefreshed { token: String },
    SignedOut,
    Failed(String),
}

/// Query parameters the provider appends to the redirect URI
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// True when the request is a provider redirect rather than a plain visit
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }
}

/// Refresh material kept next to the session, never exposed
#[derive(Default)]
struct Credentials {
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    fn from_tokens(tokens: &TokenSet, previous_refresh: Option<String>) -> Self {
        Self {
            refresh_token: tokens.refresh_token.clone().or(previous_refresh),
            expires_at: tokens
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct SessionInner {
    session: Session,
    credentials: Credentials,
    /// `state` sent with the last sign-in redirect, checked on callback
    pending_state: Option<String>,
}

/// Sole owner and writer of the application session
pub struct SessionProvider {
    identity: Arc<dyn IdentityProvider>,
    inner: RwLock<SessionInner>,
    /// Held across check-and-refresh so one expired token is refreshed once
    refresh_lock: Mutex<()>,
}

impl SessionProvider {
    /// Create the session for this application instance (status `Loading`)
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            inner: RwLock::new(SessionInner {
                session: Session::loading(),
                credentials: Credentials::default(),
                pending_state: None,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Load provider metadata; the session leaves `Loading` afterwards
    pub async fn bootstrap(&self) {
        self.apply(SessionEvent::Bootstrapping).await;
        match self.identity.discover().await {
            Ok(()) => self.apply(SessionEvent::SignedOut).await,
            Err(e) => {
                warn!("Identity provider bootstrap failed: {}", e);
                self.apply(SessionEvent::Failed(e.to_string())).await;
            }
        }
    }

    /// Rerun the bootstrap if the session is stuck in `Error`
    ///
    /// Returns the status afterwards.
    pub async fn recover(&self) -> SessionStatus {
        if self.status().await == SessionStatus::Error {
            info!("Restarting session after authentication error");
            self.bootstrap().await;
        }
        self.status().await
    }

    /// Read-only copy of the current session
    pub async fn snapshot(&self) -> Session {
        self.inner.read().await.session.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.read().await.session.status
    }

    /// Apply one transition to the session
    async fn apply(&self, event: SessionEvent) {
        let mut inner = self.inner.write().await;
        let before = inner.session.status;

        match event {
            SessionEvent::Bootstrapping => {
                inner.session = Session::loading();
            }
            SessionEvent::SignedIn { profile, token } => {
                inner.session = Session::authenticated(profile, token);
            }
            SessionEvent::TokenRefreshed { token } => {
                if inner.session.is_authenticated() {
                    inner.session.bearer_token = Some(token);
                } else {
                    debug!("Ignoring token refresh for {:?} session", before);
                }
            }
            SessionEvent::SignedOut => {
                inner.session = Session::unauthenticated();
                inner.credentials = Credentials::default();
                inner.pending_state = None;
            }
            SessionEvent::Failed(message) => {
                inner.session = Session::failed(message);
                inner.credentials = Credentials::default();
                inner.pending_state = None;
            }
        }

        if before != inner.session.status {
            info!(from = ?before, to = ?inner.session.status, "Session status changed");
        }
    }

    /// Build the provider sign-in URL and remember its `state`
    pub async fn sign_in_redirect(&self) -> Result<Url, IdentityError> {
        let state = Uuid::new_v4().to_string();
        let url = self.identity.sign_in_url(&state).await?;
        self.inner.write().await.pending_state = Some(state);
        info!("Redirecting to identity provider for sign-in");
        Ok(url)
    }

    /// Finish a sign-in from the provider's redirect parameters
    ///
    /// The session is `Loading` while the code is exchanged, then either
    /// `Authenticated` or `Error`.
    pub async fn complete_sign_in(&self, params: &CallbackParams) -> Result<(), IdentityError> {
        if let Some(error) = &params.error {
            let message = params
                .error_description
                .clone()
                .unwrap_or_else(|| error.clone());
            warn!(%error, "Identity provider reported a sign-in error");
            self.apply(SessionEvent::Failed(message.clone())).await;
            return Err(IdentityError::Provider(message));
        }

        let expected = self.inner.write().await.pending_state.take();
        if expected.is_none() || expected != params.state {
            warn!("Sign-in callback state does not match the pending redirect");
            self.apply(SessionEvent::Failed(IdentityError::StateMismatch.to_string()))
                .await;
            return Err(IdentityError::StateMismatch);
        }

        let Some(code) = params.code.as_deref() else {
            let err = IdentityError::Provider("Sign-in callback without code".to_string());
            self.apply(SessionEvent::Failed(err.to_string())).await;
            return Err(err);
        };

        self.apply(SessionEvent::Bootstrapping).await;

        let tokens = match self.identity.exchange_code(code).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Authorization code exchange failed: {}", e);
                self.apply(SessionEvent::Failed(e.to_string())).await;
                return Err(e);
            }
        };

        let claims = match self.identity.fetch_profile(&tokens.access_token).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Could not load profile claims, using defaults: {}", e);
                ProfileClaims::default()
            }
        };
        let profile = Profile::from_claims(&claims);

        self.inner.write().await.credentials = Credentials::from_tokens(&tokens, None);
        info!(user = %profile.display_name, "Signed in");
        self.apply(SessionEvent::SignedIn {
            profile,
            token: tokens.access_token,
        })
        .await;
        Ok(())
    }

    /// Refresh an expired access token before it is handed out
    ///
    /// Without a refresh token, or when refresh fails, the session ends.
    pub async fn ensure_fresh_token(&self) {
        let _refreshing = self.refresh_lock.lock().await;

        let refresh_token = {
            let inner = self.inner.read().await;
            if !inner.session.is_authenticated() || !inner.credentials.is_expired(Utc::now()) {
                return;
            }
            inner.credentials.refresh_token.clone()
        };

        let Some(refresh_token) = refresh_token else {
            info!("Access token expired and no refresh token is available");
            self.apply(SessionEvent::SignedOut).await;
            return;
        };

        match self.identity.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.inner.write().await.credentials =
                    Credentials::from_tokens(&tokens, Some(refresh_token));
                debug!("Access token refreshed");
                self.apply(SessionEvent::TokenRefreshed {
                    token: tokens.access_token,
                })
                .await;
            }
            Err(e) => {
                warn!("Token refresh failed, signing out: {}", e);
                self.apply(SessionEvent::SignedOut).await;
            }
        }
    }

    /// End the session and return the provider's logout URL, if it has one
    pub async fn sign_out_redirect(&self) -> Option<Url> {
        self.apply(SessionEvent::SignedOut).await;
        info!("Signed out");
        self.identity.sign_out_url().await
    }
}
