//! Conversion service client
//!
//! Translates text + voice + bearer token into exactly one `POST` to the
//! configured endpoint and folds every failure into [`ConversionError`].
//! Input problems are caught before any network activity. There is no retry
//! and no caching: each call is a fresh conversion.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tts_common::api::{extract_error_message, ConvertRequest, ConvertResponse};
use tts_common::Voice;

const USER_AGENT: &str = concat!("tts-ui/", env!("CARGO_PKG_VERSION"));

/// Shown when the text is empty after trimming
pub const EMPTY_TEXT_MESSAGE: &str = "Please enter some text.";

/// Shown when no bearer token is available
pub const MISSING_TOKEN_MESSAGE: &str = "User is not authenticated";

/// Failure category, for callers that branch on the kind of error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    Service,
}

/// Conversion client errors
///
/// `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Malformed input, detected before any network activity
    #[error("{0}")]
    Validation(String),

    /// Missing credential, or credential rejected by the service (401/403)
    #[error("{0}")]
    Auth(String),

    /// The service could not be reached (connect failure, timeout)
    #[error("{0}")]
    Network(String),

    /// The service answered with a non-success status or an unusable body
    #[error("{message}")]
    Service { status: Option<u16>, message: String },
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::Validation(_) => ErrorKind::Validation,
            ConversionError::Auth(_) => ErrorKind::Auth,
            ConversionError::Network(_) => ErrorKind::Network,
            ConversionError::Service { .. } => ErrorKind::Service,
        }
    }

    fn service(status: StatusCode, message: impl Into<String>) -> Self {
        ConversionError::Service {
            status: Some(status.as_u16()),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ConversionError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Conversion request timed out".to_string()
        } else if err.is_connect() {
            "Could not reach the conversion service".to_string()
        } else {
            format!("Request to conversion service failed: {}", err)
        };
        ConversionError::Network(message)
    }
}

/// Validated conversion input
///
/// Built fresh for every submit and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    text: String,
    voice: Voice,
}

impl ConversionRequest {
    /// Validate raw form input
    ///
    /// The text is kept exactly as typed; trimming only decides emptiness.
    pub fn new(text: &str, voice: &str) -> Result<Self, ConversionError> {
        if text.trim().is_empty() {
            return Err(ConversionError::Validation(EMPTY_TEXT_MESSAGE.to_string()));
        }
        let voice = voice
            .parse::<Voice>()
            .map_err(|_| ConversionError::Validation(format!("Unsupported voice: {}", voice)))?;

        Ok(Self {
            text: text.to_string(),
            voice,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }
}

/// Successful conversion: where the produced audio lives
///
/// The location is not checked for reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub audio_location: Url,
}

/// Anything that can turn text into an audio location
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        text: &str,
        voice: &str,
        bearer_token: &str,
    ) -> Result<ConversionResult, ConversionError>;
}

/// HTTP client for the remote conversion service
#[derive(Debug, Clone)]
pub struct ConversionClient {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl ConversionClient {
    pub fn new(endpoint: &str, timeout: Duration) -> tts_common::Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            tts_common::Error::Config(format!("Invalid conversion endpoint {:?}: {}", endpoint, e))
        })?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| tts_common::Error::Internal(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(
        &self,
        request: &ConversionRequest,
        bearer_token: &str,
    ) -> Result<ConversionResult, ConversionError> {
        debug!(
            endpoint = %self.endpoint,
            voice = %request.voice(),
            chars = request.text().chars().count(),
            "Sending conversion request"
        );

        let body = ConvertRequest {
            text: request.text().to_string(),
            voice: request.voice().name().to_string(),
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(bearer_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text).unwrap_or_else(|| {
                format!("Not authorized to convert text (HTTP {})", status.as_u16())
            });
            warn!(status = status.as_u16(), "Conversion rejected credential");
            return Err(ConversionError::Auth(message));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text)
                .unwrap_or_else(|| format!("Conversion failed (HTTP {})", status.as_u16()));
            warn!(status = status.as_u16(), %message, "Conversion service returned an error");
            return Err(ConversionError::service(status, message));
        }

        let text = response.text().await?;
        let parsed: ConvertResponse = serde_json::from_str(&text).map_err(|e| {
            ConversionError::service(
                status,
                format!("Malformed response from conversion service: {}", e),
            )
        })?;

        let location = parsed
            .audio_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ConversionError::service(status, "Response did not include an audio location")
            })?;

        let audio_location = Url::parse(location.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                ConversionError::service(status, "Response contained an invalid audio location")
            })?;

        info!(voice = %request.voice(), "Conversion succeeded");

        Ok(ConversionResult { audio_location })
    }
}

#[async_trait]
impl Converter for ConversionClient {
    async fn convert(
        &self,
        text: &str,
        voice: &str,
        bearer_token: &str,
    ) -> Result<ConversionResult, ConversionError> {
        let request = ConversionRequest::new(text, voice)?;

        if bearer_token.trim().is_empty() {
            return Err(ConversionError::Auth(MISSING_TOKEN_MESSAGE.to_string()));
        }

        self.send(&request, bearer_token).await
    }
}
