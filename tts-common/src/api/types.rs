//! Request/response types for the conversion service

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Voice;

/// Body of `POST <endpoint>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub text: String,
    pub voice: String,
}

/// Successful conversion response
///
/// Only `audio_url` is required; the remaining fields are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertResponse {
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Entry of the voice selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceOption {
    pub name: String,
    pub label: String,
}

impl From<Voice> for VoiceOption {
    fn from(voice: Voice) -> Self {
        Self {
            name: voice.name().to_string(),
            label: voice.label().to_string(),
        }
    }
}

/// Pull a human-readable message out of a failure response body
///
/// Looks, in order, for a string `error` field, an `error.message` field, a
/// string `message` field, and finally falls back to any non-JSON body,
/// taken verbatim (trimmed). Returns `None` when nothing usable is present.
///
/// # Examples
///
/// ```
/// use tts_common::api::extract_error_message;
///
/// assert_eq!(
///     extract_error_message(r#"{"error": "text is required"}"#),
///     Some("text is required".to_string())
/// );
/// assert_eq!(extract_error_message(""), None);
/// ```
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            let candidate = value
                .get("error")
                .and_then(Value::as_str)
                .or_else(|| {
                    value
                        .get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                })
                .or_else(|| value.get("message").and_then(Value::as_str));

            candidate
                .map(str::trim)
                .filter(|msg| !msg.is_empty())
                .map(str::to_string)
        }
        Err(_) => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ConvertRequest {
            text: "Hello world".to_string(),
            voice: "Amy".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"text": "Hello world", "voice": "Amy"}));
    }

    #[test]
    fn test_response_with_extra_fields() {
        let body = r#"{
            "message": "success",
            "audio_url": "https://cdn.example/a.mp3",
            "timestamp": "2025-01-01T00:00:00",
            "text": "Hello world"
        }"#;
        let response: ConvertResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.audio_url.as_deref(), Some("https://cdn.example/a.mp3"));
        assert_eq!(response.message.as_deref(), Some("success"));
    }

    #[test]
    fn test_response_missing_audio_url() {
        let response: ConvertResponse = serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
        assert!(response.audio_url.is_none());
    }

    #[test]
    fn test_error_field_preferred() {
        let body = r#"{"error": "Polly returned no audio", "message": "other"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Polly returned no audio")
        );
    }

    #[test]
    fn test_nested_error_message() {
        let body = r#"{"error": {"code": "BAD_REQUEST", "message": "too long"}}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("too long"));
    }

    #[test]
    fn test_message_field() {
        assert_eq!(
            extract_error_message(r#"{"message": "Unauthorized"}"#).as_deref(),
            Some("Unauthorized")
        );
    }

    #[test]
    fn test_json_without_message() {
        assert_eq!(extract_error_message(r#"{"status": 500}"#), None);
        assert_eq!(extract_error_message(r#"{"error": "   "}"#), None);
    }

    #[test]
    fn test_plain_text_body_verbatim() {
        assert_eq!(
            extract_error_message("  Service Unavailable \n").as_deref(),
            Some("Service Unavailable")
        );
    }

    #[test]
    fn test_long_plain_text_body_not_truncated() {
        let body = "x".repeat(301);
        assert_eq!(extract_error_message(&body), Some(body.clone()));
    }

    #[test]
    fn test_markup_body_verbatim() {
        assert_eq!(
            extract_error_message("<html><body>502 Bad Gateway</body></html>").as_deref(),
            Some("<html><body>502 Bad Gateway</body></html>")
        );
    }

    #[test]
    fn test_voice_option_from_voice() {
        let option = VoiceOption::from(Voice::Hans);
        assert_eq!(option.name, "Hans");
        assert_eq!(option.label, "Hans (German)");
    }
}
