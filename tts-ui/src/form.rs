//! Conversion form controller
//!
//! Holds the dashboard form (text, voice) and its [`SubmissionState`]:
//!
//! ```text
//! Idle ──submit──> InFlight ──resolve──> Succeeded | Failed
//!   ^                                        │
//!   └────────────── next submit ─────────────┘
//! ```
//!
//! Validation and auth failures go straight to `Failed` without passing
//! through `InFlight`. A submit while `InFlight` is a no-op. Editing the
//! fields never clears a displayed result or error; only the next submit does.
//!
//! Submission is split into [`ConversionForm::begin_submit`] and
//! [`ConversionForm::resolve`] so the owner can release its lock on the form
//! while the request is outstanding.

use tracing::{debug, info, warn};
use tts_common::Voice;

use crate::client::{
    ConversionError, ConversionRequest, ConversionResult, Converter, ErrorKind,
    MISSING_TOKEN_MESSAGE,
};
use crate::session::Session;

const SUBMIT_LABEL: &str = "Convert to Speech";
const IN_FLIGHT_LABEL: &str = "Converting...";

/// Why a submission failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<ConversionError> for FailureReason {
    fn from(err: ConversionError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Lifecycle of one form submission
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Succeeded(ConversionResult),
    Failed(FailureReason),
}

/// Everything needed to dispatch one conversion
pub struct SubmitTicket {
    pub request: ConversionRequest,
    bearer_token: String,
}

impl SubmitTicket {
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }
}

impl std::fmt::Debug for SubmitTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitTicket")
            .field("request", &self.request)
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}

/// Result of a submit attempt
#[derive(Debug)]
pub enum SubmitOutcome {
    /// State is now `InFlight`; the caller must dispatch and then `resolve`
    Dispatch(SubmitTicket),
    /// State is now `Failed`; nothing to dispatch
    Rejected,
    /// Already in flight; nothing changed
    Busy,
}

/// Dashboard form state
#[derive(Debug, Clone)]
pub struct ConversionForm {
    text: String,
    voice: String,
    state: SubmissionState,
}

impl Default for ConversionForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionForm {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            voice: Voice::default().name().to_string(),
            state: SubmissionState::Idle,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_voice(&mut self, voice: impl Into<String>) {
        self.voice = voice.into();
    }

    pub fn is_in_flight(&self) -> bool {
        self.state == SubmissionState::InFlight
    }

    /// Start a submission
    ///
    /// Clears the previous result or error, validates the fields and the
    /// session, and moves to `InFlight` only if everything checks out.
    pub fn begin_submit(&mut self, session: &Session) -> SubmitOutcome {
        if self.is_in_flight() {
            debug!("Submit ignored: conversion already in flight");
            return SubmitOutcome::Busy;
        }

        self.state = SubmissionState::Idle;

        let request = match ConversionRequest::new(&self.text, &self.voice) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "Submit rejected by validation");
                self.state = SubmissionState::Failed(err.into());
                return SubmitOutcome::Rejected;
            }
        };

        let Some(token) = session.usable_token() else {
            warn!(status = ?session.status, "Submit rejected: no usable bearer token");
            self.state = SubmissionState::Failed(
                ConversionError::Auth(MISSING_TOKEN_MESSAGE.to_string()).into(),
            );
            return SubmitOutcome::Rejected;
        };

        self.state = SubmissionState::InFlight;
        SubmitOutcome::Dispatch(SubmitTicket {
            request,
            bearer_token: token.to_string(),
        })
    }

    /// Take posted field values and start a submission
    ///
    /// While a conversion is in flight the posted values are discarded along
    /// with the submit, so the fields keep showing what is being converted.
    pub fn submit_input(
        &mut self,
        text: impl Into<String>,
        voice: Option<String>,
        session: &Session,
    ) -> SubmitOutcome {
        if self.is_in_flight() {
            debug!("Submit ignored: conversion already in flight");
            return SubmitOutcome::Busy;
        }

        self.set_text(text);
        if let Some(voice) = voice {
            self.set_voice(voice);
        }
        self.begin_submit(session)
    }

    /// Finish the in-flight submission, replacing any previous outcome
    pub fn resolve(&mut self, result: Result<ConversionResult, ConversionError>) {
        if !self.is_in_flight() {
            warn!("Ignoring conversion result: no submission in flight");
            return;
        }

        self.state = match result {
            Ok(result) => {
                info!(audio = %result.audio_location, "Conversion ready");
                SubmissionState::Succeeded(result)
            }
            Err(err) => {
                warn!(kind = ?err.kind(), error = %err, "Conversion failed");
                SubmissionState::Failed(err.into())
            }
        };
    }

    /// Submit and await the conversion in one step
    pub async fn submit(&mut self, session: &Session, converter: &dyn Converter) -> &SubmissionState {
        if let SubmitOutcome::Dispatch(ticket) = self.begin_submit(session) {
            let result = converter
                .convert(
                    ticket.request.text(),
                    ticket.request.voice().name(),
                    ticket.bearer_token(),
                )
                .await;
            self.resolve(result);
        }
        &self.state
    }

    /// Back to a blank form
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_submit_disabled(&self) -> bool {
        self.is_in_flight()
    }

    pub fn button_label(&self) -> &'static str {
        if self.is_in_flight() {
            IN_FLIGHT_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SubmissionState::Failed(reason) => Some(&reason.message),
            _ => None,
        }
    }

    pub fn audio_location(&self) -> Option<&str> {
        match &self.state {
            SubmissionState::Succeeded(result) => Some(result.audio_location.as_str()),
            _ => None,
        }
    }
}
