//! Conversion form submit

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{debug, error};

use crate::client::ConversionError;
use crate::form::SubmitOutcome;
use crate::guard::Route;
use crate::AppState;

/// Fields posted by the dashboard form
#[derive(Debug, Deserialize)]
pub struct ConvertForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    /// View to return to after the submit
    #[serde(default)]
    pub return_to: Option<String>,
}

/// POST /convert
///
/// Runs one submission through the form controller and answers with a
/// redirect back to the view (post/redirect/get). The request itself runs
/// in its own task: a browser that disconnects abandons the page, not the
/// conversion, and the form still leaves `InFlight`.
pub async fn convert(State(state): State<AppState>, Form(input): Form<ConvertForm>) -> Response {
    let back = input
        .return_to
        .as_deref()
        .and_then(Route::from_path)
        .filter(|route| *route != Route::Root)
        .unwrap_or(Route::Dashboard);

    state.session.ensure_fresh_token().await;
    let session = state.session.snapshot().await;

    let outcome = state
        .form
        .lock()
        .await
        .submit_input(input.text, input.voice, &session);

    match outcome {
        SubmitOutcome::Dispatch(ticket) => {
            let form = state.form.clone();
            let converter = state.converter.clone();

            let task = tokio::spawn(async move {
                let result = converter
                    .convert(
                        ticket.request.text(),
                        ticket.request.voice().name(),
                        ticket.bearer_token(),
                    )
                    .await;
                form.lock().await.resolve(result);
            });

            if let Err(e) = task.await {
                error!("Conversion task aborted: {}", e);
                state.form.lock().await.resolve(Err(ConversionError::Service {
                    status: None,
                    message: "Conversion failed".to_string(),
                }));
            }
        }
        SubmitOutcome::Rejected => {}
        SubmitOutcome::Busy => debug!("Duplicate submit ignored"),
    }

    Redirect::to(back.path()).into_response()
}
