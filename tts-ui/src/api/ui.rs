//! Static assets and UI metadata

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tts_common::api::VoiceOption;
use tts_common::Voice;

const STYLES_CSS: &str = include_str!("../../ui/styles.css");

/// GET /static/styles.css
pub async fn serve_styles() -> Response {
    (
        StatusCode::OK,
        [("content-type", "text/css; charset=utf-8")],
        STYLES_CSS,
    )
        .into_response()
}

/// GET /api/voices
pub async fn list_voices() -> Json<Vec<VoiceOption>> {
    Json(Voice::ALL.into_iter().map(VoiceOption::from).collect())
}
