//! Sign-in and sign-out routes

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use reqwest::Url;
use tracing::info;

use crate::error::UiResult;
use crate::guard::Route;
use crate::AppState;

async fn sign_in_url(state: &AppState) -> UiResult<Url> {
    Ok(state.session.sign_in_redirect().await?)
}

/// Redirect to the identity provider, or explain why that's impossible
pub(crate) async fn sign_in_response(state: &AppState) -> Response {
    match sign_in_url(state).await {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /login
///
/// User-initiated sign-in; always redirects. A session stuck in an
/// authentication error is restarted first.
pub async fn login(State(state): State<AppState>) -> Response {
    state.session.recover().await;
    sign_in_response(&state).await
}

/// GET|POST /logout
///
/// Ends the session, clears the form, and hands the browser to the
/// provider's hosted logout (or back to the root when there is none).
pub async fn logout(State(state): State<AppState>) -> Response {
    state.form.lock().await.reset();

    match state.session.sign_out_redirect().await {
        Some(url) => {
            info!("Redirecting to identity provider logout");
            Redirect::to(url.as_str()).into_response()
        }
        None => Redirect::to(Route::Root.path()).into_response(),
    }
}
