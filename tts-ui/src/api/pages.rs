//! Guarded page routes
//!
//! Every page goes through the route guard; its decision is turned into an
//! HTML page or a redirect. `303 See Other` is used for replace-navigation,
//! so the replaced URL never becomes a history entry.

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::api::auth::sign_in_response;
use crate::guard::{GuardAction, Route};
use crate::session::{CallbackParams, Profile, ProfileClaims, SessionStatus};
use crate::shell;
use crate::AppState;

/// GET /
pub async fn root(State(state): State<AppState>) -> Response {
    guarded(&state, Route::Root).await
}

/// GET /dashboard
///
/// Also the sign-in redirect URI: provider callbacks are completed here and
/// then bounced to the bare `/dashboard` URL.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.is_callback() {
        if state.session.status().await == SessionStatus::Authenticated {
            debug!("Ignoring stale sign-in callback for authenticated session");
        } else if let Err(e) = state.session.complete_sign_in(&params).await {
            // The session now carries the error; the guard renders it
            debug!("Sign-in callback failed: {}", e);
        }
        return Redirect::to(Route::Dashboard.path()).into_response();
    }

    guarded(&state, Route::Dashboard).await
}

/// GET /recents
pub async fn recents(State(state): State<AppState>) -> Response {
    guarded(&state, Route::Recents).await
}

async fn guarded(state: &AppState, route: Route) -> Response {
    state.session.ensure_fresh_token().await;
    let mut session = state.session.snapshot().await;
    let mut action = state.guard.lock().await.evaluate(&session, route);

    if action == GuardAction::Restart {
        state.session.recover().await;
        session = state.session.snapshot().await;
        action = state.guard.lock().await.evaluate(&session, route);
    }

    match action {
        GuardAction::ShowSpinner => Html(shell::render_spinner()).into_response(),
        GuardAction::RedirectToSignIn => sign_in_response(state).await,
        GuardAction::ShowRedirecting => Html(shell::render_redirecting()).into_response(),
        GuardAction::Replace(target) => Redirect::to(target.path()).into_response(),
        GuardAction::ShowError(message) => Html(shell::render_auth_error(&message)).into_response(),
        // Another request showed the error in between; let the browser ask again
        GuardAction::Restart => Redirect::to(route.path()).into_response(),
        GuardAction::Render(view) => {
            let profile = session
                .profile
                .clone()
                .unwrap_or_else(|| Profile::from_claims(&ProfileClaims::default()));
            let form = state.form.lock().await;
            Html(shell::render_dashboard(&profile, &form, view)).into_response()
        }
    }
}
