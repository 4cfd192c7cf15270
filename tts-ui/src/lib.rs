//! tts-ui library - Text to Speech user interface
//!
//! Single-user local service: the browser signs in through a hosted identity
//! provider, submits text and a voice, and gets back a playable, downloadable
//! audio file produced by the remote conversion service.

use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod error;
pub mod form;
pub mod guard;
pub mod session;
pub mod shell;

use client::Converter;
use form::ConversionForm;
use guard::RouteGuard;
use session::SessionProvider;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Owner of the one session of this application instance
    pub session: Arc<SessionProvider>,
    /// Conversion service adapter
    pub converter: Arc<dyn Converter>,
    /// The dashboard form; one instance, guarded by its own in-flight flag
    pub form: Arc<Mutex<ConversionForm>>,
    pub guard: Arc<Mutex<RouteGuard>>,
}

impl AppState {
    pub fn new(session: Arc<SessionProvider>, converter: Arc<dyn Converter>) -> Self {
        Self {
            session,
            converter,
            form: Arc::new(Mutex::new(ConversionForm::new())),
            guard: Arc::new(Mutex::new(RouteGuard::new())),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    // Pages (route guarded)
    let pages = Router::new()
        .route("/", get(api::root))
        .route("/dashboard", get(api::dashboard))
        .route("/recents", get(api::recents))
        .route("/convert", post(api::convert));

    // Session actions
    let auth = Router::new()
        .route("/login", get(api::login))
        .route("/logout", get(api::logout).post(api::logout));

    // Public routes (no session required)
    let public = Router::new()
        .route("/static/styles.css", get(api::serve_styles))
        .route("/api/voices", get(api::list_voices))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(pages)
        .merge(auth)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
