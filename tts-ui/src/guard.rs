//! Authentication-driven routing
//!
//! [`RouteGuard`] decides, for every page request, what the user gets to see
//! given the session status. It fires the sign-in redirect once per entry
//! into `Unauthenticated`; later evaluations in the same unauthenticated
//! episode show a "redirecting" page instead of looping. An authentication
//! error is shown once; the next request (a reload) restarts the session.

use tracing::debug;

use crate::session::{Session, SessionStatus};

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Dashboard,
    Recents,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "" => Some(Route::Root),
            "/dashboard" => Some(Route::Dashboard),
            "/recents" => Some(Route::Recents),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Dashboard => "/dashboard",
            Route::Recents => "/recents",
        }
    }
}

/// What to do with a page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    /// Provider still bootstrapping; show a neutral waiting page
    ShowSpinner,
    /// Send the browser to the identity provider
    RedirectToSignIn,
    /// Sign-in redirect already issued for this episode
    ShowRedirecting,
    /// Navigate without leaving a history entry
    Replace(Route),
    /// Authentication error display, until the user reloads
    ShowError(String),
    /// Error already shown; rerun the session bootstrap and evaluate again
    Restart,
    Render(Route),
}

/// Route guard state
#[derive(Debug, Default)]
pub struct RouteGuard {
    sign_in_requested: bool,
    error_shown: bool,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, session: &Session, route: Route) -> GuardAction {
        if session.status != SessionStatus::Unauthenticated {
            self.sign_in_requested = false;
        }
        if session.status != SessionStatus::Error {
            self.error_shown = false;
        }

        let action = match session.status {
            SessionStatus::Loading => GuardAction::ShowSpinner,
            SessionStatus::Unauthenticated => {
                if self.sign_in_requested {
                    GuardAction::ShowRedirecting
                } else {
                    self.sign_in_requested = true;
                    GuardAction::RedirectToSignIn
                }
            }
            SessionStatus::Error if self.error_shown => {
                self.error_shown = false;
                GuardAction::Restart
            }
            SessionStatus::Error => {
                self.error_shown = true;
                GuardAction::ShowError(
                    session
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                )
            }
            SessionStatus::Authenticated => match route {
                Route::Root => GuardAction::Replace(Route::Dashboard),
                other => GuardAction::Render(other),
            },
        };

        debug!(status = ?session.status, ?route, ?action, "Route guard decision");
        action
    }
}
