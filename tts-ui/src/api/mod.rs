//! HTTP handlers for tts-ui

pub mod auth;
pub mod buildinfo;
pub mod convert;
pub mod health;
pub mod pages;
pub mod ui;

pub use auth::{login, logout};
pub use buildinfo::get_build_info;
pub use convert::convert;
pub use health::health_routes;
pub use pages::{dashboard, recents, root};
pub use ui::{list_voices, serve_styles};
