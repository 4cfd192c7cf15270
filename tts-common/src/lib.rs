//! # Text to Speech Common Library
//!
//! Shared code for the text-to-speech client service:
//! - Error types
//! - Configuration loading and resolution
//! - Voice enumeration
//! - Conversion service wire types

pub mod api;
pub mod config;
pub mod error;
pub mod voice;

pub use error::{Error, Result};
pub use voice::Voice;
