//! Conversion service API types
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Wire types for the remote conversion service
//! - Pure functions for interpreting its responses
//!
//! No HTTP client dependencies; the UI crate wraps these with `reqwest`.

pub mod types;

pub use types::{extract_error_message, ConvertRequest, ConvertResponse, VoiceOption};
