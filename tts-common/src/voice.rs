//! Supported synthetic voices
//!
//! The conversion service accepts a fixed set of voice identifiers. Parsing is
//! exact on the identifier; anything outside the set is rejected before a
//! request is ever built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Voice identifier understood by the conversion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Voice {
    #[default]
    Amy,
    Brian,
    Joanna,
    Matthew,
    Aditi,
    Raveena,
    Mizuki,
    Hans,
}

impl Voice {
    /// Every supported voice, in display order
    pub const ALL: [Voice; 8] = [
        Voice::Amy,
        Voice::Brian,
        Voice::Joanna,
        Voice::Matthew,
        Voice::Aditi,
        Voice::Raveena,
        Voice::Mizuki,
        Voice::Hans,
    ];

    /// Identifier sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Voice::Amy => "Amy",
            Voice::Brian => "Brian",
            Voice::Joanna => "Joanna",
            Voice::Matthew => "Matthew",
            Voice::Aditi => "Aditi",
            Voice::Raveena => "Raveena",
            Voice::Mizuki => "Mizuki",
            Voice::Hans => "Hans",
        }
    }

    /// Human-readable label for the voice selector
    pub fn label(&self) -> &'static str {
        match self {
            Voice::Amy => "Amy (British English)",
            Voice::Brian => "Brian (British English)",
            Voice::Joanna => "Joanna (US English)",
            Voice::Matthew => "Matthew (US English)",
            Voice::Aditi => "Aditi (Indian English)",
            Voice::Raveena => "Raveena (Indian English)",
            Voice::Mizuki => "Mizuki (Japanese)",
            Voice::Hans => "Hans (German)",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .iter()
            .copied()
            .find(|voice| voice.name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unsupported voice: {}", s)))
    }
}
