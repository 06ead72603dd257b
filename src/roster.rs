//! Persona roster loaded once at startup
//!
//! The roster text is injected verbatim into the persona instructions; the
//! per-line persona entries are only extracted for listing.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Built-in cast used when no roster file is configured
const DEFAULT_ROSTER: &str = include_str!("../personas/default.txt");

/// `1. [Name]: traits` or `[Name]: traits`
static PERSONA_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+[.)]\s*)?\[([^\]]+)\]\s*:?\s*(.*)$").expect("valid regex")
});

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Roster file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Roster is empty")]
    Empty,
}

/// A configured chat participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub name: String,
    pub traits: String,
}

/// Where the roster text comes from
#[derive(Debug, Clone)]
pub enum RosterSource {
    BuiltIn,
    File(PathBuf),
}

/// Immutable persona registry, shared read-only across sessions
#[derive(Debug, Clone)]
pub struct Roster {
    text: String,
    personas: Vec<Persona>,
}

impl Roster {
    pub fn load(source: &RosterSource) -> Result<Self, RosterError> {
        match source {
            RosterSource::BuiltIn => Self::from_text(DEFAULT_ROSTER),
            RosterSource::File(path) => Self::from_file(path),
        }
    }

    fn from_file(path: &Path) -> Result<Self, RosterError> {
        let text = std::fs::read_to_string(path).map_err(|source| RosterError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, RosterError> {
        if text.trim().is_empty() {
            return Err(RosterError::Empty);
        }

        let personas = text
            .lines()
            .filter_map(|line| PERSONA_LINE_RE.captures(line))
            .map(|caps| Persona {
                name: caps[1].trim().to_string(),
                traits: caps[2].trim().to_string(),
            })
            .collect();

        Ok(Self {
            text: text.to_string(),
            personas,
        })
    }

    /// Raw roster text, as configured
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }
}
