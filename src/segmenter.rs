//! Persona reply segmentation
//!
//! One completion carries several personas speaking in turn. Speaker markers
//! (`[Name]:`, optionally preceded by blank lines, colon optional) split the
//! text; every marker opens a segment that runs to the next marker or to the
//! end of the text.
//!
//! | input                    | output                         |
//! |--------------------------|--------------------------------|
//! | `[A]: hi\n\n[B]: yo`     | `(A, hi)`, `(B, yo)`           |
//! | `[A]: [B]: hello`        | `(B, hello)`                   |
//! | `[A] hi`                 | `(A, hi)`                      |
//! | `no markers at all`      | nothing (with `Drop`)          |
//! | `[A [B]]: x`             | `(A [B, ]: x)`                 |

#[cfg(test)]
mod proptests;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n*\[([^\]]+)\]:?[ \t\r\n]*").expect("valid regex"));

/// What to do with text that appears before the first speaker marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreamblePolicy {
    /// Unlabeled preambles are silently dropped
    #[default]
    Drop,
    /// A non-blank preamble becomes a first utterance without a speaker
    Surface,
}

impl PreamblePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Some(Self::Drop),
            "surface" => Some(Self::Surface),
            _ => None,
        }
    }
}

/// One persona line extracted from a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub speaker: Option<String>,
    pub text: String,
}

impl Utterance {
    #[allow(dead_code)] // Used in tests
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker.into()),
            text: text.into(),
        }
    }
}

/// Split a raw completion into ordered utterances.
///
/// Segments whose body is blank are dropped one by one, so consecutive
/// markers never merge into a multi-speaker entry. No reordering,
/// deduplication or roster check is performed.
pub fn segment(text: &str, policy: PreamblePolicy) -> Vec<Utterance> {
    let markers: Vec<_> = MARKER_RE.captures_iter(text).collect();
    let mut utterances = Vec::with_capacity(markers.len() + 1);

    if policy == PreamblePolicy::Surface {
        let preamble_end = markers
            .first()
            .and_then(|caps| caps.get(0))
            .map_or(text.len(), |m| m.start());
        let preamble = text.get(..preamble_end).unwrap_or_default().trim();
        if !preamble.is_empty() {
            utterances.push(Utterance {
                speaker: None,
                text: preamble.to_string(),
            });
        }
    }

    for (i, caps) in markers.iter().enumerate() {
        let (Some(marker), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let body_end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let body = text.get(marker.end()..body_end).unwrap_or_default().trim();
        if body.is_empty() {
            continue;
        }

        let label = label.as_str().trim();
        utterances.push(Utterance {
            speaker: (!label.is_empty()).then(|| label.to_string()),
            text: body.to_string(),
        });
    }

    utterances
}
