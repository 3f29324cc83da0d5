//! Inline script extraction and reinsertion.
//!
//! ```text
//! document ──locate──▶ Extraction ──encode──▶ marked document
//!                                                   │
//!           transformed payloads ──guard──▶ decode ◀┘──▶ assembled document
//! ```
//!
//! | Module   | Purpose                                               |
//! |----------|-------------------------------------------------------|
//! | `locate` | Find `<script>` containers and classify them          |
//! | `codec`  | Marker generation, encode and decode                  |
//! | `guard`  | Neutralize `</script` inside transformed payloads     |

pub mod codec;
pub mod guard;
pub mod locate;

pub use codec::Codec;
pub use guard::escape_closing_tag;
pub use locate::{Extraction, locate};

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// One `<script>` occurrence in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Ordinal position among all script containers, starting at 0.
    pub index: usize,
    /// Raw attribute text of the start tag, exactly as written.
    pub attrs: String,
    /// Raw body text between the start and end tags.
    pub payload: String,
    pub kind: RegionKind,
    /// Byte range of `payload` in the source document.
    pub span: Range<usize>,
}

impl Region {
    #[inline]
    pub fn is_transformable(&self) -> bool {
        matches!(self.kind, RegionKind::Transformable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum RegionKind {
    Transformable,
    PassThrough(SkipReason),
}

/// Why a script container is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Has a `src` attribute.
    External,
    /// Declares a `type` outside the JavaScript allow-list.
    ForeignType(String),
    /// Body is empty or whitespace only.
    Empty,
    /// Document ends before `</script>`.
    Unterminated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::ForeignType(ty) => write!(f, "type={ty}"),
            Self::Empty => write!(f, "empty"),
            Self::Unterminated => write!(f, "unterminated"),
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transformable => write!(f, "transform"),
            Self::PassThrough(reason) => write!(f, "skip ({reason})"),
        }
    }
}
