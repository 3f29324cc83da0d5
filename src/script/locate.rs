//! Script locator.
//!
//! Walks the token stream and records every `<script>` container as a
//! [`Region`]. A container is transformable unless it:
//!
//! - references an external file (`src` attribute, any value),
//! - declares a `type` other than `text/javascript` / `application/javascript`,
//! - has a whitespace-only body,
//! - is never closed.
//!
//! The resulting [`Extraction`] also holds a *shell*: the document with every
//! transformable payload cut out, plus the shell offset where each one was.

use crate::markup::{TokenKind, find_attribute, parse_attributes, tokenize};

use super::{Region, RegionKind, SkipReason};

/// `type` values treated as classic JavaScript (compared ASCII case-insensitively).
pub const SCRIPT_TYPES: [&str; 2] = ["text/javascript", "application/javascript"];

/// Where a transformable payload was removed from the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Region ordinal.
    pub index: usize,
    /// Byte offset in the shell.
    pub offset: usize,
}

/// Result of scanning a document for script containers.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// All script containers in document order.
    pub regions: Vec<Region>,
    /// The document with every transformable payload removed.
    pub shell: String,
    /// One slot per transformable region, ascending by offset.
    slots: Vec<Slot>,
}

impl Extraction {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Transformable regions in document order.
    pub fn transformable(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.is_transformable())
    }

    pub fn transformable_count(&self) -> usize {
        self.slots.len()
    }
}

/// Scan `document` for script containers.
pub fn locate(document: &str) -> Extraction {
    let mut regions = Vec::new();
    let mut slots = Vec::new();
    let mut shell = String::with_capacity(document.len());
    // Source offset up to which the shell has been copied.
    let mut copied = 0;

    let mut tokens = tokenize(document);
    while let Some(token) = tokens.next() {
        let TokenKind::StartTag(tag) = token.kind else {
            continue;
        };
        if tag.name != "script" {
            continue;
        }
        // A script start tag is always followed by its raw-text body.
        let Some(body) = tokens.next() else {
            break;
        };
        let TokenKind::RawText { closed, .. } = body.kind else {
            continue;
        };

        let payload = body.text(document);
        let kind = classify(tag.attrs, payload, closed);
        let index = regions.len();

        if matches!(kind, RegionKind::Transformable) {
            shell.push_str(&document[copied..body.span.start]);
            slots.push(Slot {
                index,
                offset: shell.len(),
            });
            copied = body.span.end;
        }

        regions.push(Region {
            index,
            attrs: tag.attrs.to_string(),
            payload: payload.to_string(),
            kind,
            span: body.span,
        });
    }
    shell.push_str(&document[copied..]);

    Extraction {
        regions,
        shell,
        slots,
    }
}

/// Decide whether a script container is transformable.
pub fn classify(attrs: &str, payload: &str, closed: bool) -> RegionKind {
    let parsed = parse_attributes(attrs);

    if find_attribute(&parsed, "src").is_some() {
        return RegionKind::PassThrough(SkipReason::External);
    }
    if let Some(ty) = find_attribute(&parsed, "type") {
        let ty = ty.trim();
        if !SCRIPT_TYPES.iter().any(|allowed| ty.eq_ignore_ascii_case(allowed)) {
            return RegionKind::PassThrough(SkipReason::ForeignType(ty.to_string()));
        }
    }
    if !closed {
        return RegionKind::PassThrough(SkipReason::Unterminated);
    }
    if payload.trim().is_empty() {
        return RegionKind::PassThrough(SkipReason::Empty);
    }
    RegionKind::Transformable
}
