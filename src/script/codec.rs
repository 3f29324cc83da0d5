//! Placeholder codec.
//!
//! Each transformable payload is replaced by a marker of the form
//! `__SCRIPTVEIL_<nonce>_<index>__`. The nonce is random per run and is
//! rejected if the source document already contains it, so decoding can
//! only ever match markers this codec wrote.

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::locate::Extraction;
use crate::pipeline::PipelineError;

pub const MARKER_PREFIX: &str = "__SCRIPTVEIL_";
const MARKER_SUFFIX: &str = "__";

/// Marker encoder/decoder bound to one run nonce.
#[derive(Debug, Clone)]
pub struct Codec {
    nonce: String,
    pattern: Regex,
}

impl Codec {
    /// Create a codec with a fresh nonce that does not occur in `document`.
    pub fn for_document(document: &str) -> Self {
        loop {
            let nonce = hex::encode(rand::random::<[u8; 8]>());
            if !document.contains(&format!("{MARKER_PREFIX}{nonce}")) {
                return Self::with_nonce(nonce);
            }
        }
    }

    /// Create a codec with a fixed nonce. `nonce` must be lowercase hex.
    pub fn with_nonce(nonce: impl Into<String>) -> Self {
        let nonce = nonce.into();
        debug_assert!(nonce.bytes().all(|b| b.is_ascii_hexdigit()));
        // Every literal part is escaped, so the pattern always compiles.
        let pattern = Regex::new(&format!(
            "{}{}_([0-9]+){}",
            regex::escape(MARKER_PREFIX),
            regex::escape(&nonce),
            regex::escape(MARKER_SUFFIX),
        ))
        .unwrap();
        Self { nonce, pattern }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Marker text for region `index`.
    pub fn marker(&self, index: usize) -> String {
        format!("{MARKER_PREFIX}{}_{index}{MARKER_SUFFIX}", self.nonce)
    }

    /// Insert a marker into every payload slot of the extraction shell.
    pub fn encode(&self, extraction: &Extraction) -> String {
        let shell = &extraction.shell;
        let mut out = String::with_capacity(shell.len() + extraction.slots().len() * 40);
        let mut copied = 0;

        for slot in extraction.slots() {
            out.push_str(&shell[copied..slot.offset]);
            out.push_str(&self.marker(slot.index));
            copied = slot.offset;
        }
        out.push_str(&shell[copied..]);
        out
    }

    /// Replace every marker in `encoded` with its resolved payload.
    ///
    /// Fails if a marker has no resolved payload, or if a resolved payload
    /// has no marker to go into.
    pub fn decode(
        &self,
        encoded: &str,
        resolved: &FxHashMap<usize, String>,
    ) -> Result<String, PipelineError> {
        let extra: usize = resolved.values().map(String::len).sum();
        let mut out = String::with_capacity(encoded.len() + extra);
        let mut seen = FxHashSet::default();
        let mut copied = 0;

        for caps in self.pattern.captures_iter(encoded) {
            let (Some(whole), Ok(index)) = (caps.get(0), caps[1].parse::<usize>()) else {
                continue;
            };
            let payload = resolved
                .get(&index)
                .ok_or(PipelineError::MissingResolvedResult { index })?;

            out.push_str(&encoded[copied..whole.start()]);
            out.push_str(payload);
            copied = whole.end();
            seen.insert(index);
        }
        out.push_str(&encoded[copied..]);

        if let Some(&index) = resolved.keys().filter(|i| !seen.contains(i)).min() {
            return Err(PipelineError::MarkerMissing { index });
        }
        Ok(out)
    }
}
