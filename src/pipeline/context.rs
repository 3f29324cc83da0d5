//! Per-run state: the marker codec and the resolved-results map.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxHashMap;

use crate::script::Codec;

/// State owned by a single pipeline run.
///
/// Workers write resolved payloads concurrently; each region index is
/// written at most once.
#[derive(Debug)]
pub struct RunContext {
    codec: Codec,
    resolved: DashMap<usize, String>,
}

impl RunContext {
    /// Context with a nonce that does not occur in `document`.
    pub fn new(document: &str) -> Self {
        Self::with_codec(Codec::for_document(document))
    }

    pub fn with_codec(codec: Codec) -> Self {
        Self {
            codec,
            resolved: DashMap::new(),
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Record the final payload for region `index`.
    ///
    /// Returns false if the region was already resolved (the first value is kept).
    pub fn resolve(&self, index: usize, payload: String) -> bool {
        match self.resolved.entry(index) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(payload);
                true
            }
        }
    }

    /// Consume the context, returning the codec and the resolved payloads.
    pub fn into_parts(self) -> (Codec, FxHashMap<usize, String>) {
        let resolved = self.resolved.into_iter().collect();
        (self.codec, resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_resolve_once() {
        let ctx = RunContext::with_codec(Codec::with_nonce("ab"));
        assert!(ctx.resolve(0, "a".into()));
        assert!(!ctx.resolve(0, "b".into()));

        let (_, map) = ctx.into_parts();
        assert_eq!(map.get(&0).map(String::as_str), Some("a"));
        assert!(!map.contains_key(&1));
    }

    #[test]
    fn test_parallel_resolve() {
        let ctx = RunContext::new("");
        (0..256usize).into_par_iter().for_each(|i| {
            ctx.resolve(i, i.to_string());
        });
        let (_, map) = ctx.into_parts();
        assert_eq!(map.len(), 256);
        assert!((0..256usize).all(|i| map[&i] == i.to_string()));
    }
}
