//! Closing-tag guard for re-embedded script payloads.
//!
//! A transformed payload containing `</script` would end its container early
//! once written back into the document. Every such sequence is rewritten to
//! `<\/script`, which is no longer a closing tag to the HTML tokenizer.
//!
//! Inside string and template literals the escape reads as the same text.
//! Elsewhere it is not guaranteed to: in a regex literal `\/` is still `/`,
//! but an expression such as `a </script/ b` outside any literal changes
//! meaning or stops parsing. Obfuscator output only carries the sequence in
//! literals in practice.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// ASCII case-insensitive, matching how the HTML tokenizer compares tag names.
static CLOSING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)</(script)").unwrap());

/// Escape every `</script` (any case) in `payload`.
///
/// Borrows when there is nothing to escape. Applying it twice yields the
/// same text as applying it once.
#[inline]
pub fn escape_closing_tag(payload: &str) -> Cow<'_, str> {
    CLOSING_TAG.replace_all(payload, r"<\/$1")
}
