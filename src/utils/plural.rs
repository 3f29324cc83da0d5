//! Pluralization for log lines.

/// `1 script`, `3 scripts`, `0 scripts`.
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
