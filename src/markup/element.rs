//! HTML element classification and attribute parsing.
//!
//! - `is_raw_text_element()` / `is_escapable_raw_text_element()` - elements
//!   whose body is not tokenized as markup
//! - `parse_attributes()` - attribute string parsing

// =============================================================================
// Element Classification
// =============================================================================

/// Check if tag is a raw text element (content is opaque to the tokenizer).
///
/// HTML standard: script and style content is "raw text".
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

/// Check if tag is an escapable raw text element.
///
/// HTML standard: textarea and title are "escapable raw text".
#[inline]
pub fn is_escapable_raw_text_element(tag: &str) -> bool {
    matches!(tag, "textarea" | "title")
}

/// Check if tag body ends only at its own closing tag.
#[inline]
pub fn has_opaque_body(tag: &str) -> bool {
    is_raw_text_element(tag) || is_escapable_raw_text_element(tag)
}

// =============================================================================
// Attribute Parsing
// =============================================================================

/// Parse HTML-style attributes from a raw attribute string.
///
/// Names are ASCII-lowercased, values are kept as written.
///
/// Input: `type="text/javascript" SRC='a.js' defer`
/// Output: `vec![("type", "text/javascript"), ("src", "a.js"), ("defer", "")]`
pub fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == '/' {
            continue;
        }

        // Read attribute name
        let mut name = String::new();
        name.push(c.to_ascii_lowercase());
        while let Some(&next) = chars.peek() {
            if next == '=' || next == '/' || next.is_whitespace() {
                break;
            }
            name.push(next.to_ascii_lowercase());
            chars.next();
        }

        // Skip whitespace
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        if chars.peek() != Some(&'=') {
            // Boolean attribute (no value)
            attrs.push((name, String::new()));
            continue;
        }
        chars.next(); // consume '='

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        attrs.push((name, value));
    }

    attrs
}

/// Look up an attribute value by (lowercase) name. First occurrence wins.
pub fn find_attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}
