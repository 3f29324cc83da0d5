//! Span-preserving HTML tokenizer.
//!
//! Splits a document into text, comments, declarations, tags and raw-text
//! bodies without building a tree. Every token carries the byte span it was
//! read from, so callers can splice the source without re-serializing it:
//! concatenating `&source[token.span]` for all tokens yields the input.
//!
//! Bodies of `script`, `style`, `textarea` and `title` are emitted as a single
//! [`TokenKind::RawText`] token that ends at the first matching closing tag,
//! the way a browser's tokenizer switches into raw-text state.

use std::ops::Range;

use super::element::has_opaque_body;

/// A token and the byte range it covers in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// Character data between tags.
    Text,
    /// `<!-- ... -->`
    Comment,
    /// `<!DOCTYPE ...>`, `<![CDATA[...]]>`, `<?...>`
    Declaration,
    StartTag(Tag<'a>),
    EndTag { name: String },
    /// Body of a raw-text element. `closed` is false when the document ended
    /// before the element's closing tag.
    RawText { element: String, closed: bool },
}

/// A parsed start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// ASCII-lowercased tag name.
    pub name: String,
    /// Raw attribute text between the tag name and the closing `>` / `/>`.
    /// The trailing `/` of `<x/>` is excluded; HTML ignores it on normal elements.
    pub attrs: &'a str,
}

impl<'a> Token<'a> {
    /// Source text of this token.
    #[inline]
    pub fn text(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }
}

/// Iterator over the tokens of an HTML document.
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
    /// Element whose raw-text body comes next.
    pending_raw: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            pending_raw: None,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.source.as_bytes()
    }

    fn raw_text(&mut self, element: String) -> Token<'a> {
        let start = self.pos;
        let (end, closed) = match find_closing_tag(self.source, start, &element) {
            Some(close) => (close, true),
            None => (self.source.len(), false),
        };
        self.pos = end;
        Token {
            kind: TokenKind::RawText { element, closed },
            span: start..end,
        }
    }

    fn text(&mut self) -> Token<'a> {
        let start = self.pos;
        let bytes = self.bytes();
        let mut end = start + 1;
        while end < bytes.len() {
            if bytes[end] == b'<' && starts_markup(bytes, end) {
                break;
            }
            end += 1;
        }
        self.pos = end;
        Token {
            kind: TokenKind::Text,
            span: start..end,
        }
    }

    fn markup(&mut self) -> Token<'a> {
        let start = self.pos;
        let bytes = self.bytes();

        let (kind, end) = if bytes[start..].starts_with(b"<!--") {
            let end = find_from(self.source, start + 4, "-->").map_or(bytes.len(), |i| i + 3);
            (TokenKind::Comment, end)
        } else if matches!(bytes[start + 1], b'!' | b'?') {
            let end = find_byte(bytes, start + 2, b'>').map_or(bytes.len(), |i| i + 1);
            (TokenKind::Declaration, end)
        } else if bytes[start + 1] == b'/' {
            let name_start = start + 2;
            let name_end = scan_name(bytes, name_start);
            let name = self.source[name_start..name_end].to_ascii_lowercase();
            let end = find_byte(bytes, name_end, b'>').map_or(bytes.len(), |i| i + 1);
            (TokenKind::EndTag { name }, end)
        } else {
            let (tag, end) = self.start_tag(start);
            if has_opaque_body(&tag.name) {
                self.pending_raw = Some(tag.name.clone());
            }
            (TokenKind::StartTag(tag), end)
        };

        self.pos = end;
        Token {
            kind,
            span: start..end,
        }
    }

    /// Parse a start tag beginning at `start` (the `<`). Quoted attribute
    /// values may contain `>`; an unterminated tag runs to end of input.
    fn start_tag(&self, start: usize) -> (Tag<'a>, usize) {
        let bytes = self.bytes();
        let name_start = start + 1;
        let name_end = scan_name(bytes, name_start);
        let name = self.source[name_start..name_end].to_ascii_lowercase();

        let mut i = name_end;
        let (attrs_end, end) = loop {
            let Some(&b) = bytes.get(i) else {
                break (bytes.len(), bytes.len());
            };
            match b {
                b'>' => break (i, i + 1),
                b'/' if bytes.get(i + 1) == Some(&b'>') => break (i, i + 2),
                b'"' | b'\'' => {
                    i = find_byte(bytes, i + 1, b).map_or(bytes.len(), |q| q + 1);
                }
                _ => i += 1,
            }
        };

        let tag = Tag {
            name,
            attrs: &self.source[name_end..attrs_end],
        };
        (tag, end)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(element) = self.pending_raw.take() {
            return Some(self.raw_text(element));
        }
        if self.pos >= self.source.len() {
            return None;
        }
        if starts_markup(self.bytes(), self.pos) {
            Some(self.markup())
        } else {
            Some(self.text())
        }
    }
}

/// Tokenize a whole document.
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer::new(source)
}

// ============================================================================
// Scanning helpers
// ============================================================================

/// Whether the `<` at `i` opens a tag, comment or declaration.
fn starts_markup(bytes: &[u8], i: usize) -> bool {
    if bytes.get(i) != Some(&b'<') {
        return false;
    }
    match bytes.get(i + 1) {
        Some(b) if b.is_ascii_alphabetic() => true,
        Some(b'!' | b'?') => true,
        Some(b'/') => bytes.get(i + 2).is_some_and(u8::is_ascii_alphabetic),
        _ => false,
    }
}

/// End of a tag name starting at `start`.
fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && !matches!(bytes[i], b'>' | b'/') && !bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|p| p + from)
}

fn find_from(source: &str, from: usize, needle: &str) -> Option<usize> {
    source.get(from..)?.find(needle).map(|p| p + from)
}

/// Find `</name` (case-insensitive) at or after `from`, followed by
/// whitespace, `/`, `>` or end of input. Returns the offset of the `<`.
pub fn find_closing_tag(source: &str, from: usize, name: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let name = name.as_bytes();
    let mut search = from;

    while let Some(i) = find_from(source, search, "</") {
        let name_start = i + 2;
        let name_end = name_start + name.len();
        if name_end <= bytes.len() && bytes[name_start..name_end].eq_ignore_ascii_case(name) {
            match bytes.get(name_end) {
                None => return Some(i),
                Some(b) if b.is_ascii_whitespace() || matches!(b, b'/' | b'>') => return Some(i),
                _ => {}
            }
        }
        search = i + 2;
    }
    None
}
