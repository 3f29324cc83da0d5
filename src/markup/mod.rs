//! Markup scanning primitives for the script locator.
//!
//! | Module      | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `tokenizer` | Span-preserving HTML tokenizer                   |
//! | `element`   | Element classification and attribute parsing     |

pub mod element;
pub mod tokenizer;

pub use element::{find_attribute, parse_attributes};
pub use tokenizer::{TokenKind, tokenize};
