//! Builtin markup finisher backed by minify-html.
//!
//! Whitespace is minified per element context (inline text keeps its
//! separating spaces, `<pre>` and `<textarea>` stay verbatim), comments are
//! dropped unless kept, and `<style>` bodies are minified when enabled.
//! Script bodies are copied as they are: JavaScript minification is always
//! off here.

use anyhow::{Context, Result};
use minify_html::{Cfg, minify};

use super::{FinishOptions, Finisher};

pub struct MarkupFinisher {
    options: FinishOptions,
}

impl MarkupFinisher {
    pub fn new(options: FinishOptions) -> Self {
        Self { options }
    }

    fn cfg(&self) -> Cfg {
        let mut cfg = Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        cfg.keep_comments = !self.options.remove_comments;
        cfg.minify_css = self.options.minify_css;
        cfg.minify_js = false;
        cfg
    }
}

impl Finisher for MarkupFinisher {
    fn name(&self) -> &str {
        "builtin"
    }

    fn finish(&self, document: &str) -> Result<String> {
        // minify-html has no mode that keeps whitespace, so all-off means untouched.
        if self.options == FinishOptions::NONE {
            return Ok(document.to_string());
        }

        let minified = minify(document.as_bytes(), &self.cfg());
        String::from_utf8(minified).context("minified document is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish(html: &str) -> String {
        MarkupFinisher::new(FinishOptions::default())
            .finish(html)
            .unwrap()
    }

    #[test]
    fn test_block_whitespace_removed() {
        let html = "<!DOCTYPE html>\n<html>\n  <body>\n    <div>\n      <p>Hello   <b>big</b>   world</p>\n    </div>\n  </body>\n</html>\n";
        let out = finish(html);
        assert!(out.len() < html.len());
        assert!(out.contains("<p>Hello <b>big</b> world</p>"));
        assert!(!out.contains("\n    <div>"));
    }

    #[test]
    fn test_inline_script_keeps_text_spacing() {
        let out = finish("<p>Hello <script>x()</script> world</p>");
        assert!(out.contains("Hello <script>x()</script> world"));
    }

    #[test]
    fn test_comments_removed() {
        let out = finish("<div><p>a <!-- note --> b</p></div>");
        assert!(!out.contains("note"));
        assert!(out.contains("<p>a"));
    }

    #[test]
    fn test_comments_kept_when_disabled() {
        let finisher = MarkupFinisher::new(FinishOptions {
            remove_comments: false,
            ..FinishOptions::default()
        });
        let out = finisher.finish("<div><!-- note --></div>").unwrap();
        assert!(out.contains("<!-- note -->"));
    }

    #[test]
    fn test_script_body_untouched() {
        let body = "\n  var  a = 1;   // keep\n  /* and this */\n";
        let out = finish(&format!("<div>\n<script>{body}</script>\n</div>"));
        assert!(out.contains(&format!(">{body}</script>")));
    }

    #[test]
    fn test_escaped_closing_tag_untouched() {
        let body = "var s = '<\\/script>';";
        let out = finish(&format!("<body><script>{body}</script></body>"));
        assert!(out.contains(body));
    }

    #[test]
    fn test_style_minified() {
        let out = finish("<style>\n  p {\n    color: #ff0000;\n  }\n</style><p>x</p>");
        assert!(!out.contains("#ff0000"));
        assert!(!out.contains("\n    color"));
    }

    #[test]
    fn test_style_kept_when_disabled() {
        let finisher = MarkupFinisher::new(FinishOptions {
            minify_css: false,
            ..FinishOptions::default()
        });
        let out = finisher
            .finish("<style> p { color: #ff0000 } </style><p>x</p>")
            .unwrap();
        assert!(out.contains("p { color: #ff0000 }"));
    }

    #[test]
    fn test_pre_and_textarea_verbatim() {
        let out = finish("<div><pre>\n  a   b\n</pre><textarea>  x\n  y </textarea></div>");
        assert!(out.contains("  a   b\n</pre>"));
        assert!(out.contains("<textarea>  x\n  y </textarea>"));
    }

    #[test]
    fn test_all_off_is_identity() {
        let finisher = MarkupFinisher::new(FinishOptions::NONE);
        let html = "<html>\n <!-- c -->\n <style> a { } </style>\n</html>";
        assert_eq!(finisher.finish(html).unwrap(), html);
    }

    #[test]
    fn test_inline_spacing_preserved() {
        let out = finish("<p><span>a</span>\n<span>b</span></p>");
        assert!(out.contains("<span>a</span> <span>b</span>"));
    }
}
