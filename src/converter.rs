//! Markdown to HTML conversion pipeline
use std::collections::HashMap;
use unicode_casefold::UnicodeCaseFold;

use crate::config::ConverterOptions;
use crate::escape;
use crate::hooks::{HookCollection, HookPoint};
use crate::sanitizer;

/// Converts Markdown to HTML.
///
/// The converter itself only holds hooks and options. All per-document state
/// lives in a [`ConversionContext`] built for each call, so one instance can
/// serve any number of calls, including from several threads.
#[derive(Debug, Default)]
pub struct Converter {
    hooks: HookCollection,
    options: ConverterOptions,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A converter whose output is run through the whitelist sanitizer and
    /// the tag balancer.
    pub fn sanitizing() -> Self {
        Self::with_options(ConverterOptions::untrusted())
    }

    pub fn with_options(options: ConverterOptions) -> Self {
        let mut hooks = HookCollection::new();
        if options.sanitize {
            hooks.chain(HookPoint::PostConversion, sanitizer::sanitize_html);
        }
        if options.balance_tags {
            hooks.chain(HookPoint::PostConversion, sanitizer::balance_tags);
        }
        Converter { hooks, options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    pub fn hooks(&self) -> &HookCollection {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookCollection {
        &mut self.hooks
    }

    /// Convert `text` to an HTML fragment.
    pub fn convert(&self, text: &str) -> String {
        let input_len = text.len();
        let text = self.hooks.run(HookPoint::PreConversion, text);

        // `~` and `$` are taken over by the placeholder and escape codes
        let text = text.replace('~', "~T").replace('$', "~D");

        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let text = escape::detab(&format!("\n\n{text}\n\n"));
        let text = escape::blank_whitespace_lines(&text);

        let mut ctx = ConversionContext::new(&self.hooks, &self.options);
        let text = ctx.hash_html_blocks(&text);
        let text = ctx.strip_link_definitions(&text);
        let text = ctx.run_block_gamut(&text, false);

        log::debug!(
            "converted {} bytes: {} link definitions, {} html blocks",
            input_len,
            ctx.links.len(),
            ctx.html_blocks.len()
        );

        let text = escape::unescape_special_chars(&text);
        let text = text.replace("~D", "$").replace("~T", "~");

        self.hooks.run(HookPoint::PostConversion, &text)
    }
}

/// A resolved `[id]: url "title"` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkReference {
    pub url: String,
    pub title: Option<String>,
}

/// State shared by the passes of a single conversion.
pub(crate) struct ConversionContext<'a> {
    pub hooks: &'a HookCollection,
    pub options: &'a ConverterOptions,
    /// Link definitions keyed by case-folded id
    pub links: HashMap<String, LinkReference>,
    /// Verbatim HTML, referenced from the text as `~K<index>K`
    pub html_blocks: Vec<String>,
    /// How many lists enclose the text being processed
    pub list_depth: usize,
}

impl<'a> ConversionContext<'a> {
    pub fn new(hooks: &'a HookCollection, options: &'a ConverterOptions) -> Self {
        ConversionContext {
            hooks,
            options,
            links: HashMap::new(),
            html_blocks: Vec::new(),
            list_depth: 0,
        }
    }

    pub fn define_link(&mut self, id: &str, reference: LinkReference) {
        self.links.insert(fold_link_id(id), reference);
    }

    pub fn lookup_link(&self, id: &str) -> Option<&LinkReference> {
        self.links.get(&fold_link_id(id))
    }
}

/// Link ids match case-insensitively; line breaks inside an id count as a space.
pub(crate) fn fold_link_id(id: &str) -> String {
    let id = id.replace(" \n", " ").replace('\n', " ");
    id.chars().case_fold().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(Converter::new().convert(""), "");
    }

    #[test]
    fn test_whitespace_only_input() {
        assert_eq!(Converter::new().convert("  \n\t\n"), "");
    }

    #[test]
    fn test_crlf_is_normalized() {
        assert_eq!(Converter::new().convert("a\r\nb\r\rc"), "<p>a\nb</p>\n\n<p>c</p>");
    }

    #[test]
    fn test_link_ids_fold_case() {
        assert_eq!(fold_link_id("Foo BAR"), "foo bar");
        assert_eq!(fold_link_id("two\nlines"), "two lines");
        assert_eq!(fold_link_id("two \nlines"), "two lines");
    }

    #[test]
    fn test_pre_and_post_hooks() {
        let mut converter = Converter::new();
        converter
            .hooks_mut()
            .chain(HookPoint::PreConversion, |t| t.replace(":)", "smile"));
        converter
            .hooks_mut()
            .chain(HookPoint::PostConversion, |t| t.replace("<p>", "<p class=\"post\">"));
        assert_eq!(converter.convert("hi :)"), "<p class=\"post\">hi smile</p>");
    }

    #[test]
    fn test_plain_link_text_hook() {
        let mut converter = Converter::new();
        converter
            .hooks_mut()
            .set(HookPoint::PlainLinkText, |url| url.trim_start_matches("http://").to_string());
        assert_eq!(
            converter.convert("<http://example.com>"),
            "<p><a href=\"http://example.com\">example.com</a></p>"
        );
    }

    #[test]
    fn test_sanitizing_converter_strips_script() {
        let converter = Converter::sanitizing();
        assert_eq!(converter.convert("<script>alert(1)</script>"), "alert(1)");
    }

    #[test]
    fn test_script_urls_are_defused() {
        let converter = Converter::new();
        assert_eq!(
            converter.convert("[x](javascript:alert(1))"),
            "<p><a href=\"javascript%3aalert%281%29\">x</a></p>"
        );
        assert_eq!(
            converter.convert("![a](javascript:x)"),
            "<p><img src=\"javascript%3ax\" alt=\"a\" /></p>"
        );
        assert_eq!(
            converter.convert("[x](data:text/html,hi)"),
            "<p><a href=\"data%3atext/html,hi\">x</a></p>"
        );
    }

    #[test]
    fn test_email_autolinks_can_be_disabled() {
        let options = ConverterOptions {
            email_autolinks: false,
            ..ConverterOptions::default()
        };
        let html = Converter::with_options(options).convert("<me@example.com>");
        assert!(!html.contains("mailto:"));
    }

    #[test]
    fn test_converter_is_reusable() {
        let converter = Converter::new();
        let first = converter.convert("[a][x]\n\n[x]: /one");
        let second = converter.convert("[a][x]");
        assert_eq!(first, "<p><a href=\"/one\">a</a></p>");
        assert_eq!(second, "<p>[a][x]</p>");
    }

    #[test]
    fn test_converter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Converter>();
    }
}
