//! Block gamut: passes that work on whole lines and paragraphs
use fancy_regex::Regex as FancyRegex;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::converter::{ConversionContext, LinkReference};
use crate::escape;
use crate::pattern::{self, group};

/// Block element at column 0 whose closing tag also sits at column 0, so an
/// indented inner element of the same name does not end it early.
static NESTED_HTML_BLOCK: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(
        r"(?m)^(<(p|div|h[1-6]|blockquote|pre|table|dl|ol|ul|script|noscript|form|fieldset|iframe|math|ins|del)\b[^\r]*?\n</\2>[ \t]*(?=\n+))",
    )
    .unwrap()
});

/// Block element that closes at the end of a line.
static LIBERAL_HTML_BLOCK: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(
        r"(?m)^(<(p|div|h[1-6]|blockquote|pre|table|dl|ol|ul|script|noscript|form|fieldset|iframe|math)\b[^\r]*?.*</\2>[ \t]*(?=\n+)\n)",
    )
    .unwrap()
});

static HR_HTML_BLOCK: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"\n[ ]{0,3}((<(hr)\b([^<>])*?/?>)[ \t]*(?=\n{2,}))").unwrap());

static COMMENT_HTML_BLOCK: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(r"\n\n[ ]{0,3}(<!(--(?:(?:[^>-]|-[^>])(?:[^-]|-[^-])*)?--)>[ \t]*(?=\n{2,}))").unwrap()
});

/// `<? ... ?>` and `<% ... %>`
static PROCESSING_HTML_BLOCK: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"(?:\n\n)([ ]{0,3}(?:<([?%])[^\r]*?\2>)[ \t]*(?=\n{2,}))").unwrap());

// [id]: url "optional title"
//   $1: id, $2: url, $3: title with its lead-in, $4: blank lines before the title, $5: title
static LINK_DEFINITION: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(
        r#"(?m)^[ ]{0,3}\[(.+)\]:[ \t]*\n?[ \t]*<?(\S+?)>?(?=\s|$)[ \t]*\n?[ \t]*((\n*)["(](.+?)[")][ \t]*)?(?:\n+)"#,
    )
    .unwrap()
});

static SETEXT_H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(.+)[ \t]*\n=+[ \t]*\n+").unwrap());
static SETEXT_H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(.+)[ \t]*\n-+[ \t]*\n+").unwrap());
static ATX_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]*(.+?)[ \t]*#*\n+").unwrap());

static HR_STARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ ]{0,2}([ ]?\*[ ]?){3,}[ \t]*$").unwrap());
static HR_DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ ]{0,2}([ ]?-[ ]?){3,}[ \t]*$").unwrap());
static HR_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ ]{0,2}([ ]?_[ ]?){3,}[ \t]*$").unwrap());

// A list outside any other list must follow a blank line or open the document.
//   $1: run-up, $2: whole list, $3: first marker with indent, $4: first marker
static TOP_LEVEL_LIST: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(
        r"(\n\n|^\n?)(([ ]{0,3}([*+-]|\d+[.])[ \t]+)[^\r]+?(~0|\n{2,}(?=\S)(?![ \t]*(?:[*+-]|\d+[.])[ \t]+)))",
    )
    .unwrap()
});

//   $1: whole list, $2: first marker with indent, $3: first marker
static NESTED_LIST: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(
        r"(?m)^(([ ]{0,3}([*+-]|\d+[.])[ \t]+)[^\r]+?(~0|\n{2,}(?=\S)(?![ \t]*(?:[*+-]|\d+[.])[ \t]+)))",
    )
    .unwrap()
});

// One item; the next item must repeat the indent ($1) and the marker kind.
//   $1: indent, $2: marker, $3: item text
static UNORDERED_ITEM: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(r"(?m)(^[ \t]*)([*+-])[ \t]+([^\r]+?(\n+))(?=(~0|\1([*+-])[ \t]+))").unwrap()
});
static ORDERED_ITEM: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(r"(?m)(^[ \t]*)(\d+[.])[ \t]+([^\r]+?(\n+))(?=(~0|\1(\d+[.])[ \t]+))").unwrap()
});

static TRAILING_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}$").unwrap());

//   $1: code lines, $2: first character after the block (or nothing before the sentinel)
static CODE_BLOCK: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(r"(?:\n\n|^\n?)((?:(?:[ ]{4}|\t).*\n+)+)(\n*[ ]{0,3}[^ \t\n]|(?=~0))").unwrap()
});

static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)((^[ \t]*>[ \t]?.+\n(.+\n)*\n*)+)").unwrap());
static QUOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").unwrap());
static PRE_IN_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\s*<pre>[^\r]+?</pre>)").unwrap());
static QUOTE_INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^  ").unwrap());

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());
static HTML_BLOCK_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~K(\d+)K").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn from_marker(marker: &str) -> Self {
        if marker.contains(['*', '+', '-']) {
            ListKind::Unordered
        } else {
            ListKind::Ordered
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }

    fn item_pattern(self) -> &'static FancyRegex {
        match self {
            ListKind::Unordered => &UNORDERED_ITEM,
            ListKind::Ordered => &ORDERED_ITEM,
        }
    }
}

impl ConversionContext<'_> {
    /// Shield raw block-level HTML from the passes that follow by swapping it
    /// for a `~K<n>K` placeholder.
    pub(crate) fn hash_html_blocks(&mut self, text: &str) -> String {
        let text = pattern::replace_all(&NESTED_HTML_BLOCK, text, |caps| self.hash_block(group(caps, 1)));
        let text = pattern::replace_all(&LIBERAL_HTML_BLOCK, &text, |caps| self.hash_block(group(caps, 1)));
        let text = pattern::replace_all(&HR_HTML_BLOCK, &text, |caps| self.hash_block(group(caps, 1)));
        let text = pattern::replace_all(&COMMENT_HTML_BLOCK, &text, |caps| self.hash_block(group(caps, 1)));
        pattern::replace_all(&PROCESSING_HTML_BLOCK, &text, |caps| self.hash_block(group(caps, 1)))
    }

    pub(crate) fn hash_block(&mut self, html: &str) -> String {
        self.html_blocks.push(html.trim_matches('\n').to_string());
        format!("\n\n~K{}K\n\n", self.html_blocks.len() - 1)
    }

    /// Record `[id]: url "title"` lines and remove them from the text.
    pub(crate) fn strip_link_definitions(&mut self, text: &str) -> String {
        pattern::replace_all(&LINK_DEFINITION, text, |caps| {
            let id = group(caps, 1);
            let url = escape::encode_amps_and_angles(group(caps, 2));

            if !group(caps, 4).is_empty() {
                // a blank line separates it from the url, so it was never a title
                self.define_link(id, LinkReference { url, title: None });
                return format!("{}\n\n", group(caps, 3));
            }

            let title = caps.get(5).map(|m| m.as_str().replace('"', "&quot;"));
            log::trace!("link definition [{}]: {}", id, url);
            self.define_link(id, LinkReference { url, title });
            String::new()
        })
    }

    /// Run every block-level pass over `text`.
    ///
    /// Loose list items pass `do_not_unhash` so their placeholders survive
    /// until the enclosing paragraph pass restores them.
    pub(crate) fn run_block_gamut(&mut self, text: &str, do_not_unhash: bool) -> String {
        let text = self.do_headers(text);
        let text = do_horizontal_rules(&text);
        let text = self.do_lists(&text, false);
        let text = self.do_code_blocks(&text);
        let text = self.do_block_quotes(&text);

        // hash what the passes above produced so it is not wrapped in <p>
        let text = self.hash_html_blocks(&text);
        self.form_paragraphs(&text, do_not_unhash)
    }

    fn do_headers(&self, text: &str) -> String {
        let text = SETEXT_H1.replace_all(text, |caps: &Captures| {
            format!("<h1>{}</h1>\n\n", self.run_span_gamut(&caps[1]))
        });
        let text = SETEXT_H2.replace_all(&text, |caps: &Captures| {
            format!("<h2>{}</h2>\n\n", self.run_span_gamut(&caps[1]))
        });
        let text = ATX_HEADER.replace_all(&text, |caps: &Captures| {
            let level = caps[1].len();
            format!("<h{level}>{}</h{level}>\n\n", self.run_span_gamut(&caps[2]))
        });
        text.into_owned()
    }

    pub(crate) fn do_lists(&mut self, text: &str, inside_paragraphless_item: bool) -> String {
        // sentinel standing in for end-of-text
        let text = format!("{text}~0");

        let text = if self.list_depth > 0 {
            pattern::replace_all(&NESTED_LIST, &text, |caps| {
                let kind = ListKind::from_marker(group(caps, 3));
                let items = self.process_list_items(group(caps, 1), kind, inside_paragraphless_item);
                // closing tag goes on the last item's line
                format!("<{tag}>{}</{tag}>\n", items.trim_end(), tag = kind.tag())
            })
        } else {
            pattern::replace_all(&TOP_LEVEL_LIST, &text, |caps| {
                let kind = ListKind::from_marker(group(caps, 4));
                let items = self.process_list_items(group(caps, 2), kind, false);
                format!("{}<{tag}>\n{items}</{tag}>\n", group(caps, 1), tag = kind.tag())
            })
        };

        text.replacen("~0", "", 1)
    }

    fn process_list_items(&mut self, list: &str, kind: ListKind, inside_paragraphless_item: bool) -> String {
        self.list_depth += 1;

        let list = format!("{}~0", TRAILING_BLANK_LINES.replace(list, "\n"));
        let mut previous_was_loose = false;

        let items = pattern::replace_all(kind.item_pattern(), &list, |caps| {
            let item = group(caps, 3);
            let ends_loose = item.ends_with("\n\n");
            let loose = ends_loose || item.contains("\n\n");

            let body = if loose || previous_was_loose {
                self.run_block_gamut(&escape::outdent(item), true)
            } else {
                let mut body = self.do_lists(&escape::outdent(item), true);
                if body.ends_with('\n') {
                    body.pop();
                }
                // only the outermost tight item runs the span gamut
                if !inside_paragraphless_item {
                    body = self.run_span_gamut(&body);
                }
                body
            };

            previous_was_loose = ends_loose;
            format!("<li>{body}</li>\n")
        });

        self.list_depth -= 1;
        items.replace("~0", "")
    }

    fn do_code_blocks(&self, text: &str) -> String {
        let text = format!("{text}~0");
        let text = pattern::replace_all(&CODE_BLOCK, &text, |caps| {
            let code = escape::encode_code(&escape::outdent(group(caps, 1)));
            format!(
                "\n\n<pre><code>{}\n</code></pre>\n\n{}",
                code.trim_matches('\n'),
                group(caps, 2)
            )
        });
        text.replacen("~0", "", 1)
    }

    fn do_block_quotes(&mut self, text: &str) -> String {
        BLOCKQUOTE
            .replace_all(text, |caps: &Captures| {
                let quote = QUOTE_MARKER.replace_all(&caps[1], "");
                let quote = escape::blank_whitespace_lines(&quote);
                let quote = self.run_block_gamut(&quote, false);

                let quote = format!("  {}", quote.replace('\n', "\n  "));
                // the indent above must not leak into preformatted text
                let quote = PRE_IN_QUOTE.replace_all(&quote, |caps: &Captures| {
                    QUOTE_INDENT.replace_all(&caps[1], "").into_owned()
                });

                self.hash_block(&format!("<blockquote>\n{quote}\n</blockquote>"))
            })
            .into_owned()
    }

    fn form_paragraphs(&mut self, text: &str, do_not_unhash: bool) -> String {
        let text = text.trim_matches('\n');
        let mut paragraphs = Vec::new();

        for chunk in PARAGRAPH_BREAK.split(text) {
            if HTML_BLOCK_MARKER.is_match(chunk) {
                paragraphs.push(chunk.to_string());
            } else if !chunk.trim().is_empty() {
                let html = self.run_span_gamut(chunk);
                paragraphs.push(format!("<p>{}</p>", html.trim_start_matches([' ', '\t'])));
            }
        }

        if !do_not_unhash {
            for paragraph in &mut paragraphs {
                *paragraph = self.unhash_html_blocks(paragraph);
            }
        }

        paragraphs.join("\n\n")
    }

    /// Put hashed HTML back. Blocks may contain placeholders of their own,
    /// so repeat until nothing resolvable is left.
    fn unhash_html_blocks(&self, text: &str) -> String {
        let mut text = text.to_string();
        loop {
            let mut replaced = false;
            let next = HTML_BLOCK_MARKER
                .replace_all(&text, |caps: &Captures| {
                    match caps[1].parse::<usize>().ok().and_then(|i| self.html_blocks.get(i)) {
                        Some(html) => {
                            replaced = true;
                            html.clone()
                        }
                        None => caps[0].to_string(),
                    }
                })
                .into_owned();
            text = next;
            if !replaced {
                return text;
            }
        }
    }
}

fn do_horizontal_rules(text: &str) -> String {
    let text = HR_STARS.replace_all(text, "<hr />\n");
    let text = HR_DASHES.replace_all(&text, "<hr />\n");
    HR_UNDERSCORES.replace_all(&text, "<hr />\n").into_owned()
}

#[cfg(test)]
mod tests {
    use crate::converter::ConversionContext;
    use crate::{config::ConverterOptions, hooks::HookCollection};

    fn with_context<T>(f: impl FnOnce(&mut ConversionContext<'_>) -> T) -> T {
        let hooks = HookCollection::new();
        let options = ConverterOptions::default();
        let mut ctx = ConversionContext::new(&hooks, &options);
        f(&mut ctx)
    }

    #[test]
    fn test_hash_block_placeholder() {
        with_context(|ctx| {
            let out = ctx.hash_html_blocks("\n\n<div>\nraw *text*\n</div>\n\n");
            assert_eq!(out, "\n\n\n\n~K0K\n\n\n\n");
            assert_eq!(ctx.html_blocks, vec!["<div>\nraw *text*\n</div>".to_string()]);
        });
    }

    #[test]
    fn test_strip_link_definitions() {
        with_context(|ctx| {
            let out = ctx.strip_link_definitions("\n\ntext\n\n[Foo]: http://x.com/?a=1&b=2  \"The Title\"\n\n");
            assert_eq!(out, "\n\ntext\n\n");
            let reference = ctx.lookup_link("FOO").unwrap();
            assert_eq!(reference.url, "http://x.com/?a=1&amp;b=2");
            assert_eq!(reference.title.as_deref(), Some("The Title"));
        });
    }

    #[test]
    fn test_link_definition_title_on_next_line() {
        with_context(|ctx| {
            let out = ctx.strip_link_definitions("\n\n[a]: <http://a.com>\n    (Paren Title)\n\n");
            assert_eq!(out, "\n\n");
            let reference = ctx.lookup_link("a").unwrap();
            assert_eq!(reference.url, "http://a.com");
            assert_eq!(reference.title.as_deref(), Some("Paren Title"));
        });
    }

    #[test]
    fn test_title_after_blank_line_is_put_back() {
        with_context(|ctx| {
            let out = ctx.strip_link_definitions("\n\n[a]: /u\n\n\"not title\"\n\n[a]\n\n");
            assert_eq!(out, "\n\n\n\"not title\"\n\n[a]\n\n");
            let reference = ctx.lookup_link("a").unwrap();
            assert_eq!(reference.url, "/u");
            assert_eq!(reference.title, None);
        });
    }

    #[test]
    fn test_indented_line_after_blank_is_not_a_title() {
        with_context(|ctx| {
            let out = ctx.strip_link_definitions("\n\n[a]: /u\n\n  \"not title\"\n\n[a]\n\n");
            assert_eq!(out, "\n\n  \"not title\"\n\n[a]\n\n");
            assert_eq!(ctx.lookup_link("a").unwrap().title, None);
        });
    }

    #[test]
    fn test_html_block_shapes_are_hashed() {
        for html in ["<hr>", "<hr />", "<!-- hi -->", "<?php echo 1; ?>", "<% code %>"] {
            with_context(|ctx| {
                let out = ctx.hash_html_blocks(&format!("\n\n{html}\n\npara\n\n"));
                assert!(out.contains("~K0K"), "{html:?} not hashed: {out:?}");
                assert_eq!(ctx.html_blocks, vec![html.to_string()]);
            });
        }
    }

    #[test]
    fn test_later_definition_wins() {
        with_context(|ctx| {
            ctx.strip_link_definitions("\n\n[a]: /first \"One\"\n[A]: /second\n\n");
            let reference = ctx.lookup_link("a").unwrap();
            assert_eq!(reference.url, "/second");
            assert_eq!(reference.title, None);
        });
    }

    #[test]
    fn test_list_depth_is_restored() {
        with_context(|ctx| {
            let html = ctx.run_block_gamut("\n\n- a\n    - b\n\n", false);
            assert_eq!(ctx.list_depth, 0);
            assert_eq!(html, "<ul>\n<li>a\n<ul><li>b</li></ul></li>\n</ul>");
        });
    }

    #[test]
    fn test_horizontal_rule_variants() {
        for rule in ["***", "* * *", "---", "- - -", "___", "_ _ _ _"] {
            let html = with_context(|ctx| ctx.run_block_gamut(&format!("\n\n{rule}\n\n"), false));
            assert_eq!(html, "<hr />", "rule {rule:?}");
        }
    }
}
