//! Span gamut: passes that work inside a single block of text
use fancy_regex::Regex as FancyRegex;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::converter::ConversionContext;
use crate::escape;
use crate::hooks::HookPoint;
use crate::pattern::{self, group};

// Runs of N backticks, closed by exactly N more
static CODE_SPAN: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"(?m)(^|[^\\])(`+)([^\r]*?[^`])\2(?!`)").unwrap());

/// An HTML tag or comment
static TAG_OR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<[a-z/!$]("[^"]*"|'[^']*'|[^'">])*>|<!(--(?:(?:[^>-]|-[^>])(?:[^-]|-[^-])*)?--)>)"#).unwrap()
});

static CODE_TAG_IN_TAG: LazyLock<FancyRegex> = LazyLock::new(|| FancyRegex::new(r"(.)</?code>(?=.)").unwrap());

static ESCAPED_BACKSLASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\\\").unwrap());
static BACKSLASH_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([`*_{}\[\]()>#+\-.!])").unwrap());

// ![alt][id]
static REFERENCE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!\[(.*?)\][ ]?(?:\n[ ]*)?\[(.*?)\])").unwrap());

// ![alt](url "title")
//   $1: whole, $2: alt, $3: url, $6: title
static INLINE_IMAGE: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(r#"(!\[(.*?)\]\s?\([ \t]*<?(\S+?)>?[ \t]*((['"])(.*?)\5[ \t]*)?\))"#).unwrap()
});

// [text][id], the text may hold one level of nested brackets
static REFERENCE_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[((?:\[[^\]]*\]|[^\[\]])*)\][ ]?(?:\n[ ]*)?\[(.*?)\])").unwrap());

// [text](url "title"), the url may hold one level of balanced parens
//   $1: whole, $2: text, $3: url, $6: title
static INLINE_ANCHOR: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(
        r#"(\[((?:\[[^\]]*\]|[^\[\]])*)\]\([ \t]*<?((?:\([^)]*\)|[^()\s])*?)>?[ \t]*((['"])(.*?)\5[ \t]*)?\))"#,
    )
    .unwrap()
});

// [text]
static SHORTCUT_ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\[([^\[\]]+)\])").unwrap());

static EMPTY_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*\)$").unwrap());

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\s)(https?|ftp)(://[-A-Z0-9+&@#/%?=~_|\[\]()!:,.;]*[-A-Z0-9+&@#/%=~_|\[\]])($|\W)").unwrap()
});
static ANGLE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)<((https?|ftp):[^'">\s]+)>"#).unwrap());
static ANGLE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:mailto:)?([-.\w~]+@[-a-z0-9]+(?:\.[-a-z0-9]+)*\.[a-z]+)>").unwrap()
});

static STRONG: LazyLock<FancyRegex> = LazyLock::new(|| {
    FancyRegex::new(r"([\W_]|^)(\*\*|__)(?=\S)([^\r]*?\S[*_]*)\2([\W_]|$)").unwrap()
});
static EMPHASIS: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"([\W_]|^)(\*|_)(?=\S)([^\r*_]*?\S)\2([\W_]|$)").unwrap());

static HARD_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"  +\n").unwrap());

impl ConversionContext<'_> {
    /// Run every span-level pass over `text`, in order.
    pub(crate) fn run_span_gamut(&self, text: &str) -> String {
        let text = do_code_spans(text);
        let text = escape_special_chars_within_tag_attributes(&text);
        let text = encode_backslash_escapes(&text);

        // images first: `![foo][f]` also looks like an anchor
        let text = self.do_images(&text);
        let text = self.do_anchors(&text);

        // after anchors, which accept <url> as their destination
        let text = self.do_auto_links(&text);
        let text = text.replace("~P", "://");

        let text = escape::encode_amps_and_angles(&text);
        let text = do_italics_and_bold(&text);
        HARD_BREAK.replace_all(&text, " <br>\n").into_owned()
    }

    fn do_images(&self, text: &str) -> String {
        let text = REFERENCE_IMAGE.replace_all(text, |caps: &Captures| {
            self.write_image_tag(&caps[1], &caps[2], &caps[3], "", "")
        });
        pattern::replace_all(&INLINE_IMAGE, &text, |caps| {
            self.write_image_tag(group(caps, 1), group(caps, 2), "", group(caps, 3), group(caps, 6))
        })
    }

    fn write_image_tag(&self, whole: &str, alt: &str, link_id: &str, url: &str, title: &str) -> String {
        let mut url = url.to_string();
        let mut title = title.to_string();

        if url.is_empty() {
            let id = if link_id.is_empty() { alt } else { link_id };
            let Some(reference) = self.lookup_link(id) else {
                return whole.to_string();
            };
            url.clone_from(&reference.url);
            if let Some(reference_title) = &reference.title {
                title.clone_from(reference_title);
            }
        }

        let alt = escape::escape_characters(&escape::attribute_encode(alt), "*_[]()").replace("://", "~P");
        let url = escape::escape_characters(&escape::encode_problem_url_chars(&url), "*_");
        let mut html = format!("<img src=\"{url}\" alt=\"{alt}\"");
        if !title.is_empty() {
            let title = escape::escape_characters(&escape::attribute_encode(&title), "*_");
            html.push_str(&format!(" title=\"{title}\""));
        }
        html.push_str(" />");
        html
    }

    fn do_anchors(&self, text: &str) -> String {
        let text = REFERENCE_ANCHOR.replace_all(text, |caps: &Captures| {
            self.write_anchor_tag(&caps[1], &caps[2], &caps[3], "", "")
        });
        let text = pattern::replace_all(&INLINE_ANCHOR, &text, |caps| {
            self.write_anchor_tag(group(caps, 1), group(caps, 2), "", group(caps, 3), group(caps, 6))
        });
        SHORTCUT_ANCHOR
            .replace_all(&text, |caps: &Captures| {
                self.write_anchor_tag(&caps[1], &caps[2], "", "", "")
            })
            .into_owned()
    }

    fn write_anchor_tag(&self, whole: &str, link_text: &str, link_id: &str, url: &str, title: &str) -> String {
        let mut url = url.to_string();
        let mut title = title.to_string();

        if url.is_empty() {
            let id = if link_id.is_empty() { link_text } else { link_id };
            match self.lookup_link(id) {
                Some(reference) => {
                    url.clone_from(&reference.url);
                    if let Some(reference_title) = &reference.title {
                        title.clone_from(reference_title);
                    }
                }
                // `[text]()` links to the empty url
                None if EMPTY_PARENS.is_match(whole) => {}
                None => return whole.to_string(),
            }
        }

        let url = escape::escape_characters(&escape::encode_problem_url_chars(&url), "*_");
        let mut html = format!("<a href=\"{url}\"");
        if !title.is_empty() {
            let title = escape::escape_characters(&escape::attribute_encode(&title), "*_");
            html.push_str(&format!(" title=\"{title}\""));
        }
        // hide `://` so the link text is not autolinked again
        html.push('>');
        html.push_str(&link_text.replace("://", "~P"));
        html.push_str("</a>");
        html
    }

    fn do_auto_links(&self, text: &str) -> String {
        // bare urls get angle brackets, then every <url> becomes a link
        let text = BARE_URL.replace_all(text, "${1}<${2}${3}>${4}");
        let text = ANGLE_URL.replace_all(&text, |caps: &Captures| {
            let url = &caps[1];
            let href = escape::escape_characters(&escape::attribute_encode(url), "*_");
            let label = self.hooks.run(HookPoint::PlainLinkText, url);
            format!("<a href=\"{href}\">{}</a>", escape::escape_characters(&label, "*_"))
        });

        if !self.options.email_autolinks {
            return text.into_owned();
        }
        ANGLE_EMAIL
            .replace_all(&text, |caps: &Captures| {
                let address = escape::escape_characters(&caps[1], "*_");
                format!("<a href=\"mailto:{address}\">{address}</a>")
            })
            .into_owned()
    }
}

fn do_code_spans(text: &str) -> String {
    pattern::replace_all(&CODE_SPAN, text, |caps| {
        let code = group(caps, 3).trim_matches([' ', '\t']);
        let code = escape::encode_code(code).replace("://", "~P");
        format!("{}<code>{code}</code>", group(caps, 1))
    })
}

/// Inside tags, `\`, `` ` ``, `*` and `_` are attribute text, not Markdown.
/// Comments also protect `/` so urls in them are not autolinked.
fn escape_special_chars_within_tag_attributes(text: &str) -> String {
    TAG_OR_COMMENT
        .replace_all(text, |caps: &Captures| {
            let tag = &caps[0];
            let chars = if tag.starts_with("<!") { "\\`*_/" } else { "\\`*_" };
            let tag = pattern::replace_all(&CODE_TAG_IN_TAG, tag, |caps| format!("{}`", group(caps, 1)));
            escape::escape_characters(&tag, chars)
        })
        .into_owned()
}

fn encode_backslash_escapes(text: &str) -> String {
    let text = ESCAPED_BACKSLASH.replace_all(text, escape::escape_code('\\'));
    BACKSLASH_ESCAPE
        .replace_all(&text, |caps: &Captures| {
            caps[1].chars().map(escape::escape_code).collect::<String>()
        })
        .into_owned()
}

fn do_italics_and_bold(text: &str) -> String {
    // <strong> must go first
    let text = pattern::replace_all(&STRONG, text, |caps| {
        format!("{}<strong>{}</strong>{}", group(caps, 1), group(caps, 3), group(caps, 4))
    });
    pattern::replace_all(&EMPHASIS, &text, |caps| {
        format!("{}<em>{}</em>{}", group(caps, 1), group(caps, 3), group(caps, 4))
    })
}
