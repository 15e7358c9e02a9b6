//! Character-level escaping shared by the block and span passes
use fancy_regex::Regex as FancyRegex;
use regex::Regex;
use std::sync::LazyLock;

use crate::pattern;

static ESCAPE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~E(\d+)E").unwrap());

static WHITESPACE_ONLY_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]+$").unwrap());

static ONE_INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(\t|[ ]{1,4})").unwrap());

/// `&` that does not already start an entity
static NAKED_AMP: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"&(?!#?[xX]?(?:[0-9a-fA-F]+|\w+);)").unwrap());

/// `<` that cannot start a tag
static NAKED_LT: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"(?i)<(?![a-z/?!]|~D)").unwrap());

static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").unwrap());

/// The only schemes a link may carry
const SAFE_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto", "magnet"];

/// Replace every character of `chars` found in `text` with its `~E<code>E` form.
///
/// Later regex passes cannot see an escaped character, so this is how a
/// pass marks `*`, `_` and friends as already handled.
pub fn escape_characters(text: &str, chars: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if chars.contains(c) {
            out.push_str(&escape_code(c));
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn escape_code(c: char) -> String {
    format!("~E{}E", c as u32)
}

/// Turn `~E<code>E` sequences back into the characters they stand for.
pub fn unescape_special_chars(text: &str) -> String {
    ESCAPE_CODE
        .replace_all(text, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Expand tabs to spaces using a 4-column tab stop.
pub fn detab(text: &str) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let width = 4 - column % 4;
                out.extend(std::iter::repeat_n(' ', width));
                column += width;
            }
            '\n' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

/// Empty out lines that hold nothing but spaces and tabs.
pub fn blank_whitespace_lines(text: &str) -> String {
    WHITESPACE_ONLY_LINE.replace_all(text, "").into_owned()
}

/// Remove one level of indentation (a tab or up to four spaces) from every line.
pub fn outdent(text: &str) -> String {
    ONE_INDENT.replace_all(text, "").into_owned()
}

/// Encode text for use inside `<code>`: entities are not recognized there,
/// and Markdown-significant characters must survive the span gamut.
pub fn encode_code(text: &str) -> String {
    let text = text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
    escape_characters(&text, "*_{}[]\\")
}

/// Encode `&` and `<` that are not already part of an entity or a tag.
pub fn encode_amps_and_angles(text: &str) -> String {
    let text = pattern::replace_all(&NAKED_AMP, text, |_| "&amp;".to_string());
    pattern::replace_all(&NAKED_LT, &text, |_| "&lt;".to_string())
}

/// Encode everything that could close or break out of an attribute value.
pub fn attribute_encode(text: &str) -> String {
    text.replace('>', "&gt;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encode the characters that are ambiguous inside an `href`/`src`.
///
/// A colon that ends a scheme is kept only for the schemes in
/// `SAFE_SCHEMES`, so `javascript:` and `data:` urls are defused. Any other
/// colon is kept when it ends the string or precedes a digit or `/`.
pub fn encode_problem_url_chars(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut chars = url.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '~' if chars.peek().is_some_and(|&(_, next)| next == 'D') => {
                chars.next();
                out.push_str("%24");
            }
            '"' | '\'' | '*' | '(' | ')' | '[' | ']' => {
                out.push_str(&format!("%{:x}", c as u32));
            }
            ':' => {
                let prefix = &url[..offset];
                let keep = if SCHEME.is_match(prefix) {
                    SAFE_SCHEMES.iter().any(|scheme| prefix.eq_ignore_ascii_case(scheme))
                } else {
                    chars
                        .peek()
                        .is_none_or(|&(_, next)| next.is_ascii_digit() || next == '/')
                };
                if keep {
                    out.push(':');
                } else {
                    out.push_str("%3a");
                }
            }
            _ => out.push(c),
        }
    }
    out
}
