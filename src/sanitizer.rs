//! Post-conversion filters for HTML produced from untrusted Markdown
use regex::Regex;
use std::sync::LazyLock;

// anything that looks like a tag, including an unterminated one at the end
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").unwrap());

static BASIC_WHITELIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(</?(b|blockquote|code|del|dd|dl|dt|em|h1|h2|h3|i|kbd|li|ol(?: start="\d+")?|p|s|sup|sub|strong|strike|ul)>|<(br|hr)\s?/?>)$"#,
    )
    .unwrap()
});

static ANCHOR_WHITELIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(<a\shref="((https?|ftp)://|/|mailto:|magnet:\?)[-A-Za-z0-9+&@#/%?=~_|!:,.;\(\)*\[\]$]+"(\stitle="[^"<>]+")?\s?>|</a>)$"#,
    )
    .unwrap()
});

static IMAGE_WHITELIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(<img\ssrc="(https?://|/)[-A-Za-z0-9+&@#/%?=~_|!:,.;\(\)*\[\]$]+"(\swidth="\d{1,3}")?(\sheight="\d{1,3}")?(\salt="[^"<>]*")?(\stitle="[^"<>]*")?\s?/?>)$"#,
    )
    .unwrap()
});

static PRE_WHITELIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^(<pre(\sclass="[-a-z0-9 ]+")?>|</pre>)$"#).unwrap());

static BALANCED_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?\w+[^>]*(\s|$|>)").unwrap());
static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^</?(\w+)").unwrap());

/// Tags that are routinely left unclosed
const UNBALANCED_OK: &[&str] = &["p", "img", "br", "li", "hr"];

fn is_whitelisted(tag: &str) -> bool {
    [&BASIC_WHITELIST, &ANCHOR_WHITELIST, &IMAGE_WHITELIST, &PRE_WHITELIST]
        .iter()
        .any(|whitelist| whitelist.is_match(tag))
}

/// Remove every tag that is not on the whitelist. Text between tags is kept.
pub fn sanitize_html(html: &str) -> String {
    ANY_TAG
        .replace_all(html, |caps: &regex::Captures| {
            let tag = &caps[0];
            if is_whitelisted(tag) {
                tag.to_string()
            } else {
                log::trace!("sanitizer dropped {:?}", tag);
                String::new()
            }
        })
        .into_owned()
}

/// Remove opening tags without a closing partner, and closing tags without an
/// opening one.
///
/// An opening tag is paired with the first unpaired closing tag of the same
/// name that follows it. `p`, `img`, `br`, `li` and `hr` are never touched.
pub fn balance_tags(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let tokens: Vec<_> = BALANCED_TAG.find_iter(html).collect();
    let lowered: Vec<String> = tokens.iter().map(|m| m.as_str().to_lowercase()).collect();
    let mut paired = vec![false; tokens.len()];
    let mut remove = vec![false; tokens.len()];

    for (index, tag) in lowered.iter().enumerate() {
        let Some(name) = TAG_NAME.captures(tag).map(|caps| caps[1].to_string()) else {
            continue;
        };
        if paired[index] || UNBALANCED_OK.contains(&name.as_str()) {
            continue;
        }

        let closing = format!("</{name}>");
        let partner = if tag.starts_with("</") {
            None
        } else {
            (index + 1..lowered.len()).find(|&later| !paired[later] && lowered[later] == closing)
        };

        match partner {
            Some(later) => paired[later] = true,
            None => remove[index] = true,
        }
    }

    if !remove.contains(&true) {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for (token, _) in tokens.iter().zip(&remove).filter(|(_, removed)| **removed) {
        log::trace!("balancer dropped {:?}", token.as_str());
        out.push_str(&html[last..token.start()]);
        last = token.end();
    }
    out.push_str(&html[last..]);
    out
}
