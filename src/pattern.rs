//! Replacement over backtracking patterns
use fancy_regex::{Captures, Regex};

/// Replace every match of `re` in `text` with the output of `rep`.
///
/// Backtracking patterns can give up at match time. When that happens the
/// pass stops and the rest of `text` is copied through unchanged.
pub(crate) fn replace_all<F>(re: &Regex, text: &str, mut rep: F) -> String
where
    F: FnMut(&Captures<'_>) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let caps = match caps {
            Ok(caps) => caps,
            Err(err) => {
                log::warn!("pattern `{}` aborted: {}", re.as_str(), err);
                break;
            }
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&rep(&caps));
        last = whole.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Text of capture group `i`, or `""` when it did not participate.
pub(crate) fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_with_lookahead() {
        let re = Regex::new(r"a(?=b)").unwrap();
        assert_eq!(replace_all(&re, "abacab", |_| "X".to_string()), "XbacXb");
    }

    #[test]
    fn test_unmatched_group_is_empty() {
        let re = Regex::new(r"(x)?(y)").unwrap();
        let out = replace_all(&re, "y", |caps| format!("[{}|{}]", group(caps, 1), group(caps, 2)));
        assert_eq!(out, "[|y]");
    }
}
