/// A forum-style Markdown to HTML converter with optional output sanitizing
mod block;
pub mod config;
pub mod converter;
pub mod error;
pub mod escape;
pub mod hooks;
mod pattern;
pub mod sanitizer;
mod span;

pub use config::ConverterOptions;
pub use converter::Converter;
pub use error::ConvertError;
pub use hooks::{HookCollection, HookPoint};

/// Convert markdown text to HTML with a default converter
pub fn markdown_to_html(markdown: &str) -> String {
    Converter::new().convert(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(markdown_to_html(""), "");
    }

    #[test]
    fn test_basic_image() {
        let result = markdown_to_html("![foo](/url \"title\")\n");
        assert_eq!(result, "<p><img src=\"/url\" alt=\"foo\" title=\"title\" /></p>");
    }

    #[test]
    fn test_image_without_title() {
        let result = markdown_to_html("![bar](/path)\n");
        assert_eq!(result, "<p><img src=\"/path\" alt=\"bar\" /></p>");
    }

    #[test]
    fn test_heading_and_paragraph() {
        let result = markdown_to_html("# Title\n\nSome *em* text.");
        assert_eq!(result, "<h1>Title</h1>\n\n<p>Some <em>em</em> text.</p>");
    }
}
