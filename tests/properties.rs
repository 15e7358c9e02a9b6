use forumdown::{Converter, markdown_to_html, sanitizer};
use proptest::prelude::*;

proptest! {
    #[test]
    fn plain_words_become_one_paragraph(text in "[a-zA-Z0-9]{1,12}( [a-zA-Z0-9]{1,12}){0,8}") {
        prop_assert_eq!(markdown_to_html(&text), format!("<p>{}</p>", text));
    }

    #[test]
    fn tilde_and_dollar_survive(text in "[a-z]{1,8}([ ~$][a-z~$]{1,8}){0,6}") {
        prop_assert_eq!(markdown_to_html(&text), format!("<p>{}</p>", text));
    }

    #[test]
    fn no_marker_leaks(text in "[a-z *_\\[\\]()#>\n-]{0,64}") {
        let html = markdown_to_html(&text);
        prop_assert!(!html.contains('~'), "marker leaked from {:?}: {:?}", text, html);
    }

    #[test]
    fn conversion_never_panics(text in "\\PC{0,200}") {
        let _ = markdown_to_html(&text);
        let _ = Converter::sanitizing().convert(&text);
    }

    #[test]
    fn sanitized_output_is_stable(text in "[a-z<>/\" =*\n]{0,80}") {
        let once = sanitizer::sanitize_html(&text);
        prop_assert_eq!(sanitizer::sanitize_html(&once), once.clone());
    }
}
