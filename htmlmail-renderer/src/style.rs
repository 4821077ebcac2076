//! Style sheet wrapping and placeholder substitution.

/// Token in the rendered body that receives the wrapped style sheet.
pub const DEFAULT_PLACEHOLDER: &str = "<style></style>";

/// Wraps raw CSS in a `<style>` element, followed by a newline.
pub fn wrap_style(css: &str) -> String {
    let mut block = String::with_capacity(css.len() + 16);
    block.push_str("<style>");
    block.push_str(css);
    block.push_str("</style>\n");
    block
}

/// Replaces every occurrence of `placeholder` in `body` with `style_block`.
pub fn inject_style(body: &str, style_block: &str, placeholder: &str) -> String {
    if placeholder.is_empty() {
        return body.to_string();
    }
    body.replace(placeholder, style_block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_style_lands_at_placeholder() {
        let body = "<html><head><style></style></head><body>hi</body></html>";
        let out = inject_style(body, &wrap_style("body{color:red}"), DEFAULT_PLACEHOLDER);
        assert_eq!(
            out,
            "<html><head><style>body{color:red}</style>\n</head><body>hi</body></html>"
        );
        assert_eq!(out.matches("<style>body{color:red}</style>").count(), 1);
    }

    #[test]
    fn body_without_placeholder_is_untouched() {
        assert_eq!(inject_style("<p>x</p>", "<style></style>\n", DEFAULT_PLACEHOLDER), "<p>x</p>");
    }

    #[test]
    fn empty_placeholder_is_ignored() {
        assert_eq!(inject_style("abc", "X", ""), "abc");
    }
}
