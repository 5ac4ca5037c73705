// crates/wpsf-core/src/runtime/html.rs
// ============================================================================
// Module: WPSF HTML Escaping
// Description: Escaping helpers for text, attributes, class names, and URLs.
// Purpose: Keep untrusted setting values inert in rendered markup.
// Dependencies: url
// ============================================================================

//! ## Overview
//! Every value a strategy interpolates into markup passes through one of
//! these helpers. Schema-authored `desc`, `subtitle`, and section
//! descriptions are host HTML and are emitted as-is; stored values never are.

// ============================================================================
// SECTION: Imports
// ============================================================================

use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// URL schemes allowed in `href`/`src` attributes.
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "ftp", "ftps", "tel"];

// ============================================================================
// SECTION: Escaping
// ============================================================================

/// Escapes text for element content and quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reduces a class list to `[A-Za-z0-9_ -]`, dropping everything else.
#[must_use]
pub fn sanitize_class(class: &str) -> String {
    class
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ' '))
        .collect()
}

/// Escapes a URL for an attribute, returning an empty string for
/// disallowed schemes (`javascript:`, `data:`, ...).
#[must_use]
pub fn escape_url(url: &str) -> String {
    let trimmed = url.trim();
    if let Some((scheme, _)) = trimmed.split_once(':')
        && !scheme.contains(['/', '?', '#'])
        && !ALLOWED_URL_SCHEMES.iter().any(|allowed| scheme.eq_ignore_ascii_case(allowed))
    {
        return String::new();
    }
    escape_html(trimmed)
}

/// Builds a percent-encoded `application/x-www-form-urlencoded` query.
#[must_use]
pub fn query_string(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs.iter().copied()).finish()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::escape_html;
    use super::escape_url;
    use super::query_string;
    use super::sanitize_class;

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;");
    }

    #[test]
    fn escape_url_drops_script_schemes() {
        assert_eq!(escape_url("javascript:alert(1)"), "");
        assert_eq!(escape_url("https://example.com/?a=1&b=2"), "https://example.com/?a=1&amp;b=2");
        assert_eq!(escape_url("/wp-admin/admin-ajax.php"), "/wp-admin/admin-ajax.php");
    }

    #[test]
    fn query_string_encodes_reserved_characters() {
        assert_eq!(
            query_string(&[("option_group", "a&b#c"), ("token", "x=y z")]),
            "option_group=a%26b%23c&token=x%3Dy+z"
        );
    }

    #[test]
    fn sanitize_class_keeps_safe_characters() {
        assert_eq!(sanitize_class("regular-text \"onmouseover=x"), "regular-text onmouseoverx");
    }
}
