use regex::Regex;
use std::sync::LazyLock;

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap_or_else(|_| unreachable!()));

/// Decode HTML entities, twice when the payload double-escaped them (`&amp;#39;`)
pub fn decode_entities(text: &str) -> String {
    let once = html_escape::decode_html_entities(text);
    if once.contains('&') {
        html_escape::decode_html_entities(&once).into_owned()
    } else {
        once.into_owned()
    }
}

/// Display text: entities decoded, line breaks flattened, ends trimmed
pub fn raw_text(text: &str) -> String {
    decode_entities(text)
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Search text: markup stripped, invisible characters dropped, whitespace collapsed
pub fn cleaned_text(text: &str) -> String {
    let decoded = decode_entities(text);
    let stripped = MARKUP_TAG.replace_all(&decoded, " ");
    stripped
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Both normalizations, or `None` when the text cleans down to nothing
pub fn normalize(text: &str) -> Option<(String, String)> {
    let cleaned = cleaned_text(text);
    if cleaned.is_empty() {
        return None;
    }
    Some((raw_text(text), cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_escaped_apostrophe() {
        assert_eq!(decode_entities("it&amp;#39;s"), "it's");
        assert_eq!(raw_text("it&#39;s\nfine "), "it's fine");
    }

    #[test]
    fn test_cleaned_text_strips_markup_and_collapses_whitespace() {
        assert_eq!(cleaned_text("<font color=\"#E5E5E5\">hello</font>\n   world"), "hello world");
        assert_eq!(cleaned_text("a\u{00A0}\u{200B}b"), "a b");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize("  \n ").is_none());
        assert!(normalize("<br/>").is_none());
        assert_eq!(normalize(" hi ").unwrap(), ("hi".to_string(), "hi".to_string()));
    }
}
