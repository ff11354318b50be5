// src/llm/clean.rs

//! Turning chatty model output back into parseable JSON.

use regex::Regex;
use std::sync::LazyLock;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

// "payment_terms": {"net 30"}  =>  "payment_terms": "net 30"
static SET_LIKE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""payment_terms"\s*:\s*\{\s*"([^"]+)"\s*\}"#).expect("valid regex")
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("valid regex"));

/// Strip reasoning blocks, markdown fences and `//` comments.
pub fn clean_response(raw: &str) -> String {
    let without_think = THINK_BLOCK.replace_all(raw, "");
    let without_fences = without_think.replace("```json", "").replace("```", "");
    strip_line_comments(&without_fences).trim().to_string()
}

/// Drop `// ...` up to end of line, leaving string literals (URLs) intact.
fn strip_line_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&n| n != '\n').is_some() {}
            }
            _ => out.push(c),
        }
    }
    out
}

/// Extract the outermost JSON object from a string that may contain
/// surrounding text.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

/// Patch the malformations models commonly produce.
pub fn repair_json(json: &str) -> String {
    let fixed = SET_LIKE_TERMS.replace_all(json, r#""payment_terms": "$1""#);
    TRAILING_COMMA.replace_all(&fixed, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_think_and_fences() {
        let raw = "<think>\nlet me see\n</think>\n```json\n{\"a\": 1}\n```\n";
        assert_eq!(clean_response(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_comments_removed_but_urls_kept() {
        let raw = "{\n  \"site\": \"https://acme.example\", // vendor site\n  \"n\": 2 // count\n}";
        let cleaned = clean_response(raw);
        assert!(cleaned.contains("https://acme.example"));
        assert!(!cleaned.contains("vendor site"));
        let v: serde_json::Value = serde_json::from_str(&repair_json(&cleaned)).unwrap();
        assert_eq!(v["n"], 2);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let raw = r#"{"d": "12\" pipe // steel"}"#;
        assert_eq!(clean_response(raw), raw);
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("Sure! {\"a\": {}} hope that helps"), Some("{\"a\": {}}"));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_repair_json() {
        let broken = r#"{"payment_terms": {"net 30"}, "items": [1, 2,], }"#;
        let v: serde_json::Value = serde_json::from_str(&repair_json(broken)).unwrap();
        assert_eq!(v["payment_terms"], "net 30");
        assert_eq!(v["items"], serde_json::json!([1, 2]));
    }
}
