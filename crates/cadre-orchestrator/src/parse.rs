//! Extraction of JSON objects embedded in free-form model output.

/// Return the first balanced `{...}` span in `text` that parses as a JSON object.
///
/// Braces inside string literals are ignored, so prose, markdown fences and
/// trailing commentary around the object are tolerated.
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_end(bytes, start) {
            if let Ok(serde_json::Value::Object(map)) =
                serde_json::from_str::<serde_json::Value>(&text[start..end])
            {
                return Some(map);
            }
        }
        from = start + 1;
    }
    None
}

/// Byte index one past the brace closing the object opened at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let map = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn test_fenced_object_with_prose() {
        let text = "Here you go:\n```json\n{\"complexity\": \"simple\"}\n```\nThanks!";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["complexity"], "simple");
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"note {"report": "use {braces} and \"quotes\"", "n": 2} end"#;
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["n"], 2);
        assert_eq!(map["report"], "use {braces} and \"quotes\"");
    }

    #[test]
    fn test_skips_malformed_prefix() {
        let text = "{not json} then {\"ok\": true}";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["ok"], true);
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{\"unterminated\": 1").is_none());
    }
}
