//! Extraction of a JSON object from free-form model output.

/// Slice from the first `{` to the last `}` inclusive.
///
/// Returns `None` when either brace is missing or they are out of order.
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_object_wrapped_in_prose() {
        let text = "Sure! Here you go:\n```json\n{\"a\": {\"b\": 2}}\n```\nEnjoy.";
        assert_eq!(extract_object(text), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_missing_braces() {
        assert_eq!(extract_object("no json here"), None);
        assert_eq!(extract_object("{ unterminated"), None);
        assert_eq!(extract_object("} backwards {"), None);
    }
}
