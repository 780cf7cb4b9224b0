//! Secret record files.
//!
//! One record per security context, `<context>.properties`, in `key = value`
//! format. The value under `key` is the HMAC secret shared by client and
//! server.

use std::collections::BTreeMap;

/// Record field holding the secret.
pub const KEY_FIELD: &str = "key";

/// Extension of secret record files.
pub const RECORD_EXTENSION: &str = "properties";

/// Parse `key = value` lines. Lines starting with `#` are comments; keys and
/// values are trimmed.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// The non-empty secret of a record, if any.
pub fn record_secret(text: &str) -> Option<String> {
    parse_properties(text)
        .remove(KEY_FIELD)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_properties() {
        let props = parse_properties("# comment\nkey = s3cr3t\n  other=a=b \n\n=novalue\n");
        assert_eq!(props.get("key").map(String::as_str), Some("s3cr3t"));
        assert_eq!(props.get("other").map(String::as_str), Some("a=b"));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_record_secret() {
        assert_eq!(record_secret("# build server\nkey = s3cr3t\n").as_deref(), Some("s3cr3t"));
        assert_eq!(record_secret("key =\n"), None);
        assert_eq!(record_secret("user = x\n# key = old\n"), None);
    }
}
