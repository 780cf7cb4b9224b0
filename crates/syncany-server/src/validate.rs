//! Charset checks for untrusted identifiers.

use regex_lite::Regex;
use std::sync::OnceLock;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).expect("pattern is valid"))
        }
    };
}

pattern!(context_re, r"^[a-z0-9_-]+$");
pattern!(suffix_re, r"^[.a-zA-Z0-9]*$");
pattern!(file_name_re, r"^[a-zA-Z0-9_-][a-zA-Z0-9._-]*$");
pattern!(checksum_re, r"^[a-fA-F0-9]{64}$");
pattern!(version_re, r"^[a-zA-Z0-9][a-zA-Z0-9.+_-]*$");
pattern!(short_link_re, r"^[a-zA-Z0-9]+$");

/// Security context / upload context name.
pub fn is_context_name(s: &str) -> bool {
    context_re().is_match(s)
}

/// Staged file suffix: letters, digits and dots only.
pub fn is_file_suffix(s: &str) -> bool {
    suffix_re().is_match(s)
}

/// Public file name: no separators, no leading dot, no `..`.
pub fn is_file_name(s: &str) -> bool {
    file_name_re().is_match(s) && !s.contains("..")
}

/// Hex-encoded SHA-256 digest, either case.
pub fn is_checksum(s: &str) -> bool {
    checksum_re().is_match(s)
}

/// Application version string.
pub fn is_version(s: &str) -> bool {
    version_re().is_match(s)
}

/// Short link identifier.
pub fn is_short_link(s: &str) -> bool {
    short_link_re().is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_names() {
        assert!(is_context_name("application-put"));
        assert!(is_context_name("osx_notifier"));
        assert!(!is_context_name(""));
        assert!(!is_context_name("../keys"));
        assert!(!is_context_name("App"));
        assert!(!is_context_name("a/b"));
    }

    #[test]
    fn test_suffixes() {
        assert!(is_file_suffix(""));
        assert!(is_file_suffix(".tar.gz"));
        assert!(!is_file_suffix("/x"));
        assert!(!is_file_suffix(".tar-gz"));
    }

    #[test]
    fn test_file_names() {
        assert!(is_file_name("syncany-cli_0.4.0-alpha_all.deb"));
        assert!(!is_file_name(".hidden"));
        assert!(!is_file_name("a/b.zip"));
        assert!(!is_file_name("a..b"));
        assert!(!is_file_name(""));
    }

    #[test]
    fn test_checksums() {
        let hex = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(is_checksum(hex));
        assert!(is_checksum(&hex.to_uppercase()));
        assert!(!is_checksum(&hex[1..]));
        assert!(!is_checksum(&hex.replace('e', "g")));
    }

    #[test]
    fn test_versions_and_links() {
        assert!(is_version("0.4.0-alpha+SNAPSHOT"));
        assert!(!is_version("-1"));
        assert!(is_short_link("aZ09xyz"));
        assert!(!is_short_link("a-b"));
    }
}
