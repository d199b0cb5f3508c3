//! Server name generation and RFC 1123 label normalization.

use rand::seq::SliceRandom;
use rand::Rng;

/// DNS labels are limited to 63 octets.
pub const MAX_LABEL_LEN: usize = 63;

const ADJECTIVES: &[&str] = &[
    "amber", "brave", "calm", "clever", "bold", "eager", "gentle", "happy", "lucky", "mellow",
    "nimble", "proud", "quiet", "rapid", "silent", "steady", "swift", "tidy", "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "falcon", "heron", "lynx", "otter", "panda", "raven", "salmon", "tiger", "walrus",
    "beacon", "canyon", "glacier", "harbor", "meadow", "summit", "river", "forest", "comet",
    "island",
];

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// Generate a random, already RFC 1123-safe server name such as
/// `swift-otter-k3x9q2`.
pub fn generate_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("new");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("server");
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{}-{}-{}", adjective, noun, suffix)
}

/// Normalize a user-supplied name into a DNS label: trimmed, lowercased,
/// every character outside `[a-z0-9-]` replaced by `-`, hyphen runs
/// collapsed, no leading/trailing hyphen, at most 63 characters.
///
/// Returns `None` when nothing usable is left.
pub fn normalize(name: &str) -> Option<String> {
    let mut label = String::with_capacity(name.len());
    let mut last_was_hyphen = false;

    for ch in name.trim().to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '-'
        };
        if ch == '-' {
            if last_was_hyphen || label.is_empty() {
                continue;
            }
            last_was_hyphen = true;
        } else {
            last_was_hyphen = false;
        }
        label.push(ch);
    }

    label.truncate(MAX_LABEL_LEN);
    let label = label.trim_end_matches('-').to_string();

    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Whether `name` is a valid RFC 1123 DNS label.
pub fn is_rfc1123_label(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_LABEL_LEN
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_are_valid_labels() {
        for _ in 0..200 {
            let name = generate_name();
            assert!(is_rfc1123_label(&name), "invalid generated name {}", name);
            assert_eq!(name.matches('-').count(), 2);
        }
    }

    #[test]
    fn test_normalize_variants() {
        let cases = vec![
            ("  My Server  ", Some("my-server")),
            ("Web_01.prod", Some("web-01-prod")),
            ("--edge--node--", Some("edge-node")),
            ("already-fine", Some("already-fine")),
            ("ÜBER server", Some("ber-server")),
            ("***", None),
            ("", None),
        ];

        for (input, expected) in cases {
            assert_eq!(
                normalize(input).as_deref(),
                expected,
                "Failed for input: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_normalize_truncates_to_label_length() {
        let long = "a".repeat(62) + "-bcdef";
        let label = normalize(&long).unwrap();
        assert!(label.len() <= MAX_LABEL_LEN);
        assert!(is_rfc1123_label(&label));
        // Truncation must not leave a trailing hyphen
        assert_eq!(label, "a".repeat(62));
    }

    #[test]
    fn test_is_rfc1123_label() {
        assert!(is_rfc1123_label("node-1"));
        assert!(!is_rfc1123_label("-node"));
        assert!(!is_rfc1123_label("node-"));
        assert!(!is_rfc1123_label("Node"));
        assert!(!is_rfc1123_label("node_1"));
        assert!(!is_rfc1123_label(&"a".repeat(64)));
    }
}
