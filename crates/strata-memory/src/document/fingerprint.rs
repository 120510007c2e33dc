use crate::types::ChunkId;

/// Lowercase, trim, and collapse every whitespace run to a single space.
#[must_use]
pub fn normalize(content: &str) -> String {
    content
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Content fingerprint: blake3 over the normalized text.
#[must_use]
pub fn fingerprint(content: &str) -> ChunkId {
    ChunkId(blake3::hash(normalize(content).as_bytes()).to_hex().to_string())
}

/// Hash of a whole source file, used for provenance records.
#[must_use]
pub fn file_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_case_do_not_change_fingerprint() {
        let a = fingerprint("Hello   World");
        let b = fingerprint("  hello\nworld\t");
        assert_eq!(a, b);
    }

    #[test]
    fn different_words_differ() {
        assert_ne!(fingerprint("hello world"), fingerprint("hello there"));
    }

    #[test]
    fn fingerprint_is_hex() {
        let id = fingerprint("x");
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn file_hash_is_byte_sensitive() {
        assert_ne!(file_hash(b"a b"), file_hash(b"a  b"));
    }

    mod proptest_fingerprint {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn padding_is_ignored(s in "[a-zA-Z ]{0,40}", pad in "[ \t\n]{0,5}") {
                let padded = format!("{pad}{s}{pad}");
                prop_assert_eq!(fingerprint(&s), fingerprint(&padded));
            }

            #[test]
            fn uppercase_is_ignored(s in "[a-z ]{0,40}") {
                prop_assert_eq!(fingerprint(&s), fingerprint(&s.to_uppercase()));
            }
        }
    }
}
