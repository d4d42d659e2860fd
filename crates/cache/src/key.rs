//! Disk key hashing

/// Map a logical cache key (URL, resource name, file path) to a disk key.
///
/// The result is the 32-character lowercase hex MD5 digest of the key's UTF-8
/// bytes, which is always a valid journal key.
pub fn hash_key_for_disk(key: &str) -> String {
    format!("{:x}", md5::compute(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_is_deterministic() {
        let url = "https://example.com/photos/1.jpg";
        assert_eq!(hash_key_for_disk(url), hash_key_for_disk(url));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(hash_key_for_disk(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(hash_key_for_disk("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_hash_shape() {
        let hash = hash_key_for_disk("res:placeholder");
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_distinct_keys_distinct_hashes() {
        let hashes: HashSet<String> = (0..1000)
            .map(|i| hash_key_for_disk(&format!("https://example.com/{}.jpg", i)))
            .collect();
        assert_eq!(hashes.len(), 1000);
    }
}
