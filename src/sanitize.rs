//! Object key generation.
//!
//! Client-supplied filenames are arbitrary Unicode and may contain path
//! separators or other characters the storage backend rejects. Every upload
//! gets a fresh key derived from the filename: a sanitized base, a
//! millisecond timestamp, and a short random token, with the original
//! extension re-attached lower-cased.

use std::fmt;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::time::get_epoch_time_in_ms;

/// Length of the random token appended to every key.
const TOKEN_LEN: usize = 6;

/// Lowercase alphanumeric alphabet, so the token stays inside the key's
/// allowed character set.
const KEY_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// A backend-safe, collision-resistant object name.
///
/// Keys look like `my-resume-photo-1722945600000-x7k2pq.jpg`: the sanitized
/// base (possibly empty), an epoch-millisecond timestamp, a random token,
/// and the lower-cased original extension. Collision avoidance is
/// probabilistic; two keys generated in the same millisecond still differ
/// in the token with overwhelming probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derive a fresh key from a client-supplied filename.
    ///
    /// Never fails: a name with no usable base characters (or one that is
    /// only an extension, like `.gitignore`) produces a key consisting of
    /// the timestamp and token alone.
    pub fn generate(original_name: &str) -> Self {
        // Directory components in a client-supplied name are meaningless
        // here and must never reach the backend key.
        let file_name = original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original_name);
        let (base, ext) = split_extension(file_name);
        let base = sanitize_base(base);
        let timestamp = get_epoch_time_in_ms();
        let token = nanoid::nanoid!(TOKEN_LEN, &KEY_ALPHABET);
        let ext = ext.to_lowercase();

        let key = if base.is_empty() {
            format!("{timestamp}-{token}{ext}")
        } else {
            format!("{base}-{timestamp}-{token}{ext}")
        };
        ObjectKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

/// Split a filename at the last dot. The extension includes the leading
/// dot; a name without a dot has an empty extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

/// Reduce a base name to lowercase ASCII alphanumerics and single hyphens,
/// with no leading or trailing hyphen. Accented letters are folded to their
/// ASCII base character before anything unrepresentable becomes a hyphen.
fn sanitize_base(base: &str) -> String {
    let folded: String = base.nfkd().filter(|c| !is_combining_mark(*c)).collect();

    let mut out = String::with_capacity(folded.len());
    let mut pending_hyphen = false;
    for ch in folded.chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid_key(key: &str) {
        assert!(!key.is_empty());
        let base = key.split('.').next().unwrap();
        assert!(!base.starts_with('-') && !base.ends_with('-'), "{key}");
        assert!(
            base.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "{key}"
        );
        assert!(!base.contains("--"), "{key}");
    }

    #[test]
    fn test_base_is_lowercased_and_symbol_stripped() {
        let key = ObjectKey::generate("My Résumé Photo!!.JPG");
        let key = key.as_str();
        assert!(key.starts_with("my-resume-photo-"), "{key}");
        assert!(key.ends_with(".jpg"), "{key}");
        assert_valid_key(key);

        // base-timestamp-token.ext
        let stem = key.strip_suffix(".jpg").unwrap();
        let mut parts = stem.rsplitn(2, '-');
        let token = parts.next().unwrap();
        let rest = parts.next().unwrap();
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        let timestamp = rest.rsplit('-').next().unwrap();
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()), "{timestamp}");
    }

    #[test]
    fn test_rapid_generation_yields_distinct_keys() {
        let a = ObjectKey::generate("report.pdf");
        let b = ObjectKey::generate("report.pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn test_all_symbol_name_still_produces_a_key() {
        let key = ObjectKey::generate("!!!@@@###.png");
        let key = key.as_str();
        assert!(key.ends_with(".png"), "{key}");
        assert!(!key.starts_with('-'), "{key}");
        assert_valid_key(key);
        // timestamp-token only
        let stem = key.strip_suffix(".png").unwrap();
        assert_eq!(stem.split('-').count(), 2, "{key}");
    }

    #[test]
    fn test_extension_only_name() {
        let key = ObjectKey::generate(".gitignore");
        let key = key.as_str();
        assert!(key.ends_with(".gitignore"), "{key}");
        assert!(!key.starts_with('.') && !key.starts_with('-'), "{key}");
    }

    #[test]
    fn test_no_extension() {
        let key = ObjectKey::generate("README");
        let key = key.as_str();
        assert!(!key.contains('.'), "{key}");
        assert!(key.starts_with("readme-"), "{key}");
    }

    #[test]
    fn test_extension_case_is_folded_but_otherwise_preserved() {
        let key = ObjectKey::generate("archive.TaR");
        assert!(key.as_str().ends_with(".tar"));

        // unusual extensions are not rejected
        let key = ObjectKey::generate("weird.X9~Z");
        assert!(key.as_str().ends_with(".x9~z"));
    }

    #[test]
    fn test_path_components_are_dropped() {
        let key = ObjectKey::generate("../../etc/passwd");
        let key = key.as_str();
        assert!(key.starts_with("passwd-"), "{key}");
        assert!(!key.contains('/'), "{key}");

        let key = ObjectKey::generate("C:\\Users\\alice\\Cat Pic.PNG");
        let key = key.as_str();
        assert!(key.starts_with("cat-pic-"), "{key}");
        assert!(key.ends_with(".png"), "{key}");
    }

    #[test]
    fn test_sanitize_base_is_idempotent() {
        let once = sanitize_base("My Résumé  Photo!!");
        let twice = sanitize_base(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "my-resume-photo");
    }

    #[test]
    fn test_sanitize_base_collapses_and_trims_hyphens() {
        assert_eq!(sanitize_base("--a---b--"), "a-b");
        assert_eq!(sanitize_base(""), "");
        assert_eq!(sanitize_base("$$$"), "");
    }
}
