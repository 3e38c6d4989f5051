//! Mapping from cache keys to file names

use sha2::{Digest, Sha256};

/// Prefix of file stems derived from hashed keys
const HASHED_PREFIX: &str = "sha256-";

/// Returns the file name (`<stem>.json`) used to persist `key`
///
/// Keys made only of ASCII alphanumerics, `-`, `_` and `.` are used verbatim,
/// so `match_TR1_123` is stored as `match_TR1_123.json`. Anything else,
/// including empty keys, `.`/`..` and keys that could be mistaken for a hashed
/// stem, is replaced by the hex SHA-256 of the key.
pub(crate) fn file_name(key: &str) -> String {
    if is_path_safe(key) {
        format!("{}.json", key)
    } else {
        let digest = Sha256::digest(key.as_bytes());
        format!("{}{}.json", HASHED_PREFIX, hex::encode(digest))
    }
}

fn is_path_safe(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.starts_with(HASHED_PREFIX)
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
