//! Content hashing for model artifacts.
//!
//! A model's fingerprint is the hex SHA-256 of its bytes. Single files are
//! streamed in fixed-size chunks; directories fold every non-hidden file, in
//! sorted relative-path order, into one digest. Hashing is best-effort:
//! missing or unreadable content degrades to an empty or partial hash and is
//! logged, never raised.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Chunk size for streaming file contents through the digest.
const HASH_CHUNK_SIZE: usize = 8192;

/// Hash a file or directory tree.
///
/// Returns the empty string if the path does not exist, meaning "unknown".
pub fn hash_path(path: &Path) -> String {
    if path.is_dir() {
        hash_tree(path)
    } else {
        hash_file(path)
    }
}

/// Hex SHA-256 of a single file's contents.
///
/// A missing or unreadable file yields the empty string.
pub fn hash_file(path: &Path) -> String {
    match try_hash_file(path) {
        Ok(digest) => digest,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not hash file");
            String::new()
        }
    }
}

/// Hex SHA-256 over a directory tree.
///
/// Every non-hidden file is visited in sorted relative-path order. For each
/// file, the digest absorbs the UTF-8 bytes of its relative path followed by
/// the hex digest of its contents, so renames change the tree hash just as
/// content edits do. Files that fail to read are logged and skipped.
pub fn hash_tree(root: &Path) -> String {
    let mut relative_paths = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        // Hidden files do not contribute to the fingerprint.
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        relative_paths.push(relative.to_string_lossy().to_string());
    }

    relative_paths.sort();

    let mut hasher = Sha256::new();
    for relative in &relative_paths {
        match try_hash_file(&root.join(relative)) {
            Ok(digest) => {
                hasher.update(relative.as_bytes());
                hasher.update(digest.as_bytes());
            }
            Err(err) => {
                warn!(path = %relative, error = %err, "skipping file in tree hash");
            }
        }
    }

    hex::encode(hasher.finalize())
}

fn try_hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sha256_hex(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    #[test]
    fn test_hash_file_matches_reference_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.bin");
        fs::write(&path, b"model bytes").unwrap();

        assert_eq!(hash_file(&path), sha256_hex(b"model bytes"));
    }

    #[test]
    fn test_hash_file_streams_large_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let data = vec![0xabu8; HASH_CHUNK_SIZE * 3 + 17];
        fs::write(&path, &data).unwrap();

        assert_eq!(hash_file(&path), sha256_hex(&data));
    }

    #[test]
    fn test_hash_file_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(hash_file(&dir.path().join("absent.bin")), "");
    }

    #[test]
    fn test_hash_path_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(hash_path(&dir.path().join("absent")), "");
    }

    #[test]
    fn test_hash_tree_deterministic() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.txt"), "gamma").unwrap();

        let first = hash_tree(dir.path());
        let second = hash_tree(dir.path());

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_hash_tree_changes_when_file_changes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();

        let before = hash_tree(dir.path());
        fs::write(dir.path().join("a.txt"), "alpha-2").unwrap();
        let after = hash_tree(dir.path());

        assert_ne!(before, after);
    }

    #[test]
    fn test_hash_tree_changes_when_file_renamed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let before = hash_tree(dir.path());

        fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).unwrap();
        let after = hash_tree(dir.path());

        assert_ne!(before, after);
    }

    #[test]
    fn test_hash_tree_skips_hidden_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let before = hash_tree(dir.path());

        fs::write(dir.path().join(".cache"), "scratch").unwrap();
        let after = hash_tree(dir.path());

        assert_eq!(before, after);
    }

    #[test]
    fn test_hash_tree_folds_path_and_content_digest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"a.txt");
        hasher.update(sha256_hex(b"alpha").as_bytes());
        hasher.update(b"b.txt");
        hasher.update(sha256_hex(b"beta").as_bytes());
        let expected = hex::encode(hasher.finalize());

        assert_eq!(hash_tree(dir.path()), expected);
    }

    #[test]
    fn test_hash_path_dispatches_on_kind() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("single.bin");
        fs::write(&file, "data").unwrap();

        assert_eq!(hash_path(&file), hash_file(&file));
        assert_eq!(hash_path(dir.path()), hash_tree(dir.path()));
    }
}
