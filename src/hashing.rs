//! Hashing - Deterministic Content Digests
//!
//! The build report records a digest of the normalized spec and a digest
//! of the rendered tree; the idempotence tests lean on both.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex_encode(result)
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Digest of a normalized spec: same spec, same digest, regardless of the
/// key order the caller supplied.
pub fn spec_digest<T: Serialize>(spec: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(spec)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Digest of a rendered theme tree: relative paths and file bytes, walked
/// in sorted order. Regenerating an unchanged spec must reproduce it.
pub fn hash_tree(root: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();
    for rel in files {
        hasher.update(rel.as_bytes());
        hasher.update([0]);
        hasher.update(fs::read(root.join(&rel))?);
        hasher.update([0]);
    }
    Ok(hex_encode(hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            out.push(rel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_spec_digest_order_independent() {
        let a = json!({"platform": "ghost", "projectName": "X"});
        let b = json!({"projectName": "X", "platform": "ghost"});
        assert_eq!(spec_digest(&a).unwrap(), spec_digest(&b).unwrap());
    }

    #[test]
    fn test_hash_tree_stable_and_content_sensitive() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("a.txt"), "one").unwrap();
        fs::write(dir.path().join("assets/b.txt"), "two").unwrap();

        let h1 = hash_tree(dir.path()).unwrap();
        let h2 = hash_tree(dir.path()).unwrap();
        assert_eq!(h1, h2);

        fs::write(dir.path().join("a.txt"), "changed").unwrap();
        assert_ne!(h1, hash_tree(dir.path()).unwrap());
    }
}
