//! How contributions are combined with a base file.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::{MergeError, MergeResult};
use super::instructions::apply_contribution;

/// Merge strategy, chosen from the base file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Structured document: contributions are deep-merged as JSON, or
    /// applied as instructions when they hold [`super::INSTRUCTIONS_KEY`].
    Json,
    /// Unstructured text: contributions are appended in order.
    TextAppend,
}

impl MergeKind {
    /// Pick the strategy for a base file.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => MergeKind::Json,
            _ => MergeKind::TextAppend,
        }
    }

    /// Merge `contributions` into `base` and return the combined bytes.
    pub fn merge(self, base: &Path, contributions: &[PathBuf]) -> MergeResult<Vec<u8>> {
        match self {
            MergeKind::Json => {
                let mut merged = read_json(base)?;
                for path in contributions {
                    let patch = read_json(path)?;
                    apply_contribution(&mut merged, patch).map_err(|reason| MergeError::Parse {
                        path: path.clone(),
                        reason,
                    })?;
                }
                serde_json::to_vec_pretty(&merged).map_err(|e| MergeError::Parse {
                    path: base.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            MergeKind::TextAppend => {
                let mut merged = read(base)?;
                for path in contributions {
                    let bytes = read(path)?;
                    if !merged.is_empty() && !merged.ends_with(b"\n") && !bytes.is_empty() {
                        merged.push(b'\n');
                    }
                    merged.extend_from_slice(&bytes);
                }
                Ok(merged)
            }
        }
    }
}

/// Deep-merge `patch` into `target`.
///
/// Objects merge key by key. Any other value in `patch` replaces the target
/// value, except `null`, which leaves the target untouched.
pub fn merge_json_values(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    continue;
                }
                match target.get_mut(&key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (target, patch) => *target = patch,
    }
}

fn read(path: &Path) -> MergeResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| MergeError::io(path, e))
}

fn read_json(path: &Path) -> MergeResult<Value> {
    let bytes = read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| MergeError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MergeKind::from_path(Path::new("a/laser.json")), MergeKind::Json);
        assert_eq!(MergeKind::from_path(Path::new("a/LASER.JSON")), MergeKind::Json);
        assert_eq!(MergeKind::from_path(Path::new("a/names.txt")), MergeKind::TextAppend);
        assert_eq!(MergeKind::from_path(Path::new("a/table.csv")), MergeKind::TextAppend);
        assert_eq!(MergeKind::from_path(Path::new("a/noext")), MergeKind::TextAppend);
    }

    #[test]
    fn test_nested_objects_merge() {
        let mut target = json!({"stats": {"damage": 10, "heat": 5}, "name": "Laser"});
        merge_json_values(&mut target, json!({"stats": {"damage": 15}}));
        assert_eq!(target, json!({"stats": {"damage": 15, "heat": 5}, "name": "Laser"}));
    }

    #[test]
    fn test_null_is_ignored() {
        let mut target = json!({"name": "Laser", "tags": ["energy"]});
        merge_json_values(&mut target, json!({"name": null, "tags": null}));
        assert_eq!(target, json!({"name": "Laser", "tags": ["energy"]}));
    }

    #[test]
    fn test_arrays_are_replaced() {
        let mut target = json!({"tags": ["energy", "small"]});
        merge_json_values(&mut target, json!({"tags": ["ballistic"]}));
        assert_eq!(target, json!({"tags": ["ballistic"]}));
    }

    #[test]
    fn test_scalar_replaced_by_object() {
        let mut target = json!({"ammo": 0});
        merge_json_values(&mut target, json!({"ammo": {"type": "AC20"}}));
        assert_eq!(target, json!({"ammo": {"type": "AC20"}}));
    }

    #[test]
    fn test_json_merge_applies_in_order() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{"damage": 10, "heat": 5}"#);
        let a = write(&dir, "a.json", r#"{"damage": 15}"#);
        let b = write(&dir, "b.json", r#"{"damage": 20, "range": 300}"#);

        let bytes = MergeKind::Json.merge(&base, &[a, b]).unwrap();
        let merged: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(merged, json!({"damage": 20, "heat": 5, "range": 300}));
    }

    #[test]
    fn test_json_parse_error_names_contributor() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{"damage": 10}"#);
        let bad = write(&dir, "bad.json", "{ not json");

        let err = MergeKind::Json.merge(&base, &[bad.clone()]).unwrap_err();
        assert!(matches!(err, MergeError::Parse { .. }));
        assert_eq!(err.path(), &bad);
    }

    #[test]
    fn test_instruction_contributor_mixes_with_plain_ones() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{"damage": 10, "tags": ["energy"]}"#);
        let a = write(&dir, "a.json", r#"{"damage": 15}"#);
        let b = write(
            &dir,
            "b.json",
            r#"{"$instructions": [{"path": "/tags", "action": "add", "value": "heavy"}]}"#,
        );

        let bytes = MergeKind::Json.merge(&base, &[a, b]).unwrap();
        let merged: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(merged, json!({"damage": 15, "tags": ["energy", "heavy"]}));
    }

    #[test]
    fn test_failed_instruction_names_contributor() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{"damage": 10}"#);
        let bad = write(
            &dir,
            "bad.json",
            r#"{"$instructions": [{"path": "/tags", "action": "remove"}]}"#,
        );

        let err = MergeKind::Json.merge(&base, &[bad.clone()]).unwrap_err();
        assert!(matches!(err, MergeError::Parse { ref reason, .. } if reason.contains("/tags")));
        assert_eq!(err.path(), &bad);
    }

    #[test]
    fn test_missing_contributor_is_io_error() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", "{}");
        let missing = dir.path().join("gone.json");

        let err = MergeKind::Json.merge(&base, &[missing]).unwrap_err();
        assert!(matches!(err, MergeError::CacheIo { .. }));
    }

    #[test]
    fn test_text_append_inserts_line_breaks() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "names.txt", "alpha");
        let a = write(&dir, "a.txt", "beta\n");
        let b = write(&dir, "b.txt", "gamma\n");

        let bytes = MergeKind::TextAppend.merge(&base, &[a, b]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "alpha\nbeta\ngamma\n");
    }
}
