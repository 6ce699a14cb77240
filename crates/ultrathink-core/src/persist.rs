//! JSON artifact writing and timestamp formats shared by every store.

use std::path::Path;

use serde::Serialize;

use crate::errors::UltrathinkResult;
use crate::introspection::hasher::sort_keys;

/// ISO-8601 local timestamp used inside persisted artifacts.
pub fn now_iso() -> String {
    chrono::Local::now().to_rfc3339()
}

/// `YYYYmmdd_HHMMSS` stamp used in artifact file names.
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write `value` as pretty JSON with sorted keys, creating parent directories.
pub fn write_sorted_json<T: Serialize>(path: &Path, value: &T) -> UltrathinkResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sorted = sort_keys(&serde_json::to_value(value)?);
    std::fs::write(path, serde_json::to_string_pretty(&sorted)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn written_json_has_sorted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        write_sorted_json(&path, &json!({"zeta": 1, "alpha": {"b": 2, "a": 1}})).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.find("alpha").unwrap() < text.find("zeta").unwrap());
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }

    #[test]
    fn file_timestamp_shape() {
        let stamp = file_timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
    }
}
