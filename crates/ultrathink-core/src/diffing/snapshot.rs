//! Versioned API snapshot files.
//!
//! Snapshots live at `<storage>/api_snapshots/api_snapshot_<version>_<date>.json`.
//! A version string may map to several files (one per capture date); lookups
//! take the most recently modified one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::errors::UltrathinkResult;
use crate::introspection::hasher::{Sensitivity, SignatureHasher};
use crate::models::{ApiData, SNAPSHOT_FORMAT_VERSION};
use crate::persist::{now_iso, write_sorted_json};

const SNAPSHOT_PREFIX: &str = "api_snapshot_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub package_name: String,
    pub total_elements: usize,
    pub snapshot_format_version: String,
}

/// Extractor output plus its hashes, captured for one version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSnapshot {
    pub version: String,
    pub timestamp: String,
    pub api_data: ApiData,
    pub signature_hashes: BTreeMap<String, String>,
    pub metadata: SnapshotMetadata,
}

impl ApiSnapshot {
    /// Build an in-memory snapshot without persisting it.
    pub fn capture(api_data: ApiData, version: &str, hasher: &SignatureHasher) -> Self {
        let signature_hashes = hasher.hash_api_signature(&api_data);
        let metadata = SnapshotMetadata {
            package_name: if api_data.package_info.name.is_empty() {
                "unknown".to_string()
            } else {
                api_data.package_info.name.clone()
            },
            total_elements: api_data.public_api.len(),
            snapshot_format_version: SNAPSHOT_FORMAT_VERSION.to_string(),
        };
        Self {
            version: version.to_string(),
            timestamp: now_iso(),
            api_data,
            signature_hashes,
            metadata,
        }
    }
}

/// One row of [`SnapshotStore::version_history`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub version: String,
    pub timestamp: String,
    pub file: String,
    pub total_elements: usize,
}

pub struct SnapshotStore {
    snapshots_dir: PathBuf,
    hasher: SignatureHasher,
}

impl SnapshotStore {
    /// Open (and create) `<storage_root>/api_snapshots`.
    pub fn open(storage_root: &Path, sensitivity: Sensitivity) -> UltrathinkResult<Self> {
        let snapshots_dir = storage_root.join("api_snapshots");
        std::fs::create_dir_all(&snapshots_dir)?;
        Ok(Self {
            snapshots_dir,
            hasher: SignatureHasher::new(sensitivity),
        })
    }

    pub fn snapshots_dir(&self) -> &Path {
        &self.snapshots_dir
    }

    pub fn hasher(&self) -> &SignatureHasher {
        &self.hasher
    }

    /// Hash `api_data` and persist it as the snapshot for `version`.
    pub fn create_api_snapshot(
        &self,
        api_data: &ApiData,
        version: &str,
    ) -> UltrathinkResult<PathBuf> {
        let snapshot = ApiSnapshot::capture(api_data.clone(), version, &self.hasher);
        let date: String = snapshot.timestamp.chars().take(10).collect();
        let path = self
            .snapshots_dir
            .join(format!("{SNAPSHOT_PREFIX}{version}_{date}.json"));
        write_sorted_json(&path, &snapshot)?;
        info!("Created API snapshot for version {version}: {}", path.display());
        Ok(path)
    }

    /// Files matching `api_snapshot_<version>_*.json`.
    fn snapshot_files_for(&self, version: &str) -> Vec<PathBuf> {
        let prefix = format!("{SNAPSHOT_PREFIX}{version}_");
        self.snapshot_files()
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// All snapshot files, sorted by name.
    fn snapshot_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.snapshots_dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                let name = p
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json")
            })
            .collect();
        files.sort();
        files
    }

    /// Most recently modified snapshot for `version`, or `None` when there is
    /// none or it cannot be read.
    pub fn load_latest_snapshot(&self, version: &str) -> Option<ApiSnapshot> {
        let candidates = self.snapshot_files_for(version);
        if candidates.is_empty() {
            warn!("No snapshot found for version {version}");
            return None;
        }
        if candidates.len() > 1 {
            warn!(
                "{} snapshots match version {version}; using the most recently modified",
                candidates.len()
            );
        }

        let latest = candidates
            .into_iter()
            .max_by_key(|p| modified(p).unwrap_or(SystemTime::UNIX_EPOCH))?;

        let loaded = std::fs::read_to_string(&latest)
            .map_err(crate::errors::UltrathinkError::from)
            .and_then(|text| Ok(serde_json::from_str::<ApiSnapshot>(&text)?));
        match loaded {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("Failed to load snapshot {}: {e}", latest.display());
                None
            }
        }
    }

    pub fn version_history(&self) -> Vec<SnapshotEntry> {
        let mut entries = Vec::new();
        for path in self.snapshot_files() {
            let text = match std::fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Failed to read snapshot {}: {e}", path.display());
                    continue;
                }
            };
            let value: serde_json::Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Failed to read snapshot {}: {e}", path.display());
                    continue;
                }
            };
            entries.push(SnapshotEntry {
                version: value["version"].as_str().unwrap_or("unknown").to_string(),
                timestamp: value["timestamp"].as_str().unwrap_or("unknown").to_string(),
                file: path.to_string_lossy().to_string(),
                total_elements: value["metadata"]["total_elements"].as_u64().unwrap_or(0) as usize,
            });
        }
        entries
    }

    /// Delete snapshot files older than `retention_days`. Returns the count.
    pub fn cleanup_old_snapshots(&self, retention_days: u64) -> usize {
        let Some(cutoff) =
            SystemTime::now().checked_sub(Duration::from_secs(retention_days * 24 * 60 * 60))
        else {
            return 0;
        };
        let mut cleaned = 0;
        for path in self.snapshot_files() {
            let is_old = modified(&path).is_some_and(|m| m < cutoff);
            if !is_old {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    cleaned += 1;
                    debug!("Cleaned up old snapshot: {}", path.display());
                }
                Err(e) => warn!("Failed to clean up {}: {e}", path.display()),
            }
        }
        if cleaned > 0 {
            info!("Cleaned up {cleaned} old snapshots");
        }
        cleaned
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiElement, ElementKind};

    fn sample_data() -> ApiData {
        let mut data = ApiData::default();
        data.package_info.name = "demo".to_string();
        let mut run = ApiElement::new("run", ElementKind::Function, "demo.core");
        run.signature = Some("(limit=10)".to_string());
        data.public_api.insert("run".to_string(), run);
        data.public_api.insert(
            "LIMIT".to_string(),
            ApiElement::new("LIMIT", ElementKind::Variable, "demo"),
        );
        data
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path(), Sensitivity::Strict).unwrap();
        let data = sample_data();
        let path = store.create_api_snapshot(&data, "1.0.0").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("api_snapshot_1.0.0_"));
        assert!(name.ends_with(".json"));

        let loaded = store.load_latest_snapshot("1.0.0").unwrap();
        assert_eq!(loaded.api_data, data);
        assert_eq!(loaded.signature_hashes, store.hasher().hash_api_signature(&data));
        assert_eq!(loaded.metadata.total_elements, 2);
        assert_eq!(loaded.metadata.snapshot_format_version, "1.0");
    }

    #[test]
    fn test_missing_version_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path(), Sensitivity::Strict).unwrap();
        store.create_api_snapshot(&sample_data(), "1.0.0").unwrap();
        assert!(store.load_latest_snapshot("1.0").is_none());
        assert!(store.load_latest_snapshot("2.0.0").is_none());
    }

    #[test]
    fn test_unreadable_snapshot_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path(), Sensitivity::Strict).unwrap();
        std::fs::write(
            store.snapshots_dir().join("api_snapshot_3.0.0_2024-01-01.json"),
            "{not json",
        )
        .unwrap();
        assert!(store.load_latest_snapshot("3.0.0").is_none());
        assert!(store.version_history().is_empty());
    }

    #[test]
    fn test_history_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path(), Sensitivity::Relaxed).unwrap();
        store.create_api_snapshot(&sample_data(), "1.0.0").unwrap();
        store.create_api_snapshot(&sample_data(), "1.1.0").unwrap();

        let history = store.version_history();
        let versions: Vec<&str> = history.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.1.0"]);
        assert_eq!(history[0].total_elements, 2);

        assert_eq!(store.cleanup_old_snapshots(365), 0);
        assert_eq!(store.version_history().len(), 2);
    }
}
