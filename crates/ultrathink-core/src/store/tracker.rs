//! Version registry backed by `<storage>/version_tracking.db`.
//!
//! Each public method opens its own connection. Multi-row writes run in a
//! single transaction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::UltrathinkConfig;
use crate::diffing::classifier::ClassifiedChange;
use crate::diffing::version::{bump_version, compare_versions, parse_version, BumpKind};
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::persist::now_iso;
use crate::store::schema;

/// Version suggested when nothing has been registered yet.
pub const INITIAL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: i64,
    pub version_string: String,
    pub major: i64,
    pub minor: i64,
    pub patch: i64,
    pub pre_release: Option<String>,
    pub build_metadata: Option<String>,
    pub created_timestamp: String,
    pub snapshot_file: Option<String>,
    pub is_current: bool,
    pub notes: Option<String>,
}

impl VersionRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            version_string: row.get("version_string")?,
            major: row.get("major")?,
            minor: row.get("minor")?,
            patch: row.get("patch")?,
            pre_release: row.get("pre_release")?,
            build_metadata: row.get("build_metadata")?,
            created_timestamp: row.get("created_timestamp")?,
            snapshot_file: row.get("snapshot_file")?,
            is_current: row.get("is_current")?,
            notes: row.get("notes")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
    pub from_version: String,
    pub to_version: String,
    pub change_type: String,
    pub element_name: String,
    pub severity: String,
    pub description: Option<String>,
    pub created_timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationRecord {
    pub id: i64,
    pub element_name: String,
    pub deprecated_in_version: String,
    pub removal_target_version: Option<String>,
    pub reason: Option<String>,
    pub alternative: Option<String>,
    pub created_timestamp: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStatistics {
    pub total_versions: i64,
    pub total_changes: i64,
    pub total_deprecations: i64,
    pub recent_versions: i64,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub changes_by_severity: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// VersionTracker
// ---------------------------------------------------------------------------

pub struct VersionTracker {
    db_path: PathBuf,
}

impl VersionTracker {
    /// Open (creating if needed) the tracking database under `storage_root`.
    pub fn new(storage_root: &Path) -> UltrathinkResult<Self> {
        std::fs::create_dir_all(storage_root)?;
        let tracker = Self {
            db_path: storage_root.join("version_tracking.db"),
        };
        tracker.init_schema()?;
        Ok(tracker)
    }

    pub fn from_config(config: &UltrathinkConfig) -> UltrathinkResult<Self> {
        Self::new(config.storage_root())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> UltrathinkResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn init_schema(&self) -> UltrathinkResult<()> {
        schema::migrate_schema(&self.connect()?)
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    /// Register `version` and make it the only current version.
    pub fn register_version(
        &self,
        version: &str,
        snapshot_file: Option<&str>,
        notes: Option<&str>,
    ) -> UltrathinkResult<i64> {
        if self.get_version_info(version)?.is_some() {
            return Err(UltrathinkError::Value(format!(
                "Version {version} is already registered"
            )));
        }
        let parsed = parse_version(version);
        let column = |n: u64| {
            i64::try_from(n).map_err(|_| {
                UltrathinkError::Value(format!(
                    "Version {version} has a component larger than {}",
                    i64::MAX
                ))
            })
        };
        let (major, minor, patch) =
            (column(parsed.major)?, column(parsed.minor)?, column(parsed.patch)?);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE versions SET is_current = FALSE;", [])?;
        tx.execute(
            "INSERT INTO versions \
             (version_string, major, minor, patch, pre_release, build_metadata, \
              created_timestamp, snapshot_file, is_current, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, TRUE, ?9);",
            params![
                version,
                major,
                minor,
                patch,
                parsed.pre_release,
                parsed.build_metadata,
                now_iso(),
                snapshot_file,
                notes,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Registered version {version} with ID {id}");
        Ok(id)
    }

    pub fn get_version_info(&self, version: &str) -> UltrathinkResult<Option<VersionRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                "SELECT * FROM versions WHERE version_string = ?1;",
                params![version],
                VersionRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn get_current_version(&self) -> UltrathinkResult<Option<VersionRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                "SELECT * FROM versions WHERE is_current = TRUE LIMIT 1;",
                [],
                VersionRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Registered versions, highest major/minor/patch first.
    pub fn get_version_history(&self, limit: usize) -> UltrathinkResult<Vec<VersionRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM versions \
             ORDER BY major DESC, minor DESC, patch DESC, created_timestamp DESC \
             LIMIT ?1;",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], VersionRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// -1, 0 or 1 as `a` is lower than, equal to or higher than `b`.
    pub fn compare_versions(&self, a: &str, b: &str) -> i32 {
        match compare_versions(a, b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Next version after the current one, or [`INITIAL_VERSION`] when
    /// nothing is registered.
    pub fn get_next_version(&self, bump: BumpKind) -> UltrathinkResult<String> {
        Ok(match self.get_current_version()? {
            Some(current) => bump_version(&current.version_string, bump)?,
            None => INITIAL_VERSION.to_string(),
        })
    }

    fn require_version(&self, version: &str, role: &str) -> UltrathinkResult<VersionRecord> {
        self.get_version_info(version)?
            .ok_or_else(|| UltrathinkError::Value(format!("{role} version {version} not found")))
    }

    // -----------------------------------------------------------------------
    // Changes
    // -----------------------------------------------------------------------

    /// Store classified changes between two registered versions.
    pub fn record_changes<'a, I>(&self, from: &str, to: &str, changes: I) -> UltrathinkResult<usize>
    where
        I: IntoIterator<Item = &'a ClassifiedChange>,
    {
        let from_info = self.require_version(from, "Source")?;
        let to_info = self.require_version(to, "Target")?;
        let timestamp = now_iso();

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO version_changes \
                 (from_version_id, to_version_id, change_type, element_name, \
                  severity, description, created_timestamp) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for change in changes {
                stmt.execute(params![
                    from_info.id,
                    to_info.id,
                    change.change_type.as_str(),
                    change.element,
                    change.severity.as_str(),
                    change.description,
                    timestamp,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;

        info!("Recorded {count} changes from {from} to {to}");
        Ok(count)
    }

    /// Changes recorded for exactly `from -> to`; empty when either is unknown.
    pub fn get_changes_between_versions(
        &self,
        from: &str,
        to: &str,
    ) -> UltrathinkResult<Vec<ChangeRecord>> {
        let (Some(from_info), Some(to_info)) =
            (self.get_version_info(from)?, self.get_version_info(to)?)
        else {
            return Ok(Vec::new());
        };
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT vc.id, v1.version_string, v2.version_string, vc.change_type, \
                    vc.element_name, vc.severity, vc.description, vc.created_timestamp \
             FROM version_changes vc \
             JOIN versions v1 ON vc.from_version_id = v1.id \
             JOIN versions v2 ON vc.to_version_id = v2.id \
             WHERE vc.from_version_id = ?1 AND vc.to_version_id = ?2 \
             ORDER BY vc.created_timestamp, vc.id;",
        )?;
        let rows = stmt.query_map(params![from_info.id, to_info.id], |row| {
            Ok(ChangeRecord {
                id: row.get(0)?,
                from_version: row.get(1)?,
                to_version: row.get(2)?,
                change_type: row.get(3)?,
                element_name: row.get(4)?,
                severity: row.get(5)?,
                description: row.get(6)?,
                created_timestamp: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -----------------------------------------------------------------------
    // Deprecations
    // -----------------------------------------------------------------------

    /// Record a deprecation. An unregistered removal target is stored as NULL.
    pub fn add_deprecation(
        &self,
        element: &str,
        deprecated_in: &str,
        removal_target: Option<&str>,
        reason: Option<&str>,
        alternative: Option<&str>,
    ) -> UltrathinkResult<i64> {
        let deprecated_info = self.require_version(deprecated_in, "Deprecated")?;
        let removal_id = match removal_target {
            Some(target) => self.get_version_info(target)?.map(|v| v.id),
            None => None,
        };

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO deprecations \
             (element_name, deprecated_in_version_id, removal_target_version_id, \
              reason, alternative, created_timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![element, deprecated_info.id, removal_id, reason, alternative, now_iso()],
        )?;
        info!("Added deprecation for {element} in version {deprecated_in}");
        Ok(conn.last_insert_rowid())
    }

    /// Deprecations, newest first. With `current_version`, only those whose
    /// deprecated-in version is at or below it; an unknown current version
    /// yields nothing.
    pub fn get_deprecations(
        &self,
        current_version: Option<&str>,
    ) -> UltrathinkResult<Vec<DeprecationRecord>> {
        if let Some(current) = current_version {
            if self.get_version_info(current)?.is_none() {
                return Ok(Vec::new());
            }
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.element_name, v1.version_string, v2.version_string, \
                    d.reason, d.alternative, d.created_timestamp \
             FROM deprecations d \
             JOIN versions v1 ON d.deprecated_in_version_id = v1.id \
             LEFT JOIN versions v2 ON d.removal_target_version_id = v2.id \
             ORDER BY d.created_timestamp DESC, d.id DESC;",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DeprecationRecord {
                id: row.get(0)?,
                element_name: row.get(1)?,
                deprecated_in_version: row.get(2)?,
                removal_target_version: row.get(3)?,
                reason: row.get(4)?,
                alternative: row.get(5)?,
                created_timestamp: row.get(6)?,
            })
        })?;
        let mut records = rows.collect::<Result<Vec<_>, _>>()?;
        if let Some(current) = current_version {
            records.retain(|d| {
                compare_versions(&d.deprecated_in_version, current) != Ordering::Greater
            });
        }
        Ok(records)
    }

    pub fn get_statistics(&self) -> UltrathinkResult<TrackerStatistics> {
        let conn = self.connect()?;
        let count = |sql: &str| -> UltrathinkResult<i64> {
            Ok(conn.query_row(sql, [], |row| row.get(0))?)
        };

        let cutoff = (chrono::Local::now() - chrono::Duration::days(30)).to_rfc3339();
        let recent_versions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE created_timestamp > ?1;",
            params![cutoff],
            |row| row.get(0),
        )?;

        let mut stmt =
            conn.prepare("SELECT severity, COUNT(*) FROM version_changes GROUP BY severity;")?;
        let changes_by_severity = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(TrackerStatistics {
            total_versions: count("SELECT COUNT(*) FROM versions;")?,
            total_changes: count("SELECT COUNT(*) FROM version_changes;")?,
            total_deprecations: count("SELECT COUNT(*) FROM deprecations;")?,
            recent_versions,
            current_version: self.get_current_version()?.map(|v| v.version_string),
            latest_version: self
                .get_version_history(1)?
                .into_iter()
                .next()
                .map(|v| v.version_string),
            changes_by_severity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffing::classifier::{ChangeClassifier, ChangeType};
    use crate::diffing::differ::{Compatibility, Severity};

    fn tracker() -> (tempfile::TempDir, VersionTracker) {
        let dir = tempfile::tempdir().unwrap();
        let tracker = VersionTracker::new(dir.path()).unwrap();
        (dir, tracker)
    }

    fn change(element: &str, change_type: ChangeType, severity: Severity) -> ClassifiedChange {
        ClassifiedChange {
            element: element.to_string(),
            change_type,
            severity,
            compatibility_impact: Compatibility::Breaking,
            description: format!("{element} changed"),
            breaking: true,
            deprecation_target: None,
            migration_notes: None,
            change_details: None,
        }
    }

    #[test]
    fn test_current_flag_is_exclusive() {
        let (_dir, tracker) = tracker();
        tracker.register_version("1.0.0", None, None).unwrap();
        tracker.register_version("1.1.0", Some("snap.json"), Some("minor")).unwrap();
        tracker.register_version("1.0.1", None, None).unwrap();

        let current = tracker.get_current_version().unwrap().unwrap();
        assert_eq!(current.version_string, "1.0.1");
        let flagged = tracker
            .get_version_history(50)
            .unwrap()
            .iter()
            .filter(|v| v.is_current)
            .count();
        assert_eq!(flagged, 1);

        let info = tracker.get_version_info("1.1.0").unwrap().unwrap();
        assert_eq!(info.snapshot_file.as_deref(), Some("snap.json"));
        assert_eq!(info.notes.as_deref(), Some("minor"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let (_dir, tracker) = tracker();
        tracker.register_version("1.0.0", None, None).unwrap();
        let err = tracker.register_version("1.0.0", None, None).unwrap_err();
        assert!(matches!(err, UltrathinkError::Value(_)));
    }

    #[test]
    fn test_oversized_version_component_is_rejected() {
        let (_dir, tracker) = tracker();
        let max = i64::MAX;
        let id = tracker.register_version(&format!("1.{max}.0"), None, None).unwrap();
        assert_eq!(tracker.get_current_version().unwrap().unwrap().id, id);
        assert_eq!(tracker.get_current_version().unwrap().unwrap().minor, max);

        let too_big = format!("{}.0.0", i64::MAX as u64 + 1);
        let err = tracker.register_version(&too_big, None, None).unwrap_err();
        assert!(matches!(err, UltrathinkError::Value(_)));
        assert!(tracker.get_version_info(&too_big).unwrap().is_none());
        assert_eq!(tracker.get_current_version().unwrap().unwrap().id, id);
    }

    #[test]
    fn test_history_order_and_next_version() {
        let (_dir, tracker) = tracker();
        assert_eq!(tracker.get_next_version(BumpKind::Minor).unwrap(), "0.1.0");

        tracker.register_version("1.2.0", None, None).unwrap();
        tracker.register_version("1.10.0", None, None).unwrap();
        tracker.register_version("0.9.0", None, None).unwrap();
        let order: Vec<String> = tracker
            .get_version_history(2)
            .unwrap()
            .into_iter()
            .map(|v| v.version_string)
            .collect();
        assert_eq!(order, vec!["1.10.0", "1.2.0"]);

        assert_eq!(tracker.get_next_version(BumpKind::Patch).unwrap(), "0.9.1");
        assert_eq!(tracker.compare_versions("1.2.0", "1.10.0"), -1);
    }

    #[test]
    fn test_record_and_query_changes() {
        let (_dir, tracker) = tracker();
        tracker.register_version("1.0.0", None, None).unwrap();
        tracker.register_version("2.0.0", None, None).unwrap();

        let err = tracker
            .record_changes("1.0.0", "9.9.9", &[change("x", ChangeType::Removal, Severity::High)])
            .unwrap_err();
        assert!(matches!(err, UltrathinkError::Value(_)));

        let changes = vec![
            change("fetch", ChangeType::Removal, Severity::Critical),
            change("Reader", ChangeType::Modification, Severity::High),
        ];
        assert_eq!(tracker.record_changes("1.0.0", "2.0.0", &changes).unwrap(), 2);

        let stored = tracker.get_changes_between_versions("1.0.0", "2.0.0").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].change_type, "removal");
        assert_eq!(stored[0].severity, "critical");
        assert_eq!(stored[1].from_version, "1.0.0");
        assert!(tracker.get_changes_between_versions("1.0.0", "3.0.0").unwrap().is_empty());

        let stats = tracker.get_statistics().unwrap();
        assert_eq!(stats.total_versions, 2);
        assert_eq!(stats.total_changes, 2);
        assert_eq!(stats.recent_versions, 2);
        assert_eq!(stats.changes_by_severity["critical"], 1);
        assert_eq!(stats.current_version.as_deref(), Some("2.0.0"));
        assert_eq!(stats.latest_version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_record_classified_diff() {
        use crate::diffing::differ::compare_snapshots;
        use crate::diffing::differ::tests::{function, snapshot};

        let (_dir, tracker) = tracker();
        tracker.register_version("1.0.0", None, None).unwrap();
        tracker.register_version("1.1.0", None, None).unwrap();
        let diff = compare_snapshots(
            &snapshot("1.0.0", vec![function("collector_run", &[], None)]),
            &snapshot("1.1.0", vec![function("new_helper", &[], None)]),
        );
        let classified = ChangeClassifier::new().classify_changes(diff);
        let count = tracker
            .record_changes("1.0.0", "1.1.0", classified.classified_changes.iter())
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_deprecations() {
        let (_dir, tracker) = tracker();
        tracker.register_version("1.0.0", None, None).unwrap();
        tracker.register_version("1.5.0", None, None).unwrap();
        tracker.register_version("2.0.0", None, None).unwrap();

        let err = tracker
            .add_deprecation("old", "0.5.0", None, None, None)
            .unwrap_err();
        assert!(matches!(err, UltrathinkError::Value(_)));

        tracker
            .add_deprecation("old_fetch", "1.0.0", Some("2.0.0"), Some("slow"), Some("fetch"))
            .unwrap();
        tracker
            .add_deprecation("legacy", "1.5.0", Some("7.0.0"), None, None)
            .unwrap();

        let all = tracker.get_deprecations(None).unwrap();
        assert_eq!(all.len(), 2);
        let legacy = all.iter().find(|d| d.element_name == "legacy").unwrap();
        assert_eq!(legacy.removal_target_version, None);
        let old = all.iter().find(|d| d.element_name == "old_fetch").unwrap();
        assert_eq!(old.removal_target_version.as_deref(), Some("2.0.0"));
        assert_eq!(old.alternative.as_deref(), Some("fetch"));

        let upto_one = tracker.get_deprecations(Some("1.0.0")).unwrap();
        assert_eq!(upto_one.len(), 1);
        assert_eq!(tracker.get_deprecations(Some("2.0.0")).unwrap().len(), 2);
        assert!(tracker.get_deprecations(Some("3.0.0")).unwrap().is_empty());
    }
}
