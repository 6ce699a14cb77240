//! Configuration loading from `ultrathink.toml`.
//!
//! Every section is optional and falls back to defaults. Environment
//! variables are applied on top of the file:
//!
//! - `ULTRATHINK_STORAGE_ROOT` overrides `[storage].root`
//! - `ULTRATHINK_SENSITIVITY` overrides `[hashing].sensitivity`
//! - `ULTRATHINK_RUN_DOCTESTS` overrides `[validation].run_doctests`
//!
//! ```toml
//! [package]
//! name = "gapless_crypto_data"
//! source_directory = "src"
//!
//! [storage]
//! root = "docs/ultrathink/storage"
//!
//! [hashing]
//! sensitivity = "strict"
//!
//! [validation]
//! completeness_threshold = 0.95
//!
//! [gating]
//! breaking_change_tolerance = "none"
//! maintainers = ["alice"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ci::gating::BreakingChangeTolerance;
use crate::errors::{UltrathinkError, UltrathinkResult};
use crate::introspection::hasher::Sensitivity;

/// Default location of the config file, relative to the project root.
pub const DEFAULT_CONFIG_PATH: &str = "docs/ultrathink/config/ultrathink.toml";

/// Default storage root for snapshots, diffs, generated docs and the tracker DB.
pub const DEFAULT_STORAGE_ROOT: &str = "docs/ultrathink/storage";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UltrathinkConfig {
    #[serde(default)]
    pub package: PackageSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub hashing: HashingSection,
    #[serde(default)]
    pub classification: ClassificationSection,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub gating: GatingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSection {
    pub name: Option<String>,
    /// Directory that contains the package directory (or is the package directory).
    pub source_directory: PathBuf,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            name: None,
            source_directory: PathBuf::from("src"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub root: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSection {
    pub sensitivity: Sensitivity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSection {
    /// Replaces the built-in "core functionality" removal patterns when non-empty.
    pub core_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub completeness_threshold: f64,
    pub doctest_pass_rate: f64,
    pub run_doctests: bool,
    pub python_executable: String,
    pub doctest_timeout_secs: u64,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            completeness_threshold: 0.95,
            doctest_pass_rate: 1.0,
            run_doctests: true,
            python_executable: "python3".to_string(),
            doctest_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatingSection {
    pub require_maintainer_override: bool,
    pub breaking_change_tolerance: BreakingChangeTolerance,
    pub maintainers: Vec<String>,
}

impl Default for GatingSection {
    fn default() -> Self {
        Self {
            require_maintainer_override: true,
            breaking_change_tolerance: BreakingChangeTolerance::None,
            maintainers: Vec::new(),
        }
    }
}

impl UltrathinkConfig {
    /// Load configuration from `path`, then apply environment overrides.
    ///
    /// A missing file yields defaults; a malformed file is an error.
    pub fn load(path: &Path) -> UltrathinkResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<UltrathinkConfig>(&content)?
        } else {
            tracing::warn!("Config file not found: {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ULTRATHINK_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> UltrathinkResult<()> {
        if let Ok(root) = std::env::var("ULTRATHINK_STORAGE_ROOT") {
            if !root.trim().is_empty() {
                self.storage.root = PathBuf::from(root.trim());
            }
        }
        if let Ok(level) = std::env::var("ULTRATHINK_SENSITIVITY") {
            self.hashing.sensitivity = level.parse()?;
        }
        if let Ok(val) = std::env::var("ULTRATHINK_RUN_DOCTESTS") {
            let v = val.trim().to_lowercase();
            self.validation.run_doctests = !matches!(v.as_str(), "0" | "false" | "no" | "off");
        }
        Ok(())
    }

    fn validate(&self) -> UltrathinkResult<()> {
        let threshold = self.validation.completeness_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(UltrathinkError::Config(format!(
                "completeness_threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }
        let rate = self.validation.doctest_pass_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(UltrathinkError::Config(format!(
                "doctest_pass_rate must be between 0.0 and 1.0, got {rate}"
            )));
        }
        Ok(())
    }

    /// Config for `package`, rooted at the defaults.
    pub fn for_package(package: &str) -> Self {
        let mut config = Self::default();
        config.package.name = Some(package.to_string());
        config
    }

    pub fn to_toml_string(&self) -> UltrathinkResult<String> {
        toml::to_string_pretty(self).map_err(|e| UltrathinkError::Config(e.to_string()))
    }

    /// Write this config to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> UltrathinkResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UltrathinkConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.validation.completeness_threshold, 0.95);
        assert!(config.gating.require_maintainer_override);
        assert_eq!(config.package.source_directory, PathBuf::from("src"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let parsed: UltrathinkConfig = toml::from_str(
            r#"
            [package]
            name = "demo"

            [hashing]
            sensitivity = "relaxed"

            [gating]
            breaking_change_tolerance = "medium"
            maintainers = ["alice"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.package.name.as_deref(), Some("demo"));
        assert_eq!(parsed.hashing.sensitivity, Sensitivity::Relaxed);
        assert_eq!(
            parsed.gating.breaking_change_tolerance,
            BreakingChangeTolerance::Medium
        );
        assert!(parsed.gating.require_maintainer_override);
        assert_eq!(parsed.validation.doctest_pass_rate, 1.0);
        assert_eq!(parsed.storage.root, PathBuf::from(DEFAULT_STORAGE_ROOT));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ultrathink.toml");
        std::fs::write(&path, "[validation\ncompleteness_threshold = ").unwrap();
        assert!(matches!(
            UltrathinkConfig::load(&path),
            Err(UltrathinkError::Toml(_))
        ));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ultrathink.toml");
        std::fs::write(&path, "[validation]\ncompleteness_threshold = 1.5\n").unwrap();
        assert!(matches!(
            UltrathinkConfig::load(&path),
            Err(UltrathinkError::Config(_))
        ));
    }

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("ultrathink.toml");
        let mut config = UltrathinkConfig::for_package("demo");
        config.gating.maintainers = vec!["bob".to_string()];
        config.write(&path).unwrap();

        let loaded: UltrathinkConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.package.name.as_deref(), Some("demo"));
        assert_eq!(loaded.gating.maintainers, vec!["bob".to_string()]);
    }
}
