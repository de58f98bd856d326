//! Configuration file loading.
//!
//! Resolution order for the config file:
//! 1. Explicit path (command-line flag)
//! 2. `PHOTMERGE_CONFIG` environment variable
//! 3. `photmerge.toml` in the working directory
//! 4. Built-in defaults

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::merge::MergeOptions;
use crate::normalize::{Normalizer, Rewrite, CATALOG_PREFIXES};
use crate::store::DEFAULT_EXTENSION;
use crate::table::TableFormat;

pub const CONFIG_ENV_VAR: &str = "PHOTMERGE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "photmerge.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub merge: MergeOptions,
    pub table: TableFormat,
    pub names: NamesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub dir: PathBuf,
    pub extension: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// Extra identifier rules on top of the built-in ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesConfig {
    pub prefixes: Vec<String>,
    /// Exact identifier -> replacement.
    pub rename: BTreeMap<String, String>,
    /// Exact identifier -> appended suffix.
    pub suffix: BTreeMap<String, String>,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            prefixes: CATALOG_PREFIXES.iter().map(|p| p.to_string()).collect(),
            rename: BTreeMap::new(),
            suffix: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the config found by [`resolve_path`], or defaults when there is none.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_path(explicit) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Built-in naming rules plus those from `[names]`.
    pub fn normalizer(&self) -> Result<Normalizer> {
        let mut normalizer = Normalizer::default().with_prefixes(&self.names.prefixes);
        for (from, to) in &self.names.rename {
            normalizer = normalizer.with_rule(from, Rewrite::Rename(to.clone()))?;
        }
        for (from, suffix) in &self.names.suffix {
            normalizer = normalizer.with_rule(from, Rewrite::Suffix(suffix.clone()))?;
        }
        Ok(normalizer)
    }
}

/// Pick the config file to load. An explicit path always wins, even if it
/// does not exist (loading then reports the error).
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureMode, FilterSource};

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
[archive]
dir = "/data/ext"
extension = "dat"

[merge]
label = "IRAC4"
marker = "IRAC4"
unit = "mJy"
aperture = "r2"
calibration_fraction = 0.03
backup_label = "irac_v2"
filter_source = "current"
failure_mode = "lenient"

[table]
apertures = ["r1", "r2"]

[names.rename]
"BD+56524" = "bd+56d524"

[names.suffix]
"vicyg8" = "a"
"#,
        )
        .unwrap();

        assert_eq!(config.archive.dir, PathBuf::from("/data/ext"));
        assert_eq!(config.merge.label, "IRAC4");
        assert_eq!(config.merge.calibration_fraction, 0.03);
        assert_eq!(config.merge.backup_label(), "irac_v2");
        assert_eq!(config.merge.filter_source, FilterSource::Current);
        assert_eq!(config.merge.failure_mode, FailureMode::Lenient);
        assert_eq!(config.table.apertures, vec!["r1", "r2"]);

        let n = config.normalizer().unwrap();
        assert_eq!(n.normalize("BD+56524").as_str(), "bd+56d524");
        assert_eq!(n.normalize("VICyg8").as_str(), "vicyg8a");
        assert_eq!(n.normalize("bd+631964").as_str(), "bd+63d1964");
    }

    #[test]
    fn test_partial_merge_section_keeps_defaults() {
        let config = Config::parse("[merge]\nlabel = \"WISE4\"\n").unwrap();
        assert_eq!(config.merge.label, "WISE4");
        assert_eq!(config.merge.unit, "mJy");
        assert_eq!(config.merge.marker(), "WISE4");
        assert_eq!(config.merge.backup_label(), "wise4");
        assert_eq!(config.merge.failure_mode, FailureMode::Strict);
    }

    #[test]
    fn test_chained_name_rules_rejected() {
        let config = Config::parse(
            "[names.rename]\n\"ngc1\" = \"ngc2\"\n\"ngc2\" = \"ngc3\"\n",
        )
        .unwrap();
        assert!(config.normalizer().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::parse("[merge\nlabel=").unwrap_err();
        assert!(err.to_string().starts_with("config error"));
    }

    #[test]
    fn test_unknown_failure_mode_rejected() {
        assert!(Config::parse("[merge]\nfailure_mode = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[archive]\ndir = \"/x\"\n").unwrap();

        let (config, found) = Config::discover(Some(&path)).unwrap();
        assert_eq!(found.as_deref(), Some(path.as_path()));
        assert_eq!(config.archive.dir, PathBuf::from("/x"));
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::discover(Some(&tmp.path().join("missing.toml"))).is_err());
    }
}
