//! Revision cache
//!
//! Persistent record of the last successfully installed revision per recipe.
//! Stored as TOML next to the install tree it describes:
//!
//! ```toml
//! version = 1
//!
//! [recipes.jansson]
//! revision = "2.14"
//! installed_at = 1700000000
//! ```
//!
//! The cache is advisory. An entry only counts when its revision matches the
//! recipe's current revision and the install directory still exists.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::defaults::CACHE_FORMAT_VERSION;
use crate::error::CacheError;

/// One cached install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Revision that was installed
    pub revision: String,
    /// Seconds since the Unix epoch
    #[serde(default)]
    pub installed_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    recipes: BTreeMap<String, CacheEntry>,
}

/// Outcome of checking a recipe against the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CacheStatus {
    /// Recorded revision matches and the install directory exists
    Fresh,
    /// A different revision was installed
    Stale { recorded: String },
    /// Nothing recorded
    Missing,
    /// Revision matches but the install directory is gone
    Inconsistent,
}

impl CacheStatus {
    /// Whether the recipe can skip its whole pipeline
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "cached"),
            Self::Stale { recorded } => write!(f, "stale (installed {recorded})"),
            Self::Missing => write!(f, "not built"),
            Self::Inconsistent => write!(f, "install missing"),
        }
    }
}

/// Revision cache bound to its file
#[derive(Debug, Clone)]
pub struct RevisionCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl RevisionCache {
    /// An empty cache that will be written to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache; a missing file is an empty cache
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        if !path.exists() {
            debug!("No revision cache at {}", path.display());
            return Ok(Self::empty(path));
        }

        let content = fs::read_to_string(path).map_err(|e| CacheError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let file: CacheFile = toml::from_str(&content).map_err(|e| CacheError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        if file.version > CACHE_FORMAT_VERSION {
            return Err(CacheError::Parse {
                path: path.to_path_buf(),
                error: format!(
                    "unsupported format version {} (expected {CACHE_FORMAT_VERSION})",
                    file.version
                ),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries: file.recipes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last installed revision of a recipe
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.revision.as_str())
    }

    pub fn entry(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// Classify a recipe's cache state
    pub fn status(&self, name: &str, revision: &str, install_dir: &Path) -> CacheStatus {
        match self.lookup(name) {
            None => CacheStatus::Missing,
            Some(recorded) if recorded != revision => CacheStatus::Stale {
                recorded: recorded.to_string(),
            },
            Some(_) if !install_dir.is_dir() => CacheStatus::Inconsistent,
            Some(_) => CacheStatus::Fresh,
        }
    }

    /// Record a successful install and persist immediately
    pub fn record(&mut self, name: &str, revision: &str) -> Result<(), CacheError> {
        let installed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.entries.insert(
            name.to_string(),
            CacheEntry {
                revision: revision.to_string(),
                installed_at,
            },
        );
        debug!("Recorded {name} at revision {revision}");
        self.save()
    }

    /// Drop a recipe's entry and persist; returns whether one existed
    pub fn forget(&mut self, name: &str) -> Result<bool, CacheError> {
        let existed = self.entries.remove(name).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Write the cache file atomically
    pub fn save(&self) -> Result<(), CacheError> {
        let write_err = |e: &dyn fmt::Display| CacheError::Write {
            path: self.path.clone(),
            error: e.to_string(),
        };

        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            recipes: self.entries.clone(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| write_err(&e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(|e| write_err(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| write_err(&e))?;
        Ok(())
    }

    /// Recipe names with entries, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::{recipe_name, revision};
    use proptest::prelude::*;
    use tempfile::TempDir;

    // ============================================
    // Unit Tests
    // ============================================

    #[test]
    fn test_missing_file_is_empty_cache() {
        let temp = TempDir::new().unwrap();
        let cache = RevisionCache::load(&temp.path().join("revisions.toml")).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup("jansson"), None);
    }

    #[test]
    fn test_record_persists_immediately() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tree/revisions.toml");

        let mut cache = RevisionCache::load(&path).unwrap();
        cache.record("jansson", "2.14").unwrap();

        let reloaded = RevisionCache::load(&path).unwrap();
        assert_eq!(reloaded.lookup("jansson"), Some("2.14"));
        assert!(reloaded.entry("jansson").unwrap().installed_at > 0);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_status_classification() {
        let temp = TempDir::new().unwrap();
        let install_dir = temp.path().join("Jansson");
        let mut cache = RevisionCache::empty(temp.path().join("revisions.toml"));

        assert_eq!(cache.status("jansson", "2.14", &install_dir), CacheStatus::Missing);

        cache.record("jansson", "2.14").unwrap();
        assert_eq!(
            cache.status("jansson", "2.14", &install_dir),
            CacheStatus::Inconsistent
        );

        std::fs::create_dir_all(&install_dir).unwrap();
        assert_eq!(cache.status("jansson", "2.14", &install_dir), CacheStatus::Fresh);
        assert_eq!(
            cache.status("jansson", "2.15", &install_dir),
            CacheStatus::Stale {
                recorded: "2.14".to_string()
            }
        );
    }

    #[test]
    fn test_forget_removes_entry() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("revisions.toml");
        let mut cache = RevisionCache::empty(&path);
        cache.record("curl", "8.4.0").unwrap();

        assert!(cache.forget("curl").unwrap());
        assert!(!cache.forget("curl").unwrap());
        assert_eq!(RevisionCache::load(&path).unwrap().lookup("curl"), None);
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("revisions.toml");
        std::fs::write(&path, "this is [not toml").unwrap();

        assert!(matches!(
            RevisionCache::load(&path),
            Err(CacheError::Parse { .. })
        ));
    }

    #[test]
    fn test_newer_format_version_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("revisions.toml");
        std::fs::write(&path, "version = 99\n").unwrap();

        assert!(RevisionCache::load(&path).is_err());
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Whatever is recorded comes back after a reload
        #[test]
        fn prop_recorded_revisions_survive_reload(
            entries in proptest::collection::btree_map(recipe_name(), revision(), 0..10)
        ) {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("revisions.toml");
            let mut cache = RevisionCache::empty(&path);
            for (name, rev) in &entries {
                cache.record(name, rev).unwrap();
            }

            let reloaded = RevisionCache::load(&path).unwrap();
            prop_assert_eq!(reloaded.len(), entries.len());
            for (name, rev) in &entries {
                prop_assert_eq!(reloaded.lookup(name), Some(rev.as_str()));
            }
        }
    }
}
