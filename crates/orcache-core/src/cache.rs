use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::{OrcError, Result};
use crate::model::{ModelInfo, ModelInfoMap};

/// File name of the model cache, shared with the host application.
pub const OPENROUTER_MODELS_FILE: &str = "openrouter_models.json";

/// Return the default storage root for orcache data.
///
/// `$ORCACHE_HOME` wins over the platform data directory.
#[cfg(feature = "network")]
pub fn default_storage_root() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("ORCACHE_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(home));
    }
    Some(dirs::data_dir()?.join("orcache"))
}

/// Return `{storage_root}/cache`, creating it if it doesn't exist.
pub fn ensure_cache_dir(storage_root: &Path) -> Result<PathBuf> {
    let dir = storage_root.join("cache");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| OrcError::Io(format!("cannot create {}: {e}", dir.display())))?;
    }
    Ok(dir)
}

/// On-disk store of model ID → [`ModelInfo`].
///
/// Writes replace the whole file through a temp file and a rename, so readers
/// never see a half-written cache. Merges through one `CacheStore` are
/// serialized; two processes (or two stores on the same path) can still lose
/// an update when their read-merge-write cycles interleave.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the model cache under a host storage root.
    pub fn in_storage_root(storage_root: &Path) -> Result<Self> {
        Ok(Self::new(ensure_cache_dir(storage_root)?.join(OPENROUTER_MODELS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache file as raw JSON entries. `Ok(None)` if the file does not exist.
    ///
    /// Fails only when the file cannot be read, is not JSON, or is not a JSON object.
    pub fn try_read_raw(&self) -> Result<Option<Map<String, Value>>> {
        let cache_err = |reason: String| OrcError::CacheRead {
            path: self.path.clone(),
            reason,
        };
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(cache_err(e.to_string())),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => Ok(Some(entries)),
            Ok(_) => Err(cache_err("top level is not a JSON object".into())),
            Err(e) => Err(cache_err(e.to_string())),
        }
    }

    /// Read the whole cache. `Ok(None)` if the file does not exist.
    ///
    /// Entries that do not decode as [`ModelInfo`] are skipped with a warning;
    /// they stay on disk untouched.
    pub fn try_read(&self) -> Result<Option<ModelInfoMap>> {
        Ok(self.try_read_raw()?.map(|entries| self.decode(entries)))
    }

    /// Read the whole cache, treating an unreadable file like a missing one.
    pub fn read(&self) -> Option<ModelInfoMap> {
        match self.try_read() {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable model cache");
                None
            }
        }
    }

    pub fn get(&self, model_id: &str) -> Option<ModelInfo> {
        self.read()?.remove(model_id)
    }

    /// Overlay `update` on the current contents and write the result back.
    ///
    /// Returns the merged map. Entries not named in `update` are written back
    /// exactly as they were read, including ones that do not decode.
    pub fn merge(&self, update: ModelInfoMap) -> Result<ModelInfoMap> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = match self.try_read_raw() {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "replacing unreadable model cache");
                Map::new()
            }
        };
        for (model_id, info) in update {
            entries.insert(model_id, serde_json::to_value(info)?);
        }
        self.write(&entries)?;
        Ok(self.decode(entries))
    }

    fn decode(&self, entries: Map<String, Value>) -> ModelInfoMap {
        entries
            .into_iter()
            .filter_map(|(model_id, raw)| match serde_json::from_value(raw) {
                Ok(info) => Some((model_id, info)),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        model_id,
                        error = %e,
                        "skipping undecodable cache entry"
                    );
                    None
                }
            })
            .collect()
    }

    fn write(&self, entries: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .map_err(|e| OrcError::Io(format!("failed to write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            OrcError::Io(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(context_window: u64) -> ModelInfo {
        ModelInfo {
            context_window,
            ..Default::default()
        }
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nope.json"));
        assert!(store.try_read().unwrap().is_none());
        assert!(store.read().is_none());
    }

    #[test]
    fn malformed_file_is_cache_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = CacheStore::new(&path);
        assert!(matches!(store.try_read(), Err(OrcError::CacheRead { .. })));
        assert!(store.read().is_none());
    }

    #[test]
    fn merge_accumulates_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("models.json"));

        store.merge(ModelInfoMap::from([("a".into(), info(1))])).unwrap();
        store.merge(ModelInfoMap::from([("b".into(), info(2))])).unwrap();
        let merged = store.merge(ModelInfoMap::from([("a".into(), info(3))])).unwrap();

        assert_eq!(merged.len(), 2);
        let on_disk = store.read().unwrap();
        assert_eq!(on_disk, merged);
        assert_eq!(on_disk["a"].context_window, 3);
        assert_eq!(on_disk["b"].context_window, 2);
        assert!(!dir.path().join("models.json.tmp").exists());
    }

    #[test]
    fn merge_over_malformed_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let store = CacheStore::new(&path);
        let merged = store.merge(ModelInfoMap::from([("a".into(), info(1))])).unwrap();
        assert_eq!(merged.len(), 1);
        assert!(store.try_read().unwrap().is_some());
    }

    #[test]
    fn non_object_top_level_is_cache_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let store = CacheStore::new(&path);
        assert!(matches!(store.try_read(), Err(OrcError::CacheRead { .. })));
    }

    #[test]
    fn undecodable_entry_is_skipped_but_kept_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(
            &path,
            r#"{"a/b":{"contextWindow":"big"},"x/y":{"contextWindow":32000}}"#,
        )
        .unwrap();
        let store = CacheStore::new(&path);

        let models = store.read().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models["x/y"].context_window, 32000);

        let merged = store.merge(ModelInfoMap::from([("c/d".into(), info(7))])).unwrap();
        assert_eq!(merged.len(), 2);
        let raw = store.try_read_raw().unwrap().unwrap();
        assert_eq!(raw["a/b"]["contextWindow"], "big");
        assert!(raw.contains_key("x/y"));
        assert!(raw.contains_key("c/d"));
    }

    #[test]
    fn storage_root_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::in_storage_root(dir.path()).unwrap();
        assert_eq!(store.path(), dir.path().join("cache").join(OPENROUTER_MODELS_FILE));
        assert!(dir.path().join("cache").is_dir());
    }
}
