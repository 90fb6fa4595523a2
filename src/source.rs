//! Data source seam and in-memory caches.
//!
//! All session files are static and addressed by a path relative to one data
//! directory. The `TelemetrySource` trait keeps retrieval mechanics out of
//! the pipeline; the filesystem implementation is what the binary uses.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::PitviewError;

pub trait TelemetrySource: Send + Sync {
    /// Reads the whole file at `path` (relative to the source root).
    fn fetch_text(&self, path: &str) -> Result<String, PitviewError>;

    /// Years with a catalog index available.
    fn years(&self) -> Vec<String>;

    /// Reads and parses a whole JSON document. A document that does not
    /// parse is treated the same as one that could not be fetched.
    fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PitviewError>
    where
        Self: Sized,
    {
        let text = self.fetch_text(path)?;
        serde_json::from_str(&text).map_err(|e| PitviewError::DocumentParse {
            path: path.to_string(),
            source: e,
        })
    }
}

pub struct FsTelemetrySource {
    base: PathBuf,
}

impl FsTelemetrySource {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &PathBuf {
        &self.base
    }
}

const CATALOG_SUFFIX: &str = "_MeetingsIndex.json";

impl TelemetrySource for FsTelemetrySource {
    fn fetch_text(&self, path: &str) -> Result<String, PitviewError> {
        let full = self.base.join(path);
        fs::read_to_string(&full).map_err(|e| PitviewError::SourceRead {
            path: path.to_string(),
            source: e,
        })
    }

    fn years(&self) -> Vec<String> {
        let mut years = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.base) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(year) = name.strip_suffix(CATALOG_SUFFIX)
                    && !year.is_empty()
                    && year.chars().all(|c| c.is_ascii_digit())
                {
                    years.push(year.to_string());
                }
            }
        }
        years.sort();
        years
    }
}

/// Path-keyed cache, populated at most once per key. The UI thread is the
/// only writer; values are shared out as `Arc` so loader threads can hold
/// them without copying.
pub struct DataCache<T> {
    entries: HashMap<String, Arc<T>>,
}

impl<T> Default for DataCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> DataCache<T> {
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.entry(key).or_insert_with(|| value).clone()
    }

    pub fn get_or_load(
        &mut self,
        key: &str,
        load: impl FnOnce() -> Result<T, PitviewError>,
    ) -> Result<Arc<T>, PitviewError> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let value = load()?;
        Ok(self.insert(key.to_string(), value))
    }

    /// Caches are scoped explicitly; this is for the ones torn down on a
    /// data-directory change.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn fs_source_reads_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        let mut f = File::create(dir.path().join("sub/file.json")).unwrap();
        writeln!(f, "{{\"ok\": true}}").unwrap();

        let source = FsTelemetrySource::new(dir.path().to_path_buf());
        let text = source.fetch_text("sub/file.json").unwrap();
        assert!(text.contains("ok"));

        let err = source.fetch_text("missing.json").unwrap_err();
        assert!(matches!(err, PitviewError::SourceRead { .. }));
    }

    #[test]
    fn fs_source_lists_catalog_years() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "2024_MeetingsIndex.json",
            "2025_MeetingsIndex.json",
            "notes.txt",
            "_MeetingsIndex.json",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }
        let source = FsTelemetrySource::new(dir.path().to_path_buf());
        assert_eq!(source.years(), vec!["2024", "2025"]);
    }

    #[test]
    fn fetch_json_maps_parse_failure_to_document_parse() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("broken.json")).unwrap();
        writeln!(f, "not json").unwrap();
        let source = FsTelemetrySource::new(dir.path().to_path_buf());
        let result: Result<serde_json::Value, _> = source.fetch_json("broken.json");
        assert!(matches!(
            result.unwrap_err(),
            PitviewError::DocumentParse { .. }
        ));
    }

    #[test]
    fn cache_populates_each_key_once() {
        let mut cache = DataCache::<u32>::default();
        let loads = Cell::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_load("k", || {
                    loads.set(loads.get() + 1);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn cache_load_failure_leaves_key_empty() {
        let mut cache = DataCache::<u32>::default();
        let err = cache.get_or_load("k", || {
            Err(PitviewError::SourceRead {
                path: "k".to_string(),
                source: std::io::Error::other("boom"),
            })
        });
        assert!(err.is_err());
        assert!(cache.get("k").is_none());
    }
}
