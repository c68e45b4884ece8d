use std::cmp;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use tempfile::NamedTempFile;

/// Errors while saving the query cache
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cache i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache rename: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Fewest unsaved answers that trigger a save
pub const MIN_SAVE_INTERVAL: usize = 1024;

/// Oracle answers keyed by the queried ciphertext's hex encoding
///
/// Entries are only ever added. A file backed cache is saved once the
/// unsaved answers reach a quarter of the cache (and at least
/// `MIN_SAVE_INTERVAL`), on `flush`, and on drop. A save writes the whole
/// map to a temporary file in the same directory and renames it over the
/// old one, so an interrupted write never leaves a truncated cache behind.
#[derive(Debug, Default)]
pub struct QueryCache {
    path: Option<PathBuf>,
    entries: HashMap<String, bool>,
    unsaved: usize,
}

impl QueryCache {
    /// Cache that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache stored at path
    ///
    /// A missing, unreadable or corrupt file yields an empty cache
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read(&path) {
            Ok(data) => match serde_json::from_slice::<HashMap<String, bool>>(&data) {
                Ok(entries) => {
                    tracing::info!(path = %path.display(), entries = entries.len(), "loaded query cache");
                    entries
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt query cache, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable query cache, starting empty");
                HashMap::new()
            }
        };

        Self {
            path: Some(path),
            entries,
            unsaved: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of answers not yet written to the backing file
    pub fn unsaved(&self) -> usize {
        self.unsaved
    }

    /// Record an answer, saving the cache when enough answers are pending
    ///
    /// The entry is kept in memory even if saving fails
    pub fn insert(&mut self, key: String, value: bool) -> Result<(), Error> {
        if self.entries.insert(key, value) != Some(value) {
            self.unsaved += 1;
        }

        if self.unsaved >= cmp::max(MIN_SAVE_INTERVAL, self.entries.len() / 4) {
            self.flush()?;
        }

        Ok(())
    }

    /// Write pending answers to the backing file
    pub fn flush(&mut self) -> Result<(), Error> {
        if self.unsaved == 0 {
            return Ok(());
        }

        self.save()?;
        self.unsaved = 0;

        Ok(())
    }

    fn save(&self) -> Result<(), Error> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &self.entries)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        Ok(())
    }
}

impl Drop for QueryCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, unsaved = self.unsaved, "failed to persist query cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = QueryCache::open(&path);
        assert!(cache.is_empty());

        cache.insert("00ab".to_string(), true).unwrap();
        cache.insert("00cd".to_string(), false).unwrap();
        assert_eq!(cache.get("00ab"), Some(true));

        // nothing is written until enough answers are pending
        assert!(!path.exists());
        assert_eq!(cache.unsaved(), 2);

        cache.flush().unwrap();
        assert_eq!(cache.unsaved(), 0);

        let reloaded = QueryCache::open(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("00ab"), Some(true));
        assert_eq!(reloaded.get("00cd"), Some(false));
        assert_eq!(reloaded.get("00ef"), None);

        // only the cache itself remains, no temporaries
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn check_corrupt_cache_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{\"00ab\": tru").unwrap();

        let mut cache = QueryCache::open(&path);
        assert!(cache.is_empty());

        // the next write replaces the corrupt file
        cache.insert("00ab".to_string(), true).unwrap();
        cache.flush().unwrap();
        assert_eq!(QueryCache::open(&path).get("00ab"), Some(true));
    }

    #[test]
    fn check_in_memory() {
        let mut cache = QueryCache::in_memory();
        cache.insert("ff".to_string(), false).unwrap();
        assert_eq!(cache.get("ff"), Some(false));
        assert!(cache.path().is_none());
    }

    #[test]
    fn check_dropped_cache_reloads_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let count = 2 * MIN_SAVE_INTERVAL + 7;

        {
            let mut cache = QueryCache::open(&path);
            for i in 0..count {
                cache.insert(format!("{:04x}", i), i % 3 == 0).unwrap();
            }
            // periodic saves ran, the tail is still pending
            assert!(path.exists());
            assert!(cache.unsaved() > 0);
            assert!(cache.unsaved() < count);
        }

        let reloaded = QueryCache::open(&path);
        assert_eq!(reloaded.len(), count);
        for i in 0..count {
            assert_eq!(reloaded.get(&format!("{:04x}", i)), Some(i % 3 == 0));
        }
    }

    #[test]
    fn check_repeated_answer_is_not_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = QueryCache::open(dir.path().join("cache.json"));

        cache.insert("00ab".to_string(), true).unwrap();
        cache.flush().unwrap();
        cache.insert("00ab".to_string(), true).unwrap();
        assert_eq!(cache.unsaved(), 0);
    }
}
