//! Cache manager for persisting normalized API responses to disk
//!
//! Provides a `CacheManager` that stores serializable data as JSON files, one
//! directory per provider. Freshness is judged purely from the file's
//! modification time against a TTL supplied by the caller on every read.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Distinguishes temporary files written by one process
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was written, taken from the file's modification time
    pub cached_at: DateTime<Utc>,
    /// Age of the entry at read time
    pub age: Duration,
}

/// File count and size for one cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub cache_dir: PathBuf,
}

impl CacheStats {
    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Manages reading and writing cached data to disk
///
/// Every `read` goes back to disk; there is no in-memory mirror, so several
/// processes sharing a cache directory see each other's writes immediately.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Returns the XDG-compliant cache root (`~/.cache/hscontent/` on Linux)
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn default_root() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "hscontent")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Creates the manager for one provider's subdirectory under `root`
    pub fn for_provider(root: &Path, provider_id: &str) -> Self {
        Self::with_dir(root.join(provider_id))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Writes data to the cache, replacing any previous entry for `key`
    ///
    /// The payload is written to a temporary sibling, synced, then renamed over
    /// the target, so a concurrent reader sees either the old or the new file.
    /// Each write gets its own temporary file, so concurrent writers of one
    /// key never publish each other's partial output.
    ///
    /// # Arguments
    /// * `key` - Unique identifier for the cache entry (e.g., "subjects")
    /// * `data` - The data to cache (must implement Serialize)
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> std::io::Result<()> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let target = self.entry_path(key);
        let tmp = self.cache_dir.join(format!(
            ".{}.{}.{}.tmp",
            key,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = (|| {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &target)
        })();
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written?;
        debug!(key, dir = %self.cache_dir.display(), "cache write");
        Ok(())
    }

    /// Reads data from the cache
    ///
    /// Returns `None` if the entry doesn't exist, is at least `ttl` old, or
    /// cannot be parsed. A malformed file is logged and treated as a miss.
    pub fn read<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<CachedData<T>> {
        let path = self.entry_path(key);
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;

        // A clock step backwards makes mtime look like the future; count that as age zero.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= ttl {
            debug!(key, age_secs = age.as_secs(), ttl_secs = ttl.as_secs(), "cache entry expired");
            return None;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache file, treating as miss");
                return None;
            }
        };
        let data = match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed cache file, treating as miss");
                return None;
            }
        };

        Some(CachedData {
            data,
            cached_at: DateTime::<Utc>::from(modified),
            age,
        })
    }

    /// Removes every file in the cache directory, returning how many were deleted
    pub fn clear(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for (path, _) in self.entries()? {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Counts files and bytes in the cache directory
    ///
    /// A directory that has never been written reports zero files.
    pub fn stats(&self) -> std::io::Result<CacheStats> {
        let entries = self.entries()?;
        Ok(CacheStats {
            file_count: entries.len(),
            total_size_bytes: entries.iter().map(|(_, meta)| meta.len()).sum(),
            cache_dir: self.cache_dir.clone(),
        })
    }

    /// Deletes the least recently written files until the directory holds at
    /// most `max_total_bytes`. Returns the number of files removed.
    ///
    /// Nothing calls this implicitly; the cache grows without bound unless a
    /// caller opts in.
    pub fn prune(&self, max_total_bytes: u64) -> std::io::Result<usize> {
        let mut entries = self.entries()?;
        let mut total: u64 = entries.iter().map(|(_, meta)| meta.len()).sum();
        entries.sort_by_key(|(_, meta)| meta.modified().unwrap_or(SystemTime::UNIX_EPOCH));

        let mut removed = 0;
        for (path, meta) in entries {
            if total <= max_total_bytes {
                break;
            }
            fs::remove_file(&path)?;
            total -= meta.len();
            removed += 1;
        }
        Ok(removed)
    }

    /// Lists regular files in the cache directory with their metadata
    fn entries(&self) -> std::io::Result<Vec<(PathBuf, fs::Metadata)>> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() {
                entries.push((entry.path(), meta));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
pub(crate) fn backdate(path: &Path, by: Duration) {
    let file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .expect("Should open cache file");
    file.set_modified(SystemTime::now() - by)
        .expect("Should set mtime");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn sample(name: &str, value: i32) -> TestData {
        TestData {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn test_write_creates_file_in_cache_directory() {
        let (cache, temp_dir) = create_test_cache();

        cache.write("test_key", &sample("test", 42)).expect("Write should succeed");

        let expected_path = temp_dir.path().join("test_key.json");
        assert!(expected_path.exists(), "Cache file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"name\""));
        assert!(content.contains("\"test\""));
        assert!(content.contains("42"));
    }

    #[test]
    fn test_write_leaves_no_temp_file_behind() {
        let (cache, _temp_dir) = create_test_cache();

        cache.write("clean", &sample("clean", 1)).expect("Write should succeed");

        assert_eq!(cache.stats().unwrap().file_count, 1);
    }

    #[test]
    fn test_concurrent_writers_of_one_key_never_tear_the_entry() {
        let (cache, _temp_dir) = create_test_cache();
        let payloads: Vec<TestData> = (0..8)
            .map(|i| sample(&"x".repeat(1000 * (i + 1)), i as i32))
            .collect();

        std::thread::scope(|scope| {
            for payload in &payloads {
                let cache = cache.clone();
                scope.spawn(move || {
                    for _ in 0..20 {
                        cache.write("shared", payload).expect("Every write should succeed");
                    }
                });
            }
        });

        let result: CachedData<TestData> = cache.read("shared", DAY).expect("Entry should parse");
        assert!(payloads.contains(&result.data));
        assert_eq!(cache.stats().unwrap().file_count, 1, "no temporary files left behind");
    }

    #[test]
    fn test_read_returns_none_for_missing_key() {
        let (cache, _temp_dir) = create_test_cache();

        let result: Option<CachedData<TestData>> = cache.read("nonexistent_key", DAY);

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[test]
    fn test_read_after_write_returns_identical_payload() {
        let (cache, _temp_dir) = create_test_cache();
        let data = sample("fresh", 100);

        cache.write("fresh_key", &data).expect("Write should succeed");

        let result: CachedData<TestData> = cache.read("fresh_key", DAY).expect("Should read fresh cache");
        assert_eq!(result.data, data);
        assert!(result.age < DAY);
    }

    #[test]
    fn test_read_treats_entry_older_than_ttl_as_absent() {
        let (cache, temp_dir) = create_test_cache();
        cache.write("old_key", &sample("old", 0)).expect("Write should succeed");

        backdate(&temp_dir.path().join("old_key.json"), 2 * DAY);

        assert!(cache.read::<TestData>("old_key", DAY).is_none());
        // The same entry is still valid for a longer-lived endpoint.
        assert!(cache.read::<TestData>("old_key", 7 * DAY).is_some());
    }

    #[test]
    fn test_zero_ttl_is_always_expired() {
        let (cache, _temp_dir) = create_test_cache();
        cache.write("zero", &sample("zero", 0)).expect("Write should succeed");

        assert!(cache.read::<TestData>("zero", Duration::ZERO).is_none());
    }

    #[test]
    fn test_malformed_file_is_a_miss() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(temp_dir.path().join("broken.json"), "{not json").unwrap();

        assert!(cache.read::<TestData>("broken", DAY).is_none());
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let cache = CacheManager::with_dir(nested_path.clone());

        cache.write("nested_key", &sample("nested", 1)).expect("Write should succeed");

        assert!(nested_path.join("nested_key.json").exists(), "Cache file should exist");
    }

    #[test]
    fn test_cached_at_tracks_file_mtime() {
        let (cache, _temp_dir) = create_test_cache();

        let before = Utc::now() - chrono::Duration::seconds(2);
        cache.write("timestamp_key", &sample("timestamp", 999)).expect("Write should succeed");
        let after = Utc::now() + chrono::Duration::seconds(2);

        let result: CachedData<TestData> = cache.read("timestamp_key", DAY).expect("Should read cache");
        assert!(result.cached_at >= before);
        assert!(result.cached_at <= after);
    }

    #[test]
    fn test_overwrite_existing_cache() {
        let (cache, _temp_dir) = create_test_cache();

        cache.write("overwrite_key", &sample("first", 1)).expect("First write should succeed");
        cache.write("overwrite_key", &sample("second", 2)).expect("Second write should succeed");

        let result: CachedData<TestData> = cache.read("overwrite_key", DAY).expect("Should read cache");
        assert_eq!(result.data, sample("second", 2));
    }

    #[test]
    fn test_clear_then_stats_reports_zero_files() {
        let (cache, _temp_dir) = create_test_cache();
        cache.write("a", &sample("a", 1)).unwrap();
        cache.write("b", &sample("b", 2)).unwrap();
        assert_eq!(cache.stats().unwrap().file_count, 2);

        let removed = cache.clear().expect("Clear should succeed");

        assert_eq!(removed, 2);
        let stats = cache.stats().unwrap();
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.total_size_bytes, 0);
    }

    #[test]
    fn test_stats_on_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::for_provider(temp_dir.path(), "never_written");

        let stats = cache.stats().expect("Stats should succeed");

        assert_eq!(stats.file_count, 0);
        assert!(stats.cache_dir.ends_with("never_written"));
    }

    #[test]
    fn test_prune_removes_oldest_first() {
        let (cache, temp_dir) = create_test_cache();
        cache.write("oldest", &sample("oldest", 1)).unwrap();
        cache.write("middle", &sample("middle", 2)).unwrap();
        cache.write("newest", &sample("newest", 3)).unwrap();
        backdate(&temp_dir.path().join("oldest.json"), 3 * DAY);
        backdate(&temp_dir.path().join("middle.json"), 2 * DAY);

        let one_file = fs::metadata(temp_dir.path().join("newest.json")).unwrap().len();
        let removed = cache.prune(one_file).expect("Prune should succeed");

        assert_eq!(removed, 2);
        assert!(cache.read::<TestData>("newest", DAY).is_some());
        assert!(!temp_dir.path().join("oldest.json").exists());
        assert!(!temp_dir.path().join("middle.json").exists());
    }

    #[test]
    fn test_prune_under_cap_is_noop() {
        let (cache, _temp_dir) = create_test_cache();
        cache.write("keep", &sample("keep", 1)).unwrap();

        assert_eq!(cache.prune(u64::MAX).unwrap(), 0);
        assert_eq!(cache.stats().unwrap().file_count, 1);
    }

    #[test]
    fn test_default_root_is_project_scoped() {
        if let Some(root) = CacheManager::default_root() {
            assert!(root.to_string_lossy().contains("hscontent"));
        }
        // Test passes if default_root() returns None (e.g., no home directory in CI)
    }
}
