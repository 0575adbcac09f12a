use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::source::slugify;

/// Hex characters of the URL digest appended to every cache key.
const KEY_DIGEST_LEN: usize = 16;

/// On-disk representation of one cached response.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    data: Option<Value>,
    /// Epoch milliseconds of the write
    timestamp: Option<i64>,
}

/// Response cache for GitLab REST calls.
///
/// Stores one JSON file per cache key below a private directory, by default:
/// - Linux: `~/.cache/gitlab-tooling/cache/{key}`
/// - macOS: `~/Library/Caches/gitlab-tooling/cache/{key}`
///
/// Entries expire lazily: `get` ignores stale files but never deletes them.
/// Every failure is logged and treated as a miss, the cache is never a hard
/// dependency of a render.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    directory: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    /// Creates a cache rooted at `directory` with the given time to live.
    ///
    /// The directory is created if needed. Creation errors are logged, later
    /// reads and writes simply miss.
    pub fn new(directory: impl Into<PathBuf>, ttl: Duration) -> Self {
        let directory = directory.into();

        if directory.is_dir() {
            debug!("Cache directory '{}' exists", directory.display());
        } else {
            match fs::create_dir_all(&directory) {
                Ok(()) => info!("Cache directory created at: {}", directory.display()),
                Err(e) => warn!(
                    "Error creating cache directory '{}': {e}",
                    directory.display()
                ),
            }
        }

        Self { directory, ttl }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Stores `data` under `key`, replacing any previous entry.
    pub fn set(&self, key: &str, data: &Value) {
        self.set_at(key, data, Utc::now());
    }

    fn set_at(&self, key: &str, data: &Value, now: DateTime<Utc>) {
        let entry = CacheEntry {
            data: Some(data.clone()),
            timestamp: Some(now.timestamp_millis()),
        };

        let path = self.entry_path(key);
        let result = serde_json::to_string(&entry)
            .map_err(std::io::Error::from)
            .and_then(|content| fs::write(&path, content));

        match result {
            Ok(()) => debug!("Cached response for key {key}"),
            Err(e) => warn!("Error setting cache key {key}: {e}"),
        }
    }

    /// Returns the cached payload for `key` if present and younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let path = self.entry_path(key);

        let entry: CacheEntry = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Cache miss for key {key}: {e}");
                return None;
            }
        };

        let (Some(data), Some(timestamp)) = (entry.data, entry.timestamp) else {
            debug!("Cache entry {key} is incomplete");
            return None;
        };

        if data.is_null() || timestamp == 0 || !self.is_fresh(timestamp, now) {
            debug!("Cache entry {key} is expired");
            return None;
        }

        debug!("Cache hit for key {key}");
        Some(data)
    }

    /// Deletes the entry for `key`.
    pub fn remove(&self, key: &str) {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed cache key {key}"),
            Err(e) => warn!("Error removing cache key {key}: {e}"),
        }
    }

    /// Removes every cached entry and returns how many files were deleted.
    pub fn flush(&self) -> usize {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Error flushing cache directory '{}': {e}",
                    self.directory.display()
                );
                return 0;
            }
        };

        let mut removed = 0;
        for path in entries.flatten().map(|entry| entry.path()) {
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error removing cache file '{}': {e}", path.display()),
            }
        }

        info!(
            "Cache directory '{}' flushed ({removed} entries)",
            self.directory.display()
        );
        removed
    }

    fn is_fresh(&self, timestamp: i64, now: DateTime<Utc>) -> bool {
        let age_ms = i128::from(now.timestamp_millis()) - i128::from(timestamp);
        age_ms < self.ttl.as_millis() as i128
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }
}

/// Filesystem-safe cache key for a request URL.
///
/// The slug keeps keys readable; the digest separates URLs whose slugs
/// coincide (slugs drop digits, so `merge_requests/1` and `merge_requests/2`
/// share one).
pub fn cache_key(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}-{}", slugify(url), &digest[..KEY_DIGEST_LEN])
}
