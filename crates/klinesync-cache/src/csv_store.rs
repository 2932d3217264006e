use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::BarRecord;

/// Durable CSV-backed store for bar history, one file per cache resource.
///
/// A resource name maps to `<root>/<resource>.csv`. The store never deletes
/// a resource; callers only extend or replace contents.
#[derive(Debug, Clone)]
pub struct BarStore {
    root: PathBuf,
}

impl BarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the cache files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a resource's cache file.
    pub fn resource_path(&self, resource: &str) -> PathBuf {
        self.root.join(format!("{resource}.csv"))
    }

    /// Load every row of a resource, in file order.
    ///
    /// A missing file is a valid empty state. A corrupt or unreadable file
    /// is downgraded to empty with a warning; the sync layer re-backfills.
    pub fn load(&self, resource: &str) -> Vec<BarRecord> {
        let path = self.resource_path(resource);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(resource, error = %err, "cache file unreadable, treating as empty");
                return Vec::new();
            }
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut rows = Vec::new();
        for row in reader.deserialize::<BarRecord>() {
            match row {
                Ok(row) => rows.push(row),
                Err(err) => {
                    warn!(resource, error = %err, "cache file corrupt, treating as empty");
                    return Vec::new();
                }
            }
        }

        debug!(resource, rows = rows.len(), "loaded cache file");
        rows
    }

    /// Latest cached timestamp of a resource, if it holds any rows.
    pub fn latest_timestamp(&self, resource: &str) -> Option<i64> {
        self.load(resource).last().map(|row| row.timestamp)
    }

    /// Replace the resource contents with `rows`.
    ///
    /// Expects rows already sorted ascending and deduplicated by timestamp.
    /// The rows are staged in a temp file inside the cache directory and
    /// renamed over the target, so the swap is all-or-nothing.
    pub fn save(&self, resource: &str, rows: &[BarRecord]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|source| StoreError::CreateDir {
            path: self.root.clone(),
            source,
        })?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).map_err(|source| StoreError::Encode {
                resource: resource.to_owned(),
                source,
            })?;
        }
        let encoded = writer
            .into_inner()
            .expect("flushing an in-memory csv writer cannot fail");

        let stage_err = |source| StoreError::Stage {
            resource: resource.to_owned(),
            source,
        };
        let mut staged = NamedTempFile::new_in(&self.root).map_err(stage_err)?;
        staged.write_all(&encoded).map_err(stage_err)?;
        staged.as_file().sync_all().map_err(stage_err)?;

        let path = self.resource_path(resource);
        staged.persist(&path).map_err(|err| StoreError::Replace {
            resource: resource.to_owned(),
            source: err.error,
        })?;

        debug!(resource, rows = rows.len(), "replaced cache file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64) -> BarRecord {
        BarRecord {
            timestamp,
            open: 10.0,
            high: 12.0,
            low: 9.5,
            close: 11.0,
            volume: 345.5,
        }
    }

    #[test]
    fn missing_resource_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BarStore::new(dir.path());

        assert!(store.load("BTC_USDT_5m").is_empty());
        assert_eq!(store.latest_timestamp("BTC_USDT_5m"), None);
    }

    #[test]
    fn corrupt_resource_downgrades_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BarStore::new(dir.path());
        std::fs::write(
            store.resource_path("BTC_USDT_5m"),
            "timestamp,open,high,low,close,volume\nnot-a-number,1,2,3,4,5\n",
        )
        .expect("write fixture");

        assert!(store.load("BTC_USDT_5m").is_empty());
    }

    #[test]
    fn save_writes_header_and_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BarStore::new(dir.path());
        let rows = vec![record(1_000), record(2_000)];

        store.save("BTC_USDT_5m", &rows).expect("save");

        let raw = std::fs::read_to_string(store.resource_path("BTC_USDT_5m")).expect("read");
        assert!(raw.starts_with("timestamp,open,high,low,close,volume"));
        assert_eq!(store.load("BTC_USDT_5m"), rows);
        assert_eq!(store.latest_timestamp("BTC_USDT_5m"), Some(2_000));
    }

    #[test]
    fn save_replaces_prior_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BarStore::new(dir.path());

        store
            .save("ETH_USDT_1h", &[record(1_000), record(2_000)])
            .expect("first save");
        store.save("ETH_USDT_1h", &[record(3_000)]).expect("second save");

        let rows = store.load("ETH_USDT_1h");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, 3_000);
    }

    #[test]
    fn save_creates_missing_cache_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BarStore::new(dir.path().join("nested").join("cache"));

        store.save("BTC_USDT_1d", &[record(1_000)]).expect("save");

        assert_eq!(store.load("BTC_USDT_1d").len(), 1);
    }
}
