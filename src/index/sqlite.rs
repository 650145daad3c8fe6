//! SQLite dedup index.
//!
//! A `files` row per content hash, a `runs` row per completed run, and a `meta`
//! row naming the hash algorithm the index was created with. Each insert commits
//! on its own with `synchronous = FULL`, so it is on disk before returning.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{DedupIndex, DedupRecord, RunMarker};
use crate::hash::{ContentHash, HashAlgorithm};
use crate::{Error, Result};

/// Index file name used when none is configured
pub const DEFAULT_INDEX_FILE_NAME: &str = "media-backup.db";

/// Stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

const ALGORITHM_KEY: &str = "hash_algorithm";

#[derive(Debug)]
pub struct SqliteIndex {
    conn: Option<Connection>,
    path: PathBuf,
    algorithm: HashAlgorithm,
    records: usize,
    last_run: Option<DateTime<Utc>>,
}

impl SqliteIndex {
    /// Open the index at `path`, creating it for `algorithm` if it does not exist.
    ///
    /// Fails if an existing index was created with a different algorithm.
    pub fn open(path: &Path, algorithm: HashAlgorithm) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let index = Self::from_connection(conn, path.to_path_buf(), algorithm)?;

        info!(
            "Opened dedup index {} ({} records, algorithm {})",
            path.display(),
            index.records,
            algorithm
        );
        Ok(index)
    }

    pub fn open_in_memory(algorithm: HashAlgorithm) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"), algorithm)
    }

    fn from_connection(conn: Connection, path: PathBuf, algorithm: HashAlgorithm) -> Result<Self> {
        configure_pragmas(&conn)?;
        migrate_schema(&conn)?;

        match read_algorithm(&conn)? {
            Some(stored) if stored != algorithm => {
                return Err(Error::Index {
                    reason: format!(
                        "index {} uses {} hashes, but {} was requested",
                        path.display(),
                        stored,
                        algorithm
                    ),
                });
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                    params![ALGORITHM_KEY, algorithm.to_string()],
                )?;
            }
        }

        let records: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        let latest: Option<String> =
            conn.query_row("SELECT MAX(started_at) FROM runs", [], |row| row.get(0))?;
        let last_run = latest.as_deref().map(parse_time).transpose()?;

        Ok(Self {
            conn: Some(conn),
            path,
            algorithm,
            records: records as usize,
            last_run,
        })
    }

    /// Algorithm an existing index was created with, without creating anything
    pub fn stored_algorithm(path: &Path) -> Result<Option<HashAlgorithm>> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        read_algorithm(&conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| Error::Index {
            reason: format!("index {} is closed", self.path.display()),
        })
    }
}

fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;
         PRAGMA busy_timeout = 5000;",
    )?;
    debug!("SQLite pragmas configured (WAL mode, synchronous FULL)");
    Ok(())
}

fn migrate_schema(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(Error::Index {
            reason: format!("unsupported index schema version {}", version),
        });
    }

    conn.execute_batch(include_str!("schema.sql"))?;
    conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
    debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
    Ok(())
}

fn read_algorithm(conn: &Connection) -> Result<Option<HashAlgorithm>> {
    let stored: String = match conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![ALGORITHM_KEY],
        |row| row.get(0),
    ) {
        Ok(value) => value,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    stored.parse().map(Some).map_err(|reason| Error::Index { reason })
}

/// Fixed-width UTC text, so string order is time order
fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| Error::Index {
            reason: format!("bad timestamp '{}' in index: {}", text, e),
        })
}

/// A `files` row before its timestamps are parsed
struct FileRow {
    hash: String,
    source: String,
    destination: String,
    size: i64,
    modified: String,
    recorded_at: String,
}

impl FileRow {
    fn into_record(self) -> Result<DedupRecord> {
        Ok(DedupRecord {
            hash: ContentHash(self.hash),
            source: PathBuf::from(self.source),
            destination: PathBuf::from(self.destination),
            size: self.size.max(0) as u64,
            modified: parse_time(&self.modified)?,
            recorded_at: parse_time(&self.recorded_at)?,
        })
    }
}

impl DedupIndex for SqliteIndex {
    fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    fn lookup(&self, hash: &ContentHash) -> Result<Option<DedupRecord>> {
        let row = self.conn()?.query_row(
            "SELECT hash, source, destination, size, modified, recorded_at
             FROM files WHERE hash = ?1",
            params![hash.as_str()],
            |row| {
                Ok(FileRow {
                    hash: row.get(0)?,
                    source: row.get(1)?,
                    destination: row.get(2)?,
                    size: row.get(3)?,
                    modified: row.get(4)?,
                    recorded_at: row.get(5)?,
                })
            },
        );
        match row {
            Ok(row) => row.into_record().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn insert(&mut self, record: DedupRecord) -> Result<()> {
        // first record for a hash wins
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO files (hash, source, destination, size, modified, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.hash.as_str(),
                record.source.to_string_lossy().into_owned(),
                record.destination.to_string_lossy().into_owned(),
                record.size as i64,
                timestamp(&record.modified),
                timestamp(&record.recorded_at),
            ],
        )?;
        self.records += inserted;
        Ok(())
    }

    fn record_run(&mut self, marker: RunMarker) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO runs (run_id, started_at, finished_at) VALUES (?1, ?2, ?3)",
            params![
                marker.run_id.to_string(),
                timestamp(&marker.started_at),
                timestamp(&marker.finished_at),
            ],
        )?;
        if self.last_run.map_or(true, |last| marker.started_at > last) {
            self.last_run = Some(marker.started_at);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.records
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| Error::Database(e))?;
            debug!("Closed dedup index {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(hash: &str, destination: &str) -> DedupRecord {
        let now = Utc::now();
        DedupRecord {
            hash: ContentHash(hash.to_string()),
            source: PathBuf::from("/src").join(destination),
            destination: PathBuf::from("/dest").join(destination),
            size: 42,
            modified: now - Duration::days(3),
            recorded_at: now,
        }
    }

    fn marker(started_at: DateTime<Utc>) -> RunMarker {
        RunMarker {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at + Duration::seconds(10),
        }
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(DEFAULT_INDEX_FILE_NAME);

        let mut index = SqliteIndex::open(&path, HashAlgorithm::Sha256).unwrap();
        assert!(index.is_empty());
        let stored = record("aa11", "2023-06/IMG_0001.jpg");
        index.insert(stored.clone()).unwrap();
        index.close().unwrap();

        let index = SqliteIndex::open(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(index.len(), 1);
        let found = index.lookup(&ContentHash("aa11".to_string())).unwrap().unwrap();
        assert_eq!(found, stored);
        assert!(index.lookup(&ContentHash("bb22".to_string())).unwrap().is_none());
    }

    #[test]
    fn test_first_record_for_a_hash_wins() {
        let mut index = SqliteIndex::open_in_memory(HashAlgorithm::Blake3).unwrap();
        index.insert(record("cc33", "2023-06/a.jpg")).unwrap();
        index.insert(record("cc33", "2023-07/b.jpg")).unwrap();

        assert_eq!(index.len(), 1);
        let found = index.lookup(&ContentHash("cc33".to_string())).unwrap().unwrap();
        assert_eq!(found.destination, PathBuf::from("/dest/2023-06/a.jpg"));
    }

    #[test]
    fn test_algorithm_is_bound_at_creation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_INDEX_FILE_NAME);
        SqliteIndex::open(&path, HashAlgorithm::Blake3)
            .unwrap()
            .close()
            .unwrap();

        assert_eq!(
            SqliteIndex::stored_algorithm(&path).unwrap(),
            Some(HashAlgorithm::Blake3)
        );
        let err = SqliteIndex::open(&path, HashAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, Error::Index { .. }));
        assert!(err.to_string().contains("blake3"));
    }

    #[test]
    fn test_stored_algorithm_does_not_create_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.db");
        assert!(SqliteIndex::stored_algorithm(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_latest_run_is_the_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_INDEX_FILE_NAME);
        let now = Utc::now();

        let mut index = SqliteIndex::open(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(index.last_run(), None);
        index.record_run(marker(now)).unwrap();
        index.record_run(marker(now - Duration::hours(1))).unwrap();
        assert_eq!(index.last_run(), Some(now));
        index.close().unwrap();

        let index = SqliteIndex::open(&path, HashAlgorithm::Sha256).unwrap();
        assert_eq!(index.last_run(), Some(now));
    }

    #[test]
    fn test_closed_index_refuses_work() {
        let mut index = SqliteIndex::open_in_memory(HashAlgorithm::Sha256).unwrap();
        index.close().unwrap();
        index.close().unwrap();

        assert!(index.lookup(&ContentHash("dd44".to_string())).is_err());
        assert!(index.insert(record("dd44", "x.jpg")).is_err());
    }
}
