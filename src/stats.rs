use chrono::{DateTime, Local};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::app_dirs::AppDirs;
use crate::error::ScoreError;
use crate::high_score::ScoreStorage;

/// Key under which the best wpm is stored
pub const HIGH_SCORE_KEY: &str = "high_score_wpm";

/// One finished session as kept in the history table
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub timestamp: DateTime<Local>,
    pub duration_secs: u32,
    pub elapsed_secs: u32,
    pub characters: usize,
    pub errors: usize,
    pub wpm: u32,
    pub accuracy: u8,
    /// Reference text fully typed before time ran out
    pub completed: bool,
}

/// Append-only sink for finished sessions
pub trait SessionLog: Send {
    fn append(&mut self, record: &SessionRecord) -> Result<(), ScoreError>;
}

/// SQLite store holding the high score and the session history.
///
/// Clones share one connection, so the score board and the history log can
/// each own a handle to the same database.
#[derive(Debug, Clone)]
pub struct ScoreDb {
    conn: Arc<Mutex<Connection>>,
}

impl ScoreDb {
    /// Open the database in the default state directory
    pub fn open_default() -> Result<Self, ScoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typesprint_stats.db"));
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self, ScoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("opening score database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ScoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ScoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                elapsed_secs INTEGER NOT NULL,
                characters INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                completed BOOLEAN NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_results_timestamp ON session_results(timestamp)",
            [],
        )?;

        Ok(ScoreDb {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ScoreError> {
        self.conn.lock().map_err(|_| ScoreError::Poisoned)
    }

    pub fn get_value(&self, key: &str) -> Result<Option<i64>, ScoreError> {
        let value = self
            .conn()?
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_value(&self, key: &str, value: i64) -> Result<(), ScoreError> {
        self.conn()?.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    pub fn record_session(&self, record: &SessionRecord) -> Result<(), ScoreError> {
        self.conn()?.execute(
            r#"
            INSERT INTO session_results
            (timestamp, duration_secs, elapsed_secs, characters, errors, wpm, accuracy, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.timestamp.to_rfc3339(),
                record.duration_secs,
                record.elapsed_secs,
                record.characters as i64,
                record.errors as i64,
                record.wpm,
                record.accuracy,
                record.completed,
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, ScoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT timestamp, duration_secs, elapsed_secs, characters, errors, wpm, accuracy, completed
            FROM session_results
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let timestamp_str: String = row.get(0)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(SessionRecord {
                timestamp,
                duration_secs: row.get(1)?,
                elapsed_secs: row.get(2)?,
                characters: row.get::<_, i64>(3)? as usize,
                errors: row.get::<_, i64>(4)? as usize,
                wpm: row.get(5)?,
                accuracy: row.get(6)?,
                completed: row.get(7)?,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

impl ScoreStorage for ScoreDb {
    fn load(&self) -> Result<Option<u32>, ScoreError> {
        match self.get_value(HIGH_SCORE_KEY)? {
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| ScoreError::OutOfRange(v)),
            None => Ok(None),
        }
    }

    fn save(&mut self, value: u32) -> Result<(), ScoreError> {
        self.set_value(HIGH_SCORE_KEY, i64::from(value))
    }
}

impl SessionLog for ScoreDb {
    fn append(&mut self, record: &SessionRecord) -> Result<(), ScoreError> {
        self.record_session(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(wpm: u32, completed: bool) -> SessionRecord {
        SessionRecord {
            timestamp: Local::now(),
            duration_secs: 60,
            elapsed_secs: 42,
            characters: 210,
            errors: 7,
            wpm,
            accuracy: 97,
            completed,
        }
    }

    #[test]
    fn test_high_score_absent_by_default() {
        let db = ScoreDb::open_in_memory().unwrap();
        assert_eq!(db.load().unwrap(), None);
    }

    #[test]
    fn test_high_score_overwrites() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.save(40).unwrap();
        db.save(52).unwrap();
        assert_eq!(db.load().unwrap(), Some(52));
        assert_eq!(db.get_value(HIGH_SCORE_KEY).unwrap(), Some(52));
    }

    #[test]
    fn test_negative_value_is_out_of_range() {
        let db = ScoreDb::open_in_memory().unwrap();
        db.set_value(HIGH_SCORE_KEY, -1).unwrap();
        assert!(matches!(db.load(), Err(ScoreError::OutOfRange(-1))));
    }

    #[test]
    fn test_record_and_list_sessions() {
        let mut db = ScoreDb::open_in_memory().unwrap();
        db.append(&record(30, false)).unwrap();
        db.append(&record(45, true)).unwrap();
        db.append(&record(50, true)).unwrap();

        let recent = db.recent_sessions(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].wpm, 50);
        assert_eq!(recent[1].wpm, 45);
        assert!(recent[0].completed);
        assert_eq!(recent[0].characters, 210);
        assert_eq!(recent[0].errors, 7);
        assert_eq!(recent[0].accuracy, 97);
    }

    #[test]
    fn test_clones_share_one_connection() {
        let mut scores = ScoreDb::open_in_memory().unwrap();
        let mut history = scores.clone();

        scores.save(61).unwrap();
        history.append(&record(61, true)).unwrap();

        assert_eq!(history.load().unwrap(), Some(61));
        assert_eq!(scores.recent_sessions(5).unwrap().len(), 1);
    }

    #[test]
    fn test_value_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.db");

        {
            let mut db = ScoreDb::open(&path).unwrap();
            db.save(77).unwrap();
        }

        let db = ScoreDb::open(&path).unwrap();
        assert_eq!(db.load().unwrap(), Some(77));
    }
}
