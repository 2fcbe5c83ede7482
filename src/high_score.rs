use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

/// Durable medium for a single integer
pub trait ScoreStorage: Send {
    /// `None` when nothing has been recorded yet
    fn load(&self) -> Result<Option<u32>, ScoreError>;
    fn save(&mut self, value: u32) -> Result<(), ScoreError>;
}

/// Non-durable storage for tests and `--no-persist`
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStorage {
    value: Option<u32>,
}

impl MemoryScoreStorage {
    pub fn with_value(value: u32) -> Self {
        Self { value: Some(value) }
    }
}

impl ScoreStorage for MemoryScoreStorage {
    fn load(&self) -> Result<Option<u32>, ScoreError> {
        Ok(self.value)
    }

    fn save(&mut self, value: u32) -> Result<(), ScoreError> {
        self.value = Some(value);
        Ok(())
    }
}

/// When a finished session's wpm counts as a new record
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
pub enum RecordRule {
    /// Candidate must be strictly greater than the stored record
    #[default]
    #[serde(rename = "strict")]
    #[value(name = "strict")]
    #[strum(to_string = "strict")]
    StrictlyGreater,
    /// Ties count once a positive record exists
    #[serde(rename = "at-least")]
    #[value(name = "at-least")]
    #[strum(to_string = "at-least")]
    AtLeastWhenSet,
}

impl RecordRule {
    pub fn beats(self, candidate: u32, current: u32) -> bool {
        match self {
            RecordRule::StrictlyGreater => candidate > current,
            RecordRule::AtLeastWhenSet if current > 0 => candidate >= current,
            RecordRule::AtLeastWhenSet => candidate > current,
        }
    }
}

/// Best wpm ever achieved, cached in memory and written through to storage
pub struct HighScoreBoard {
    best: u32,
    /// False until `best` reflects what storage holds
    synced: bool,
    rule: RecordRule,
    storage: Box<dyn ScoreStorage>,
}

impl HighScoreBoard {
    /// Read the stored record.
    ///
    /// A storage failure shows 0 for now; storage is read again before the
    /// next write so an unseen record is never overwritten.
    pub fn load(storage: Box<dyn ScoreStorage>, rule: RecordRule) -> Self {
        let mut board = Self {
            best: 0,
            synced: false,
            rule,
            storage,
        };
        if let Err(e) = board.sync() {
            warn!("unable to read high score, showing 0 for now: {}", e);
        }
        board
    }

    fn sync(&mut self) -> Result<(), ScoreError> {
        let stored = self.storage.load()?.unwrap_or(0);
        self.best = self.best.max(stored);
        self.synced = true;
        Ok(())
    }

    pub fn read(&self) -> u32 {
        self.best
    }

    /// Record `candidate` if it beats the current value.
    ///
    /// Returns whether the record changed. The in-memory record is updated
    /// even when persisting fails; the failure is returned to the caller.
    /// While storage cannot be read nothing is written to it.
    pub fn write_if_greater(&mut self, candidate: u32) -> Result<bool, ScoreError> {
        let unsynced = if self.synced {
            None
        } else {
            self.sync().err()
        };

        if !self.rule.beats(candidate, self.best) {
            return Ok(false);
        }

        info!("new high score: {} wpm (was {})", candidate, self.best);
        self.best = candidate;
        if let Some(e) = unsynced {
            warn!("stored high score unreadable, not overwriting it: {}", e);
            return Err(e);
        }
        self.storage.save(candidate)?;
        Ok(true)
    }
}
