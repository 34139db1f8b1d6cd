//! # pose_history
//!
//! Append-only history of completed pose holds.
//!
//! Each completion becomes one [`LogEntry`] — timestamp, pose id, round,
//! set — written as a single text line and never mutated or deleted.
//! [`History`] is the storage seam: [`MemoryHistory`] for tests and
//! simulation, [`FileHistory`] for the durable append-only file.  A failed
//! append is reported to the caller and must never stall the session that
//! produced the entry.
//!
//! [`summarize_daily`] folds a log into per-day progress rows (completions,
//! sets done, percent of a full day, trend against the previous day) for
//! the report view.
//!
//! ## Line format
//!
//! ```text
//! [2026-08-06 08:14:02] set 0 round 3 pose 2
//! ```
//!
//! `tail` parses lines back; anything unparseable is skipped with a
//! warning, never an error.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// LogEntry
// ════════════════════════════════════════════════════════════════════════════

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed hold.  Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub pose_id:   u8,
    pub round:     u32,
    pub set:       u32,
}

impl LogEntry {
    pub fn new(timestamp: NaiveDateTime, pose_id: u8, round: u32, set: u32) -> Self {
        LogEntry { timestamp, pose_id, round, set }
    }

    /// Entry stamped with the current wall-clock time.
    pub fn now(pose_id: u8, round: u32, set: u32) -> Self {
        Self::new(Local::now().naive_local(), pose_id, round, set)
    }

    /// Serialise to the one-line text form.
    pub fn to_line(&self) -> String {
        format!(
            "[{}] set {} round {} pose {}",
            self.timestamp.format(TIME_FORMAT),
            self.set,
            self.round,
            self.pose_id,
        )
    }

    /// Parse a line produced by [`LogEntry::to_line`].  Returns `None` for
    /// anything else.
    pub fn parse_line(line: &str) -> Option<Self> {
        fn keyed<'a>(words: &mut std::str::SplitWhitespace<'a>, key: &str) -> Option<&'a str> {
            if words.next()? != key {
                return None;
            }
            words.next()
        }

        let rest = line.trim().strip_prefix('[')?;
        let (stamp, fields) = rest.split_once("] ")?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIME_FORMAT).ok()?;

        let mut words = fields.split_whitespace();
        let set = keyed(&mut words, "set")?.parse().ok()?;
        let round = keyed(&mut words, "round")?.parse().ok()?;
        let pose_id = keyed(&mut words, "pose")?.parse().ok()?;

        Some(LogEntry { timestamp, pose_id, round, set })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HistoryError
// ════════════════════════════════════════════════════════════════════════════

/// Persistence failures.  Reported, never fatal to the session.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to append to {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// History — the storage seam
// ════════════════════════════════════════════════════════════════════════════

/// Append-only entry storage.  Entries are never reordered or deleted;
/// `tail` returns the most recent window in chronological order.
pub trait History {
    fn append(&mut self, entry: &LogEntry) -> Result<(), HistoryError>;

    /// The most recent `n` entries, oldest first.  All of them if fewer
    /// than `n` exist.
    fn tail(&self, n: usize) -> Result<Vec<LogEntry>, HistoryError>;
}

// ── in-memory backend ───────────────────────────────────────────────────────

/// Vec-backed history for tests and simulation runs.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<LogEntry>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl History for MemoryHistory {
    fn append(&mut self, entry: &LogEntry) -> Result<(), HistoryError> {
        self.entries.push(*entry);
        Ok(())
    }

    fn tail(&self, n: usize) -> Result<Vec<LogEntry>, HistoryError> {
        let start = self.entries.len().saturating_sub(n);
        Ok(self.entries[start..].to_vec())
    }
}

// ── file backend ────────────────────────────────────────────────────────────

/// Durable history: one line per entry, appended and flushed immediately.
///
/// The file handle is opened once in append mode; `tail` re-reads the file
/// so a concurrent display can observe a point-in-time snapshot without
/// blocking the writer.
pub struct FileHistory {
    path: PathBuf,
    file: File,
}

impl FileHistory {
    /// Open (creating if absent) the history file for appending.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| HistoryError::Append {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), "history file opened");
        Ok(FileHistory {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_err(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Append {
            path: self.path.clone(),
            source,
        }
    }
}

impl History for FileHistory {
    fn append(&mut self, entry: &LogEntry) -> Result<(), HistoryError> {
        writeln!(self.file, "{}", entry.to_line()).map_err(|e| self.append_err(e))?;
        self.file.flush().map_err(|e| self.append_err(e))
    }

    fn tail(&self, n: usize) -> Result<Vec<LogEntry>, HistoryError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            // A file that has not been written yet is an empty history.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut skipped = 0usize;
        let entries: Vec<LogEntry> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let parsed = LogEntry::parse_line(line);
                if parsed.is_none() {
                    skipped += 1;
                }
                parsed
            })
            .collect();
        if skipped > 0 {
            tracing::warn!(
                path = %self.path.display(),
                skipped,
                "skipped unparseable history lines"
            );
        }

        let start = entries.len().saturating_sub(n);
        Ok(entries[start..].to_vec())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Daily summary
// ════════════════════════════════════════════════════════════════════════════

/// Completions that make up one set, and the count treated as a full
/// day's work, for the summary arithmetic.
pub const COMPLETIONS_PER_SET: u32 = 10;
pub const FULL_DAY_COMPLETIONS: u32 = 30;

/// How a day compares to the one before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up   => "↑",
            Trend::Down => "↓",
            Trend::Flat => " ",
        }
    }
}

/// One row of the progress report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailySummary {
    pub date:         NaiveDate,
    pub completions:  u32,
    pub sets_done:    u32,
    pub progress_pct: f32,
    pub trend:        Trend,
}

/// Fold a log into one row per calendar day, first to last, with gap days
/// filled in at zero so a missed day is visible in the report.
pub fn summarize_daily(entries: &[LogEntry]) -> Vec<DailySummary> {
    use std::collections::BTreeMap;

    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.timestamp.date()).or_insert(0) += 1;
    }
    let (Some(&first), Some(&last)) = (counts.keys().next(), counts.keys().next_back()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut prev_pct: Option<f32> = None;
    let mut day = first;
    loop {
        let completions = counts.get(&day).copied().unwrap_or(0);
        let progress_pct =
            (completions as f32 / FULL_DAY_COMPLETIONS as f32 * 100.0).min(100.0);
        let trend = match prev_pct {
            Some(prev) if progress_pct > prev => Trend::Up,
            Some(prev) if progress_pct < prev => Trend::Down,
            _ => Trend::Flat,
        };
        out.push(DailySummary {
            date: day,
            completions,
            sets_done: completions / COMPLETIONS_PER_SET,
            progress_pct,
            trend,
        });
        prev_pct = Some(progress_pct);
        if day == last {
            break;
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
