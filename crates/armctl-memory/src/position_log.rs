//! Append-only position log.
//!
//! One JSON object per line:
//!
//! ```text
//! {"joints":[int,int,int,int,int,int],"gripper":bool,"timestamp":"YYYY-MM-DD HH:MM:SS"}
//! ```
//!
//! Records are only ever appended; nothing is rewritten or deleted.
//!
//! # Example
//!
//! ```rust
//! use armctl_memory::PositionLog;
//! use armctl_types::{JointModel, PositionRecord};
//!
//! let dir = std::env::temp_dir().join(format!("armctl-doc-{}", std::process::id()));
//! std::fs::create_dir_all(&dir).unwrap();
//! let log = PositionLog::new(dir.join("positions.json"));
//!
//! let record = PositionRecord::capture(&JointModel::new());
//! log.append(&record).unwrap();
//! assert_eq!(log.read_all().unwrap().last(), Some(&record));
//! # std::fs::remove_dir_all(&dir).ok();
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use armctl_types::{ArmError, PositionRecord};
use thiserror::Error;
use tracing::{debug, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from position log operations.
#[derive(Error, Debug)]
pub enum PositionLogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl From<PositionLogError> for ArmError {
    fn from(err: PositionLogError) -> Self {
        ArmError::PersistenceFailure(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PositionLog
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to an NDJSON position file. The file is opened per call, so the
/// handle is cheap and holds no descriptor.
#[derive(Debug, Clone)]
pub struct PositionLog {
    path: PathBuf,
}

impl PositionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line, creating the file if needed.
    pub fn append(&self, record: &PositionRecord) -> Result<(), PositionLogError> {
        let mut line = serde_json::to_string(record)
            .map_err(|source| PositionLogError::Json { line: 0, source })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;

        debug!(path = %self.path.display(), joints = ?record.joints, "position appended");
        Ok(())
    }

    /// Read every record back in append order. A missing file is an empty
    /// log; blank lines are skipped.
    pub fn read_all(&self) -> Result<Vec<PositionRecord>, PositionLogError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| self.io_error(source))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| {
                warn!(path = %self.path.display(), line = idx + 1, "malformed position record");
                PositionLogError::Json {
                    line: idx + 1,
                    source,
                }
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn io_error(&self, source: std::io::Error) -> PositionLogError {
        PositionLogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armctl_types::JointModel;
    use chrono::NaiveDate;

    fn record(angles: [f64; 6], closed: bool) -> PositionRecord {
        let mut model = JointModel::new();
        for (i, a) in angles.iter().enumerate() {
            model.set_angle(i, *a).unwrap();
        }
        if closed {
            model.toggle_gripper();
        }
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        PositionRecord::new(&model, ts)
    }

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let log = PositionLog::new(dir.path().join("positions.json"));

        let first = record([90.0, 0.0, 0.0, 0.0, 0.0, 0.0], false);
        let second = record([10.0, 20.0, 30.0, 40.0, 50.0, 60.0], true);
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let back = log.read_all().unwrap();
        assert_eq!(back, vec![first, second]);
        assert_eq!(back[1].joints, [10, 20, 30, 40, 50, 60]);
        assert!(back[1].gripper);
    }

    #[test]
    fn file_is_one_object_per_line() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let log = PositionLog::new(dir.path().join("positions.json"));
        log.append(&record([0.0; 6], false)).unwrap();
        log.append(&record([0.0; 6], true)).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(r#"{"joints":[0,0,0,0,0,0],"gripper":false"#));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let log = PositionLog::new(dir.path().join("absent.json"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("positions.json");
        let log = PositionLog::new(&path);
        log.append(&record([0.0; 6], false)).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(b"{not json}\n"))
            .unwrap();

        match log.read_all() {
            Err(PositionLogError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected JSON error, got {other:?}"),
        }
    }

    #[test]
    fn unwritable_path_is_persistence_failure() {
        let dir = tempfile::tempdir().expect("tmp dir");
        // A directory cannot be opened for append.
        let log = PositionLog::new(dir.path());
        let err = log.append(&record([0.0; 6], false)).unwrap_err();
        assert!(matches!(err, PositionLogError::Io { .. }));
        assert!(matches!(ArmError::from(err), ArmError::PersistenceFailure(_)));
    }
}
