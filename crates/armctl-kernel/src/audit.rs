//! [`AuditSink`] – observer interface for supervisor log records.
//!
//! The supervisor hands every [`AuditRecord`] to each registered sink. How a
//! record is shown (log panel, file, bus) is the sink's business.

use std::sync::Mutex;

use armctl_types::{AuditLevel, AuditRecord};

/// Receives structured audit records from the supervisor.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// In-memory sink that keeps every record. Handy for tests and for a log
/// panel that wants the full history.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all records received so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of records at exactly `level`.
    pub fn count(&self, level: AuditLevel) -> usize {
        self.records
            .lock()
            .map(|r| r.iter().filter(|rec| rec.level == level).count())
            .unwrap_or(0)
    }
}

impl AuditSink for MemorySink {
    fn record(&self, record: &AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
