//! Append-only, time-ordered audit log.
//!
//! Entries are immutable once appended and are retrieved newest-first,
//! optionally filtered by mode and an inclusive time range. Retention is an
//! injectable cap: when set, the oldest entries are evicted on append.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tiller_core::types::{AuditEntry, NewAuditEntry};
use tracing::debug;

use crate::error::EngineError;

pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Filters for [`AuditLog::query`]. All fields optional; `limit` defaults
/// to [`DEFAULT_QUERY_LIMIT`].
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub limit: Option<usize>,
    pub mode: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    next_seq: AtomicU64,
    max_entries: Option<usize>,
}

impl AuditLog {
    /// `max_entries = None` means unbounded append.
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            next_seq: AtomicU64::new(1),
            max_entries,
        }
    }

    /// Append an entry, assigning its sequence number.
    ///
    /// The only rejection is required-field presence: an empty `action` or
    /// `mode` fails validation and is not stored. No business validation
    /// beyond that.
    pub fn append(&self, entry: NewAuditEntry) -> Result<u64, EngineError> {
        if entry.action.trim().is_empty() {
            return Err(EngineError::Validation("audit action must be non-empty".into()));
        }
        if entry.mode.trim().is_empty() {
            return Err(EngineError::Validation("audit mode must be non-empty".into()));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| EngineError::Internal("audit log lock poisoned".into()))?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        entries.push_back(AuditEntry {
            seq,
            timestamp: entry.timestamp,
            action: entry.action,
            targets: entry.targets,
            mode: entry.mode,
            summary: entry.summary,
            run_ids: entry.run_ids,
            payload_hash: entry.payload_hash,
        });
        if let Some(cap) = self.max_entries {
            while entries.len() > cap {
                entries.pop_front();
            }
        }
        debug!(seq, "audit entry appended");
        Ok(seq)
    }

    /// Return at most `limit` entries, most-recent-first, filtered by
    /// optional mode equality and inclusive time range.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        entries
            .iter()
            .rev()
            .filter(|entry| {
                if let Some(ref mode) = query.mode {
                    if entry.mode != *mode {
                        return false;
                    }
                }
                if let Some(from) = query.from {
                    if entry.timestamp < from {
                        return false;
                    }
                }
                if let Some(to) = query.to {
                    if entry.timestamp > to {
                        return false;
                    }
                }
                true
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
