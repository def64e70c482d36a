//! Append-only store of history packets with point deletion by id.
//!
//! Independent of the audit log: the two share a target/mode correlation
//! key but are not joined structurally.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::Utc;
use tiller_core::types::HistoryPacket;
use uuid::Uuid;

use crate::error::EngineError;

pub const DEFAULT_LIST_LIMIT: usize = 50;

pub struct HistoryStore {
    packets: RwLock<VecDeque<HistoryPacket>>,
    max_entries: Option<usize>,
}

impl HistoryStore {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            packets: RwLock::new(VecDeque::new()),
            max_entries,
        }
    }

    /// Store a packet, assigning its id and timestamp. Ids are UUIDv4 and
    /// never reused, even after deletion.
    pub fn append(
        &self,
        target: impl Into<String>,
        mode: impl Into<String>,
        packet: serde_json::Value,
    ) -> Result<HistoryPacket, EngineError> {
        let target = target.into();
        let mode = mode.into();
        if target.trim().is_empty() {
            return Err(EngineError::Validation("history target must be non-empty".into()));
        }
        if mode.trim().is_empty() {
            return Err(EngineError::Validation("history mode must be non-empty".into()));
        }

        let stored = HistoryPacket {
            id: Uuid::new_v4(),
            target,
            mode,
            packet,
            created_at: Utc::now(),
        };
        let mut packets = self
            .packets
            .write()
            .map_err(|_| EngineError::Internal("history store lock poisoned".into()))?;
        packets.push_back(stored.clone());
        if let Some(cap) = self.max_entries {
            while packets.len() > cap {
                packets.pop_front();
            }
        }
        Ok(stored)
    }

    /// Return at most `limit` packets, most-recent-first.
    pub fn list(&self, limit: Option<usize>) -> Vec<HistoryPacket> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        match self.packets.read() {
            Ok(packets) => packets.iter().rev().take(limit).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Remove a packet by id. Returns `true` only when a packet was actually
    /// removed, so callers can report accurately.
    pub fn delete(&self, id: Uuid) -> bool {
        let mut packets = match self.packets.write() {
            Ok(packets) => packets,
            Err(_) => return false,
        };
        let before = packets.len();
        packets.retain(|packet| packet.id != id);
        packets.len() < before
    }

    pub fn len(&self) -> usize {
        self.packets.read().map(|packets| packets.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
