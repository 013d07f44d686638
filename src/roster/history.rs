//! Bounded roster snapshot history for rollback.
//!
//! Persisted in its own segment so it survives restarts. A history segment
//! that fails to decode is discarded rather than blocking startup.

use super::data::Unit;
use crate::constants::{HISTORY_CAP, HISTORY_SEGMENT};
use crate::memorysystem::SegmentStore;
use crate::serialize;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch; 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Full copy of the roster at a point in time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub timestamp: u64,
    pub roster: Vec<Unit>,
}

/// Most-recent-first list of snapshots, never longer than `HISTORY_CAP`.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct SnapshotHistory {
    entries: VecDeque<Snapshot>,
}

impl SnapshotHistory {
    pub fn new() -> SnapshotHistory {
        SnapshotHistory::default()
    }

    /// Record `roster` as the newest entry, dropping the oldest past the cap.
    pub fn snapshot(&mut self, roster: &[Unit]) {
        self.push(Snapshot {
            timestamp: now_millis(),
            roster: roster.to_vec(),
        });
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push_front(snapshot);
        self.entries.truncate(HISTORY_CAP);
    }

    /// Remove and return the newest entry.
    pub fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_front()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load<S: SegmentStore>(segments: &S) -> SnapshotHistory {
        segments
            .get(HISTORY_SEGMENT)
            .and_then(|raw| {
                if raw.trim().is_empty() {
                    None
                } else {
                    match serialize::decode_from_string::<SnapshotHistory>(&raw) {
                        Ok(mut history) => {
                            history.entries.truncate(HISTORY_CAP);
                            Some(history)
                        }
                        Err(e) => {
                            warn!("Failed to decode roster history, using empty history: {}", e);
                            None
                        }
                    }
                }
            })
            .unwrap_or_default()
    }

    pub fn save<S: SegmentStore>(&self, segments: &mut S) {
        match serialize::encode_to_string(self) {
            Ok(encoded) => segments.set(HISTORY_SEGMENT, encoded),
            Err(e) => warn!("Failed to encode roster history: {}", e),
        }
    }
}
