//! Runtime feature toggles, stored as JSON in the `_features` segment.
//!
//! Every field is optional in the stored document; missing fields take their
//! defaults so an empty or absent segment yields `Features::default()`.

use crate::constants::FEATURES_SEGMENT;
use crate::memorysystem::SegmentStore;
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetFeatures {
    /// Ignore the persisted roster on the next open.
    pub roster: bool,
    /// Drop the persisted snapshot history on the next open.
    pub history: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryFeatures {
    /// Write the snapshot history segment on snapshot and rollback.
    pub persist: bool,
}

impl Default for HistoryFeatures {
    fn default() -> Self {
        HistoryFeatures { persist: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub reset: ResetFeatures,
    pub history: HistoryFeatures,
}

impl Features {
    pub fn load<S: SegmentStore>(segments: &S) -> Features {
        match segments.get(FEATURES_SEGMENT) {
            Some(raw) if !raw.trim().is_empty() => match serde_json::from_str(&raw) {
                Ok(features) => features,
                Err(e) => {
                    warn!("Failed to parse features, using defaults: {}", e);
                    Features::default()
                }
            },
            _ => Features::default(),
        }
    }

    pub fn save<S: SegmentStore>(&self, segments: &mut S) -> Result<(), String> {
        let data = serde_json::to_string(self).map_err(|e| e.to_string())?;

        segments.set(FEATURES_SEGMENT, data);

        Ok(())
    }

    pub fn any_reset(&self) -> bool {
        self.reset.roster || self.reset.history
    }

    /// Clear one-shot reset toggles once they have been honored.
    pub fn clear_resets<S: SegmentStore>(&mut self, segments: &mut S) {
        if !self.any_reset() {
            return;
        }

        self.reset = ResetFeatures::default();

        if let Err(e) = self.save(segments) {
            warn!("Failed to clear reset features: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memorysystem::MemorySegments;

    #[test]
    fn missing_fields_take_defaults() {
        let features: Features = serde_json::from_str(r#"{"reset":{"roster":true}}"#).unwrap();

        assert!(features.reset.roster);
        assert!(!features.reset.history);
        assert!(features.history.persist);
    }

    #[test]
    fn malformed_segment_falls_back_to_defaults() {
        let mut segments = MemorySegments::new();
        segments.set(FEATURES_SEGMENT, "{nope".to_string());

        assert_eq!(Features::load(&segments), Features::default());
    }

    #[test]
    fn clearing_resets_rewrites_the_segment() {
        let mut segments = MemorySegments::new();
        segments.set(FEATURES_SEGMENT, r#"{"reset":{"roster":true,"history":true},"history":{"persist":false}}"#.to_string());

        let mut features = Features::load(&segments);
        assert!(features.any_reset());

        features.clear_resets(&mut segments);

        let reloaded = Features::load(&segments);
        assert!(!reloaded.any_reset());
        assert!(!reloaded.history.persist);
    }
}
