//! Authoritative roster state and its mutation pipeline.
//!
//! Every mutation builds a new unit list and hands it to `commit`, which drops
//! duplicate ids, re-runs slot allocation over the whole roster, replaces the
//! current state and persists it. Readers never observe a partially applied
//! change.

use super::data::*;
use super::defaults::archetype_template;
use super::history::SnapshotHistory;
use super::hydrate::load_roster;
use super::summary::RosterSummary;
use crate::constants::ROSTER_SEGMENT;
use crate::features::Features;
use crate::identity::{make_unit_id, next_callsign_excluding, normalize_token, taken_callsigns};
use crate::memorysystem::SegmentStore;
use crate::squad::allocator::assign_slots;
use crate::squad::placement::plan_recruit_placement;
use crate::squad::topology::SquadTopology;
use itertools::Itertools;
use log::*;
use std::collections::HashSet;

/// Drop later units that repeat an earlier id, then allocate slots.
pub fn normalize_roster(topology: &SquadTopology, units: Vec<Unit>) -> Vec<Unit> {
    let count = units.len();

    let unique: Vec<Unit> = units.into_iter().unique_by(|unit| unit.id.clone()).collect();

    if unique.len() != count {
        debug!("Dropped {} units with duplicate ids", count - unique.len());
    }

    assign_slots(topology, &unique)
}

/// Outcome of a recruit.
#[derive(Clone, Debug, PartialEq)]
pub struct Recruitment {
    pub unit_id: String,
    pub squad_id: String,
    pub slot_index: usize,
    pub auto_rerouted: bool,
    pub notice: Notice,
}

pub struct RosterStore<S: SegmentStore> {
    topology: SquadTopology,
    units: Vec<Unit>,
    history: SnapshotHistory,
    features: Features,
    segments: S,
}

impl<S: SegmentStore> RosterStore<S> {
    /// Load roster, history and features from `segments`, repairing whatever
    /// is found. Never fails; unusable data is replaced by defaults.
    pub fn open(topology: SquadTopology, mut segments: S) -> RosterStore<S> {
        let mut features = Features::load(&segments);

        let payload = if features.reset.roster {
            info!("Resetting roster to defaults");
            None
        } else {
            segments.get(ROSTER_SEGMENT)
        };

        let hydration = load_roster(&topology, payload.as_deref());

        let reset_history = features.reset.history;

        let history = if reset_history {
            info!("Discarding roster history");
            SnapshotHistory::new()
        } else {
            SnapshotHistory::load(&segments)
        };

        features.clear_resets(&mut segments);

        let mut store = RosterStore {
            topology,
            units: Vec::new(),
            history,
            features,
            segments,
        };

        store.commit(hydration.units);

        if reset_history {
            store.save_history();
        }

        store
    }

    pub fn topology(&self) -> &SquadTopology {
        &self.topology
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == unit_id)
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn segments(&self) -> &S {
        &self.segments
    }

    pub fn into_segments(self) -> S {
        self.segments
    }

    pub fn summary(&self) -> RosterSummary {
        RosterSummary::from_units(&self.topology, &self.units)
    }

    fn squad_name(&self, squad_id: &str) -> String {
        self.topology
            .squad(squad_id)
            .map(|squad| squad.name.clone())
            .unwrap_or_else(|| squad_id.to_string())
    }

    //
    // Pipeline
    //

    /// Replace the roster with `units` after dedup and allocation, then persist.
    fn commit(&mut self, units: Vec<Unit>) {
        self.units = normalize_roster(&self.topology, units);

        self.persist();
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.units) {
            Ok(data) => self.segments.set(ROSTER_SEGMENT, data),
            Err(e) => error!("Failed to serialize roster: {}", e),
        }
    }

    fn save_history(&mut self) {
        if self.features.history.persist {
            self.history.save(&mut self.segments);
        }
    }

    //
    // Mutations
    //

    pub fn recruit(&mut self, draft: UnitDraft) -> Recruitment {
        let placement = plan_recruit_placement(&self.topology, &self.units, draft.squad.as_deref());

        let taken = taken_callsigns(&self.units);

        let callsign = match draft.callsign.as_deref().map(normalize_token).filter(|callsign| !callsign.is_empty()) {
            Some(callsign) if !taken.contains(&callsign) => callsign,
            _ => next_callsign_excluding(draft.archetype, &taken),
        };

        let template = archetype_template(draft.archetype);

        let unit = Unit {
            id: make_unit_id(&self.units),
            name: draft
                .name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| callsign.clone()),
            callsign,
            archetype: draft.archetype,
            squad_id: placement.squad_id.clone(),
            slot_index: Some(placement.slot_index),
            project_tag: draft.project_tag.map(|tag| normalize_token(&tag)).unwrap_or_default(),
            enabled: true,
            status: UnitStatus::Idle,
            portrait: template.portrait,
            model: draft.model.unwrap_or(template.model),
            provider: draft.provider.unwrap_or(template.provider),
            schedule: draft.schedule.unwrap_or(template.schedule),
            temperature: draft.temperature.unwrap_or(template.temperature),
            max_tokens: draft.max_tokens.unwrap_or(template.max_tokens),
            extra: draft.extra,
        };

        let unit_id = unit.id.clone();

        let mut units = self.units.clone();
        units.push(unit);
        self.commit(units);

        let (callsign, squad_id, slot_index) = self
            .unit(&unit_id)
            .map(|unit| (unit.callsign.clone(), unit.squad_id.clone(), unit.slot_index.unwrap_or(placement.slot_index)))
            .unwrap_or_else(|| (String::new(), placement.squad_id.clone(), placement.slot_index));

        let mut message = format!("Recruited {} into {} (slot {})", callsign, self.squad_name(&squad_id), slot_index);

        if placement.auto_rerouted {
            match draft.squad.as_deref().and_then(|preferred| self.topology.squad(preferred.trim())) {
                Some(preferred) => message.push_str(&format!(" - auto-rerouted, {} is full", preferred.name)),
                None => message.push_str(" - auto-rerouted from unknown squad"),
            }
        }

        if self.units.len() > self.topology.total_slots() {
            message.push_str(&format!(" - roster over capacity ({} units, {} slots)", self.units.len(), self.topology.total_slots()));
        }

        info!("{}", message);

        Recruitment {
            unit_id,
            squad_id,
            slot_index,
            auto_rerouted: placement.auto_rerouted,
            notice: Notice::new(message),
        }
    }

    /// Merge `patch` into unit `unit_id`. Returns false for an unknown id.
    pub fn update(&mut self, unit_id: &str, patch: UnitPatch) -> bool {
        let index = match self.units.iter().position(|unit| unit.id == unit_id) {
            Some(index) => index,
            None => {
                debug!("Ignoring update for unknown unit {}", unit_id);
                return false;
            }
        };

        let mut unit = self.units[index].clone();

        if let Some(archetype) = patch.archetype {
            if archetype != unit.archetype {
                unit.archetype = archetype;
                unit.portrait = archetype.portrait().to_string();
            }
        }

        if let Some(callsign) = patch.callsign {
            let taken = taken_callsigns(self.units.iter().filter(|other| other.id != unit_id));
            let callsign = normalize_token(&callsign);

            unit.callsign = if callsign.is_empty() || taken.contains(&callsign) {
                let replacement = next_callsign_excluding(unit.archetype, &taken);
                debug!("Callsign {:?} unavailable for {} - using {}", callsign, unit_id, replacement);
                replacement
            } else {
                callsign
            };
        }

        if let Some(name) = patch.name {
            unit.name = name;
        }

        if let Some(squad_id) = patch.squad_id {
            unit.squad_id = squad_id;
        }

        if let Some(slot_index) = patch.slot_index {
            unit.slot_index = Some(slot_index);
        }

        if let Some(project_tag) = patch.project_tag {
            unit.project_tag = project_tag;
        }

        if let Some(enabled) = patch.enabled {
            unit.enabled = enabled;
        }

        if let Some(status) = patch.status {
            unit.status = status;
        }

        if let Some(model) = patch.model {
            unit.model = model;
        }

        if let Some(provider) = patch.provider {
            unit.provider = provider;
        }

        if let Some(schedule) = patch.schedule {
            unit.schedule = schedule;
        }

        if let Some(temperature) = patch.temperature {
            unit.temperature = temperature;
        }

        if let Some(max_tokens) = patch.max_tokens {
            unit.max_tokens = max_tokens;
        }

        let mut units = self.units.clone();
        units[index] = unit;
        self.commit(units);

        true
    }

    /// Remove unit `unit_id`. Refused for unknown ids and for the last unit.
    pub fn delete(&mut self, unit_id: &str) -> Option<Notice> {
        let index = self.units.iter().position(|unit| unit.id == unit_id)?;

        if self.units.len() <= 1 {
            info!("Refusing to delete {} - roster would be empty", unit_id);
            return None;
        }

        self.snapshot();

        let mut units = self.units.clone();
        let removed = units.remove(index);
        self.commit(units);

        let message = format!("Removed {} ({}) from {}", removed.callsign, removed.name, self.squad_name(&removed.squad_id));

        info!("{}", message);

        Some(Notice::new(message))
    }

    /// Apply `action` to every listed unit in a single commit.
    pub fn batch(&mut self, ids: &[String], action: BatchAction) -> Notice {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut units = self.units.clone();
        let mut matched = 0;
        let mut changed = 0;

        for unit in units.iter_mut().filter(|unit| targets.contains(unit.id.as_str())) {
            matched += 1;

            if action.apply(unit) {
                changed += 1;
            }
        }

        if matched == 0 {
            return Notice::new(format!("No matching bots to {}", action.verb()));
        }

        self.commit(units);

        let mut message = format!("{} {} bot{}", action.past_tense(), matched, if matched == 1 { "" } else { "s" });

        if changed < matched {
            message.push_str(&format!(" ({} unchanged)", matched - changed));
        }

        info!("{}", message);

        Notice::new(message)
    }

    //
    // History
    //

    /// Record the current roster for rollback.
    pub fn snapshot(&mut self) {
        self.history.snapshot(&self.units);

        self.save_history();
    }

    /// Restore the most recent snapshot and drop it from the history.
    pub fn rollback(&mut self) -> Option<Notice> {
        let snapshot = self.history.pop()?;

        self.commit(snapshot.roster);
        self.save_history();

        let message = format!("Rolled back to snapshot {} ({} bots, {} older snapshots left)", snapshot.timestamp, self.units.len(), self.history.len());

        info!("{}", message);

        Some(Notice::new(message))
    }
}
