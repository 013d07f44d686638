use crate::constants::{DEFAULT_SQUAD_SIZE, MAX_TOTAL_SLOTS};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Static squad description. Seat capacity is shared across the topology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Squad {
    pub id: String,
    pub name: String,
    /// Project tag given to members that do not carry their own.
    pub project_tag: String,
}

impl Squad {
    pub fn new(id: &str, name: &str, project_tag: &str) -> Squad {
        Squad {
            id: id.to_string(),
            name: name.to_string(),
            project_tag: project_tag.to_string(),
        }
    }
}

/// Serialized form of a topology, as read from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyConfig {
    pub squads: Vec<Squad>,
    pub squad_size: usize,
}

/// Ordered squads with a fixed number of seats each. Slot `i` belongs to
/// squad `i / squad_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SquadTopology {
    squads: Vec<Squad>,
    squad_size: usize,
}

impl SquadTopology {
    pub fn new(squads: Vec<Squad>, squad_size: usize) -> Result<SquadTopology, String> {
        if squads.is_empty() {
            return Err("Topology requires at least one squad".to_string());
        }

        if squad_size == 0 {
            return Err("Squad size must be at least one seat".to_string());
        }

        if let Some(duplicate) = squads.iter().map(|squad| squad.id.as_str()).duplicates().next() {
            return Err(format!("Duplicate squad id: {}", duplicate));
        }

        match squads.len().checked_mul(squad_size) {
            Some(total) if total <= MAX_TOTAL_SLOTS => {}
            _ => {
                return Err(format!(
                    "Topology too large - Squads: {} - Squad size: {} - Limit: {} slots",
                    squads.len(),
                    squad_size,
                    MAX_TOTAL_SLOTS
                ))
            }
        }

        Ok(SquadTopology { squads, squad_size })
    }

    pub fn from_config(config: TopologyConfig) -> Result<SquadTopology, String> {
        SquadTopology::new(config.squads, config.squad_size)
    }

    pub fn from_json(data: &str) -> Result<SquadTopology, String> {
        let config: TopologyConfig = serde_json::from_str(data).map_err(|e| e.to_string())?;

        SquadTopology::from_config(config)
    }

    pub fn to_config(&self) -> TopologyConfig {
        TopologyConfig {
            squads: self.squads.clone(),
            squad_size: self.squad_size,
        }
    }

    pub fn squads(&self) -> &[Squad] {
        &self.squads
    }

    pub fn squad_size(&self) -> usize {
        self.squad_size
    }

    pub fn total_slots(&self) -> usize {
        self.squads.len() * self.squad_size
    }

    pub fn squad_index_for_slot(&self, slot: usize) -> Option<usize> {
        if slot < self.total_slots() {
            Some(slot / self.squad_size)
        } else {
            None
        }
    }

    pub fn squad_for_slot(&self, slot: usize) -> Option<&Squad> {
        self.squad_index_for_slot(slot).map(|index| &self.squads[index])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.squads.iter().position(|squad| squad.id == id)
    }

    pub fn squad(&self, id: &str) -> Option<&Squad> {
        self.squads.iter().find(|squad| squad.id == id)
    }

    /// Index of squad `id`, or 0 when the id is unknown. Units with a stale
    /// reference are reassigned on the next allocation pass instead of dropped.
    pub fn squad_index_for_id(&self, id: &str) -> usize {
        self.position(id).unwrap_or(0)
    }

    /// Squad at `index`. Panics if out of range, like slice indexing.
    pub fn squad_at(&self, index: usize) -> &Squad {
        &self.squads[index]
    }

    /// Slot indices belonging to squad `index`, in seat order.
    pub fn seats(&self, index: usize) -> Range<usize> {
        let start = index * self.squad_size;

        start..start + self.squad_size
    }
}

impl Default for SquadTopology {
    fn default() -> Self {
        SquadTopology {
            squads: vec![
                Squad::new("alpha", "Alpha Squad", "CORE-OPS"),
                Squad::new("bravo", "Bravo Squad", "RESEARCH"),
                Squad::new("charlie", "Charlie Squad", "BUILD"),
                Squad::new("delta", "Delta Squad", "WATCH"),
            ],
            squad_size: DEFAULT_SQUAD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_law() {
        let topology = SquadTopology::default();

        assert_eq!(topology.total_slots(), topology.squads().len() * topology.squad_size());

        for slot in 0..topology.total_slots() {
            let squad = topology.squad_for_slot(slot).unwrap();
            assert_eq!(topology.position(&squad.id), Some(slot / topology.squad_size()));
            assert!(topology.seats(slot / topology.squad_size()).contains(&slot));
        }

        assert_eq!(topology.squad_for_slot(topology.total_slots()), None);
    }

    #[test]
    fn unknown_squad_falls_back_to_first() {
        let topology = SquadTopology::default();

        assert_eq!(topology.squad_index_for_id("charlie"), 2);
        assert_eq!(topology.squad_index_for_id("echo"), 0);
        assert_eq!(topology.squad("echo"), None);
    }

    #[test]
    fn rejects_degenerate_topologies() {
        assert!(SquadTopology::new(Vec::new(), 2).is_err());
        assert!(SquadTopology::new(vec![Squad::new("a", "A", "A")], 0).is_err());
        assert!(SquadTopology::new(vec![Squad::new("a", "A", "A"), Squad::new("a", "B", "B")], 2).is_err());
    }

    #[test]
    fn rejects_oversized_topologies() {
        let two = vec![Squad::new("a", "A", "A"), Squad::new("b", "B", "B")];

        assert!(SquadTopology::new(two.clone(), usize::MAX).is_err());
        assert!(SquadTopology::new(two.clone(), MAX_TOTAL_SLOTS / 2 + 1).is_err());
        assert_eq!(SquadTopology::new(two, MAX_TOTAL_SLOTS / 2).map(|topology| topology.total_slots()), Ok(MAX_TOTAL_SLOTS));

        let huge = SquadTopology::from_json(r#"{"squads":[{"id":"a","name":"A","projectTag":"A"}],"squadSize":1000000000000000000}"#);
        assert!(huge.is_err());
    }

    #[test]
    fn reads_json_config() {
        let topology = SquadTopology::from_json(
            r#"{"squads":[{"id":"red","name":"Red","projectTag":"R"},{"id":"blue","name":"Blue","projectTag":"B"}],"squadSize":3}"#,
        )
        .unwrap();

        assert_eq!(topology.total_slots(), 6);
        assert_eq!(topology.squad_for_slot(3).map(|s| s.id.as_str()), Some("blue"));
        assert_eq!(SquadTopology::from_config(topology.to_config()), Ok(topology));
    }
}
