use super::data::{Unit, UnitStatus};
use crate::squad::topology::SquadTopology;
use serde::Serialize;
use std::fmt;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SquadOccupancy {
    pub squad_id: String,
    pub name: String,
    pub occupied: usize,
    pub capacity: usize,
}

/// Aggregate counts over a roster.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    pub online: usize,
    pub idle: usize,
    pub running: usize,
    pub paused: usize,
    pub squads: Vec<SquadOccupancy>,
}

impl RosterSummary {
    pub fn from_units(topology: &SquadTopology, units: &[Unit]) -> RosterSummary {
        let count_status = |status: UnitStatus| units.iter().filter(|unit| unit.status == status).count();

        let enabled = units.iter().filter(|unit| unit.enabled).count();

        let squads = topology
            .squads()
            .iter()
            .map(|squad| SquadOccupancy {
                squad_id: squad.id.clone(),
                name: squad.name.clone(),
                occupied: units.iter().filter(|unit| unit.squad_id == squad.id).count(),
                capacity: topology.squad_size(),
            })
            .collect();

        RosterSummary {
            total: units.len(),
            enabled,
            disabled: units.len() - enabled,
            online: units.iter().filter(|unit| unit.is_online()).count(),
            idle: count_status(UnitStatus::Idle),
            running: count_status(UnitStatus::Running),
            paused: count_status(UnitStatus::Paused),
            squads,
        }
    }

    /// Status shared by every unit, if any.
    fn common_status(&self) -> Option<UnitStatus> {
        UnitStatus::ALL
            .into_iter()
            .find(|status| self.total > 0 && self.count(*status) == self.total)
    }

    fn count(&self, status: UnitStatus) -> usize {
        match status {
            UnitStatus::Idle => self.idle,
            UnitStatus::Running => self.running,
            UnitStatus::Paused => self.paused,
        }
    }
}

impl fmt::Display for RosterSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bot{} · {} online", self.total, if self.total == 1 { "" } else { "s" }, self.online)?;

        match self.common_status() {
            Some(status) => write!(f, " · {}", status),
            None => write!(f, " · mixed"),
        }
    }
}
