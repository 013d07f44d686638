use super::allocator::{first_free_seat, used_slots};
use super::topology::SquadTopology;
use crate::constants::AUTO_SQUAD;
use crate::roster::data::Unit;
use log::*;

/// Where a new recruit lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub squad_id: String,
    pub slot_index: usize,
    /// The recruit did not land in the squad that was asked for.
    pub auto_rerouted: bool,
}

fn preference(preferred: Option<&str>) -> Option<&str> {
    preferred.map(str::trim).filter(|id| !id.is_empty() && !id.eq_ignore_ascii_case(AUTO_SQUAD))
}

/// Pick a seat for a recruit joining `units`: the preferred squad's first
/// free seat, else the first squad with room, else `units.len() % total_slots`.
///
/// The last branch accepts a collision; callers must follow it with a full
/// allocation pass.
pub fn plan_recruit_placement(topology: &SquadTopology, units: &[Unit], preferred: Option<&str>) -> Placement {
    let preferred = preference(preferred);
    let used = used_slots(topology, units);

    let placed = |slot: usize| {
        let squad = topology.squad_at(slot / topology.squad_size());

        Placement {
            squad_id: squad.id.clone(),
            slot_index: slot,
            auto_rerouted: preferred.map(|id| id != squad.id).unwrap_or(false),
        }
    };

    if let Some(index) = preferred.and_then(|id| topology.position(id)) {
        if let Some(slot) = first_free_seat(topology, index, &used) {
            return placed(slot);
        }
    }

    if let Some(slot) = (0..topology.squads().len()).find_map(|index| first_free_seat(topology, index, &used)) {
        return placed(slot);
    }

    let slot = units.len() % topology.total_slots();

    warn!("No free seat for recruit - Units: {} - Slots: {} - Overflow slot: {}", units.len(), topology.total_slots(), slot);

    placed(slot)
}
