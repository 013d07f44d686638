//! Conflict-free slot assignment over a whole roster.
//!
//! Units are processed in input order against a running set of used slots.
//! A unit keeps its slot when the slot is in range, still free and inside the
//! squad it intends to be in; otherwise it gets the first free seat of that
//! squad, then the first free slot anywhere (moving it to whichever squad owns
//! that slot), and finally `position % total_slots` when every slot is taken.

use super::topology::SquadTopology;
use crate::identity::normalize_token;
use crate::roster::data::Unit;
use log::*;

/// Squad a unit wants to be in: its named squad if known, else the squad of
/// its current slot, else the first squad.
pub fn intended_squad(topology: &SquadTopology, unit: &Unit) -> usize {
    topology
        .position(&unit.squad_id)
        .or_else(|| unit.slot_index.and_then(|slot| topology.squad_index_for_slot(slot)))
        .unwrap_or(0)
}

pub fn first_free_seat(topology: &SquadTopology, squad_index: usize, used: &[bool]) -> Option<usize> {
    topology.seats(squad_index).find(|slot| !used[*slot])
}

pub fn first_free_slot(used: &[bool]) -> Option<usize> {
    used.iter().position(|taken| !taken)
}

/// Occupancy map of `units`, ignoring missing or out-of-range slots.
pub fn used_slots(topology: &SquadTopology, units: &[Unit]) -> Vec<bool> {
    let mut used = vec![false; topology.total_slots()];

    for slot in units.iter().filter_map(|unit| unit.slot_index) {
        if let Some(taken) = used.get_mut(slot) {
            *taken = true;
        }
    }

    used
}

/// Give every unit a valid slot consistent with its squad and default its
/// project tag from the squad. Pure; idempotent while the roster fits.
pub fn assign_slots(topology: &SquadTopology, units: &[Unit]) -> Vec<Unit> {
    let total_slots = topology.total_slots();
    let mut used = vec![false; total_slots];

    units
        .iter()
        .enumerate()
        .map(|(position, unit)| {
            let intended = intended_squad(topology, unit);

            let kept = unit
                .slot_index
                .filter(|slot| *slot < total_slots && !used[*slot] && topology.squad_index_for_slot(*slot) == Some(intended));

            let slot = match kept {
                Some(slot) => slot,
                None => {
                    let slot = first_free_seat(topology, intended, &used)
                        .or_else(|| first_free_slot(&used))
                        .unwrap_or_else(|| {
                            let slot = position % total_slots;
                            warn!("Roster exceeds {} slots - Unit: {} - Sharing slot: {}", total_slots, unit.id, slot);
                            slot
                        });

                    debug!("Reassigned unit {} from {:?} to slot {}", unit.id, unit.slot_index, slot);

                    slot
                }
            };

            used[slot] = true;

            let squad = topology.squad_at(slot / topology.squad_size());
            let own_tag = normalize_token(&unit.project_tag);

            Unit {
                squad_id: squad.id.clone(),
                slot_index: Some(slot),
                project_tag: if own_tag.is_empty() { squad.project_tag.clone() } else { own_tag },
                ..unit.clone()
            }
        })
        .collect()
}
