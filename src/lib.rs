#![warn(clippy::all)]

pub mod constants;
pub mod features;
pub mod identity;
pub mod logging;
pub mod memorysystem;
pub mod roster;
pub mod serialize;
pub mod squad;

pub use memorysystem::{FileSegments, MemorySegments, SegmentStore};
pub use roster::{Archetype, BatchAction, Notice, RosterStore, Unit, UnitDraft, UnitPatch, UnitStatus};
pub use squad::{Squad, SquadTopology};
