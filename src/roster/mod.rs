pub mod data;
pub mod defaults;
pub mod history;
pub mod hydrate;
pub mod store;
pub mod summary;

pub use data::*;
pub use history::{Snapshot, SnapshotHistory};
pub use hydrate::{hydrate, load_roster, Hydration, PersistedUnit, RepairFlags};
pub use store::{normalize_roster, Recruitment, RosterStore};
pub use summary::{RosterSummary, SquadOccupancy};
