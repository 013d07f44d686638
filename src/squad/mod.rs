pub mod allocator;
pub mod placement;
pub mod topology;

pub use allocator::assign_slots;
pub use placement::{plan_recruit_placement, Placement};
pub use topology::{Squad, SquadTopology, TopologyConfig};
