/// Maximum length of a normalized callsign or project tag.
pub const MAX_TOKEN_LEN: usize = 18;

/// Number of roster snapshots retained for rollback.
pub const HISTORY_CAP: usize = 20;

/// Upper bound on squads * seats for any topology.
pub const MAX_TOTAL_SLOTS: usize = 4096;

/// Seats per squad in the built-in topology.
pub const DEFAULT_SQUAD_SIZE: usize = 4;

/// Squad preference meaning "let the placement planner choose".
pub const AUTO_SQUAD: &str = "auto";

/// Prefix for minted unit ids.
pub const UNIT_ID_PREFIX: &str = "bot-";

//
// Segment keys.
//

pub const ROSTER_SEGMENT: &str = "opsnode.roster";
pub const HISTORY_SEGMENT: &str = "opsnode.history";
pub const FEATURES_SEGMENT: &str = "_features";

/// Segments larger than this are still written but reported.
pub const SEGMENT_SIZE_LIMIT: usize = 100 * 1024;
