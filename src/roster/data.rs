use serde::{Deserialize, Serialize};
use shrinkwraprs::*;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ─── Archetype ──────────────────────────────────────────────────────────────

/// Closed set of unit roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Operator,
    Analyst,
    Builder,
    Sentinel,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [Archetype::Operator, Archetype::Analyst, Archetype::Builder, Archetype::Sentinel];

    pub fn label(&self) -> &'static str {
        match self {
            Archetype::Operator => "Operator",
            Archetype::Analyst => "Analyst",
            Archetype::Builder => "Builder",
            Archetype::Sentinel => "Sentinel",
        }
    }

    /// Auto-callsign candidates, tried in order.
    pub fn callsign_pool(&self) -> &'static [&'static str] {
        match self {
            Archetype::Operator => &["VANGUARD", "ORBIT", "HALCYON", "RELAY"],
            Archetype::Analyst => &["ORACLE", "CIPHER", "PRISM", "LEDGER"],
            Archetype::Builder => &["FORGE", "ANVIL", "RIVET", "GANTRY"],
            Archetype::Sentinel => &["AEGIS", "BASTION", "WARDEN", "BEACON"],
        }
    }

    pub fn portrait(&self) -> &'static str {
        match self {
            Archetype::Operator => "portraits/operator.png",
            Archetype::Analyst => "portraits/analyst.png",
            Archetype::Builder => "portraits/builder.png",
            Archetype::Sentinel => "portraits/sentinel.png",
        }
    }

    /// Case-insensitive match against the archetype label.
    pub fn parse(raw: &str) -> Option<Archetype> {
        let raw = raw.trim();

        Archetype::ALL.iter().copied().find(|archetype| archetype.label().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::parse(s).ok_or_else(|| format!("Unknown archetype: {}", s))
    }
}

// ─── Status ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl UnitStatus {
    pub const ALL: [UnitStatus; 3] = [UnitStatus::Idle, UnitStatus::Running, UnitStatus::Paused];

    pub fn name(&self) -> &'static str {
        match self {
            UnitStatus::Idle => "idle",
            UnitStatus::Running => "running",
            UnitStatus::Paused => "paused",
        }
    }

    pub fn parse(raw: &str) -> Option<UnitStatus> {
        let raw = raw.trim();

        UnitStatus::ALL.iter().copied().find(|status| status.name().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for UnitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitStatus::parse(s).ok_or_else(|| format!("Unknown status: {}", s))
    }
}

// ─── Unit ───────────────────────────────────────────────────────────────────

/// A recruited operator record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Opaque, unique and immutable once created.
    pub id: String,
    pub name: String,
    /// Normalized token, unique among current units.
    pub callsign: String,
    pub archetype: Archetype,
    /// Squad reference. Corrected by the allocator when unknown or stale.
    pub squad_id: String,
    /// Always `Some` once the unit has been through an allocation pass.
    pub slot_index: Option<usize>,
    /// Empty means unset; the allocator fills in the squad's default tag.
    pub project_tag: String,
    pub enabled: bool,
    pub status: UnitStatus,
    pub portrait: String,
    pub model: String,
    pub provider: String,
    pub schedule: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub extra: BTreeMap<String, String>,
}

impl Unit {
    pub fn is_online(&self) -> bool {
        self.enabled && self.status != UnitStatus::Paused
    }
}

// ─── Inputs ─────────────────────────────────────────────────────────────────

/// Recruitment request. Passthrough fields left as `None` take the
/// archetype's defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitDraft {
    pub archetype: Archetype,
    pub callsign: Option<String>,
    /// Preferred squad id; `None` or `"auto"` lets the planner choose.
    pub squad: Option<String>,
    pub name: Option<String>,
    pub project_tag: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub schedule: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub extra: BTreeMap<String, String>,
}

impl UnitDraft {
    pub fn new(archetype: Archetype) -> UnitDraft {
        UnitDraft {
            archetype,
            callsign: None,
            squad: None,
            name: None,
            project_tag: None,
            model: None,
            provider: None,
            schedule: None,
            temperature: None,
            max_tokens: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_callsign(mut self, callsign: &str) -> UnitDraft {
        self.callsign = Some(callsign.to_string());
        self
    }

    pub fn with_squad(mut self, squad: &str) -> UnitDraft {
        self.squad = Some(squad.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> UnitDraft {
        self.name = Some(name.to_string());
        self
    }
}

/// Field-level edit of an existing unit. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub callsign: Option<String>,
    pub archetype: Option<Archetype>,
    pub squad_id: Option<String>,
    /// Seat hint; honored only if the allocator finds it valid.
    pub slot_index: Option<usize>,
    pub project_tag: Option<String>,
    pub enabled: Option<bool>,
    pub status: Option<UnitStatus>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub schedule: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl UnitPatch {
    pub fn is_empty(&self) -> bool {
        *self == UnitPatch::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchAction {
    Enable,
    Disable,
    Pause,
    Resume,
}

impl BatchAction {
    pub const ALL: [BatchAction; 4] = [BatchAction::Enable, BatchAction::Disable, BatchAction::Pause, BatchAction::Resume];

    pub fn verb(&self) -> &'static str {
        match self {
            BatchAction::Enable => "enable",
            BatchAction::Disable => "disable",
            BatchAction::Pause => "pause",
            BatchAction::Resume => "resume",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            BatchAction::Enable => "Enabled",
            BatchAction::Disable => "Disabled",
            BatchAction::Pause => "Paused",
            BatchAction::Resume => "Resumed",
        }
    }

    /// Apply the action to a single unit. Returns whether anything changed.
    pub fn apply(&self, unit: &mut Unit) -> bool {
        let before = (unit.enabled, unit.status);

        match self {
            BatchAction::Enable => unit.enabled = true,
            BatchAction::Disable => unit.enabled = false,
            BatchAction::Pause => unit.status = UnitStatus::Paused,
            BatchAction::Resume => unit.status = UnitStatus::Running,
        }

        before != (unit.enabled, unit.status)
    }
}

impl FromStr for BatchAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();

        BatchAction::ALL
            .iter()
            .copied()
            .find(|action| action.verb().eq_ignore_ascii_case(raw))
            .ok_or_else(|| format!("Unknown batch action: {}", s))
    }
}

// ─── Notice ─────────────────────────────────────────────────────────────────

/// Human-readable outcome of a roster operation, shown by the dashboard.
#[derive(Shrinkwrap, Clone, Debug, PartialEq, Eq)]
pub struct Notice(String);

impl Notice {
    pub fn new(message: impl Into<String>) -> Notice {
        Notice(message.into())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
