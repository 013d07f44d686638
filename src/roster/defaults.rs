use super::data::*;
use std::collections::BTreeMap;

/// Passthrough defaults for a freshly recruited unit of `archetype`.
/// Identity fields (id, callsign, squad, slot) are left empty.
pub fn archetype_template(archetype: Archetype) -> Unit {
    let (schedule, temperature, max_tokens) = match archetype {
        Archetype::Operator => ("on-demand", 0.4, 4096),
        Archetype::Analyst => ("daily 07:00", 0.2, 8192),
        Archetype::Builder => ("on-demand", 0.3, 8192),
        Archetype::Sentinel => ("every 15m", 0.0, 2048),
    };

    Unit {
        id: String::new(),
        name: archetype.label().to_string(),
        callsign: String::new(),
        archetype,
        squad_id: String::new(),
        slot_index: None,
        project_tag: String::new(),
        enabled: true,
        status: UnitStatus::Idle,
        portrait: archetype.portrait().to_string(),
        model: "standard".to_string(),
        provider: "gateway".to_string(),
        schedule: schedule.to_string(),
        temperature,
        max_tokens,
        extra: BTreeMap::new(),
    }
}

/// Built-in roster used on first start and whenever the persisted roster is
/// unreadable. Not yet allocated.
pub fn default_roster() -> Vec<Unit> {
    let mut yasna = archetype_template(Archetype::Operator);
    yasna.id = "bot-yasna".to_string();
    yasna.name = "Yasna".to_string();
    yasna.callsign = "VANGUARD".to_string();
    yasna.squad_id = "alpha".to_string();
    yasna.slot_index = Some(0);

    let mut zhu = archetype_template(Archetype::Analyst);
    zhu.id = "bot-zhu".to_string();
    zhu.name = "Zhu".to_string();
    zhu.callsign = "ORACLE".to_string();
    zhu.squad_id = "alpha".to_string();
    zhu.slot_index = Some(1);

    vec![yasna, zhu]
}

/// Default a persisted record at `position` is merged over: the matching
/// built-in unit when there is one, otherwise a template cycling through the
/// archetypes. Its slot hint is dropped so positional defaults never claim seats.
pub fn positional_default(position: usize) -> Unit {
    let mut unit = default_roster()
        .into_iter()
        .nth(position)
        .unwrap_or_else(|| archetype_template(Archetype::ALL[position % Archetype::ALL.len()]));

    unit.slot_index = None;

    unit
}
