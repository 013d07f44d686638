//! Load and repair a persisted roster.
//!
//! Persisted records are duck-typed: any field may be missing, of the wrong
//! JSON type or of an unexpected value. A wrong-typed field counts as missing.
//! Each record is merged field by field over the default for its position,
//! duplicate ids and duplicate identity fingerprints are dropped, callsigns
//! are made unique, and the result goes through slot allocation before it is
//! accepted.

use super::data::*;
use super::defaults::{default_roster, positional_default};
use crate::identity::{make_unit_id, next_callsign_excluding, normalize_token};
use crate::squad::allocator::assign_slots;
use crate::squad::topology::SquadTopology;
use bitflags::*;
use log::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

bitflags! {
    /// Repairs applied while hydrating a roster.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct RepairFlags: u8 {
        /// A record repeated an id seen earlier and was dropped.
        const DUPLICATE_ID          = 1;
        /// A record repeated a (name, callsign, archetype) fingerprint and was dropped.
        const DUPLICATE_FINGERPRINT = 1 << 1;
        /// A callsign was missing, empty or taken and an automatic one was used.
        const CALLSIGN_REASSIGNED   = 1 << 2;
        /// A record had no id and one was minted.
        const ID_MINTED             = 1 << 3;
        /// The payload was unusable and the built-in roster was loaded.
        const DEFAULT_ROSTER        = 1 << 4;
        /// A field had the wrong JSON type and was treated as absent.
        const MALFORMED_FIELD       = 1 << 5;
        /// A list element was not an object and was dropped.
        const MALFORMED_RECORD      = 1 << 6;
    }
}

/// Persisted unit record with every field optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedUnit {
    pub id: Option<String>,
    pub name: Option<String>,
    pub callsign: Option<String>,
    pub archetype: Option<String>,
    pub squad_id: Option<String>,
    pub slot_index: Option<f64>,
    pub project_tag: Option<String>,
    pub enabled: Option<bool>,
    pub status: Option<String>,
    pub portrait: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub schedule: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u64>,
    pub extra: Option<BTreeMap<String, String>>,
}

fn field<T>(record: &Map<String, Value>, key: &str, read: impl FnOnce(&Value) -> Option<T>, malformed: &mut bool) -> Option<T> {
    let value = record.get(key).filter(|value| !value.is_null())?;

    let result = read(value);

    if result.is_none() {
        debug!("Ignoring persisted field {} - unexpected value {}", key, value);
        *malformed = true;
    }

    result
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Scalars are kept as text; nested values are rejected.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn scalar_entries(extra: &Map<String, Value>, nested: &mut bool) -> BTreeMap<String, String> {
    extra
        .iter()
        .filter_map(|(key, value)| match scalar_text(value) {
            Some(text) => Some((key.clone(), text)),
            None => {
                debug!("Ignoring persisted extra {} - nested value", key);
                *nested = true;
                None
            }
        })
        .collect()
}

impl PersistedUnit {
    /// Read a record field by field. Returns `None` for non-objects; the flag
    /// is set when any present field had to be ignored.
    pub fn from_value(value: &Value) -> Option<(PersistedUnit, bool)> {
        let record = value.as_object()?;
        let mut malformed = false;
        let mut nested = false;

        let unit = PersistedUnit {
            id: field(record, "id", text, &mut malformed),
            name: field(record, "name", text, &mut malformed),
            callsign: field(record, "callsign", text, &mut malformed),
            archetype: field(record, "archetype", text, &mut malformed),
            squad_id: field(record, "squadId", text, &mut malformed),
            slot_index: field(record, "slotIndex", Value::as_f64, &mut malformed),
            project_tag: field(record, "projectTag", text, &mut malformed),
            enabled: field(record, "enabled", Value::as_bool, &mut malformed),
            status: field(record, "status", text, &mut malformed),
            portrait: field(record, "portrait", text, &mut malformed),
            model: field(record, "model", text, &mut malformed),
            provider: field(record, "provider", text, &mut malformed),
            schedule: field(record, "schedule", text, &mut malformed),
            temperature: field(
                record,
                "temperature",
                |value| value.as_f64().filter(|t| t.is_finite() && t.abs() <= f32::MAX as f64).map(|t| t as f32),
                &mut malformed,
            ),
            max_tokens: field(record, "maxTokens", Value::as_u64, &mut malformed),
            extra: field(record, "extra", |value| value.as_object().map(|extra| scalar_entries(extra, &mut nested)), &mut malformed),
        };

        Some((unit, malformed || nested))
    }

    /// Slot hint if it is a non-negative whole number.
    fn slot_hint(&self) -> Option<usize> {
        self.slot_index
            .filter(|slot| slot.is_finite() && *slot >= 0.0 && slot.fract() == 0.0 && *slot <= usize::MAX as f64)
            .map(|slot| slot as usize)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hydration {
    pub units: Vec<Unit>,
    pub repairs: RepairFlags,
}

impl Hydration {
    fn default_roster(topology: &SquadTopology) -> Hydration {
        Hydration {
            units: assign_slots(topology, &default_roster()),
            repairs: RepairFlags::DEFAULT_ROSTER,
        }
    }
}

fn fingerprint(name: &str, callsign: &str, archetype: Archetype) -> (String, String, Archetype) {
    (name.trim().to_lowercase(), callsign.to_string(), archetype)
}

/// Turn persisted records into an allocated, identity-consistent roster.
pub fn hydrate(topology: &SquadTopology, records: &[PersistedUnit]) -> Hydration {
    let mut units: Vec<Unit> = Vec::with_capacity(records.len());
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_fingerprints = HashSet::new();
    let mut taken_callsigns: HashSet<String> = HashSet::new();
    let mut repairs = RepairFlags::empty();

    for (position, record) in records.iter().enumerate() {
        let default = positional_default(position);

        let archetype = record.archetype.as_deref().and_then(Archetype::parse).unwrap_or(default.archetype);

        let raw_id = record.id.as_deref().map(str::trim).filter(|id| !id.is_empty());

        if let Some(id) = raw_id {
            if seen_ids.contains(id) {
                debug!("Dropping record {} - duplicate id {}", position, id);
                repairs |= RepairFlags::DUPLICATE_ID;
                continue;
            }
        }

        let requested = record.callsign.as_deref().map(normalize_token).filter(|callsign| !callsign.is_empty());

        let callsign = match requested {
            Some(ref callsign) if !taken_callsigns.contains(callsign) => callsign.clone(),
            _ => next_callsign_excluding(archetype, &taken_callsigns),
        };

        let name = record.name.clone().unwrap_or_else(|| default.name.clone());

        let key = fingerprint(&name, requested.as_deref().unwrap_or(&callsign), archetype);

        if seen_fingerprints.contains(&key) {
            debug!("Dropping record {} - duplicate of {:?}", position, key);
            repairs |= RepairFlags::DUPLICATE_FINGERPRINT;
            continue;
        }

        if requested.as_deref() != Some(callsign.as_str()) {
            repairs |= RepairFlags::CALLSIGN_REASSIGNED;
        }

        let id = match raw_id {
            Some(id) => id.to_string(),
            None => {
                repairs |= RepairFlags::ID_MINTED;
                make_unit_id(&units)
            }
        };

        seen_ids.insert(id.clone());
        seen_fingerprints.insert(key);
        taken_callsigns.insert(callsign.clone());

        let portrait = record.portrait.clone().unwrap_or_else(|| {
            if archetype == default.archetype {
                default.portrait.clone()
            } else {
                archetype.portrait().to_string()
            }
        });

        units.push(Unit {
            id,
            name,
            callsign,
            archetype,
            squad_id: record.squad_id.clone().unwrap_or(default.squad_id),
            slot_index: record.slot_hint(),
            project_tag: record.project_tag.clone().unwrap_or(default.project_tag),
            enabled: record.enabled.unwrap_or(default.enabled),
            status: record.status.as_deref().and_then(UnitStatus::parse).unwrap_or(default.status),
            portrait,
            model: record.model.clone().unwrap_or(default.model),
            provider: record.provider.clone().unwrap_or(default.provider),
            schedule: record.schedule.clone().unwrap_or(default.schedule),
            temperature: record.temperature.unwrap_or(default.temperature),
            max_tokens: record.max_tokens.map(|tokens| tokens.min(u32::MAX as u64) as u32).unwrap_or(default.max_tokens),
            extra: record.extra.clone().unwrap_or(default.extra),
        });
    }

    if !repairs.is_empty() {
        info!("Hydrated {} of {} roster records - Repairs: {:?}", units.len(), records.len(), repairs);
    }

    Hydration {
        units: assign_slots(topology, &units),
        repairs,
    }
}

/// Parse and hydrate a persisted roster payload. Missing, unparsable or empty
/// payloads yield the built-in roster.
pub fn load_roster(topology: &SquadTopology, payload: Option<&str>) -> Hydration {
    let payload = match payload.map(str::trim).filter(|payload| !payload.is_empty()) {
        Some(payload) => payload,
        None => return Hydration::default_roster(topology),
    };

    let values = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(values)) => values,
        Ok(_) => {
            warn!("Persisted roster is not a list, using default roster");
            return Hydration::default_roster(topology);
        }
        Err(e) => {
            warn!("Failed to parse persisted roster, using default roster: {}", e);
            return Hydration::default_roster(topology);
        }
    };

    let mut repairs = RepairFlags::empty();

    let records: Vec<PersistedUnit> = values
        .iter()
        .enumerate()
        .filter_map(|(position, value)| match PersistedUnit::from_value(value) {
            Some((record, malformed)) => {
                if malformed {
                    repairs |= RepairFlags::MALFORMED_FIELD;
                }

                Some(record)
            }
            None => {
                debug!("Dropping persisted element {} - not an object", position);
                repairs |= RepairFlags::MALFORMED_RECORD;
                None
            }
        })
        .collect();

    let mut hydration = hydrate(topology, &records);

    hydration.repairs |= repairs;

    if hydration.units.is_empty() {
        warn!("Persisted roster has no usable units, using default roster");
        return Hydration::default_roster(topology);
    }

    hydration
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, callsign: &str, archetype: &str) -> PersistedUnit {
        PersistedUnit {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            callsign: Some(callsign.to_string()),
            archetype: Some(archetype.to_string()),
            ..PersistedUnit::default()
        }
    }

    #[test]
    fn same_fingerprint_with_different_ids_yields_one_unit() {
        let records = vec![
            record("bot-1", "Yasna", "vanguard", "operator"),
            record("bot-2", "  YASNA ", "VANGUARD", "Operator"),
        ];

        let hydration = hydrate(&SquadTopology::default(), &records);

        assert_eq!(hydration.units.len(), 1);
        assert_eq!(hydration.units[0].id, "bot-1");
        assert!(hydration.repairs.contains(RepairFlags::DUPLICATE_FINGERPRINT));
    }

    #[test]
    fn duplicate_ids_keep_the_first_record() {
        let records = vec![record("bot-1", "One", "ORBIT", "operator"), record("bot-1", "Two", "RELAY", "operator")];

        let hydration = hydrate(&SquadTopology::default(), &records);

        assert_eq!(hydration.units.len(), 1);
        assert_eq!(hydration.units[0].name, "One");
        assert_eq!(hydration.repairs, RepairFlags::DUPLICATE_ID);
    }

    #[test]
    fn colliding_callsign_is_replaced() {
        let records = vec![record("bot-1", "One", "forge", "builder"), record("bot-2", "Two", "FORGE", "builder")];

        let hydration = hydrate(&SquadTopology::default(), &records);

        let callsigns: Vec<&str> = hydration.units.iter().map(|unit| unit.callsign.as_str()).collect();
        assert_eq!(callsigns, vec!["FORGE", "ANVIL"]);
        assert!(hydration.repairs.contains(RepairFlags::CALLSIGN_REASSIGNED));
    }

    #[test]
    fn missing_fields_come_from_positional_default() {
        let records = vec![PersistedUnit::default(), PersistedUnit::default(), PersistedUnit::default()];

        let hydration = hydrate(&SquadTopology::default(), &records);
        let units = &hydration.units;

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].name, "Yasna");
        assert_eq!(units[0].archetype, Archetype::Operator);
        assert_eq!(units[1].archetype, Archetype::Analyst);
        assert_eq!(units[2].archetype, Archetype::Builder);
        assert!(units.iter().all(|unit| unit.id.starts_with("bot-")));
        assert!(hydration.repairs.contains(RepairFlags::ID_MINTED | RepairFlags::CALLSIGN_REASSIGNED));
        assert_eq!(units.iter().map(|unit| unit.slot_index).collect::<Vec<_>>(), vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn unknown_enums_and_bad_slots_are_tolerated() {
        let payload = r#"[{"id":"x","archetype":"wizard","status":"dancing","slotIndex":-3,"squadId":"bravo"},
                          {"id":"y","slotIndex":5.5,"status":"PAUSED","maxTokens":99999999999}]"#;

        let hydration = load_roster(&SquadTopology::default(), Some(payload));
        let units = &hydration.units;

        assert_eq!(units[0].archetype, Archetype::Operator);
        assert_eq!(units[0].status, UnitStatus::Idle);
        assert_eq!(units[0].slot_index, Some(4));
        assert_eq!(units[1].status, UnitStatus::Paused);
        assert_eq!(units[1].max_tokens, u32::MAX);
    }

    #[test]
    fn wrong_typed_fields_fall_back_per_field() {
        let payload = r##"[{"id":"bot-a","name":"Ada","callsign":"RELAY"},
                          {"id":7,"name":"Bo","callsign":"prism","archetype":"analyst","maxTokens":-1,
                           "enabled":"yes","slotIndex":"3","extra":{"retries":3,"verbose":true,"nested":{"a":1},"channel":"#ops"}}]"##;

        let hydration = load_roster(&SquadTopology::default(), Some(payload));
        let units = &hydration.units;

        assert_eq!(units.len(), 2);
        assert_eq!((units[0].id.as_str(), units[0].name.as_str(), units[0].callsign.as_str()), ("bot-a", "Ada", "RELAY"));

        assert!(units[1].id.starts_with("bot-"));
        assert_ne!(units[1].id, "7");
        assert_eq!(units[1].name, "Bo");
        assert_eq!(units[1].callsign, "PRISM");
        assert_eq!(units[1].max_tokens, positional_default(1).max_tokens);
        assert!(units[1].enabled);
        assert_eq!(units[1].slot_index, Some(1));

        let extra: Vec<(&str, &str)> = units[1].extra.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(extra, vec![("channel", "#ops"), ("retries", "3"), ("verbose", "true")]);

        assert!(hydration.repairs.contains(RepairFlags::MALFORMED_FIELD | RepairFlags::ID_MINTED));
        assert!(!hydration.repairs.contains(RepairFlags::DEFAULT_ROSTER));
    }

    #[test]
    fn non_object_elements_are_dropped() {
        let payload = r#"[42, "bot-x", null, [1], {"id":"bot-a","name":"Ada","callsign":"relay"}]"#;

        let hydration = load_roster(&SquadTopology::default(), Some(payload));

        assert_eq!(hydration.units.len(), 1);
        assert_eq!(hydration.units[0].id, "bot-a");
        assert_eq!(hydration.repairs, RepairFlags::MALFORMED_RECORD);
    }

    #[test]
    fn unusable_payloads_load_default_roster() {
        let topology = SquadTopology::default();

        for payload in [None, Some(""), Some("{broken"), Some("[]"), Some("{\"id\":1}"), Some("[1, \"two\"]")] {
            let hydration = load_roster(&topology, payload);

            assert_eq!(hydration.repairs, RepairFlags::DEFAULT_ROSTER);
            assert_eq!(hydration.units, assign_slots(&topology, &default_roster()));
        }
    }

    #[test]
    fn serialized_roster_hydrates_unchanged() {
        let topology = SquadTopology::default();
        let mut units = load_roster(&topology, None).units;
        units[1].extra.insert("channel".to_string(), "#ops".to_string());
        units[1].status = UnitStatus::Running;

        let payload = serde_json::to_string(&units).unwrap();
        let hydration = load_roster(&topology, Some(&payload));

        assert_eq!(hydration.units, units);
        assert!(hydration.repairs.is_empty());
    }
}
