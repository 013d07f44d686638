//! Canonical identity tokens and collision-free ids.

use crate::constants::{MAX_TOKEN_LEN, UNIT_ID_PREFIX};
use crate::roster::data::{Archetype, Unit};
use itertools::Itertools;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// Canonicalize free text into a callsign/tag token: diacritics folded,
/// upper-cased, restricted to `[A-Z0-9-]`, whitespace runs joined by a single
/// hyphen, at most `MAX_TOKEN_LEN` characters.
pub fn normalize_token(raw: &str) -> String {
    let filtered: String = raw
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == ' ' || *c == '-')
        .collect();

    filtered.split_whitespace().join("-").chars().take(MAX_TOKEN_LEN).collect()
}

/// Normalized callsigns held by `units`.
pub fn taken_callsigns<'a>(units: impl IntoIterator<Item = &'a Unit>) -> HashSet<String> {
    units.into_iter().map(|unit| normalize_token(&unit.callsign)).collect()
}

/// First pool candidate for `archetype` that `units` do not already use,
/// falling back to `<LABEL>-<n>` for the smallest free `n`.
pub fn next_available_callsign(archetype: Archetype, units: &[Unit]) -> String {
    next_callsign_excluding(archetype, &taken_callsigns(units))
}

pub fn next_callsign_excluding(archetype: Archetype, taken: &HashSet<String>) -> String {
    if let Some(candidate) = archetype
        .callsign_pool()
        .iter()
        .map(|candidate| normalize_token(candidate))
        .find(|candidate| !taken.contains(candidate))
    {
        return candidate;
    }

    let label = normalize_token(archetype.label());

    (1..)
        .map(|n| normalize_token(&format!("{}-{}", label, n)))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(label)
}

/// Mint an id not used by any of `units`.
pub fn make_unit_id(units: &[Unit]) -> String {
    make_unit_id_with(units, || format!("{}{}", UNIT_ID_PREFIX, Uuid::new_v4().to_simple()))
}

/// Mint an id from `generate`, retrying until it misses every existing id.
pub fn make_unit_id_with<F>(units: &[Unit], mut generate: F) -> String
where
    F: FnMut() -> String,
{
    let existing: HashSet<&str> = units.iter().map(|unit| unit.id.as_str()).collect();

    loop {
        let candidate = generate();

        if !candidate.is_empty() && !existing.contains(candidate.as_str()) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::defaults::archetype_template;

    fn unit_with_callsign(archetype: Archetype, callsign: &str) -> Unit {
        let mut unit = archetype_template(archetype);
        unit.callsign = callsign.to_string();
        unit
    }

    #[test]
    fn folds_diacritics_and_collapses_whitespace() {
        assert_eq!(normalize_token("néon  flux!!"), "NEON-FLUX");
        assert_eq!(normalize_token("  alpha\tteam  "), "ALPHA-TEAM");
        assert_eq!(normalize_token("Straße 9"), "STRASSE-9");
        assert_eq!(normalize_token("!!!"), "");
    }

    #[test]
    fn truncates_to_max_len() {
        let token = normalize_token("a very long callsign that keeps going");

        assert_eq!(token.len(), MAX_TOKEN_LEN);
        assert_eq!(token, "A-VERY-LONG-CALLSI");
        assert_eq!(normalize_token(&token), token);
    }

    #[test]
    fn callsign_scans_pool_in_order() {
        let units = vec![
            unit_with_callsign(Archetype::Builder, "forge"),
            unit_with_callsign(Archetype::Operator, "RIVET"),
        ];

        assert_eq!(next_available_callsign(Archetype::Builder, &units), "ANVIL");
        assert_eq!(next_available_callsign(Archetype::Sentinel, &units), "AEGIS");
    }

    #[test]
    fn callsign_falls_back_to_numbered_label() {
        let mut units: Vec<Unit> = Archetype::Analyst
            .callsign_pool()
            .iter()
            .map(|callsign| unit_with_callsign(Archetype::Analyst, callsign))
            .collect();

        assert_eq!(next_available_callsign(Archetype::Analyst, &units), "ANALYST-1");

        units.push(unit_with_callsign(Archetype::Analyst, "analyst 1"));
        assert_eq!(next_available_callsign(Archetype::Analyst, &units), "ANALYST-2");
    }

    #[test]
    fn unit_id_retries_on_collision() {
        let mut existing = archetype_template(Archetype::Operator);
        existing.id = "bot-1".to_string();

        let mut candidates = vec!["bot-2", "", "bot-1"];
        let id = make_unit_id_with(&[existing.clone()], || candidates.pop().unwrap_or("bot-3").to_string());

        assert_eq!(id, "bot-2");
        assert!(make_unit_id(&[existing]).starts_with(UNIT_ID_PREFIX));
    }
}
