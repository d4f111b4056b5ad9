//! Raw generator payloads.
//!
//! Generated entities arrive as loosely shaped JSON: fields may be missing,
//! misspelled, stringly typed, or of the wrong shape entirely. The `Partial*`
//! types here accept any of that without failing; a field that cannot be
//! read as its expected type is kept as [`Loose::Invalid`] so the
//! canonicalizer can tell "absent" from "supplied but unusable".

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::de::{self, DeserializeOwned, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::entity::{Creature, InventoryItem, Npc};

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("empty payload")]
    Empty,
    #[error("invalid JSON: {0}")]
    Invalid(String),
}

/// A field that either parsed as `T` or was kept verbatim.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose<T> {
    Valid(T),
    Invalid(Value),
}

impl<T> Loose<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Loose::Valid(value) => Some(value),
            Loose::Invalid(_) => None,
        }
    }
}

/// Accepts either a single value or a list of them.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::Many(values) => values.iter(),
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
        }
    }
}

/// A finite number, also accepted when written as a numeric string (`"12"`, `" 7.5 "`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, JsonSchema)]
pub struct Num(pub f64);

impl<'de> Deserialize<'de> for Num {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumVisitor)
    }
}

struct NumVisitor;

impl<'de> Visitor<'de> for NumVisitor {
    type Value = Num;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a finite number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Num, E> {
        Ok(Num(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Num, E> {
        Ok(Num(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Num, E> {
        if value.is_finite() {
            Ok(Num(value))
        } else {
            Err(E::custom("non-finite number"))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Num, E> {
        let trimmed = value.trim().trim_end_matches('%').trim_end();
        match trimmed.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => Ok(Num(parsed)),
            _ => Err(E::custom(format!("not a number: {value}"))),
        }
    }
}

pub type Text = Option<Loose<String>>;
pub type Number = Option<Loose<Num>>;
pub type Flag = Option<Loose<bool>>;
pub type TextList = Option<Loose<OneOrMany<Loose<String>>>>;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialCreature {
    pub id: Text,
    pub instance_id: Text,
    pub name: Text,
    pub types: TextList,
    pub current_hp: Number,
    pub max_hp: Number,
    pub level: Number,
    pub experience: Option<Loose<ExperienceInput>>,
    pub stats: Option<Loose<PartialStats>>,
    pub ivs: Option<Loose<PartialStats>>,
    pub nature: Text,
    pub moves: Option<Loose<OneOrMany<MoveInput>>>,
    pub statuses: TextList,
    pub stat_stages: Option<Loose<BTreeMap<String, Loose<Num>>>>,
    pub is_hit: Flag,
    pub is_owned: Flag,
    pub image: Text,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ExperienceInput {
    Flat(Num),
    Detailed(PartialExperience),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialExperience {
    pub current: Number,
    pub to_next: Number,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialStats {
    pub hp: Number,
    pub attack: Number,
    pub defense: Number,
    pub sp_attack: Number,
    pub sp_defense: Number,
    pub speed: Number,
}

/// Moves may be given by name only or as a full object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum MoveInput {
    Named(String),
    Detailed(PartialMove),
    Invalid(Value),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialMove {
    pub name: Text,
    pub power: Number,
    #[serde(rename = "type")]
    pub element: Text,
    pub category: Text,
    pub pp: Number,
    pub current_pp: Number,
    pub accuracy: Number,
    pub priority: Number,
    pub effects: Option<Loose<OneOrMany<Loose<PartialEffect>>>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialEffect {
    pub kind: Text,
    pub target: Text,
    pub chance: Number,
    pub status: Text,
    pub stat: Text,
    pub stages: Number,
    pub heal_percent: Number,
    pub recoil_percent: Number,
    pub fixed_damage: Number,
    pub min_hits: Number,
    pub max_hits: Number,
    pub description: Text,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialItem {
    pub id: Text,
    pub name: Text,
    pub quantity: Number,
    pub description: Option<DescriptionInput>,
    pub usable_in_battle: Flag,
    pub target: Text,
    pub effect: Option<ItemEffectInput>,
    pub image: Text,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum DescriptionInput {
    Text(String),
    Nested(Map<String, Value>),
    Other(Value),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemEffectInput {
    Named(String),
    Detailed(PartialItemEffect),
    Invalid(Value),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialItemEffect {
    #[serde(rename = "type")]
    pub kind: Text,
    pub amount: Number,
    pub status: Text,
    pub stat: Text,
    pub stages: Number,
    pub modifier: Number,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialNpc {
    pub id: Text,
    pub name: Text,
    pub description: Text,
    pub relationship: Text,
    pub portrait: Text,
    pub dialogue: Option<Loose<Vec<DialogueInput>>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum DialogueInput {
    Text(String),
    Line(PartialLine),
    Invalid(Value),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PartialLine {
    pub speaker: Text,
    pub text: Text,
}

/// Alternate spellings accepted for a field, keyed by the field's wire name.
type KeyAliases = &'static [(&'static str, &'static [&'static str])];

const CREATURE_KEYS: KeyAliases = &[
    ("instanceId", &["instance_id"]),
    ("name", &["species"]),
    ("types", &["type"]),
    ("currentHp", &["hp", "current_hp"]),
    ("maxHp", &["max_hp"]),
    ("experience", &["exp"]),
    ("statuses", &["status"]),
    ("statStages", &["stat_stages"]),
    ("isHit", &["is_hit"]),
    ("isOwned", &["is_owned"]),
    ("image", &["imageUrl", "image_url"]),
];

const EXPERIENCE_KEYS: KeyAliases = &[("toNext", &["toNextLevel", "to_next"])];

const STAT_KEYS: KeyAliases = &[
    ("attack", &["atk"]),
    ("defense", &["def"]),
    ("spAttack", &["specialAttack", "sp_attack"]),
    ("spDefense", &["specialDefense", "sp_defense"]),
    ("speed", &["spe"]),
];

const MOVE_KEYS: KeyAliases = &[
    ("type", &["element"]),
    ("pp", &["maxPp"]),
    ("currentPp", &["current_pp"]),
];

const EFFECT_KEYS: KeyAliases = &[
    ("kind", &["type"]),
    ("healPercent", &["heal_percent"]),
    ("recoilPercent", &["recoil_percent"]),
    ("fixedDamage", &["fixed_damage"]),
    ("minHits", &["min_hits"]),
    ("maxHits", &["max_hits"]),
];

const ITEM_KEYS: KeyAliases = &[
    ("quantity", &["qty", "count"]),
    ("usableInBattle", &["usable", "usable_in_battle"]),
    ("image", &["imageUrl", "image_url"]),
];

const ITEM_EFFECT_KEYS: KeyAliases = &[("type", &["kind"]), ("modifier", &["catchRate"])];

const NPC_KEYS: KeyAliases = &[
    ("relationship", &["relationshipStatus"]),
    ("portrait", &["portraitUrl"]),
    ("dialogue", &["dialogueHistory"]),
];

/// Folds every spelling of a field into its wire name. The wire name wins,
/// then aliases in table order; nulls never win over a real value.
fn merge_keys(map: &mut Map<String, Value>, aliases: KeyAliases) {
    for (key, alternates) in aliases {
        let mut chosen = map.remove(*key).filter(|value| !value.is_null());
        for alternate in *alternates {
            if let Some(value) = map.remove(*alternate) {
                if chosen.is_none() && !value.is_null() {
                    chosen = Some(value);
                } else {
                    debug!(field = *key, alias = *alternate, "dropping duplicate field");
                }
            }
        }
        if let Some(value) = chosen {
            map.insert((*key).to_string(), value);
        }
    }
}

fn for_each_object(value: Option<&mut Value>, mut apply: impl FnMut(&mut Map<String, Value>)) {
    match value {
        Some(Value::Object(map)) => apply(map),
        Some(Value::Array(values)) => {
            for map in values.iter_mut().filter_map(Value::as_object_mut) {
                apply(map);
            }
        }
        _ => {}
    }
}

/// Reading a partial never fails: anything unreadable becomes an empty partial.
pub trait Intake: DeserializeOwned + Default {
    /// Rewrites alternate field spellings in place before deserializing.
    fn normalize(map: &mut Map<String, Value>);

    fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            debug!(kind = json_kind(value), "payload is not an object");
            return Self::default();
        };
        let mut map = map.clone();
        Self::normalize(&mut map);
        match Self::deserialize(Value::Object(map)) {
            Ok(partial) => partial,
            Err(err) => {
                debug!(error = %err, "payload did not match partial shape");
                Self::default()
            }
        }
    }

    fn from_text(raw: &str) -> Self {
        match parse_json_loose::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                debug!(error = %err, "payload text was not JSON");
                Self::default()
            }
        }
    }
}

impl Intake for PartialCreature {
    fn normalize(map: &mut Map<String, Value>) {
        merge_keys(map, CREATURE_KEYS);
        for_each_object(map.get_mut("experience"), |exp| merge_keys(exp, EXPERIENCE_KEYS));
        for_each_object(map.get_mut("stats"), |stats| merge_keys(stats, STAT_KEYS));
        for_each_object(map.get_mut("ivs"), |ivs| merge_keys(ivs, STAT_KEYS));
        for_each_object(map.get_mut("moves"), |mv| {
            merge_keys(mv, MOVE_KEYS);
            for_each_object(mv.get_mut("effects"), |effect| merge_keys(effect, EFFECT_KEYS));
        });
    }
}

impl Intake for PartialItem {
    fn normalize(map: &mut Map<String, Value>) {
        merge_keys(map, ITEM_KEYS);
        for_each_object(map.get_mut("effect"), |effect| merge_keys(effect, ITEM_EFFECT_KEYS));
    }
}

impl Intake for PartialNpc {
    fn normalize(map: &mut Map<String, Value>) {
        merge_keys(map, NPC_KEYS);
    }
}

// Nested types live under `definitions`, so the whole root is exported.
pub fn creature_schema_string() -> String {
    let schema = schemars::schema_for!(Creature);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

pub fn item_schema_string() -> String {
    let schema = schemars::schema_for!(InventoryItem);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

pub fn npc_schema_string() -> String {
    let schema = schemars::schema_for!(Npc);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

pub fn parse_json_loose<T: DeserializeOwned>(raw: &str) -> Result<T, PayloadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::Empty);
    }

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
        if let Ok(parsed) = serde_json::from_str::<T>(&inner) {
            return Ok(parsed);
        }
    }

    if let Some(candidate) = extract_json_candidate(trimmed) {
        if let Ok(parsed) = serde_json::from_str::<T>(&candidate) {
            return Ok(parsed);
        }
    }

    Err(PayloadError::Invalid(shorten(trimmed, 200)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn extract_json_candidate(raw: &str) -> Option<String> {
    if let Some(fenced) = extract_fenced_json(raw) {
        return Some(fenced);
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

fn extract_fenced_json(raw: &str) -> Option<String> {
    let fence = "```";
    let start = raw.find(fence)?;
    let rest = &raw[start + fence.len()..];
    let end = rest.find(fence)?;
    let inside = rest[..end].trim();
    let inside = inside.strip_prefix("json").unwrap_or(inside).trim_start();
    if inside.is_empty() {
        None
    } else {
        Some(inside.to_string())
    }
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = text.chars().take(max).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_accept_numeric_strings() {
        let partial = PartialCreature::from_value(&json!({ "level": "12", "maxHp": 40.5 }));
        assert_eq!(partial.level, Some(Loose::Valid(Num(12.0))));
        assert_eq!(partial.max_hp, Some(Loose::Valid(Num(40.5))));
    }

    #[test]
    fn wrong_shapes_are_kept_as_invalid() {
        let partial = PartialCreature::from_value(&json!({ "level": "very high", "name": 7 }));
        assert_eq!(partial.level, Some(Loose::Invalid(json!("very high"))));
        assert_eq!(partial.name, Some(Loose::Invalid(json!(7))));
        assert!(partial.nature.is_none());
    }

    #[test]
    fn moves_accept_names_and_objects() {
        let partial = PartialCreature::from_value(&json!({
            "moves": ["Ember", { "name": "Scratch", "power": 40 }, 12]
        }));
        let moves: Vec<_> = partial.moves.as_ref().and_then(Loose::valid).unwrap().iter().collect();
        assert!(matches!(moves[0], MoveInput::Named(name) if name == "Ember"));
        assert!(matches!(moves[1], MoveInput::Detailed(_)));
        assert!(matches!(moves[2], MoveInput::Invalid(_)));
    }

    #[test]
    fn single_move_name_is_accepted() {
        let partial = PartialCreature::from_value(&json!({ "moves": "Thunderbolt" }));
        let moves = partial.moves.as_ref().and_then(Loose::valid).unwrap();
        assert!(matches!(moves, OneOrMany::One(MoveInput::Named(name)) if name == "Thunderbolt"));
    }

    #[test]
    fn duplicated_spellings_keep_the_rest_of_the_payload() {
        let partial = PartialCreature::from_value(&json!({
            "name": "Charizard",
            "type": "fire",
            "types": ["fire", "flying"],
            "hp": 20,
            "currentHp": 25,
            "level": 50
        }));
        assert_eq!(partial.name, Some(Loose::Valid("Charizard".to_string())));
        assert_eq!(partial.current_hp, Some(Loose::Valid(Num(25.0))));
        assert_eq!(partial.level, Some(Loose::Valid(Num(50.0))));
        let types = partial.types.as_ref().and_then(Loose::valid).unwrap();
        assert_eq!(types.iter().count(), 2);

        let item = PartialItem::from_value(&json!({
            "name": "Potion",
            "qty": 5,
            "quantity": 4,
            "usable": true,
            "usableInBattle": true
        }));
        assert_eq!(item.name, Some(Loose::Valid("Potion".to_string())));
        assert_eq!(item.quantity, Some(Loose::Valid(Num(4.0))));
        assert_eq!(item.usable_in_battle, Some(Loose::Valid(true)));
    }

    #[test]
    fn alias_used_when_wire_name_is_null() {
        let partial = PartialCreature::from_value(&json!({ "currentHp": null, "hp": 9 }));
        assert_eq!(partial.current_hp, Some(Loose::Valid(Num(9.0))));
    }

    #[test]
    fn nested_duplicates_are_merged() {
        let partial = PartialCreature::from_value(&json!({
            "moves": [{
                "name": "Flamethrower",
                "type": "fire",
                "element": "fire",
                "effects": { "kind": "status", "type": "status", "status": "burn" }
            }]
        }));
        let moves: Vec<_> = partial.moves.as_ref().and_then(Loose::valid).unwrap().iter().collect();
        let MoveInput::Detailed(detailed) = moves[0] else {
            panic!("expected a detailed move, got {:?}", moves[0]);
        };
        assert_eq!(detailed.element, Some(Loose::Valid("fire".to_string())));
        let effects = detailed.effects.as_ref().and_then(Loose::valid).unwrap();
        let effect = effects.iter().next().and_then(Loose::valid).unwrap();
        assert_eq!(effect.status, Some(Loose::Valid("burn".to_string())));

        let item = PartialItem::from_value(&json!({
            "name": "Quick Ball",
            "effect": { "type": "capture", "kind": "capture", "modifier": 2, "catchRate": 3 }
        }));
        let Some(ItemEffectInput::Detailed(effect)) = item.effect else {
            panic!("expected a detailed effect");
        };
        assert_eq!(effect.modifier, Some(Loose::Valid(Num(2.0))));
    }

    #[test]
    fn single_type_string_is_accepted() {
        let partial = PartialCreature::from_value(&json!({ "type": "fire" }));
        let types = partial.types.as_ref().and_then(Loose::valid).unwrap();
        assert_eq!(types.iter().count(), 1);
    }

    #[test]
    fn non_object_payload_is_empty_partial() {
        let partial = PartialItem::from_value(&json!([1, 2, 3]));
        assert!(partial.name.is_none());
        assert!(partial.quantity.is_none());
    }

    #[test]
    fn parse_fenced_json() {
        let input = "Here you go:\n```json\n{\"name\":\"Potion\"}\n```";
        let partial = PartialItem::from_text(input);
        assert_eq!(partial.name, Some(Loose::Valid("Potion".to_string())));
    }

    #[test]
    fn parse_embedded_object() {
        let value: Value = parse_json_loose("sure! {\"name\": \"Mira\"} hope that helps").unwrap();
        assert_eq!(value, json!({ "name": "Mira" }));
    }

    #[test]
    fn parse_empty_is_error() {
        assert_eq!(parse_json_loose::<Value>("   "), Err(PayloadError::Empty));
    }

    fn collect_refs<'a>(value: &'a Value, refs: &mut Vec<&'a str>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(target)) = map.get("$ref") {
                    refs.push(target);
                }
                map.values().for_each(|child| collect_refs(child, refs));
            }
            Value::Array(values) => values.iter().for_each(|child| collect_refs(child, refs)),
            _ => {}
        }
    }

    #[test]
    fn schema_refs_resolve() {
        for raw in [creature_schema_string(), item_schema_string(), npc_schema_string()] {
            let schema: Value = serde_json::from_str(&raw).unwrap();
            assert!(schema.get("properties").is_some());
            let mut refs = Vec::new();
            collect_refs(&schema, &mut refs);
            for target in refs {
                let name = target.strip_prefix("#/definitions/").unwrap();
                assert!(schema["definitions"].get(name).is_some(), "unresolved {target}");
            }
        }
        assert!(creature_schema_string().contains("#/definitions/Move"));
    }
}
