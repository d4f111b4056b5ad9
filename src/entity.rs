//! Canonical game entities.
//!
//! Everything in this module is assumed valid: values are produced by
//! [`crate::canon::Canonicalizer`] and afterwards only mutated through the
//! battle reducer, which re-runs [`Creature::refresh`] after every patch.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MAX_LEVEL: u8 = 100;
pub const MAX_MOVES: usize = 4;
pub const MAX_TYPES: usize = 2;
pub const MAX_STAGE: i8 = 6;
pub const MAX_IV: u8 = 31;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Normal,
    Fire,
    Water,
    Grass,
    Electric,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl ElementType {
    pub const ALL: [ElementType; 18] = [
        ElementType::Normal,
        ElementType::Fire,
        ElementType::Water,
        ElementType::Grass,
        ElementType::Electric,
        ElementType::Ice,
        ElementType::Fighting,
        ElementType::Poison,
        ElementType::Ground,
        ElementType::Flying,
        ElementType::Psychic,
        ElementType::Bug,
        ElementType::Rock,
        ElementType::Ghost,
        ElementType::Dragon,
        ElementType::Dark,
        ElementType::Steel,
        ElementType::Fairy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ElementType::Normal => "normal",
            ElementType::Fire => "fire",
            ElementType::Water => "water",
            ElementType::Grass => "grass",
            ElementType::Electric => "electric",
            ElementType::Ice => "ice",
            ElementType::Fighting => "fighting",
            ElementType::Poison => "poison",
            ElementType::Ground => "ground",
            ElementType::Flying => "flying",
            ElementType::Psychic => "psychic",
            ElementType::Bug => "bug",
            ElementType::Rock => "rock",
            ElementType::Ghost => "ghost",
            ElementType::Dragon => "dragon",
            ElementType::Dark => "dark",
            ElementType::Steel => "steel",
            ElementType::Fairy => "fairy",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let key = normalize_key(input);
        Self::ALL.iter().copied().find(|element| element.label() == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusCondition {
    Burn,
    Freeze,
    Paralysis,
    Poison,
    BadlyPoisoned,
    Sleep,
    Confusion,
}

impl StatusCondition {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_key(input).as_str() {
            "burn" | "brn" | "burned" | "burnt" => Some(StatusCondition::Burn),
            "freeze" | "frz" | "frozen" => Some(StatusCondition::Freeze),
            "paralysis" | "par" | "paralyze" | "paralyzed" => Some(StatusCondition::Paralysis),
            "poison" | "psn" | "poisoned" => Some(StatusCondition::Poison),
            "badly_poisoned" | "tox" | "toxic" => Some(StatusCondition::BadlyPoisoned),
            "sleep" | "slp" | "asleep" | "sleeping" => Some(StatusCondition::Sleep),
            "confusion" | "confused" => Some(StatusCondition::Confusion),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCondition::Burn => "burn",
            StatusCondition::Freeze => "freeze",
            StatusCondition::Paralysis => "paralysis",
            StatusCondition::Poison => "poison",
            StatusCondition::BadlyPoisoned => "badly poisoned",
            StatusCondition::Sleep => "sleep",
            StatusCondition::Confusion => "confusion",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Attack,
    Defense,
    SpAttack,
    SpDefense,
    Speed,
    Accuracy,
    Evasion,
}

impl StatKind {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_key(input).as_str() {
            "attack" | "atk" => Some(StatKind::Attack),
            "defense" | "def" | "defence" => Some(StatKind::Defense),
            "sp_attack" | "spattack" | "special_attack" | "sp_atk" | "spatk" | "spa" => {
                Some(StatKind::SpAttack)
            }
            "sp_defense" | "spdefense" | "special_defense" | "sp_def" | "spdef" | "spd" => {
                Some(StatKind::SpDefense)
            }
            "speed" | "spe" => Some(StatKind::Speed),
            "accuracy" | "acc" => Some(StatKind::Accuracy),
            "evasion" | "eva" | "evasiveness" => Some(StatKind::Evasion),
            _ => None,
        }
    }
}

/// Temporary in-battle stat modifiers, each in `[-6, 6]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StatStages {
    pub attack: i8,
    pub defense: i8,
    pub sp_attack: i8,
    pub sp_defense: i8,
    pub speed: i8,
    pub accuracy: i8,
    pub evasion: i8,
}

impl StatStages {
    pub fn get(&self, stat: StatKind) -> i8 {
        match stat {
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::SpAttack => self.sp_attack,
            StatKind::SpDefense => self.sp_defense,
            StatKind::Speed => self.speed,
            StatKind::Accuracy => self.accuracy,
            StatKind::Evasion => self.evasion,
        }
    }

    pub fn set(&mut self, stat: StatKind, value: i64) {
        let value = clamp_stage(value);
        match stat {
            StatKind::Attack => self.attack = value,
            StatKind::Defense => self.defense = value,
            StatKind::SpAttack => self.sp_attack = value,
            StatKind::SpDefense => self.sp_defense = value,
            StatKind::Speed => self.speed = value,
            StatKind::Accuracy => self.accuracy = value,
            StatKind::Evasion => self.evasion = value,
        }
    }

    fn clamp_all(&mut self) {
        for stat in [
            StatKind::Attack,
            StatKind::Defense,
            StatKind::SpAttack,
            StatKind::SpDefense,
            StatKind::Speed,
            StatKind::Accuracy,
            StatKind::Evasion,
        ] {
            let current = self.get(stat);
            self.set(stat, i64::from(current));
        }
    }
}

pub fn clamp_stage(value: i64) -> i8 {
    value.clamp(-i64::from(MAX_STAGE), i64::from(MAX_STAGE)) as i8
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoreStats {
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

impl CoreStats {
    pub fn for_level(base: u32, level: u8) -> Self {
        let value = calc_stat(base, level);
        Self {
            attack: value,
            defense: value,
            sp_attack: value,
            sp_defense: value,
            speed: value,
        }
    }
}

/// Per-individual variation, each in `[0, 32)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndividualValues {
    pub hp: u8,
    pub attack: u8,
    pub defense: u8,
    pub sp_attack: u8,
    pub sp_defense: u8,
    pub speed: u8,
}

impl IndividualValues {
    pub fn uniform(value: u8) -> Self {
        let value = value.min(MAX_IV);
        Self {
            hp: value,
            attack: value,
            defense: value,
            sp_attack: value,
            sp_defense: value,
            speed: value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub current: u32,
    pub to_next: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

impl MoveCategory {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_key(input).as_str() {
            "physical" | "phys" => Some(MoveCategory::Physical),
            "special" | "spec" => Some(MoveCategory::Special),
            "status" | "other" => Some(MoveCategory::Status),
            _ => None,
        }
    }

    pub fn infer(power: u32) -> Self {
        if power > 0 {
            MoveCategory::Physical
        } else {
            MoveCategory::Status
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Status,
    StatChange,
    Heal,
    Drain,
    RecoilPercent,
    RecoilFixed,
    MultiHit,
    Flinch,
    FixedDamage,
    Ohko,
    Field,
    Priority,
    None,
}

impl EffectKind {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_key(input).as_str() {
            "status" | "inflict_status" | "status_effect" => Some(EffectKind::Status),
            "stat_change" | "stat" | "stats" | "stat_stage" => Some(EffectKind::StatChange),
            "heal" | "healing" => Some(EffectKind::Heal),
            "drain" | "damage_then_heal" | "damage_heal" | "leech" => Some(EffectKind::Drain),
            "recoil_percent" | "recoil" => Some(EffectKind::RecoilPercent),
            "recoil_fixed" => Some(EffectKind::RecoilFixed),
            "multi_hit" | "multihit" => Some(EffectKind::MultiHit),
            "flinch" => Some(EffectKind::Flinch),
            "fixed_damage" => Some(EffectKind::FixedDamage),
            "ohko" | "one_hit_ko" | "one_hit_knockout" => Some(EffectKind::Ohko),
            "field" | "field_effect" | "weather" | "terrain" => Some(EffectKind::Field),
            "priority" | "priority_change" => Some(EffectKind::Priority),
            "none" => Some(EffectKind::None),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    User,
    Opponent,
    AllOpponents,
    AllAllies,
    UserSide,
    OpponentSide,
    Field,
}

impl EffectTarget {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_key(input).as_str() {
            "user" | "self" => Some(EffectTarget::User),
            "opponent" | "single_opponent" | "enemy" | "target" | "foe" => {
                Some(EffectTarget::Opponent)
            }
            "all_opponents" | "all_enemies" | "all_foes" => Some(EffectTarget::AllOpponents),
            "all_allies" | "allies" => Some(EffectTarget::AllAllies),
            "user_side" | "ally_side" | "own_side" => Some(EffectTarget::UserSide),
            "opponent_side" | "enemy_side" | "foe_side" => Some(EffectTarget::OpponentSide),
            "field" | "both_sides" | "all" | "entire_field" => Some(EffectTarget::Field),
            _ => None,
        }
    }

    pub fn default_for(kind: EffectKind) -> Self {
        match kind {
            EffectKind::Heal
            | EffectKind::Drain
            | EffectKind::RecoilPercent
            | EffectKind::RecoilFixed
            | EffectKind::Priority => EffectTarget::User,
            EffectKind::Field => EffectTarget::Field,
            _ => EffectTarget::Opponent,
        }
    }
}

/// One effect attached to a move. Parameters that were not supplied stay `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveEffect {
    pub kind: EffectKind,
    pub target: EffectTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<StatKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heal_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoil_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_damage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_hits: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hits: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MoveEffect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            target: EffectTarget::default_for(kind),
            chance: None,
            status: None,
            stat: None,
            stages: None,
            heal_percent: None,
            recoil_percent: None,
            fixed_damage: None,
            min_hits: None,
            max_hits: None,
            description: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub name: String,
    pub power: u32,
    #[serde(rename = "type")]
    pub element: ElementType,
    pub category: MoveCategory,
    pub pp: u32,
    pub current_pp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<u8>,
    #[serde(default)]
    pub priority: i8,
    #[serde(default)]
    pub effects: Vec<MoveEffect>,
}

impl Move {
    pub fn tackle() -> Self {
        Self {
            name: "Tackle".to_string(),
            power: 40,
            element: ElementType::Normal,
            category: MoveCategory::Physical,
            pp: 35,
            current_pp: 35,
            accuracy: Some(100),
            priority: 0,
            effects: Vec::new(),
        }
    }

    pub fn refresh(&mut self) {
        self.pp = self.pp.max(1);
        self.current_pp = self.current_pp.min(self.pp);
        self.accuracy = self.accuracy.map(|accuracy| accuracy.min(100));
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    /// Species identifier, shared by every individual of the species.
    pub id: String,
    /// Addresses this individual inside a roster.
    pub instance_id: String,
    pub name: String,
    pub types: Vec<ElementType>,
    pub current_hp: u32,
    pub max_hp: u32,
    pub level: u8,
    pub experience: Experience,
    pub stats: CoreStats,
    pub ivs: IndividualValues,
    pub nature: String,
    pub moves: Vec<Move>,
    #[serde(default)]
    pub statuses: Vec<StatusCondition>,
    #[serde(default)]
    pub stat_stages: StatStages,
    #[serde(default)]
    pub is_fainted: bool,
    #[serde(default)]
    pub is_hit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_owned: Option<bool>,
    pub image: String,
}

impl Creature {
    /// Re-establishes the creature invariants after a mutation.
    pub fn refresh(&mut self) {
        self.max_hp = self.max_hp.max(1);
        self.current_hp = self.current_hp.min(self.max_hp);
        self.is_fainted = self.current_hp == 0;
        self.level = self.level.clamp(1, MAX_LEVEL);
        self.experience.to_next = self.experience.to_next.max(1);
        if self.types.is_empty() {
            self.types.push(ElementType::Normal);
        }
        dedup_in_order(&mut self.types);
        self.types.truncate(MAX_TYPES);
        dedup_in_order(&mut self.statuses);
        self.stat_stages.clamp_all();
        self.moves.truncate(MAX_MOVES);
        for entry in &mut self.moves {
            entry.refresh();
        }
    }

    pub fn display_name(&self) -> String {
        format_name(&self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemTarget {
    SelfTeam,
    Enemy,
    SelfActive,
}

impl ItemTarget {
    pub fn parse(input: &str) -> Option<Self> {
        match normalize_key(input).as_str() {
            "self_team" | "team" | "party" | "ally" => Some(ItemTarget::SelfTeam),
            "enemy" | "opponent" | "foe" | "wild" => Some(ItemTarget::Enemy),
            "self_active" | "active" | "self" | "user" => Some(ItemTarget::SelfActive),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    HealHp {
        amount: u32,
    },
    /// `status: None` cures every condition.
    CureStatus {
        #[serde(default)]
        status: Option<StatusCondition>,
    },
    StatBoost {
        stat: StatKind,
        stages: i8,
    },
    Capture {
        modifier: f32,
    },
}

impl ItemEffect {
    pub fn default_target(&self) -> ItemTarget {
        match self {
            ItemEffect::HealHp { .. } | ItemEffect::CureStatus { .. } => ItemTarget::SelfTeam,
            ItemEffect::StatBoost { .. } => ItemTarget::SelfActive,
            ItemEffect::Capture { .. } => ItemTarget::Enemy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub usable_in_battle: bool,
    pub target: ItemTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<ItemEffect>,
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub description: String,
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
}

impl Npc {
    pub fn push_line(&mut self, speaker: impl Into<String>, text: impl Into<String>) {
        self.dialogue.push(DialogueLine {
            speaker: speaker.into(),
            text: text.into(),
        });
    }
}

pub fn exp_for_level(level: u8) -> u32 {
    let level = level.max(1) as u32;
    level.pow(3)
}

pub fn exp_to_next_level(level: u8) -> u32 {
    if level >= MAX_LEVEL {
        return 1;
    }
    exp_for_level(level.saturating_add(1))
        .saturating_sub(exp_for_level(level))
        .max(1)
}

pub fn calc_hp(base: u32, level: u8) -> u32 {
    let level = level.max(1) as u32;
    (((2 * base + 31) * level) / 100) + level + 10
}

pub fn calc_stat(base: u32, level: u8) -> u32 {
    let level = level.max(1) as u32;
    (((2 * base + 31) * level) / 100) + 5
}

pub fn format_name(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let rest = chars.as_str();
                    format!("{}{}", first.to_uppercase(), rest)
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercases and folds separators so `"Sp. Atk"`, `"sp-atk"` and `"SP_ATK"` compare equal.
pub(crate) fn normalize_key(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.trim().chars() {
        match ch {
            ' ' | '-' | '_' => {
                if !out.ends_with('_') && !out.is_empty() {
                    out.push('_');
                }
            }
            '.' | '\'' => {}
            _ => out.extend(ch.to_lowercase()),
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn dedup_in_order<T: PartialEq + Copy>(values: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(values.len());
    values.retain(|value| {
        if seen.contains(value) {
            false
        } else {
            seen.push(*value);
            true
        }
    });
}
