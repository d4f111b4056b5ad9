use tracing::debug;

use super::{
    clamp_int, clamp_unit, flag, generate_id, number, slug, text, Canonicalizer,
    DEFAULT_BASE_STAT, DEFAULT_CREATURE_NAME, DEFAULT_IV, DEFAULT_LEVEL, DEFAULT_MOVE_NAME,
    DEFAULT_MOVE_PP, DEFAULT_NATURE,
};
use crate::entity::{
    calc_hp, calc_stat, clamp_stage, exp_to_next_level, CoreStats, Creature, EffectKind,
    EffectTarget, ElementType, Experience, IndividualValues, Move, MoveCategory, MoveEffect,
    StatKind, StatStages, StatusCondition, MAX_IV, MAX_LEVEL, MAX_MOVES, MAX_STAGE, MAX_TYPES,
};
use crate::image::{AssetKind, ImageResolver};
use crate::payload::{
    ExperienceInput, Loose, MoveInput, OneOrMany, PartialCreature, PartialEffect, PartialMove,
    PartialStats, TextList,
};

const MAX_HP: i64 = 9999;
const MAX_STAT: i64 = 9999;
const MAX_POWER: i64 = 999;
const MAX_PP: i64 = 64;
const MAX_PRIORITY: i64 = 7;
const MAX_HITS: i64 = 10;

impl<R: ImageResolver> Canonicalizer<R> {
    /// Canonicalizes a creature. `external_image_url` takes precedence over any
    /// image field carried in the payload itself.
    pub fn creature(
        &self,
        partial: &PartialCreature,
        external_image_url: Option<&str>,
    ) -> Creature {
        let name = text(&partial.name).unwrap_or_else(|| DEFAULT_CREATURE_NAME.to_string());
        let id = text(&partial.id).unwrap_or_else(|| slug(&name));
        let instance_id = text(&partial.instance_id).unwrap_or_else(|| generate_id("mon"));

        let level = number(&partial.level)
            .map(|v| clamp_int(v, 1, MAX_LEVEL as i64) as u8)
            .unwrap_or(DEFAULT_LEVEL);
        let max_hp = number(&partial.max_hp)
            .map(|v| clamp_int(v, 1, MAX_HP) as u32)
            .unwrap_or_else(|| calc_hp(DEFAULT_BASE_STAT, level));
        let current_hp = number(&partial.current_hp)
            .map(|v| clamp_int(v, 0, max_hp as i64) as u32)
            .unwrap_or(max_hp);

        let payload_image = text(&partial.image);
        let external = external_image_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or(payload_image.as_deref());
        let image = self.resolver().resolve(AssetKind::Creature, &name, external);

        let mut creature = Creature {
            id,
            instance_id,
            types: canonical_types(&partial.types),
            current_hp,
            max_hp,
            level,
            experience: canonical_experience(partial.experience.as_ref(), level),
            stats: canonical_stats(partial.stats.as_ref().and_then(Loose::valid), level),
            ivs: canonical_ivs(partial.ivs.as_ref().and_then(Loose::valid)),
            nature: text(&partial.nature).unwrap_or_else(|| DEFAULT_NATURE.to_string()),
            moves: canonical_moves(partial.moves.as_ref()),
            statuses: canonical_statuses(&partial.statuses),
            stat_stages: canonical_stages(partial),
            is_fainted: false,
            is_hit: flag(&partial.is_hit).unwrap_or(false),
            is_owned: flag(&partial.is_owned),
            image,
            name,
        };
        creature.refresh();
        creature
    }
}

fn canonical_types(field: &TextList) -> Vec<ElementType> {
    let mut types = Vec::new();
    match field {
        Some(Loose::Valid(entries)) => {
            for entry in entries.iter() {
                match entry {
                    Loose::Valid(raw) => {
                        let tokens: Vec<&str> = raw
                            .split(['/', ','])
                            .map(str::trim)
                            .filter(|token| !token.is_empty())
                            .collect();
                        if tokens.is_empty() {
                            types.push(ElementType::Normal);
                        }
                        for token in tokens {
                            types.push(ElementType::parse(token).unwrap_or_else(|| {
                                debug!(affinity = token, "unknown affinity, using normal");
                                ElementType::Normal
                            }));
                        }
                    }
                    Loose::Invalid(_) => types.push(ElementType::Normal),
                }
            }
        }
        Some(Loose::Invalid(_)) => types.push(ElementType::Normal),
        None => {}
    }

    let mut unique: Vec<ElementType> = Vec::with_capacity(MAX_TYPES);
    for element in types {
        if !unique.contains(&element) {
            unique.push(element);
        }
    }
    unique.truncate(MAX_TYPES);
    if unique.is_empty() {
        unique.push(ElementType::Normal);
    }
    unique
}

fn canonical_experience(field: Option<&Loose<ExperienceInput>>, level: u8) -> Experience {
    let default_next = exp_to_next_level(level);
    let (current, to_next) = match field.and_then(Loose::valid) {
        Some(ExperienceInput::Flat(num)) => (Some(num.0), None),
        Some(ExperienceInput::Detailed(detail)) => {
            (number(&detail.current), number(&detail.to_next))
        }
        None => (None, None),
    };
    Experience {
        current: current
            .map(|v| clamp_int(v, 0, u32::MAX as i64) as u32)
            .unwrap_or(0),
        to_next: to_next
            .map(|v| clamp_int(v, 1, u32::MAX as i64) as u32)
            .unwrap_or(default_next),
    }
}

fn canonical_stats(partial: Option<&PartialStats>, level: u8) -> CoreStats {
    let fallback = calc_stat(DEFAULT_BASE_STAT, level);
    let read = |field: Option<&crate::payload::Number>| {
        field
            .and_then(number)
            .map(|v| clamp_int(v, 0, MAX_STAT) as u32)
            .unwrap_or(fallback)
    };
    CoreStats {
        attack: read(partial.map(|p| &p.attack)),
        defense: read(partial.map(|p| &p.defense)),
        sp_attack: read(partial.map(|p| &p.sp_attack)),
        sp_defense: read(partial.map(|p| &p.sp_defense)),
        speed: read(partial.map(|p| &p.speed)),
    }
}

fn canonical_ivs(partial: Option<&PartialStats>) -> IndividualValues {
    let read = |field: Option<&crate::payload::Number>| {
        field
            .and_then(number)
            .map(|v| clamp_int(v, 0, MAX_IV as i64) as u8)
            .unwrap_or(DEFAULT_IV)
    };
    IndividualValues {
        hp: read(partial.map(|p| &p.hp)),
        attack: read(partial.map(|p| &p.attack)),
        defense: read(partial.map(|p| &p.defense)),
        sp_attack: read(partial.map(|p| &p.sp_attack)),
        sp_defense: read(partial.map(|p| &p.sp_defense)),
        speed: read(partial.map(|p| &p.speed)),
    }
}

fn canonical_statuses(field: &TextList) -> Vec<StatusCondition> {
    let mut statuses = Vec::new();
    let Some(entries) = field.as_ref().and_then(Loose::valid) else {
        return statuses;
    };
    for entry in entries.iter() {
        let Some(raw) = entry.valid() else {
            continue;
        };
        match StatusCondition::parse(raw) {
            Some(status) if !statuses.contains(&status) => statuses.push(status),
            Some(_) => {}
            None => debug!(status = raw.as_str(), "dropping unknown status"),
        }
    }
    statuses
}

fn canonical_stages(partial: &PartialCreature) -> StatStages {
    let mut stages = StatStages::default();
    let Some(entries) = partial.stat_stages.as_ref().and_then(Loose::valid) else {
        return stages;
    };
    for (key, value) in entries {
        let (Some(stat), Some(num)) = (StatKind::parse(key), value.valid()) else {
            continue;
        };
        stages.set(stat, clamp_int(num.0, -(MAX_STAGE as i64), MAX_STAGE as i64));
    }
    stages
}

fn canonical_moves(field: Option<&Loose<OneOrMany<MoveInput>>>) -> Vec<Move> {
    let mut moves: Vec<Move> = field
        .and_then(Loose::valid)
        .map(|inputs| inputs.iter().filter_map(canonical_move).take(MAX_MOVES).collect())
        .unwrap_or_default();
    if moves.is_empty() {
        moves.push(Move::tackle());
    }
    moves
}

fn canonical_move(input: &MoveInput) -> Option<Move> {
    match input {
        MoveInput::Named(name) => {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let partial = PartialMove {
                name: Some(Loose::Valid(name.to_string())),
                ..PartialMove::default()
            };
            Some(move_from(&partial))
        }
        MoveInput::Detailed(partial) => Some(move_from(partial)),
        MoveInput::Invalid(_) => None,
    }
}

fn move_from(partial: &PartialMove) -> Move {
    let power = number(&partial.power)
        .map(|v| clamp_int(v, 0, MAX_POWER) as u32)
        .unwrap_or(0);
    let category = text(&partial.category)
        .and_then(|raw| MoveCategory::parse(&raw))
        .unwrap_or_else(|| MoveCategory::infer(power));
    let pp = number(&partial.pp)
        .map(|v| clamp_int(v, 1, MAX_PP) as u32)
        .unwrap_or(DEFAULT_MOVE_PP);
    let current_pp = number(&partial.current_pp)
        .map(|v| clamp_int(v, 0, pp as i64) as u32)
        .unwrap_or(pp);
    let effects = partial
        .effects
        .as_ref()
        .and_then(Loose::valid)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Loose::valid)
                .map(canonical_effect)
                .collect()
        })
        .unwrap_or_default();

    Move {
        name: text(&partial.name).unwrap_or_else(|| DEFAULT_MOVE_NAME.to_string()),
        power,
        element: text(&partial.element)
            .and_then(|raw| ElementType::parse(&raw))
            .unwrap_or(ElementType::Normal),
        category,
        pp,
        current_pp,
        accuracy: number(&partial.accuracy).map(|v| clamp_int(v, 0, 100) as u8),
        priority: number(&partial.priority)
            .map(|v| clamp_int(v, -MAX_PRIORITY, MAX_PRIORITY) as i8)
            .unwrap_or(0),
        effects,
    }
}

fn canonical_effect(partial: &PartialEffect) -> MoveEffect {
    let kind = text(&partial.kind)
        .and_then(|raw| EffectKind::parse(&raw))
        .unwrap_or(EffectKind::None);
    let mut min_hits = number(&partial.min_hits).map(|v| clamp_int(v, 1, MAX_HITS) as u8);
    let mut max_hits = number(&partial.max_hits).map(|v| clamp_int(v, 1, MAX_HITS) as u8);
    if let (Some(lo), Some(hi)) = (min_hits, max_hits) {
        if lo > hi {
            min_hits = Some(hi);
            max_hits = Some(lo);
        }
    }

    MoveEffect {
        kind,
        target: text(&partial.target)
            .and_then(|raw| EffectTarget::parse(&raw))
            .unwrap_or_else(|| EffectTarget::default_for(kind)),
        chance: number(&partial.chance).map(|v| {
            // "30" and "0.3" both mean a 30% chance.
            let v = if v > 1.0 { v / 100.0 } else { v };
            clamp_unit(v, 0.0, 1.0)
        }),
        status: text(&partial.status).and_then(|raw| StatusCondition::parse(&raw)),
        stat: text(&partial.stat).and_then(|raw| StatKind::parse(&raw)),
        stages: number(&partial.stages).map(|v| clamp_stage(v.round() as i64)),
        heal_percent: number(&partial.heal_percent).map(|v| clamp_unit(v, 0.0, 100.0)),
        recoil_percent: number(&partial.recoil_percent).map(|v| clamp_unit(v, 0.0, 100.0)),
        fixed_damage: number(&partial.fixed_damage).map(|v| clamp_int(v, 0, MAX_HP) as u32),
        min_hits,
        max_hits,
        description: text(&partial.description),
    }
}
