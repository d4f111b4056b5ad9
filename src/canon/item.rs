use serde_json::Value;
use tracing::debug;

use super::{clamp_int, flag, generate_id, number, text, Canonicalizer, DEFAULT_ITEM_NAME};
use crate::entity::{
    normalize_key, InventoryItem, ItemEffect, ItemTarget, StatKind, StatusCondition, MAX_STAGE,
};
use crate::image::{AssetKind, ImageResolver};
use crate::payload::{DescriptionInput, ItemEffectInput, PartialItem, PartialItemEffect};

const MAX_QUANTITY: i64 = 999;
const FULL_HEAL_AMOUNT: u32 = 9999;
const DEFAULT_HEAL_AMOUNT: u32 = 20;

/// Name-substring rule. Rules are checked in order and the first match wins,
/// so more specific names precede the generic ones they contain.
pub struct ItemRule {
    pub pattern: &'static str,
    pub effect: ItemEffect,
}

const fn heal(pattern: &'static str, amount: u32) -> ItemRule {
    ItemRule { pattern, effect: ItemEffect::HealHp { amount } }
}

const fn cure(pattern: &'static str, status: Option<StatusCondition>) -> ItemRule {
    ItemRule { pattern, effect: ItemEffect::CureStatus { status } }
}

const fn boost(pattern: &'static str, stat: StatKind) -> ItemRule {
    ItemRule { pattern, effect: ItemEffect::StatBoost { stat, stages: 1 } }
}

const fn capture(pattern: &'static str, modifier: f32) -> ItemRule {
    ItemRule { pattern, effect: ItemEffect::Capture { modifier } }
}

pub const ITEM_RULES: &[ItemRule] = &[
    heal("full restore", FULL_HEAL_AMOUNT),
    heal("max potion", FULL_HEAL_AMOUNT),
    heal("hyper potion", 200),
    heal("super potion", 50),
    heal("potion", DEFAULT_HEAL_AMOUNT),
    heal("berry", 10),
    cure("full heal", None),
    cure("antidote", Some(StatusCondition::Poison)),
    cure("burn heal", Some(StatusCondition::Burn)),
    cure("ice heal", Some(StatusCondition::Freeze)),
    cure("awakening", Some(StatusCondition::Sleep)),
    cure("paralyz", Some(StatusCondition::Paralysis)),
    cure("parlyz", Some(StatusCondition::Paralysis)),
    boost("x sp atk", StatKind::SpAttack),
    boost("x special attack", StatKind::SpAttack),
    boost("x sp def", StatKind::SpDefense),
    boost("x special defense", StatKind::SpDefense),
    boost("x attack", StatKind::Attack),
    boost("x defen", StatKind::Defense),
    boost("x speed", StatKind::Speed),
    boost("x accuracy", StatKind::Accuracy),
    capture("master ball", 255.0),
    capture("ultra ball", 2.0),
    capture("great ball", 1.5),
    capture("ball", 1.0),
];

/// Effect implied by an item's name, if any rule matches.
pub fn infer_item(name: &str) -> Option<&'static ItemEffect> {
    let key = normalize_key(name).replace('_', " ").replace('é', "e");
    ITEM_RULES
        .iter()
        .find(|rule| key.contains(rule.pattern))
        .map(|rule| &rule.effect)
}

impl<R: ImageResolver> Canonicalizer<R> {
    pub fn item(&self, partial: &PartialItem) -> InventoryItem {
        let name = text(&partial.name).unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string());
        let id = text(&partial.id).unwrap_or_else(|| generate_id("item"));
        let quantity = number(&partial.quantity)
            .map(|v| clamp_int(v, 1, MAX_QUANTITY) as u32)
            .unwrap_or(1);

        let effect = partial
            .effect
            .as_ref()
            .and_then(canonical_item_effect)
            .or_else(|| infer_item(&name).cloned());
        let usable_in_battle = flag(&partial.usable_in_battle).unwrap_or(effect.is_some());
        let target = text(&partial.target)
            .and_then(|raw| ItemTarget::parse(&raw))
            .or_else(|| effect.as_ref().map(ItemEffect::default_target))
            .unwrap_or(ItemTarget::SelfTeam);

        let payload_image = text(&partial.image);
        let image = self
            .resolver()
            .resolve(AssetKind::Item, &name, payload_image.as_deref());

        InventoryItem {
            id,
            quantity,
            description: canonical_description(partial.description.as_ref(), &name),
            usable_in_battle,
            target,
            effect,
            image,
            name,
        }
    }
}

fn canonical_description(input: Option<&DescriptionInput>, name: &str) -> Option<String> {
    match input? {
        DescriptionInput::Text(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        DescriptionInput::Nested(map) => {
            debug!(item = name, "flattening nested item description");
            let summary = ["text", "description", "summary", "effect"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|text| !text.is_empty());
            Some(match summary {
                Some(text) => text.to_string(),
                None if name != DEFAULT_ITEM_NAME => format!("See {name}."),
                None => "Description unavailable.".to_string(),
            })
        }
        DescriptionInput::Other(Value::Null) => None,
        DescriptionInput::Other(Value::Number(n)) => Some(n.to_string()),
        DescriptionInput::Other(Value::Bool(b)) => Some(b.to_string()),
        DescriptionInput::Other(_) => Some("Description unavailable.".to_string()),
    }
}

fn canonical_item_effect(input: &ItemEffectInput) -> Option<ItemEffect> {
    match input {
        ItemEffectInput::Named(kind) => effect_from(kind, &PartialItemEffect::default()),
        ItemEffectInput::Detailed(partial) => {
            let kind = text(&partial.kind)?;
            effect_from(&kind, partial)
        }
        ItemEffectInput::Invalid(_) => None,
    }
}

fn effect_from(kind: &str, partial: &PartialItemEffect) -> Option<ItemEffect> {
    match normalize_key(kind).as_str() {
        "heal_hp" | "heal" | "healhp" | "restore_hp" | "hp" => Some(ItemEffect::HealHp {
            amount: number(&partial.amount)
                .map(|v| clamp_int(v, 1, FULL_HEAL_AMOUNT as i64) as u32)
                .unwrap_or(DEFAULT_HEAL_AMOUNT),
        }),
        "cure_status" | "cure" | "status_cure" | "heal_status" => Some(ItemEffect::CureStatus {
            status: text(&partial.status).and_then(|raw| StatusCondition::parse(&raw)),
        }),
        "stat_boost" | "boost" | "stat_up" | "stat_change" => Some(ItemEffect::StatBoost {
            stat: text(&partial.stat)
                .and_then(|raw| StatKind::parse(&raw))
                .unwrap_or(StatKind::Attack),
            stages: number(&partial.stages)
                .map(|v| clamp_int(v, 1, MAX_STAGE as i64) as i8)
                .unwrap_or(1),
        }),
        "capture" | "catch" | "ball" | "pokeball" => Some(ItemEffect::Capture {
            modifier: number(&partial.modifier)
                .map(|v| v.clamp(0.0, 255.0) as f32)
                .unwrap_or(1.0),
        }),
        other => {
            debug!(kind = other, "unknown item effect kind");
            None
        }
    }
}
