//! Entity canonicalizer.
//!
//! Turns arbitrary partial payloads into fully-valid entities. Every
//! operation is total: malformed input degrades to defaults, it never
//! fails. Feeding a canonical entity back in yields an equivalent entity.

mod creature;
mod item;
mod npc;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::image::{AssetCatalog, ImageResolver};
use crate::payload::{Flag, Loose, Number, Text};

pub use item::{infer_item, ItemRule, ITEM_RULES};

pub const DEFAULT_LEVEL: u8 = 5;
pub const DEFAULT_BASE_STAT: u32 = 50;
pub const DEFAULT_IV: u8 = 15;
pub const DEFAULT_NATURE: &str = "Hardy";
pub const DEFAULT_MOVE_PP: u32 = 10;
pub const DEFAULT_CREATURE_NAME: &str = "Unknown Pokemon";
pub const DEFAULT_MOVE_NAME: &str = "Unknown Move";
pub const DEFAULT_ITEM_NAME: &str = "Unknown Item";
pub const DEFAULT_NPC_NAME: &str = "Stranger";
pub const DEFAULT_RELATIONSHIP: &str = "neutral";

pub struct Canonicalizer<R = AssetCatalog> {
    resolver: R,
}

impl Default for Canonicalizer<AssetCatalog> {
    fn default() -> Self {
        Self::new(AssetCatalog::builtin())
    }
}

impl<R: ImageResolver> Canonicalizer<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

static ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Process-unique identifier: `{prefix}-{millis:x}-{counter}{salt}`.
pub fn generate_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt = next_u32(millis ^ (count as u64).rotate_left(17)) % 0x1000;
    format!("{prefix}-{millis:x}-{count:x}{salt:03x}")
}

fn next_u32(seed: u64) -> u32 {
    let next = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (next >> 32) as u32
}

/// Lowercase slug used as a species identifier.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn text(field: &Text) -> Option<String> {
    match field {
        Some(Loose::Valid(value)) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

pub(crate) fn number(field: &Number) -> Option<f64> {
    field.as_ref().and_then(Loose::valid).map(|num| num.0)
}

pub(crate) fn flag(field: &Flag) -> Option<bool> {
    field.as_ref().and_then(Loose::valid).copied()
}

/// Rounds to the nearest integer and clamps into `[lo, hi]`.
pub(crate) fn clamp_int(value: f64, lo: i64, hi: i64) -> i64 {
    (value.round() as i64).clamp(lo, hi)
}

pub(crate) fn clamp_unit(value: f64, lo: f64, hi: f64) -> f32 {
    value.clamp(lo, hi) as f32
}
