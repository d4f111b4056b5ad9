//! Battle flow and entity canonicalization for an AI-narrated creature RPG.
//!
//! Generated creatures, items and NPCs pass through [`canon`] before they
//! enter play. Battles run on a tui-dispatch store: [`reducer::reducer`]
//! applies [`action::Action`]s to [`state::BattleState`] and the lifecycle
//! rules in [`rules`] decide substitutions and outcomes.

pub mod action;
pub mod canon;
pub mod effect;
pub mod entity;
pub mod image;
pub mod inventory;
pub mod payload;
pub mod reducer;
pub mod rules;
pub mod scenario;
pub mod session;
pub mod state;
