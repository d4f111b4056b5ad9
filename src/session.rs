//! Owned battle handle for callers that do not run a full store.
//!
//! Every mutation goes through [`reducer`], so the lifecycle rules apply
//! exactly as they do under `EffectStore`. Effects are queued until drained.

use crate::action::Action;
use crate::effect::Effect;
use crate::entity::{Creature, InventoryItem};
use crate::reducer::reducer;
use crate::state::{BattleResult, BattleState, CreaturePatch, LogDraft};

#[derive(Debug, Default)]
pub struct BattleSession {
    state: BattleState,
    effects: Vec<Effect>,
}

impl BattleSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    /// Returns whether the state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let result = reducer(&mut self.state, action);
        let changed = result.changed;
        self.effects.extend(result.effects);
        changed
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn initialize(
        &mut self,
        roster: Vec<Creature>,
        inventory: Vec<InventoryItem>,
        opponent: Creature,
        active_instance_id: Option<&str>,
    ) -> bool {
        self.effects.clear();
        self.dispatch(Action::BattleInit {
            roster,
            inventory,
            opponent: Box::new(opponent),
            active_instance_id: active_instance_id.map(str::to_string),
        })
    }

    pub fn set_active(&mut self, instance_id: &str) -> bool {
        self.dispatch(Action::ActiveSelect(instance_id.to_string()))
    }

    pub fn patch_member(&mut self, instance_id: &str, patch: CreaturePatch) -> bool {
        self.dispatch(Action::RosterPatch {
            instance_id: instance_id.to_string(),
            patch,
        })
    }

    pub fn patch_opponent(&mut self, patch: CreaturePatch) -> bool {
        self.dispatch(Action::OpponentPatch(patch))
    }

    /// Replaces the inventory with `transform(current)`.
    pub fn transform_inventory<F>(&mut self, transform: F) -> bool
    where
        F: FnOnce(&[InventoryItem]) -> Vec<InventoryItem>,
    {
        let next = transform(&self.state.inventory);
        self.dispatch(Action::InventoryReplace(next))
    }

    pub fn append_log(&mut self, draft: LogDraft) -> bool {
        self.dispatch(Action::LogAppend(draft))
    }

    pub fn flee(&mut self) -> bool {
        self.dispatch(Action::BattleFlee)
    }

    pub fn record_capture(&mut self) -> bool {
        self.dispatch(Action::OpponentCaptured)
    }

    pub fn handoff(&self) -> Option<BattleResult> {
        self.state.handoff()
    }

    /// Clears the battle, returning its result if it had been decided.
    pub fn reset(&mut self) -> Option<BattleResult> {
        let result = self.state.handoff();
        self.dispatch(Action::BattleReset);
        self.effects.clear();
        result
    }
}
