//! Battle lifecycle rules.
//!
//! [`reconcile`] runs after every state-changing dispatch. Victory is checked
//! before substitution, so when both sides go down in the same update the
//! player wins.

use tracing::info;

use crate::entity::Creature;
use crate::state::{BattleOutcome, BattleScreen, BattleState, LogDraft};

pub const FLEE_TEXT: &str = "Got away safely!";
pub const EMPTY_BAG_TEXT: &str = "Your bag is empty.";
pub const BLACKOUT_TEXT: &str = "You have no more Pokemon that can fight! You blacked out...";

/// The requested member if it can fight, otherwise the first member that can.
pub fn resolve_active(roster: &[Creature], requested: Option<&str>) -> Option<String> {
    requested
        .and_then(|id| {
            roster
                .iter()
                .find(|c| c.instance_id == id && !c.is_fainted)
        })
        .or_else(|| roster.iter().find(|c| !c.is_fainted))
        .map(|c| c.instance_id.clone())
}

/// Clears per-turn flags and re-establishes creature invariants.
pub fn sanitize(mut creature: Creature) -> Creature {
    creature.is_hit = false;
    creature.refresh();
    creature
}

/// Applies victory and substitution rules. Returns the outcome if this call decided the battle.
pub fn reconcile(state: &mut BattleState) -> Option<BattleOutcome> {
    if !state.is_started() || state.is_over() {
        return None;
    }
    if let Some(outcome) = check_victory(state) {
        return Some(outcome);
    }
    check_substitution(state)
}

fn check_victory(state: &mut BattleState) -> Option<BattleOutcome> {
    let text = if let Some(captured) = &state.captured {
        format!("Gotcha! {} was caught!", captured.display_name())
    } else {
        let opponent = state.opponent.as_ref().filter(|o| o.is_fainted)?;
        format!("The wild {} fainted!", opponent.display_name())
    };
    finish(state, BattleOutcome::Win, text);
    Some(BattleOutcome::Win)
}

fn check_substitution(state: &mut BattleState) -> Option<BattleOutcome> {
    let active = state.active_creature();
    if active.is_some_and(|c| !c.is_fainted) {
        return None;
    }
    let fallen = active.map(|c| (c.instance_id.clone(), c.display_name()));
    let replacement = state
        .roster
        .iter()
        .find(|c| {
            !c.is_fainted
                && fallen
                    .as_ref()
                    .map_or(true, |(fallen_id, _)| &c.instance_id != fallen_id)
        })
        .map(|c| c.instance_id.clone());

    let Some(next_id) = replacement else {
        finish(state, BattleOutcome::Loss, BLACKOUT_TEXT.to_string());
        return Some(BattleOutcome::Loss);
    };

    let text = match &fallen {
        Some((_, name)) => format!("{name} fainted!"),
        None => "Your Pokemon can't fight!".to_string(),
    };
    state.push_log(LogDraft::battle(text));
    info!(next = %next_id, "forced switch");
    state.active_instance_id = Some(next_id);
    state.screen = BattleScreen::ForcedSwitch;
    None
}

fn finish(state: &mut BattleState, outcome: BattleOutcome, text: String) {
    state.push_log(LogDraft::battle(text));
    state.outcome = Some(outcome);
    state.screen = BattleScreen::BattleOverChoices;
    info!(?outcome, "battle decided");
}
