//! Reducer - pure function: (state, action) -> DispatchResult
//!
//! Actions that do not apply to the current state are absorbed: they return
//! `unchanged` and log at debug level instead of failing.

use tracing::{debug, info};
use tui_dispatch::{DataResource, DispatchResult};

use crate::action::Action;
use crate::effect::Effect;
use crate::entity::{Creature, InventoryItem};
use crate::rules::{self, EMPTY_BAG_TEXT, FLEE_TEXT};
use crate::state::{
    BattleOutcome, BattleScreen, BattleState, CommandInterpretation, CreaturePatch, LogCategory,
    LogDraft, Suggestion, PLAYER_SPEAKER,
};

pub fn reducer(state: &mut BattleState, action: Action) -> DispatchResult<Effect> {
    let result = apply(state, action);
    if !result.changed {
        return result;
    }

    let mut effects = result.effects;
    if rules::reconcile(state).is_some() {
        if let Some(handoff) = state.handoff() {
            effects.push(Effect::BattleEnded(Box::new(handoff)));
        }
    }

    if effects.is_empty() {
        DispatchResult::changed()
    } else {
        DispatchResult::changed_with_many(effects)
    }
}

fn apply(state: &mut BattleState, action: Action) -> DispatchResult<Effect> {
    match action {
        // ===== Battle lifecycle =====
        Action::BattleInit {
            roster,
            inventory,
            opponent,
            active_instance_id,
        } => init(state, roster, inventory, *opponent, active_instance_id),

        Action::BattleFlee => {
            if !state.is_started() || state.is_over() {
                debug!("flee ignored outside a running battle");
                return DispatchResult::unchanged();
            }
            state.push_log(LogDraft::battle(FLEE_TEXT));
            state.outcome = Some(BattleOutcome::Fled);
            state.screen = BattleScreen::BattleOverChoices;
            info!("player fled");
            match state.handoff() {
                Some(handoff) => {
                    DispatchResult::changed_with(Effect::BattleEnded(Box::new(handoff)))
                }
                None => DispatchResult::changed(),
            }
        }

        Action::BattleReset => {
            *state = BattleState::new();
            DispatchResult::changed()
        }

        // ===== Screens =====
        Action::ScreenOpen(target) => open_screen(state, target),

        Action::ScreenBack => {
            if !state.screen.is_submenu() {
                debug!(screen = ?state.screen, "back ignored");
                return DispatchResult::unchanged();
            }
            state.screen = BattleScreen::MainMenu;
            DispatchResult::changed()
        }

        Action::TurnResolved => {
            if !state.is_started()
                || state.is_over()
                || state.screen == BattleScreen::ForcedSwitch
            {
                debug!(screen = ?state.screen, "turn resolution ignored");
                return DispatchResult::unchanged();
            }
            state.screen = BattleScreen::MainMenu;
            for creature in state.roster.iter_mut().chain(state.opponent.as_mut()) {
                creature.is_hit = false;
            }
            DispatchResult::changed()
        }

        // ===== Roster and opponent =====
        Action::ActiveSelect(instance_id) => select_active(state, instance_id),

        Action::RosterPatch { instance_id, patch } => {
            if patch.is_empty() {
                return DispatchResult::unchanged();
            }
            let Some(member) = state.member_mut(&instance_id) else {
                debug!(%instance_id, "patch for unknown roster member");
                return DispatchResult::unchanged();
            };
            patch.apply(member);
            DispatchResult::changed()
        }

        Action::OpponentPatch(patch) => patch_opponent(state, &patch),

        Action::OpponentCaptured => {
            if state.is_over() {
                debug!("capture ignored, battle already decided");
                return DispatchResult::unchanged();
            }
            let Some(opponent) = &state.opponent else {
                debug!("capture ignored, no opponent");
                return DispatchResult::unchanged();
            };
            let mut caught = opponent.clone();
            caught.is_owned = Some(true);
            caught.is_hit = false;
            state.captured = Some(caught);
            DispatchResult::changed()
        }

        // ===== Inventory =====
        Action::InventoryReplace(items) => {
            let items: Vec<InventoryItem> = items.into_iter().filter(|i| i.quantity > 0).collect();
            if items == state.inventory {
                return DispatchResult::unchanged();
            }
            state.inventory = items;
            DispatchResult::changed()
        }

        // ===== Log =====
        Action::LogAppend(draft) => {
            state.push_log(draft);
            DispatchResult::changed()
        }

        // ===== Free-text commands =====
        Action::CommandInputChanged(text) => {
            if text == state.pending_input {
                return DispatchResult::unchanged();
            }
            state.pending_input = text;
            DispatchResult::changed()
        }

        Action::CommandSubmit => submit_command(state),

        Action::CommandDidInterpret(result) => interpret_loaded(state, result),

        Action::CommandDidError(message) => {
            if !state.command.is_loading() {
                debug!("stale command error discarded");
                return DispatchResult::unchanged();
            }
            state.push_log(LogDraft::system(format!(
                "The narrator could not follow that: {message}"
            )));
            state.command = DataResource::Failed(message);
            DispatchResult::changed()
        }

        // ===== Item suggestions =====
        Action::SuggestFetch => {
            if !state.is_started() || state.is_over() {
                return DispatchResult::unchanged();
            }
            if state.usable_items().is_empty() {
                state.suggestions = DataResource::Loaded(Vec::new());
                return DispatchResult::changed();
            }
            state.suggestions = DataResource::Loading;
            DispatchResult::changed_with(Effect::SuggestItems {
                context: state.context(),
            })
        }

        Action::SuggestDidLoad(list) => suggestions_loaded(state, list),

        Action::SuggestDidError(message) => {
            if !state.suggestions.is_loading() {
                debug!("stale suggestion error discarded");
                return DispatchResult::unchanged();
            }
            state.suggestions = DataResource::Failed(message);
            DispatchResult::changed()
        }
    }
}

fn init(
    state: &mut BattleState,
    roster: Vec<Creature>,
    inventory: Vec<InventoryItem>,
    opponent: Creature,
    requested: Option<String>,
) -> DispatchResult<Effect> {
    let roster: Vec<Creature> = roster.into_iter().map(rules::sanitize).collect();
    let active_instance_id = rules::resolve_active(&roster, requested.as_deref());
    info!(
        roster = roster.len(),
        opponent = %opponent.name,
        active = ?active_instance_id,
        "battle started"
    );
    *state = BattleState::started(
        roster,
        inventory.into_iter().filter(|i| i.quantity > 0).collect(),
        rules::sanitize(opponent),
        active_instance_id,
    );
    DispatchResult::changed()
}

fn open_screen(state: &mut BattleState, target: BattleScreen) -> DispatchResult<Effect> {
    if !target.is_submenu() {
        debug!(?target, "screen cannot be opened directly");
        return DispatchResult::unchanged();
    }
    if !state.is_started() || state.screen != BattleScreen::MainMenu {
        debug!(from = ?state.screen, ?target, "screen change ignored");
        return DispatchResult::unchanged();
    }
    if target == BattleScreen::SelectItem && state.usable_items().is_empty() {
        state.push_log(LogDraft::system(EMPTY_BAG_TEXT));
        return DispatchResult::changed();
    }
    state.screen = target;
    DispatchResult::changed()
}

fn select_active(state: &mut BattleState, instance_id: String) -> DispatchResult<Effect> {
    if !state.is_started() || state.is_over() {
        debug!("active selection ignored outside a running battle");
        return DispatchResult::unchanged();
    }
    let Some(member) = state.member(&instance_id) else {
        debug!(%instance_id, "active selection of unknown member");
        return DispatchResult::unchanged();
    };
    if member.is_fainted {
        debug!(%instance_id, "fainted member cannot be sent out");
        return DispatchResult::unchanged();
    }

    let name = member.display_name();
    let switching = state.active_instance_id.as_deref() != Some(instance_id.as_str());
    let forced = state.screen == BattleScreen::ForcedSwitch;
    if !switching && !forced {
        return DispatchResult::unchanged();
    }
    if switching {
        state.push_log(LogDraft::battle(format!("Go! {name}!")));
        state.active_instance_id = Some(instance_id);
    }
    if forced {
        state.screen = BattleScreen::MainMenu;
    }
    DispatchResult::changed()
}

fn patch_opponent(state: &mut BattleState, patch: &CreaturePatch) -> DispatchResult<Effect> {
    if patch.is_empty() {
        return DispatchResult::unchanged();
    }
    let Some(opponent) = state.opponent.as_mut() else {
        debug!("opponent patch without an opponent");
        return DispatchResult::unchanged();
    };
    patch.apply(opponent);
    DispatchResult::changed()
}

fn submit_command(state: &mut BattleState) -> DispatchResult<Effect> {
    let text = state.pending_input.trim().to_string();
    if text.is_empty() || !state.is_started() || state.is_over() {
        return DispatchResult::unchanged();
    }
    state.pending_input.clear();
    state.push_log(LogDraft::new(PLAYER_SPEAKER, text.clone(), LogCategory::Player));
    state.command = DataResource::Loading;
    DispatchResult::changed_with(Effect::InterpretCommand {
        text,
        context: state.context(),
    })
}

fn interpret_loaded(
    state: &mut BattleState,
    result: CommandInterpretation,
) -> DispatchResult<Effect> {
    if !state.command.is_loading() {
        debug!("stale interpretation discarded");
        return DispatchResult::unchanged();
    }
    let narration = result.narration.trim();
    if !narration.is_empty() {
        state.push_log(
            LogDraft::narration(narration).with_suggestions(result.suggestions.clone()),
        );
    }
    state.command = DataResource::Loaded(result);
    DispatchResult::changed()
}

fn suggestions_loaded(state: &mut BattleState, list: Vec<Suggestion>) -> DispatchResult<Effect> {
    if !state.suggestions.is_loading() {
        debug!("stale suggestions discarded");
        return DispatchResult::unchanged();
    }
    state.suggestions = DataResource::Loaded(list);
    DispatchResult::changed()
}
