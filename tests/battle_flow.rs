//! Battle lifecycle tests using EffectStore and EffectStoreTestHarness

use pretty_assertions::assert_eq;
use serde_json::json;
use tui_dispatch::testing::*;
use tui_dispatch::{DataResource, EffectStore};

use poketale::{
    action::Action,
    canon::Canonicalizer,
    effect::Effect,
    entity::{Creature, InventoryItem},
    image::AssetCatalog,
    payload::{Intake, PartialCreature, PartialItem},
    reducer::reducer,
    rules::BLACKOUT_TEXT,
    state::{
        BattleOutcome, BattleScreen, BattleState, CommandInterpretation, CreaturePatch,
        LogCategory, LogDraft, Suggestion,
    },
};

fn canon() -> Canonicalizer<AssetCatalog> {
    Canonicalizer::new(AssetCatalog::builtin())
}

fn mon(name: &str, instance_id: &str, hp: u32) -> Creature {
    canon().creature(
        &PartialCreature::from_value(&json!({
            "name": name,
            "instanceId": instance_id,
            "maxHp": 30,
            "currentHp": hp
        })),
        None,
    )
}

fn bag() -> Vec<InventoryItem> {
    vec![
        canon().item(&PartialItem::from_value(&json!({
            "id": "potion",
            "name": "Potion",
            "quantity": 2
        }))),
        canon().item(&PartialItem::from_value(&json!({ "id": "ball", "name": "Poke Ball" }))),
    ]
}

fn init(roster: Vec<Creature>) -> Action {
    Action::BattleInit {
        roster,
        inventory: bag(),
        opponent: Box::new(mon("rattata", "wild", 30)),
        active_instance_id: Some("a".into()),
    }
}

fn three_member_init() -> Action {
    init(vec![mon("pikachu", "a", 30), mon("bulbasaur", "b", 30), mon("squirtle", "c", 30)])
}

#[test]
fn test_init_resets_previous_battle() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::LogAppend(LogDraft::narration("A wild Rattata appeared!")));
    store.dispatch(Action::BattleFlee);
    assert_eq!(store.state().outcome, Some(BattleOutcome::Fled));

    let result = store.dispatch(three_member_init());
    assert!(result.changed);
    assert!(result.effects.is_empty());
    assert!(store.state().log.is_empty());
    assert_eq!(store.state().outcome, None);
    assert_eq!(store.state().screen, BattleScreen::MainMenu);
    assert_eq!(store.state().active_instance_id.as_deref(), Some("a"));
}

#[test]
fn test_forced_switch_picks_next_healthy_member() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(three_member_init());
    harness.dispatch_collect(Action::RosterPatch {
        instance_id: "b".into(),
        patch: CreaturePatch::hp(0),
    });
    harness.assert_state(|s| s.screen == BattleScreen::MainMenu);

    harness.dispatch_collect(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch::hp(0),
    });

    harness.assert_state(|s| s.active_instance_id.as_deref() == Some("c"));
    harness.assert_state(|s| s.screen == BattleScreen::ForcedSwitch);
    harness.assert_state(|s| s.outcome.is_none());
    harness.assert_state(|s| s.log.last().is_some_and(|e| e.text == "Pikachu fainted!"));
    harness.drain_effects().effects_empty();
}

#[test]
fn test_forced_switch_confirmation_returns_to_menu() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch::hp(0),
    });
    assert_eq!(store.state().screen, BattleScreen::ForcedSwitch);

    // Turn resolution may not skip the switch.
    assert!(!store.dispatch(Action::TurnResolved).changed);
    assert!(!store.dispatch(Action::ScreenOpen(BattleScreen::SelectMove)).changed);

    // Confirming the automatic pick returns to the menu without a new entry.
    assert_eq!(store.state().active_instance_id.as_deref(), Some("b"));
    let logged = store.state().log.len();
    assert!(store.dispatch(Action::ActiveSelect("b".into())).changed);
    assert_eq!(store.state().screen, BattleScreen::MainMenu);
    assert_eq!(store.state().log.len(), logged);
    assert_eq!(
        store.state().log.last().map(|e| e.text.as_str()),
        Some("Pikachu fainted!")
    );
}

#[test]
fn test_forced_switch_override_sends_out_chosen_member() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch::hp(0),
    });
    assert_eq!(store.state().active_instance_id.as_deref(), Some("b"));

    assert!(store.dispatch(Action::ActiveSelect("c".into())).changed);
    assert_eq!(store.state().active_instance_id.as_deref(), Some("c"));
    assert_eq!(store.state().screen, BattleScreen::MainMenu);
    assert_eq!(
        store.state().log.last().map(|e| e.text.as_str()),
        Some("Go! Squirtle!")
    );
}

#[test]
fn test_log_ids_differ_between_battles() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::LogAppend(LogDraft::narration("Round one.")));
    let first = store.state().log[0].id.clone();

    store.dispatch(three_member_init());
    store.dispatch(Action::LogAppend(LogDraft::narration("Round two.")));
    assert_ne!(store.state().log[0].id, first);
}

#[test]
fn test_last_member_fainting_is_a_loss() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(init(vec![mon("pikachu", "a", 30), mon("oddish", "b", 0)]));

    harness.dispatch_collect(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch::hp(0),
    });

    harness.assert_state(|s| s.outcome == Some(BattleOutcome::Loss));
    harness.assert_state(|s| s.screen == BattleScreen::BattleOverChoices);
    harness.assert_state(|s| s.log.last().is_some_and(|e| e.text == BLACKOUT_TEXT));

    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| {
        matches!(e, Effect::BattleEnded(result) if !result.did_player_win && !result.fled)
    });
}

#[test]
fn test_all_fainted_at_init_is_immediate_loss() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    let result = store.dispatch(init(vec![mon("pikachu", "a", 0)]));
    assert_eq!(store.state().active_instance_id, None);
    assert_eq!(store.state().outcome, Some(BattleOutcome::Loss));
    assert_eq!(result.effects.len(), 1);
}

#[test]
fn test_opponent_fainting_wins() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(three_member_init());
    harness.dispatch_collect(Action::OpponentPatch(CreaturePatch::hp(0)));

    harness.assert_state(|s| s.outcome == Some(BattleOutcome::Win));
    harness.assert_state(|s| s.screen == BattleScreen::BattleOverChoices);
    harness.assert_state(|s| {
        s.log.last().is_some_and(|e| {
            e.text == "The wild Rattata fainted!" && e.category == LogCategory::Battle
        })
    });

    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| {
        matches!(e, Effect::BattleEnded(result) if result.did_player_win)
    });
}

#[test]
fn test_victory_checked_before_substitution() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    let result = store.dispatch(Action::BattleInit {
        roster: vec![mon("pikachu", "a", 0)],
        inventory: bag(),
        opponent: Box::new(mon("rattata", "wild", 0)),
        active_instance_id: None,
    });

    assert_eq!(store.state().outcome, Some(BattleOutcome::Win));
    assert_eq!(result.effects.len(), 1);
}

#[test]
fn test_decided_battle_ignores_rules() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(init(vec![mon("pikachu", "a", 30)]));
    store.dispatch(Action::OpponentPatch(CreaturePatch::hp(0)));
    let log_len = store.state().log.len();

    let result = store.dispatch(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch::hp(0),
    });

    assert!(result.changed);
    assert!(result.effects.is_empty());
    assert_eq!(store.state().outcome, Some(BattleOutcome::Win));
    assert_eq!(store.state().screen, BattleScreen::BattleOverChoices);
    assert_eq!(store.state().log.len(), log_len);
}

#[test]
fn test_capture_takes_precedence() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    let result = store.dispatch(Action::OpponentCaptured);

    assert_eq!(store.state().outcome, Some(BattleOutcome::Win));
    assert_eq!(
        store.state().log.last().map(|e| e.text.as_str()),
        Some("Gotcha! Rattata was caught!")
    );
    let captured = store.state().captured.as_ref().unwrap();
    assert_eq!(captured.is_owned, Some(true));
    assert!(matches!(
        &result.effects[0],
        Effect::BattleEnded(handoff) if handoff.captured.is_some() && handoff.did_player_win
    ));

    // A decided battle ignores further lifecycle actions.
    assert!(!store.dispatch(Action::BattleFlee).changed);
    assert!(!store.dispatch(Action::OpponentCaptured).changed);
}

#[test]
fn test_flee_ends_battle() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(three_member_init());
    harness.dispatch_collect(Action::BattleFlee);

    harness.assert_state(|s| s.outcome == Some(BattleOutcome::Fled));
    harness.assert_state(|s| s.log.last().is_some_and(|e| e.text == "Got away safely!"));
    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| matches!(e, Effect::BattleEnded(result) if result.fled));
}

#[test]
fn test_log_is_append_only() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::LogAppend(LogDraft::narration("The grass rustles.")));
    store.dispatch(Action::LogAppend(LogDraft::separator()));
    let before = store.state().log.clone();

    store.dispatch(Action::ScreenOpen(BattleScreen::SelectMove));
    store.dispatch(Action::TurnResolved);
    store.dispatch(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch::hp(0),
    });

    let after = &store.state().log;
    assert!(after.len() > before.len());
    assert_eq!(&after[..before.len()], before.as_slice());
    assert_eq!(after[1].speaker, "---");
}

#[test]
fn test_patches_are_visible_through_active_view() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::RosterPatch {
        instance_id: "a".into(),
        patch: CreaturePatch {
            current_hp: Some(12),
            is_hit: Some(true),
            ..CreaturePatch::default()
        },
    });

    let active = store.state().active_creature().unwrap();
    assert_eq!(active.current_hp, 12);
    assert!(active.is_hit);
    assert_eq!(store.state().roster[0], *active);

    store.dispatch(Action::TurnResolved);
    assert!(!store.state().active_creature().unwrap().is_hit);
}

#[test]
fn test_patch_clamps_hp() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::RosterPatch {
        instance_id: "b".into(),
        patch: CreaturePatch::hp(500),
    });
    assert_eq!(store.state().member("b").unwrap().current_hp, 30);
}

#[test]
fn test_command_round_trip() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(three_member_init());
    harness.dispatch_collect(Action::CommandInputChanged("  throw sand at it ".into()));
    harness.dispatch_collect(Action::CommandSubmit);

    harness.assert_state(|s| s.command.is_loading());
    harness.assert_state(|s| s.pending_input.is_empty());
    harness.assert_state(|s| {
        s.log
            .last()
            .is_some_and(|e| e.category == LogCategory::Player && e.text == "throw sand at it")
    });

    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| {
        matches!(e, Effect::InterpretCommand { text, context }
            if text == "throw sand at it" && context.opponent.as_deref() == Some("Rattata"))
    });

    harness.complete_action(Action::CommandDidInterpret(CommandInterpretation {
        narration: "Sand flies into Rattata's eyes.".into(),
        suggestions: vec![Suggestion::new("Use Quick Attack")],
    }));
    let (changed, total) = harness.process_emitted();
    assert_eq!((changed, total), (1, 1));

    harness.assert_state(|s| s.command.is_loaded());
    harness.assert_state(|s| {
        s.log.last().is_some_and(|e| {
            e.category == LogCategory::Narration
                && e.suggestions.as_ref().is_some_and(|l| l.len() == 1)
        })
    });
}

#[test]
fn test_stale_results_are_discarded() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    let log_len = store.state().log.len();

    let late = store.dispatch(Action::CommandDidInterpret(CommandInterpretation {
        narration: "Too late.".into(),
        suggestions: Vec::new(),
    }));
    assert!(!late.changed);
    assert!(!store.dispatch(Action::SuggestDidLoad(vec![Suggestion::new("Potion")])).changed);
    assert!(!store.dispatch(Action::CommandDidError("timeout".into())).changed);
    assert_eq!(store.state().log.len(), log_len);
    assert!(store.state().command.is_empty());
}

#[test]
fn test_suggestion_fetch_flow() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(three_member_init());
    harness.dispatch_collect(Action::SuggestFetch);
    harness.assert_state(|s| s.suggestions.is_loading());
    harness.drain_effects().effects_first_matches(|e| {
        matches!(e, Effect::SuggestItems { context } if context.usable_items.len() == 2)
    });

    harness.complete_action(Action::SuggestDidError("narrator offline".into()));
    harness.process_emitted();
    harness.assert_state(|s| s.suggestions.error() == Some("narrator offline"));
}

#[test]
fn test_empty_bag_blocks_item_screen() {
    let mut store = EffectStore::new(BattleState::new(), reducer);
    store.dispatch(three_member_init());
    store.dispatch(Action::InventoryReplace(Vec::new()));
    store.dispatch(Action::ScreenOpen(BattleScreen::SelectItem));
    assert_eq!(store.state().screen, BattleScreen::MainMenu);
    assert_eq!(
        store.state().log.last().map(|e| e.text.as_str()),
        Some("Your bag is empty.")
    );
    assert!(matches!(store.state().suggestions, DataResource::Empty));
}

#[test]
fn test_dispatch_all_reports_absorbed_actions() {
    let mut harness = EffectStoreTestHarness::new(BattleState::new(), reducer);
    harness.dispatch_collect(three_member_init());
    let results = harness.dispatch_all([
        Action::ScreenOpen(BattleScreen::SelectPokemon),
        Action::ScreenOpen(BattleScreen::SelectMove),
        Action::ActiveSelect("b".into()),
        Action::TurnResolved,
        Action::ScreenBack,
    ]);
    assert_eq!(results, vec![true, false, true, true, false]);
    harness.assert_state(|s| s.active_instance_id.as_deref() == Some("b"));
}
