//! Battle actions
//!
//! Intents come from the surrounding game (damage resolution, menus, the
//! command box); `*Did*` variants are async results fed back by effect
//! handlers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entity::{Creature, InventoryItem};
use crate::state::{BattleScreen, CommandInterpretation, CreaturePatch, LogDraft, Suggestion};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    // ===== Battle lifecycle =====
    /// Start a battle. Resets screen, outcome, log and pending commands.
    BattleInit {
        roster: Vec<Creature>,
        inventory: Vec<InventoryItem>,
        opponent: Box<Creature>,
        active_instance_id: Option<String>,
    },
    BattleFlee,
    /// Clear everything back to the pre-battle state.
    BattleReset,

    // ===== Screens =====
    ScreenOpen(BattleScreen),
    ScreenBack,
    /// The game finished resolving a turn; return to the main menu.
    TurnResolved,

    // ===== Roster and opponent =====
    ActiveSelect(String),
    RosterPatch {
        instance_id: String,
        patch: CreaturePatch,
    },
    OpponentPatch(CreaturePatch),
    OpponentCaptured,

    // ===== Inventory =====
    InventoryReplace(Vec<InventoryItem>),

    // ===== Log =====
    LogAppend(LogDraft),

    // ===== Free-text commands =====
    CommandInputChanged(String),
    CommandSubmit,
    CommandDidInterpret(CommandInterpretation),
    CommandDidError(String),

    // ===== Item suggestions =====
    SuggestFetch,
    SuggestDidLoad(Vec<Suggestion>),
    SuggestDidError(String),
}
