//! Battle session state - single source of truth for an encounter

use std::time::{SystemTime, UNIX_EPOCH};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::canon::generate_id;
use crate::entity::{
    CoreStats, Creature, Experience, InventoryItem, Move, StatStages, StatusCondition,
};
use crate::inventory;

pub const SYSTEM_SPEAKER: &str = "System";
pub const NARRATOR_SPEAKER: &str = "Narrator";
pub const PLAYER_SPEAKER: &str = "You";
pub const SEPARATOR_SPEAKER: &str = "---";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleScreen {
    #[default]
    MainMenu,
    SelectMove,
    SelectPokemon,
    SelectItem,
    ActionInfo,
    ForcedSwitch,
    BattleOverChoices,
}

impl BattleScreen {
    /// Screens reachable from the main menu and left with "back".
    pub fn is_submenu(self) -> bool {
        matches!(
            self,
            BattleScreen::SelectMove
                | BattleScreen::SelectPokemon
                | BattleScreen::SelectItem
                | BattleScreen::ActionInfo
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Win,
    Loss,
    Fled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Narration,
    Dialogue,
    Player,
    Battle,
    System,
    Separator,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Suggestion {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl Suggestion {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub speaker: String,
    pub text: String,
    pub category: LogCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
}

/// A log entry before it is stamped with an id and time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogDraft {
    pub speaker: String,
    pub text: String,
    pub category: LogCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
}

impl LogDraft {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, category: LogCategory) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            category,
            suggestions: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, text, LogCategory::System)
    }

    pub fn battle(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, text, LogCategory::Battle)
    }

    pub fn narration(text: impl Into<String>) -> Self {
        Self::new(NARRATOR_SPEAKER, text, LogCategory::Narration)
    }

    pub fn separator() -> Self {
        Self::new(SEPARATOR_SPEAKER, " ", LogCategory::Separator)
    }

    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = (!suggestions.is_empty()).then_some(suggestions);
        self
    }
}

/// Narrative response to a free-text battle command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandInterpretation {
    pub narration: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// Partial update for a creature already in the battle. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CreaturePatch {
    pub current_hp: Option<u32>,
    pub max_hp: Option<u32>,
    pub level: Option<u8>,
    pub experience: Option<Experience>,
    pub stats: Option<CoreStats>,
    pub moves: Option<Vec<Move>>,
    pub statuses: Option<Vec<StatusCondition>>,
    pub stat_stages: Option<StatStages>,
    pub is_hit: Option<bool>,
    pub image: Option<String>,
}

impl CreaturePatch {
    pub fn hp(current_hp: u32) -> Self {
        Self {
            current_hp: Some(current_hp),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the patch and re-establishes the creature invariants.
    pub fn apply(&self, creature: &mut Creature) {
        if let Some(max_hp) = self.max_hp {
            creature.max_hp = max_hp;
        }
        if let Some(current_hp) = self.current_hp {
            creature.current_hp = current_hp;
        }
        if let Some(level) = self.level {
            creature.level = level;
        }
        if let Some(experience) = &self.experience {
            creature.experience = experience.clone();
        }
        if let Some(stats) = &self.stats {
            creature.stats = stats.clone();
        }
        if let Some(moves) = &self.moves {
            creature.moves = moves.clone();
        }
        if let Some(statuses) = &self.statuses {
            creature.statuses = statuses.clone();
        }
        if let Some(stages) = &self.stat_stages {
            creature.stat_stages = stages.clone();
        }
        if let Some(is_hit) = self.is_hit {
            creature.is_hit = is_hit;
        }
        if let Some(image) = &self.image {
            creature.image = image.clone();
        }
        creature.refresh();
    }
}

/// Snapshot handed to the command interpreter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleContext {
    pub active: Option<String>,
    pub opponent: Option<String>,
    pub moves: Vec<String>,
    pub usable_items: Vec<String>,
    pub screen: BattleScreen,
}

/// Everything the surrounding game needs once a battle is decided.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub did_player_win: bool,
    pub fled: bool,
    pub final_roster: Vec<Creature>,
    pub final_inventory: Vec<InventoryItem>,
    pub final_opponent: Creature,
    pub captured: Option<Creature>,
    pub log: Vec<LogEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BattleState {
    pub roster: Vec<Creature>,
    pub inventory: Vec<InventoryItem>,
    pub opponent: Option<Creature>,
    /// Instance id of the roster member currently fighting.
    pub active_instance_id: Option<String>,
    pub screen: BattleScreen,
    pub outcome: Option<BattleOutcome>,
    pub captured: Option<Creature>,
    pub log: Vec<LogEntry>,
    pub pending_input: String,
    pub command: DataResource<CommandInterpretation>,
    pub suggestions: DataResource<Vec<Suggestion>>,
}

impl Default for BattleState {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleState {
    pub fn new() -> Self {
        Self {
            roster: Vec::new(),
            inventory: Vec::new(),
            opponent: None,
            active_instance_id: None,
            screen: BattleScreen::MainMenu,
            outcome: None,
            captured: None,
            log: Vec::new(),
            pending_input: String::new(),
            command: DataResource::Empty,
            suggestions: DataResource::Empty,
        }
    }

    /// A fresh battle on the main menu with an empty log.
    pub fn started(
        roster: Vec<Creature>,
        inventory: Vec<InventoryItem>,
        opponent: Creature,
        active_instance_id: Option<String>,
    ) -> Self {
        Self {
            roster,
            inventory,
            opponent: Some(opponent),
            active_instance_id,
            ..Self::new()
        }
    }

    pub fn is_started(&self) -> bool {
        self.opponent.is_some()
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn active_creature(&self) -> Option<&Creature> {
        let id = self.active_instance_id.as_deref()?;
        self.member(id)
    }

    pub fn member(&self, instance_id: &str) -> Option<&Creature> {
        self.roster.iter().find(|c| c.instance_id == instance_id)
    }

    pub fn member_mut(&mut self, instance_id: &str) -> Option<&mut Creature> {
        self.roster.iter_mut().find(|c| c.instance_id == instance_id)
    }

    pub fn usable_items(&self) -> Vec<&InventoryItem> {
        inventory::usable(&self.inventory).collect()
    }

    pub fn push_log(&mut self, draft: LogDraft) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.log.push(LogEntry {
            id: generate_id("log"),
            timestamp,
            speaker: draft.speaker,
            text: draft.text,
            category: draft.category,
            suggestions: draft.suggestions,
        });
    }

    pub fn context(&self) -> BattleContext {
        let active = self.active_creature();
        BattleContext {
            active: active.map(Creature::display_name),
            opponent: self.opponent.as_ref().map(Creature::display_name),
            moves: active
                .map(|c| c.moves.iter().map(|m| m.name.clone()).collect())
                .unwrap_or_default(),
            usable_items: self
                .usable_items()
                .into_iter()
                .map(|item| item.name.clone())
                .collect(),
            screen: self.screen,
        }
    }

    /// The battle result, once an outcome has been decided.
    pub fn handoff(&self) -> Option<BattleResult> {
        let outcome = self.outcome?;
        let opponent = self.opponent.clone()?;
        Some(BattleResult {
            did_player_win: outcome == BattleOutcome::Win,
            fled: outcome == BattleOutcome::Fled,
            final_roster: self.roster.clone(),
            final_inventory: self.inventory.clone(),
            final_opponent: opponent,
            captured: self.captured.clone(),
            log: self.log.clone(),
        })
    }
}

impl DebugState for BattleState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![DebugSection::new("Battle")
            .entry("screen", ron_string(&self.screen))
            .entry("outcome", ron_string(&self.outcome))
            .entry("active", ron_string(&self.active_instance_id))
            .entry("log_len", ron_string(&self.log.len()))];

        if let Some(opponent) = &self.opponent {
            sections.push(
                DebugSection::new("Opponent")
                    .entry("name", ron_string(&opponent.name))
                    .entry("hp", format!("{}/{}", opponent.current_hp, opponent.max_hp))
                    .entry("fainted", ron_string(&opponent.is_fainted)),
            );
        }

        let members: Vec<String> = self
            .roster
            .iter()
            .map(|member| format!("{} {}/{}", member.name, member.current_hp, member.max_hp))
            .collect();
        sections.push(
            DebugSection::new("Roster")
                .entry("members", ron_string(&members))
                .entry("items", ron_string(&self.inventory.len())),
        );

        sections.push(
            DebugSection::new("Command")
                .entry("input", ron_string(&self.pending_input))
                .entry("interpret", format!("{:?}", self.command))
                .entry("suggestions", format!("{:?}", self.suggestions)),
        );

        sections
    }
}
