//! Scripted battle scenarios.
//!
//! A scenario carries raw generator payloads (canonicalized on load) and a
//! list of actions to replay. RON is the default format; `.json` files are
//! read as JSON.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::action::Action;
use crate::canon::Canonicalizer;
use crate::effect::Effect;
use crate::image::ImageResolver;
use crate::payload::{Intake, PartialCreature, PartialItem};
use crate::session::BattleSession;
use crate::state::{BattleResult, LogEntry};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub roster: Vec<Value>,
    #[serde(default)]
    pub inventory: Vec<Value>,
    pub opponent: Value,
    #[serde(default)]
    pub opponent_image: Option<String>,
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub script: Vec<Action>,
}

/// What a replay produced.
#[derive(Debug)]
pub struct ReplayReport {
    pub log: Vec<LogEntry>,
    pub effects: Vec<Effect>,
    pub result: Option<BattleResult>,
    pub applied: usize,
    pub ignored: usize,
}

impl Scenario {
    pub fn from_ron(source: &str) -> Result<Self, ScenarioError> {
        ron::de::from_str(source).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub fn from_json(source: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(source).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScenarioError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&source)
        } else {
            Self::from_ron(&source)
        }
    }

    /// Canonicalizes the payloads and initializes a session with them.
    pub fn start<R: ImageResolver>(&self, canon: &Canonicalizer<R>) -> BattleSession {
        let roster = self
            .roster
            .iter()
            .map(|raw| canon.creature(&PartialCreature::from_value(raw), None))
            .collect();
        let inventory = self
            .inventory
            .iter()
            .map(|raw| canon.item(&PartialItem::from_value(raw)))
            .collect();
        let opponent = canon.creature(
            &PartialCreature::from_value(&self.opponent),
            self.opponent_image.as_deref(),
        );

        let mut session = BattleSession::new();
        session.initialize(roster, inventory, opponent, self.active.as_deref());
        info!(scenario = %self.name, "scenario started");
        session
    }

    pub fn replay<R: ImageResolver>(&self, canon: &Canonicalizer<R>) -> ReplayReport {
        let mut session = self.start(canon);
        let mut effects = session.drain_effects();
        let (mut applied, mut ignored) = (0, 0);
        for action in &self.script {
            if session.dispatch(action.clone()) {
                applied += 1;
            } else {
                debug!(?action, "scripted action had no effect");
                ignored += 1;
            }
            effects.extend(session.drain_effects());
        }
        ReplayReport {
            log: session.state().log.clone(),
            result: session.handoff(),
            effects,
            applied,
            ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::AssetCatalog;
    use crate::state::BattleScreen;

    const DEMO: &str = include_str!("../demos/viridian_ambush.ron");

    #[test]
    fn demo_scenario_parses() {
        let scenario = Scenario::from_ron(DEMO).unwrap();
        assert_eq!(scenario.roster.len(), 2);
        assert_eq!(scenario.inventory.len(), 2);
        assert_eq!(scenario.active.as_deref(), Some("p1"));
        assert_eq!(scenario.script[0], Action::ScreenOpen(BattleScreen::SelectMove));
    }

    #[test]
    fn demo_scenario_ends_in_victory() {
        let scenario = Scenario::from_ron(DEMO).unwrap();
        let report = scenario.replay(&Canonicalizer::new(AssetCatalog::builtin()));
        let result = report.result.unwrap();
        assert!(result.did_player_win);
        assert!(!result.fled);
        assert_eq!(report.ignored, 0);
        assert!(report
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::BattleEnded(_))));
    }

    #[test]
    fn json_scenarios_use_external_tagging() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "run",
                "roster": [{ "name": "Pidgey" }],
                "opponent": { "name": "Rattata" },
                "script": ["BattleFlee", { "ScreenOpen": "SELECT_ITEM" }]
            }"#,
        )
        .unwrap();
        let report = scenario.replay(&Canonicalizer::new(AssetCatalog::empty()));
        assert_eq!((report.applied, report.ignored), (1, 1));
        assert!(report.result.is_some_and(|r| r.fled));
    }

    #[test]
    fn malformed_scenario_is_parse_error() {
        assert!(matches!(
            Scenario::from_ron("(name: 3)"),
            Err(ScenarioError::Parse(_))
        ));
    }
}
