use crate::state::{BattleContext, BattleResult};

#[derive(Clone, Debug)]
pub enum Effect {
    /// Ask the narrator to interpret a free-text command.
    InterpretCommand { text: String, context: BattleContext },
    /// Ask the narrator which items are worth using right now.
    SuggestItems { context: BattleContext },
    /// The battle was decided; hand the result back to the game.
    BattleEnded(Box<BattleResult>),
}
