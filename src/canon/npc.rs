use super::{generate_id, text, Canonicalizer, DEFAULT_NPC_NAME, DEFAULT_RELATIONSHIP};
use crate::entity::{DialogueLine, Npc};
use crate::image::ImageResolver;
use crate::payload::{DialogueInput, Loose, PartialNpc};

impl<R: ImageResolver> Canonicalizer<R> {
    pub fn npc(&self, partial: &PartialNpc) -> Npc {
        let name = text(&partial.name).unwrap_or_else(|| DEFAULT_NPC_NAME.to_string());
        let dialogue = partial
            .dialogue
            .as_ref()
            .and_then(Loose::valid)
            .map(|lines| lines.iter().filter_map(|line| dialogue_line(line, &name)).collect())
            .unwrap_or_default();

        Npc {
            id: text(&partial.id).unwrap_or_else(|| generate_id("npc")),
            description: text(&partial.description).unwrap_or_default(),
            relationship: text(&partial.relationship)
                .unwrap_or_else(|| DEFAULT_RELATIONSHIP.to_string()),
            portrait: text(&partial.portrait),
            dialogue,
            name,
        }
    }
}

// Bare strings are attributed to the NPC itself.
fn dialogue_line(input: &DialogueInput, name: &str) -> Option<DialogueLine> {
    match input {
        DialogueInput::Text(raw) => {
            let text = raw.trim();
            (!text.is_empty()).then(|| DialogueLine {
                speaker: name.to_string(),
                text: text.to_string(),
            })
        }
        DialogueInput::Line(line) => Some(DialogueLine {
            text: text(&line.text)?,
            speaker: text(&line.speaker).unwrap_or_else(|| name.to_string()),
        }),
        DialogueInput::Invalid(_) => None,
    }
}
