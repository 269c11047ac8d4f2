//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Prompt templates for every cognitive service operation
//!
//! Templates use `{{key}}` placeholders filled from a [`TemplateInput`].
//! The built-in set can be overridden per deployment by dropping `.txt`
//! files named after the template into a directory.

use crate::services::types::{ServiceError, ServiceResult, TemplateInput};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// System message sent with every completion request
pub const SYSTEM_INSTRUCTION: &str = "You are the inner voice of a character in a turn-based \
simulation. You answer only as asked: no preamble, no commentary, no markdown fences. When a \
format is specified, follow it exactly.";

/// Built-in prompt for every operation, keyed by template name
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "event_poignancy",
        "{{identity}}\n\nOn a scale of 1 to 10, where 1 is mundane (brushing teeth, a door \
closing) and 10 is extremely poignant (a death, a betrayal), rate how poignant the following \
event is to {{agent}}.\nEvent: {{description}}\nAnswer with a single integer.",
    ),
    (
        "thought_poignancy",
        "{{identity}}\n\nOn a scale of 1 to 10, where 1 is mundane and 10 is extremely \
poignant, rate how poignant the following thought is to {{agent}}.\nThought: {{thought}}\n\
Answer with a single integer.",
    ),
    (
        "chat_poignancy",
        "{{identity}}\n\nOn a scale of 1 to 10, where 1 is idle small talk and 10 is a \
life-changing exchange, rate how poignant the following conversation is to {{agent}}.\n\
Conversation:\n{{conversation}}\nAnswer with a single integer.",
    ),
    (
        "wake_up_hour",
        "{{identity}}\n\nGiven {{agent}}'s lifestyle, at what hour do they wake up? Answer \
with a single integer between 0 and 23.",
    ),
    (
        "generate_planning",
        "{{identity}}\n\nRecent thoughts on {{agent}}'s mind:\n{{statements}}\n\nDecide what \
{{agent}} does next and for how long. Respond with JSON exactly in the form \
{\"duration_minutes\": <integer>, \"activity\": \"<what {{agent}} is doing, third person>\"}.",
    ),
    (
        "reaction_schedule",
        "{{identity}}\n\n{{agent}} has just noticed the following:\n{{events}}\n\n{{agent}} is \
currently free. Should {{agent}} react to what they noticed? If no reaction is warranted, \
answer exactly none. Otherwise respond with JSON exactly in the form {\"duration_minutes\": \
<integer>, \"activity\": \"<the reaction, third person>\"}.",
    ),
    (
        "interrupting_reaction_schedule",
        "{{identity}}\n\n{{agent}} is busy: {{current_action}}\n\n{{agent}} has just noticed \
the following:\n{{events}}\n\nIs this urgent enough to interrupt what {{agent}} is doing? If \
not, answer exactly none. Otherwise respond with JSON exactly in the form \
{\"duration_minutes\": <integer>, \"activity\": \"<the reaction, third person>\"}.",
    ),
    (
        "action_triple",
        "Break the activity into a subject, predicate, and object.\nActivity: {{agent}} is \
{{activity}}\nAnswer in the form subject||predicate||object. Use none for a missing object.\n\
Example: Aldric is polishing the silver -> Aldric||is polishing||the silver",
    ),
    (
        "action_sector",
        "{{identity}}\n\n{{agent}} wants to do the following: {{activity}}\nKnown areas: \
{{sectors}}\nWhich single area should {{agent}} go to? Answer with exactly one area name from \
the list.",
    ),
    (
        "action_object",
        "{{identity}}\n\n{{agent}} wants to do the following: {{activity}}\nObjects in the \
area: {{objects}}\nWhich object fits best, and does {{agent}} intend to take it? Answer in \
the form <object name>, <true|false>. If no object fits, answer none, false.",
    ),
    (
        "action_character",
        "{{identity}}\n\n{{agent}} wants to do the following: {{activity}}\nOther characters: \
{{characters}}\nIs this activity directed at one of them? Answer with exactly one name from \
the list, or None.",
    ),
    (
        "action_mode_object",
        "{{identity}}\n\n{{agent}} is doing the following: {{activity}}\nThe target is the \
{{object}}, and {{agent}} is now beside it.\nShould {{agent}} Interact with it or Wait? \
Answer with exactly one word: Interact or Wait.",
    ),
    (
        "action_mode_character",
        "{{identity}}\n\n{{agent}} is doing the following: {{activity}}\nThe target is \
{{target}}, who is now within reach.\nWhat {{agent}} remembers about {{target}}:\n\
{{statements}}\n\nHow does {{agent}} engage? Answer with exactly one word: Attack, Chat, \
Give, or Wait.",
    ),
    (
        "generate_chat_start",
        "{{identity}}\n\n{{agent}} is starting a conversation with {{target}}.\nContext:\n\
{{context}}\n\nThis is exchange {{exchange}} of at most 5. Write {{agent}}'s opening line and \
whether {{agent}} wants the conversation to end after it. Respond with JSON exactly in the \
form {\"message\": \"<the line>\", \"end\": <true|false>}.",
    ),
    (
        "generate_chat",
        "{{identity}}\n\n{{agent}} is talking with {{target}}.\nContext:\n{{context}}\n\n\
Conversation so far:\n{{history}}\n\nThis is exchange {{exchange}} of at most 5. Write \
{{agent}}'s next line and whether {{agent}} wants the conversation to end after it. Respond \
with JSON exactly in the form {\"message\": \"<the line>\", \"end\": <true|false>}.",
    ),
    (
        "chat_summary",
        "Summarize the following conversation in one or two sentences, naming both \
speakers.\n\n{{conversation}}",
    ),
    (
        "relationship_summary",
        "{{identity}}\n\nWhat {{agent}} remembers involving {{target}}:\n{{statements}}\n\n\
In one sentence, describe {{agent}}'s relationship with {{target}}.",
    ),
    (
        "plan_note",
        "{{identity}}\n\nStatements about {{agent}}'s plans:\n{{statements}}\n\nIn one \
sentence, what is {{agent}}'s plan for today?",
    ),
    (
        "thought_note",
        "{{identity}}\n\nStatements about recent events in {{agent}}'s life:\n{{statements}}\n\n\
In one or two sentences, what has been on {{agent}}'s mind lately?",
    ),
    (
        "chat_planning_thought",
        "{{identity}}\n\n{{agent}} just had this conversation: {{summary}}\n\nDoes anything \
from it change {{agent}}'s plans? Answer with one sentence starting with \"{{agent}}\", or \
None if nothing changes.",
    ),
    (
        "chat_memo_thought",
        "{{identity}}\n\n{{agent}} just had this conversation: {{summary}}\n\nWhat is worth \
remembering from it? Answer with one sentence starting with \"{{agent}}\", or None if nothing \
is worth remembering.",
    ),
    (
        "generate_currently",
        "{{identity}}\n\n{{agent}}'s plan: {{plan_note}}\nOn {{agent}}'s mind: \
{{thought_note}}\n\n{{agent}}'s current status was: {{currently}}\nWrite an updated one \
sentence status for {{agent}} starting the new day, or None if it should not change.",
    ),
    (
        "focal_points",
        "Given only the statements below, what are the {{count}} most salient high-level \
questions we can answer about the subjects?\n\n{{statements}}\n\nAnswer with exactly \
{{count}} questions separated by || on a single line.",
    ),
    (
        "insights",
        "Numbered statements:\n{{statements}}\n\nWhat {{count}} high-level insights can you \
infer? For each, cite the statement numbers it rests on. Respond with a JSON array exactly in \
the form [{\"thought\": \"<insight>\", \"evidence\": [<statement numbers>]}].",
    ),
    (
        "trade_item",
        "{{identity}}\n\n{{agent}} wants to give something to {{target}}.\nWhat {{agent}} \
remembers about {{target}}:\n{{context}}\n\n{{agent}}'s belongings (name, quantity):\n\
{{inventory}}\n\nWhat does {{agent}} hand over, how many, and what do they say? Respond with \
JSON exactly in the form {\"name\": \"<item name>\", \"quantity\": <integer>, \"message\": \
\"<what {{agent}} says>\"}.",
    ),
];

/// Prompt template store with `{{key}}` substitution
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, String>,
}

impl TemplateRegistry {
    /// Registry holding the built-in template set
    pub fn builtin() -> Self {
        let templates = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, text)| (name.to_string(), text.to_string()))
            .collect();
        Self { templates }
    }

    /// Load `.txt` files from `dir` as overrides, keyed by file stem.
    /// Files that do not name a built-in template are added as new entries.
    pub fn with_overrides_from_dir(mut self, dir: impl AsRef<Path>) -> ServiceResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ServiceError::Config(format!("template dir {}: {e}", dir.display())))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| ServiceError::Config(format!("template dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path).map_err(|e| {
                ServiceError::Config(format!("template file {}: {e}", path.display()))
            })?;
            debug!(template = name, "loaded template override");
            self.templates.insert(name.to_string(), text);
        }
        Ok(self)
    }

    /// Whether a template with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render a template, substituting every `{{key}}` placeholder
    pub fn render(&self, name: &str, input: &TemplateInput) -> ServiceResult<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| ServiceError::Template(format!("unknown template '{name}'")))?;
        let mut rendered = template.clone();
        for (key, value) in input.iter() {
            rendered = rendered.replace(&format!("{{{{{key}}}}}"), value);
        }
        if let Some(start) = rendered.find("{{") {
            let tail = &rendered[start..];
            let placeholder = tail
                .find("}}")
                .map(|end| &tail[..end + 2])
                .unwrap_or("{{...");
            return Err(ServiceError::Template(format!(
                "unresolved placeholder {placeholder} in template '{name}'"
            )));
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let registry = TemplateRegistry::builtin();
        let input = TemplateInput::new()
            .with("identity", "Name: Aldric")
            .with("agent", "Aldric")
            .with("description", "Vesper enters position (3, 4)");
        let rendered = registry.render("event_poignancy", &input).unwrap();
        assert!(rendered.contains("Name: Aldric"));
        assert!(rendered.contains("poignant the following event is to Aldric"));
        assert!(rendered.contains("Vesper enters position (3, 4)"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_render_unknown_template() {
        let registry = TemplateRegistry::builtin();
        let result = registry.render("no_such_template", &TemplateInput::new());
        assert!(matches!(result, Err(ServiceError::Template(_))));
    }

    #[test]
    fn test_render_unresolved_placeholder() {
        let registry = TemplateRegistry::builtin();
        let input = TemplateInput::new().with("identity", "x").with("agent", "y");
        let result = registry.render("event_poignancy", &input);
        match result {
            Err(ServiceError::Template(message)) => {
                assert!(message.contains("{{description}}"), "{message}");
            }
            other => panic!("expected template error, got {other:?}"),
        }
    }

    #[test]
    fn test_builtin_covers_every_operation() {
        let registry = TemplateRegistry::builtin();
        for name in [
            "event_poignancy",
            "thought_poignancy",
            "chat_poignancy",
            "wake_up_hour",
            "generate_planning",
            "reaction_schedule",
            "interrupting_reaction_schedule",
            "action_triple",
            "action_sector",
            "action_object",
            "action_character",
            "action_mode_object",
            "action_mode_character",
            "generate_chat_start",
            "generate_chat",
            "chat_summary",
            "relationship_summary",
            "plan_note",
            "thought_note",
            "chat_planning_thought",
            "chat_memo_thought",
            "generate_currently",
            "focal_points",
            "insights",
            "trade_item",
        ] {
            assert!(registry.contains(name), "missing template '{name}'");
        }
    }

    #[test]
    fn test_overrides_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wake_up_hour.txt"), "Hour for {{agent}}?").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let registry = TemplateRegistry::builtin()
            .with_overrides_from_dir(dir.path())
            .unwrap();
        let rendered = registry
            .render("wake_up_hour", &TemplateInput::new().with("agent", "Maera"))
            .unwrap();
        assert_eq!(rendered, "Hour for Maera?");
    }
}
