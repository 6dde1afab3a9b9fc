//! System context assembly.
//!
//! Every model call is prefixed with the same four system messages: the
//! persona, who is in the conversation, the notes kept for it, and a nudge
//! to keep taking notes.

use chrono::{DateTime, Utc};
use parley_core::memory::MemoryBackend;
use parley_core::message::{ConversationId, MessageRecord, ModelMessage};
use tracing::warn;

use crate::context::AgentIdentity;

const MEMORY_INSTRUCTION: &str = concat!(
    "Always proactively call the `add_memory` function for any information a user shares that ",
    "could improve future interactions, even if they do not ask you to remember it. This ",
    "includes preferences, goals, location, interests, relationships and habits. Prioritise ",
    "information that makes later answers more personal and relevant."
);

/// Substitute `%time%`, `%botName%` and `%botId%` in a persona template.
pub fn substitute_placeholders(template: &str, agent: &AgentIdentity, now: DateTime<Utc>) -> String {
    template
        .replace("%time%", &now.to_rfc2822())
        .replace("%botName%", &agent.name)
        .replace("%botId%", &agent.id)
}

/// One `User ID: <id> | <name>` line per distinct author, first-seen order.
///
/// The most recent display name wins for authors seen more than once.
pub fn roster(history: &[MessageRecord]) -> String {
    let mut authors: Vec<(&str, &str)> = Vec::new();
    for record in history {
        let display = record.display();
        match authors.iter_mut().find(|(id, _)| *id == display.author_id) {
            Some(entry) => entry.1 = display.author_name.as_str(),
            None => authors.push((display.author_id.as_str(), display.author_name.as_str())),
        }
    }

    authors
        .iter()
        .map(|(id, name)| format!("User ID: {id} | {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the system messages that precede the history on every model call.
///
/// A memory read failure degrades to an empty note list.
pub async fn system_messages(
    persona: &str,
    agent: &AgentIdentity,
    history: &[MessageRecord],
    memory: &dyn MemoryBackend,
    conversation_id: &ConversationId,
    now: DateTime<Utc>,
) -> Vec<ModelMessage> {
    let notes = match memory.read(conversation_id).await {
        Ok(notes) => notes,
        Err(e) => {
            warn!(conversation_id = %conversation_id, error = %e, "Memory read failed, continuing without notes");
            String::new()
        }
    };

    vec![
        ModelMessage::system(substitute_placeholders(persona, agent, now)),
        ModelMessage::system(format!("Users in this conversation:\n{}", roster(history))),
        ModelMessage::system(format!("Memory (notes you have taken before):\n{notes}")),
        ModelMessage::system(MEMORY_INSTRUCTION),
    ]
}
