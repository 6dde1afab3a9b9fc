//! Token costing and record construction.
//!
//! Every record's cost is computed here, once, through the provider's
//! token counter. The store trusts these numbers forever after.

use parley_core::channel::{Channel, ChannelMessage};
use parley_core::message::{ConversationId, DisplayContent, MessageContent, MessageRecord, ModelMessage};
use parley_core::provider::Provider;

/// Who the agent is on the current platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub id: String,
    pub name: String,
}

impl AgentIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn from_channel(channel: &dyn Channel) -> Self {
        Self::new(channel.agent_id(), channel.agent_name())
    }
}

/// Cost of an inbound message: text tokens plus a flat surcharge per image.
pub fn inbound_cost(
    counter: &dyn Provider,
    text: &str,
    image_count: usize,
    image_token_cost: usize,
) -> usize {
    counter.count_tokens(text) + image_count * image_token_cost
}

/// Wrap an inbound chat message as a user record.
pub fn user_record(
    counter: &dyn Provider,
    message: &ChannelMessage,
    image_token_cost: usize,
) -> MessageRecord {
    let cost = inbound_cost(counter, &message.content, message.images.len(), image_token_cost);
    let display = DisplayContent::new(&message.content, &message.sender_id, &message.sender_name)
        .with_images(message.images.clone());
    let model = ModelMessage::user(
        MessageContent::with_images(&message.content, &message.images),
        &message.sender_id,
    );

    MessageRecord::new(message.conversation_id.clone(), display, model, cost)
        .with_created_at(message.created_at)
}

/// A tool's serialized result, shown to humans as what the call did.
pub fn tool_result_record(
    counter: &dyn Provider,
    conversation_id: &ConversationId,
    agent: &AgentIdentity,
    tool_name: &str,
    description: &str,
    payload: &str,
) -> MessageRecord {
    MessageRecord::new(
        conversation_id.clone(),
        DisplayContent::new(description, &agent.id, &agent.name),
        ModelMessage::tool_result(tool_name, payload),
        counter.count_tokens(payload),
    )
}

/// The agent's final answer.
pub fn assistant_record(
    counter: &dyn Provider,
    conversation_id: &ConversationId,
    agent: &AgentIdentity,
    answer: &str,
) -> MessageRecord {
    MessageRecord::new(
        conversation_id.clone(),
        DisplayContent::new(answer, &agent.id, &agent.name),
        ModelMessage::assistant(answer),
        counter.count_tokens(answer),
    )
}

/// A system note recording where the preceding answer came from.
pub fn provenance_record(
    counter: &dyn Provider,
    conversation_id: &ConversationId,
    agent: &AgentIdentity,
    citation_block: &str,
) -> MessageRecord {
    let text = format!(
        "The answer you created above is generated from these sources:\n{citation_block}"
    );
    let cost = counter.count_tokens(&text);
    MessageRecord::new(
        conversation_id.clone(),
        DisplayContent::new(&text, &agent.id, &agent.name),
        ModelMessage::system(text),
        cost,
    )
}
