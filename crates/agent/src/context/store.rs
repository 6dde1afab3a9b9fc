//! The Context Store — conversation id → ordered records + running total.
//!
//! Contexts are created lazily on first reference and destroyed explicitly
//! with [`ContextStore::clear`]. Every mutation keeps `token_total` equal to
//! the sum of the cached record costs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parley_config::ContextConfig;
use parley_core::event::{DomainEvent, EventBus};
use parley_core::message::{ConversationId, MessageRecord, Role};
use tokio::sync::RwLock;
use tracing::debug;

/// Which ceiling an `append` is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetMode {
    /// Regular intake of user messages
    Normal,
    /// A tool-call chain is in flight; the relaxed ceiling applies and the
    /// last user record is protected from eviction
    ToolChain,
}

/// The two token ceilings a conversation lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_tokens: usize,
    pub tool_chain_max_tokens: usize,
}

impl ContextBudget {
    pub fn new(max_tokens: usize, tool_chain_max_tokens: usize) -> Self {
        Self {
            max_tokens,
            tool_chain_max_tokens,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_tokens, config.tool_chain_max_tokens)
    }

    pub fn ceiling(&self, mode: BudgetMode) -> usize {
        match mode {
            BudgetMode::Normal => self.max_tokens,
            BudgetMode::ToolChain => self.tool_chain_max_tokens,
        }
    }
}

/// One conversation's history, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    pub messages: Vec<MessageRecord>,
    pub token_total: usize,
}

impl ConversationContext {
    /// Build a context whose total is the exact sum of `messages`.
    pub fn from_messages(messages: Vec<MessageRecord>) -> Self {
        let token_total = sum_costs(&messages);
        Self {
            messages,
            token_total,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Sum of the cached token costs.
pub fn sum_costs(messages: &[MessageRecord]) -> usize {
    messages.iter().map(MessageRecord::token_cost).sum()
}

/// Evict oldest records until `context` fits under `ceiling`.
///
/// Never removes the last remaining record, so a single oversized message
/// is kept. Under [`BudgetMode::ToolChain`] the only remaining user record
/// is skipped and the next-oldest record goes instead.
///
/// Returns the number of records removed.
pub fn evict(context: &mut ConversationContext, ceiling: usize, mode: BudgetMode) -> usize {
    let mut evicted = 0;

    while context.token_total > ceiling && context.messages.len() > 1 {
        let victim = if mode == BudgetMode::ToolChain && is_sole_user_anchor(&context.messages) {
            1
        } else {
            0
        };

        let removed = context.messages.remove(victim);
        context.token_total = context.token_total.saturating_sub(removed.token_cost());
        evicted += 1;
    }

    evicted
}

/// Whether the oldest record is a user record and no other user record exists.
fn is_sole_user_anchor(messages: &[MessageRecord]) -> bool {
    match messages.split_first() {
        Some((first, rest)) => {
            first.role() == Role::User && !rest.iter().any(|r| r.role() == Role::User)
        }
        None => false,
    }
}

/// In-process, volatile store of every conversation's context.
pub struct ContextStore {
    budget: ContextBudget,
    contexts: RwLock<HashMap<ConversationId, ConversationContext>>,
    event_bus: Option<Arc<EventBus>>,
}

impl ContextStore {
    pub fn new(budget: ContextBudget) -> Self {
        Self {
            budget,
            contexts: RwLock::new(HashMap::new()),
            event_bus: None,
        }
    }

    /// Publish [`DomainEvent::ContextEvicted`] on `bus` whenever records are evicted.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    /// The conversation's context, or an empty one. Never fails.
    pub async fn get(&self, conversation_id: &ConversationId) -> ConversationContext {
        self.contexts
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append `record` and evict under the ceiling for `mode`.
    ///
    /// Returns how many records were evicted.
    pub async fn append(
        &self,
        conversation_id: &ConversationId,
        record: MessageRecord,
        mode: BudgetMode,
    ) -> usize {
        let ceiling = self.budget.ceiling(mode);
        let (evicted, token_total, len) = {
            let mut contexts = self.contexts.write().await;
            let context = contexts.entry(conversation_id.clone()).or_default();
            context.token_total += record.token_cost();
            context.messages.push(record);
            let evicted = evict(context, ceiling, mode);
            (evicted, context.token_total, context.messages.len())
        };

        debug!(
            conversation_id = %conversation_id,
            mode = ?mode,
            tokens = token_total,
            messages = len,
            evicted,
            "Appended record"
        );

        if evicted > 0 {
            if let Some(bus) = &self.event_bus {
                bus.publish(DomainEvent::ContextEvicted {
                    conversation_id: conversation_id.to_string(),
                    evicted,
                    token_total,
                    timestamp: Utc::now(),
                });
            }
        }

        evicted
    }

    /// Atomically swap in a finished message list and its total.
    ///
    /// No eviction runs. `token_total` must be the sum of the costs.
    pub async fn replace(
        &self,
        conversation_id: &ConversationId,
        messages: Vec<MessageRecord>,
        token_total: usize,
    ) {
        debug_assert_eq!(token_total, sum_costs(&messages));
        self.contexts.write().await.insert(
            conversation_id.clone(),
            ConversationContext {
                messages,
                token_total,
            },
        );
    }

    /// Drop the conversation entirely.
    pub async fn clear(&self, conversation_id: &ConversationId) {
        self.contexts.write().await.remove(conversation_id);
        debug!(conversation_id = %conversation_id, "Context cleared");
    }

    /// Number of conversations currently held.
    pub async fn conversation_count(&self) -> usize {
        self.contexts.read().await.len()
    }
}
