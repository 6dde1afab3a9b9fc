//! Domain event system — decoupled observation of turns.
//!
//! The turn loop publishes events as it works; observers (logging sinks,
//! tests, dashboards) subscribe without coupling to the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A new message was taken into a conversation's context
    MessageReceived {
        conversation_id: String,
        sender_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// Records were evicted to keep a conversation within budget
    ContextEvicted {
        conversation_id: String,
        evicted: usize,
        token_total: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        conversation_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The agent committed a final answer
    ResponseGenerated {
        conversation_id: String,
        model: String,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A generation attempt failed
    TurnFailed {
        conversation_id: String,
        attempt: u32,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A conversation's context was discarded
    ContextCleared {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
