//! # parley core
//!
//! Domain types, collaborator traits, and error definitions for the parley
//! chat agent. This crate has **no framework dependencies**: it defines the
//! model every other crate implements against.
//!
//! ## Layout
//!
//! - [`message`]: the Message Record, its model-facing payload and roles
//! - [`provider`]: the Model Gateway trait and its request/response shapes
//! - [`tool`]: invocable tools and the name-keyed registry
//! - [`channel`]: chat platform adapters (delivery + typing indicator)
//! - [`memory`]: the long-term notes collaborator
//! - [`event`]: broadcast domain events for observers

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod tool;
pub mod memory;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ContentPart, ConversationId, DisplayContent, MessageContent, MessageRecord, ModelMessage, Role};
pub use provider::{ModelReply, Provider, ProviderRequest, ProviderResponse, ToolCallRequest};
pub use channel::{Channel, ChannelMessage};
pub use tool::{Tool, ToolRegistry};
pub use memory::{MemoryBackend, MemoryWriteOutcome};
pub use event::{DomainEvent, EventBus};
