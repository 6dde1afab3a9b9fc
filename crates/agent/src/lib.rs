//! The turn engine — the heart of parley.
//!
//! Every inbound chat message goes through the same pipeline:
//!
//! 1. **Intake**: cost the message and append it to its conversation's
//!    context under the normal token budget
//! 2. **Activation**: only messages addressing the agent start a turn
//! 3. **Generate**: system context + history go to the model; tool calls
//!    run, their results are appended under the relaxed budget, and the
//!    model is called again
//! 4. **Finalize**: tool results are stripped, the answer (and a
//!    provenance note) is committed, and the answer plus a sources block
//!    are delivered
//!
//! A failed generation clears the conversation and is retried once.

pub mod context;
pub mod dispatch;
pub mod loop_runner;
pub mod prompt;
pub mod turn;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{AgentIdentity, BudgetMode, ContextBudget, ContextStore, ConversationContext};
pub use dispatch::Dispatcher;
pub use loop_runner::{AgentLoop, TurnOutcome};
pub use turn::{TurnHandler, TypingIndicator};
