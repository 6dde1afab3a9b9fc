//! Per-conversation history kept inside a token budget.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`store`] | conversation map, `append`/`replace`/`clear`, eviction |
//! | [`token`] | token costing and record construction |

pub mod store;
pub mod token;

pub use store::{BudgetMode, ContextBudget, ContextStore, ConversationContext, evict};
pub use token::AgentIdentity;
