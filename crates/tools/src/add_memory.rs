//! Memory-write tool — lets the model keep notes about the people it meets.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::memory::MemoryBackend;
use parley_core::message::ConversationId;
use parley_core::tool::{CONVERSATION_ID_ARG, Tool};
use std::sync::Arc;
use tracing::debug;

pub struct AddMemoryTool {
    memory: Arc<dyn MemoryBackend>,
}

impl AddMemoryTool {
    pub fn new(memory: Arc<dyn MemoryBackend>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for AddMemoryTool {
    fn name(&self) -> &str {
        "add_memory"
    }

    fn description(&self) -> &str {
        concat!(
            "Adds a piece of information to your memory that may help you recognise a user's ",
            "preferences, interests, location and so on.\n",
            "Always identify the user by user ID, never by display name, written as <@userId> ",
            "(e.g. <@1234567890>).\n",
            "Examples:\n",
            "- A user says they are from Jakarta: \"<@userId> lives in Jakarta\"\n",
            "- A user says they like cats: \"<@userId> likes cats\""
        )
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": {
                    "type": "string",
                    "description": "The conversation this note belongs to"
                },
                "content": {
                    "type": "string",
                    "description": "The note to remember"
                }
            },
            "required": ["conversation_id", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let conversation_id = arguments[CONVERSATION_ID_ARG]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'conversation_id' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let outcome = self
            .memory
            .write(&ConversationId::from(conversation_id), content)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        debug!(conversation_id, success = outcome.success, "Memory note written");
        serde_json::to_value(&outcome).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!("Remembering {}", arguments["content"].as_str().unwrap_or_default())
    }
}
