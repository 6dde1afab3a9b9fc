//! The generation loop: model call → optional tool call → repeat.
//!
//! Tool-call chains run as an explicit loop with an accumulating citation
//! trail. The loop ends when the model answers in plain text, at which point
//! the turn's tool results are stripped from history and the clean answer
//! is committed with a single `replace`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use parley_config::AppConfig;
use parley_core::error::ToolError;
use parley_core::event::{DomainEvent, EventBus};
use parley_core::memory::MemoryBackend;
use parley_core::message::{ConversationId, Role};
use parley_core::provider::{ModelReply, Provider, ProviderRequest, ToolCallRequest};
use parley_core::tool::{CONVERSATION_ID_ARG, Tool, ToolRegistry};
use tracing::{debug, info, warn};

use crate::context::token::{assistant_record, provenance_record, tool_result_record};
use crate::context::{AgentIdentity, BudgetMode, ContextStore};
use crate::context::store::sum_costs;
use crate::prompt;

/// Returned to the user when the model's final answer is empty.
pub const EMPTY_ANSWER_FALLBACK: &str = "Sorry, I could not generate a response.";

/// Heading of the sources block sent after an answer that used tools.
pub const CITATION_HEADING: &str = "### 🔍 Sources";

/// What one successful generation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The answer text to deliver
    pub answer: String,
    /// Sources block, present when at least one tool ran
    pub citations: Option<String>,
}

/// Render the citation trail as a bulleted sources block.
pub fn citation_block(trail: &[String]) -> Option<String> {
    if trail.is_empty() {
        return None;
    }
    let bullets: Vec<String> = trail.iter().map(|d| format!("- {d}")).collect();
    Some(format!("{CITATION_HEADING}\n{}", bullets.join("\n")))
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,

    model: String,

    temperature: f32,

    /// Max tokens per model response
    max_tokens: Option<u32>,

    tools: Arc<ToolRegistry>,

    memory: Arc<dyn MemoryBackend>,

    store: Arc<ContextStore>,

    event_bus: Arc<EventBus>,

    /// Persona template with `%time%`, `%botName%`, `%botId%` placeholders
    persona: String,

    /// Images older than this are replayed as text only
    image_staleness: Duration,

    /// Cap on tool calls per generation (None = unbounded)
    max_tool_steps: Option<u32>,
}

impl AgentLoop {
    /// Create a new agent loop with default persona and no step cap.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryBackend>,
        store: Arc<ContextStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 1.0,
            max_tokens: None,
            tools,
            memory,
            store,
            event_bus,
            persona: "You are %botName%.".into(),
            image_staleness: Duration::hours(3),
            max_tool_steps: None,
        }
    }

    /// Create an agent loop with every knob taken from the configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryBackend>,
        store: Arc<ContextStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let mut agent = Self::new(provider, &config.provider.model, tools, memory, store, event_bus)
            .with_temperature(config.provider.temperature)
            .with_persona(&config.agent.system_prompt)
            .with_image_staleness(Duration::minutes(config.context.image_staleness_minutes));
        if let Some(max) = config.provider.max_tokens {
            agent = agent.with_max_tokens(max);
        }
        if let Some(max) = config.agent.max_tool_steps {
            agent = agent.with_max_tool_steps(max);
        }
        agent
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_image_staleness(mut self, staleness: Duration) -> Self {
        self.image_staleness = staleness;
        self
    }

    /// Fail the turn once the model has asked for more than `max` tools.
    pub fn with_max_tool_steps(mut self, max: u32) -> Self {
        self.max_tool_steps = Some(max);
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Run the model against the conversation until it produces an answer.
    ///
    /// Tool results are appended under the relaxed budget as they arrive.
    /// On success the committed context holds no tool results, one new
    /// assistant record and, when tools ran, a provenance note. Any model
    /// or tool failure is returned without touching the context further.
    pub async fn generate(
        &self,
        conversation_id: &ConversationId,
        agent: &AgentIdentity,
    ) -> parley_core::Result<TurnOutcome> {
        let definitions = self.tools.definitions();
        let mut trail: Vec<String> = Vec::new();

        loop {
            let context = self.store.get(conversation_id).await;
            let now = Utc::now();

            let mut messages = prompt::system_messages(
                &self.persona,
                agent,
                &context.messages,
                self.memory.as_ref(),
                conversation_id,
                now,
            )
            .await;
            messages.extend(
                context
                    .messages
                    .iter()
                    .map(|r| r.replay(now, self.image_staleness)),
            );

            debug!(
                conversation_id = %conversation_id,
                step = trail.len(),
                messages = messages.len(),
                tokens = context.token_total,
                "Calling model"
            );

            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: definitions.clone(),
            };

            let response = self.provider.complete(request).await?;

            match response.reply {
                ModelReply::ToolCall(call) => {
                    if let Some(limit) = self.max_tool_steps {
                        if trail.len() as u32 >= limit {
                            warn!(conversation_id = %conversation_id, limit, "Tool chain limit reached");
                            return Err(parley_core::Error::ToolChainLimit { limit });
                        }
                    }
                    let description = self.run_tool(conversation_id, agent, call).await?;
                    trail.push(description);
                }
                ModelReply::Answer(text) => {
                    return Ok(self
                        .finalize(conversation_id, agent, text, &trail, &response.model)
                        .await);
                }
            }
        }
    }

    /// Execute one requested tool and append its result to the context.
    ///
    /// Returns the description of what the call did.
    async fn run_tool(
        &self,
        conversation_id: &ConversationId,
        agent: &AgentIdentity,
        call: ToolCallRequest,
    ) -> parley_core::Result<String> {
        let tool = self.tools.resolve(&call.name)?;

        let mut arguments = parse_arguments(&call.arguments)?;
        arguments.insert(
            CONVERSATION_ID_ARG.to_string(),
            serde_json::Value::String(conversation_id.to_string()),
        );
        let arguments = serde_json::Value::Object(arguments);

        info!(conversation_id = %conversation_id, tool = %call.name, "Executing tool");
        let start = Instant::now();
        let result = tool.execute(arguments.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.event_bus.publish(DomainEvent::ToolExecuted {
            conversation_id: conversation_id.to_string(),
            tool_name: call.name.clone(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        let result = result.inspect_err(|e| {
            warn!(conversation_id = %conversation_id, tool = %call.name, error = %e, "Tool execution failed");
        })?;

        let description = tool.describe(&arguments);
        let payload = serde_json::to_string(&result)?;
        let record = tool_result_record(
            self.provider.as_ref(),
            conversation_id,
            agent,
            &call.name,
            &description,
            &payload,
        );

        debug!(
            conversation_id = %conversation_id,
            tool = %call.name,
            tokens = record.token_cost(),
            duration_ms,
            "Tool result appended"
        );
        self.store
            .append(conversation_id, record, BudgetMode::ToolChain)
            .await;

        Ok(description)
    }

    /// Strip tool results, append the answer (and provenance) and commit.
    async fn finalize(
        &self,
        conversation_id: &ConversationId,
        agent: &AgentIdentity,
        answer: String,
        trail: &[String],
        model: &str,
    ) -> TurnOutcome {
        let citations = citation_block(trail);
        let counter = self.provider.as_ref();

        let mut messages: Vec<_> = self
            .store
            .get(conversation_id)
            .await
            .messages
            .into_iter()
            .filter(|r| r.role() != Role::ToolResult)
            .collect();

        messages.push(assistant_record(counter, conversation_id, agent, &answer));
        if let Some(block) = &citations {
            messages.push(provenance_record(counter, conversation_id, agent, block));
        }

        let token_total = sum_costs(&messages);
        let kept = messages.len();
        self.store.replace(conversation_id, messages, token_total).await;

        info!(
            conversation_id = %conversation_id,
            tool_calls = trail.len(),
            messages = kept,
            tokens = token_total,
            "Answer committed"
        );
        self.event_bus.publish(DomainEvent::ResponseGenerated {
            conversation_id: conversation_id.to_string(),
            model: model.to_string(),
            tool_calls: trail.len(),
            timestamp: Utc::now(),
        });

        let answer = if answer.is_empty() {
            EMPTY_ANSWER_FALLBACK.to_string()
        } else {
            answer
        };
        TurnOutcome { answer, citations }
    }
}

/// Parse the model's argument JSON into an object. Empty means no arguments.
fn parse_arguments(raw: &str) -> Result<serde_json::Map<String, serde_json::Value>, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
    }
}
