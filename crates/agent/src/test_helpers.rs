//! Shared test doubles for agent tests.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::channel::{Channel, ChannelMessage};
use parley_core::error::{ChannelError, ProviderError, ToolError};
use parley_core::message::ConversationId;
use parley_core::provider::{
    ModelReply, Provider, ProviderRequest, ProviderResponse, ToolCallRequest, Usage,
};
use parley_core::memory::MemoryBackend;
use parley_core::tool::{Tool, ToolRegistry};
use parley_tools::{AddMemoryTool, GetKhodamTool};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// The agent's id in tests; messages mentioning it address the agent.
pub const BOT_ID: &str = "bot";

/// A provider that plays back a script of replies and records requests.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Result<ModelReply, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<ModelReply, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The `n`th request received (0-based).
    pub fn request(&self, n: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("ScriptedProvider: no reply scripted for call #{call}"))?;
        Ok(response(reply))
    }
}

/// Answers `echo: <last user text>` after `delay`, tracking overlap.
pub struct EchoProvider {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl EchoProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of simultaneous `complete` calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == parley_core::message::Role::User)
            .map(|m| m.content.text())
            .unwrap_or_default();
        Ok(response(ModelReply::Answer(format!("echo: {last_user}"))))
    }
}

fn response(reply: ModelReply) -> ProviderResponse {
    ProviderResponse {
        reply,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A model reply asking for `name` with `args`.
pub fn tool_call(name: &str, args: serde_json::Value) -> ModelReply {
    ModelReply::ToolCall(ToolCallRequest {
        name: name.to_string(),
        arguments: args.to_string(),
    })
}

/// An inbound message from Alice, optionally mentioning the agent.
pub fn inbound(conversation: &str, text: &str, mentions_bot: bool) -> ChannelMessage {
    ChannelMessage {
        conversation_id: ConversationId::from(conversation),
        message_id: format!("m-{text}"),
        sender_id: "42".into(),
        sender_name: "Alice".into(),
        content: text.into(),
        mentions: if mentions_bot { vec![BOT_ID.into()] } else { vec![] },
        images: vec![],
        created_at: Utc::now(),
    }
}

/// Something a [`RecordingChannel`] was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply(String),
    Message(String),
}

/// A channel that records deliveries and typing indicators.
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    typing: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            typing: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }

    /// Make every later `send`/`reply` fail.
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn record(&self, conversation_id: &ConversationId, sent: Sent) -> Result<(), ChannelError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChannelError::DeliveryFailed {
                conversation: conversation_id.to_string(),
                reason: "recording channel set to fail".into(),
            });
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(
        &self,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, conversation_id: &ConversationId, content: &str) -> Result<(), ChannelError> {
        self.record(conversation_id, Sent::Message(content.into()))
    }

    async fn reply(&self, original: &ChannelMessage, content: &str) -> Result<(), ChannelError> {
        self.record(&original.conversation_id, Sent::Reply(content.into()))
    }

    async fn send_typing(&self, _conversation_id: &ConversationId) -> Result<(), ChannelError> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn agent_id(&self) -> &str {
        BOT_ID
    }

    fn agent_name(&self) -> &str {
        "Parley"
    }
}

/// A tool whose every invocation fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "always_fails"
    }

    fn description(&self) -> &str {
        "Fails every time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "always_fails".into(),
            reason: "boom".into(),
        })
    }

    fn describe(&self, _arguments: &serde_json::Value) -> String {
        "Failing on purpose".into()
    }
}

/// An offline stand-in for `get_weather_forecast` with a fixed payload.
pub struct ForecastStub;

#[async_trait]
impl Tool for ForecastStub {
    fn name(&self) -> &str {
        "get_weather_forecast"
    }

    fn description(&self) -> &str {
        "Canned forecast"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "location": { "type": "string" } },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let location = arguments["location"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'location' argument".into()))?;
        Ok(serde_json::json!({
            "location": location,
            "temperature": 31.5,
            "units": "°C",
            "conditions": "Partly cloudy",
            "humidity": 74,
            "wind_speed": 12.0,
            "wind_direction": "SW",
        }))
    }

    fn describe(&self, arguments: &serde_json::Value) -> String {
        format!(
            "Checking the weather in {}",
            arguments["location"].as_str().unwrap_or("an unknown place")
        )
    }
}

/// Memory and khodam tools plus [`ForecastStub`]; nothing touches the network.
pub fn offline_registry(memory: Arc<dyn MemoryBackend>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(AddMemoryTool::new(memory)));
    registry.register(Box::new(GetKhodamTool));
    registry.register(Box::new(ForecastStub));
    registry
}
