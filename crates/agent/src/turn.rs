//! Turn handling: intake, typing indicator, one-shot retry, delivery.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parley_config::AppConfig;
use parley_core::channel::{Channel, ChannelMessage};
use parley_core::event::{DomainEvent, EventBus};
use parley_core::message::ConversationId;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::context::token::user_record;
use crate::context::{AgentIdentity, BudgetMode};
use crate::loop_runner::{AgentLoop, TurnOutcome};

/// A generation is attempted at most this many times per turn.
const MAX_ATTEMPTS: u32 = 2;

/// Sends a typing indicator now and then every `interval` until dropped.
///
/// Dropping the guard cancels the timer, so every exit path of a turn
/// stops the indicator.
pub struct TypingIndicator {
    handle: JoinHandle<()>,
}

impl TypingIndicator {
    pub async fn start(
        channel: Arc<dyn Channel>,
        conversation_id: ConversationId,
        interval: Duration,
    ) -> Self {
        send_typing(channel.as_ref(), &conversation_id).await;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                send_typing(channel.as_ref(), &conversation_id).await;
            }
        });
        Self { handle }
    }
}

async fn send_typing(channel: &dyn Channel, conversation_id: &ConversationId) {
    if let Err(e) = channel.send_typing(conversation_id).await {
        debug!(conversation_id = %conversation_id, error = %e, "Typing indicator failed");
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Turns inbound chat messages into delivered answers.
pub struct TurnHandler {
    agent: Arc<AgentLoop>,
    channel: Arc<dyn Channel>,
    event_bus: Arc<EventBus>,
    image_token_cost: usize,
    typing_interval: Duration,
    failure_notice: String,
}

impl TurnHandler {
    pub fn new(agent: Arc<AgentLoop>, channel: Arc<dyn Channel>, event_bus: Arc<EventBus>) -> Self {
        Self {
            agent,
            channel,
            event_bus,
            image_token_cost: 85,
            typing_interval: Duration::from_secs(5),
            failure_notice: "Sorry, something went wrong while answering. Please try again.".into(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        agent: Arc<AgentLoop>,
        channel: Arc<dyn Channel>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(agent, channel, event_bus)
            .with_image_token_cost(config.context.image_token_cost)
            .with_typing_interval(Duration::from_secs(config.agent.typing_interval_secs))
            .with_failure_notice(&config.agent.failure_notice)
    }

    pub fn with_image_token_cost(mut self, cost: usize) -> Self {
        self.image_token_cost = cost;
        self
    }

    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    pub fn with_failure_notice(mut self, notice: impl Into<String>) -> Self {
        self.failure_notice = notice.into();
        self
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Take one inbound message through a full turn.
    ///
    /// Every message is added to its conversation's context. Only messages
    /// addressing the agent trigger a generation. Never returns an error:
    /// failures clear the context, retry once, then send the failure notice.
    pub async fn handle_incoming(&self, message: ChannelMessage) {
        let conversation_id = message.conversation_id.clone();
        let record = user_record(
            self.agent.provider().as_ref(),
            &message,
            self.image_token_cost,
        );

        self.event_bus.publish(DomainEvent::MessageReceived {
            conversation_id: conversation_id.to_string(),
            sender_id: message.sender_id.clone(),
            content_preview: message.content.chars().take(80).collect(),
            timestamp: Utc::now(),
        });
        self.agent
            .store()
            .append(&conversation_id, record, BudgetMode::Normal)
            .await;

        if !message.addresses(self.channel.agent_id()) {
            debug!(conversation_id = %conversation_id, "Message does not address the agent");
            return;
        }

        let agent = AgentIdentity::from_channel(self.channel.as_ref());
        let outcome = {
            let _typing = TypingIndicator::start(
                self.channel.clone(),
                conversation_id.clone(),
                self.typing_interval,
            )
            .await;
            self.generate_with_retry(&conversation_id, &agent).await
        };

        match outcome {
            Some(outcome) => self.deliver(&message, outcome).await,
            None => {
                error!(conversation_id = %conversation_id, "Turn failed after retry");
                if let Err(e) = self.channel.reply(&message, &self.failure_notice).await {
                    warn!(conversation_id = %conversation_id, error = %e, "Failed to deliver failure notice");
                }
            }
        }
    }

    /// Generate, clearing the context after every failure.
    ///
    /// The retry runs against the emptied context; only the system
    /// preamble reaches the model.
    async fn generate_with_retry(
        &self,
        conversation_id: &ConversationId,
        agent: &AgentIdentity,
    ) -> Option<TurnOutcome> {
        let store = self.agent.store();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.agent.generate(conversation_id, agent).await {
                Ok(outcome) => return Some(outcome),
                Err(e) => {
                    warn!(
                        conversation_id = %conversation_id,
                        attempt,
                        error = %e,
                        "Generation failed, clearing context"
                    );
                    self.event_bus.publish(DomainEvent::TurnFailed {
                        conversation_id: conversation_id.to_string(),
                        attempt,
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });

                    store.clear(conversation_id).await;
                    self.event_bus.publish(DomainEvent::ContextCleared {
                        conversation_id: conversation_id.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        None
    }

    /// Reply with the answer, then post the sources block on its own.
    async fn deliver(&self, original: &ChannelMessage, outcome: TurnOutcome) {
        let conversation_id = &original.conversation_id;
        if let Err(e) = self.channel.reply(original, &outcome.answer).await {
            warn!(conversation_id = %conversation_id, error = %e, "Failed to deliver answer");
        }
        if let Some(citations) = &outcome.citations {
            if let Err(e) = self.channel.send(conversation_id, citations).await {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to deliver sources");
            }
        }
        info!(conversation_id = %conversation_id, cited = outcome.citations.is_some(), "Turn complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextBudget, ContextStore};
    use crate::test_helpers::{
        RecordingChannel, ScriptedProvider, Sent, inbound, offline_registry, tool_call,
    };
    use parley_core::error::ProviderError;
    use parley_core::message::Role;
    use parley_core::provider::ModelReply;
    use parley_memory::InMemoryBackend;

    struct Harness {
        handler: TurnHandler,
        channel: Arc<RecordingChannel>,
        store: Arc<ContextStore>,
        bus: Arc<EventBus>,
        provider: Arc<ScriptedProvider>,
    }

    fn harness(replies: Vec<Result<ModelReply, ProviderError>>) -> Harness {
        let provider = Arc::new(ScriptedProvider::new(replies));
        let memory = Arc::new(InMemoryBackend::default());
        let store = Arc::new(ContextStore::new(ContextBudget::new(1000, 2000)));
        let bus = Arc::new(EventBus::default());
        let agent = Arc::new(AgentLoop::new(
            provider.clone(),
            "mock-model",
            Arc::new(offline_registry(memory.clone())),
            memory,
            store.clone(),
            bus.clone(),
        ));
        let channel = Arc::new(RecordingChannel::new());
        let handler = TurnHandler::new(agent, channel.clone(), bus.clone())
            .with_typing_interval(Duration::from_millis(10))
            .with_failure_notice("It broke.");
        Harness {
            handler,
            channel,
            store,
            bus,
            provider,
        }
    }

    fn conv() -> ConversationId {
        ConversationId::from("general")
    }

    fn cleared_count(rx: &mut tokio::sync::broadcast::Receiver<Arc<DomainEvent>>) -> usize {
        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event.as_ref(), DomainEvent::ContextCleared { .. }) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn unaddressed_message_is_only_stored() {
        let h = harness(vec![]);
        h.handler.handle_incoming(inbound("general", "just chatting", false)).await;

        assert!(h.channel.sent().is_empty());
        assert_eq!(h.channel.typing_count(), 0);
        let context = h.store.get(&conv()).await;
        assert_eq!(context.len(), 1);
        assert_eq!(context.messages[0].role(), Role::User);
    }

    #[tokio::test]
    async fn answer_is_replied() {
        let h = harness(vec![Ok(ModelReply::Answer("Hi Alice!".into()))]);
        h.handler.handle_incoming(inbound("general", "hello bot", true)).await;

        assert_eq!(h.channel.sent(), vec![Sent::Reply("Hi Alice!".into())]);
        assert!(h.channel.typing_count() >= 1);
    }

    #[tokio::test]
    async fn citations_follow_the_answer() {
        let h = harness(vec![
            Ok(tool_call("get_khodam", serde_json::json!({"user_id": "42"}))),
            Ok(ModelReply::Answer("Your khodam is a cat.".into())),
        ]);
        h.handler.handle_incoming(inbound("general", "khodam?", true)).await;

        assert_eq!(
            h.channel.sent(),
            vec![
                Sent::Reply("Your khodam is a cat.".into()),
                Sent::Message("### 🔍 Sources\n- Reading khodam <@42>".into()),
            ]
        );
    }

    #[tokio::test]
    async fn first_failure_is_retried_once() {
        let h = harness(vec![
            Err(ProviderError::Network("reset".into())),
            Ok(ModelReply::Answer("Second time lucky.".into())),
        ]);
        let mut events = h.bus.subscribe();

        h.handler.handle_incoming(inbound("general", "hello", true)).await;

        assert_eq!(h.channel.sent(), vec![Sent::Reply("Second time lucky.".into())]);
        assert_eq!(cleared_count(&mut events), 1);
        let context = h.store.get(&conv()).await;
        assert_eq!(
            context.messages.iter().map(|r| r.role()).collect::<Vec<_>>(),
            vec![Role::Assistant]
        );
        // The question went with the cleared context.
        let retry = h.provider.request(1);
        assert!(retry.messages.iter().all(|m| m.role == Role::System));
    }

    #[tokio::test]
    async fn second_failure_sends_notice() {
        let h = harness(vec![
            Err(ProviderError::Network("reset".into())),
            Err(ProviderError::Timeout("slow".into())),
        ]);
        let mut events = h.bus.subscribe();

        h.handler.handle_incoming(inbound("general", "hello", true)).await;

        assert_eq!(h.channel.sent(), vec![Sent::Reply("It broke.".into())]);
        assert_eq!(cleared_count(&mut events), 2);
        assert!(h.store.get(&conv()).await.is_empty());
    }

    #[tokio::test]
    async fn failed_tool_chain_leaves_no_scaffolding() {
        let h = harness(vec![
            Ok(tool_call("get_weather_forecast", serde_json::json!({"location": "Jakarta"}))),
            Ok(tool_call("does_not_exist", serde_json::json!({}))),
            Ok(ModelReply::Answer("Recovered.".into())),
        ]);

        h.handler.handle_incoming(inbound("general", "weather?", true)).await;

        assert_eq!(h.channel.sent(), vec![Sent::Reply("Recovered.".into())]);
        let context = h.store.get(&conv()).await;
        assert!(context.messages.iter().all(|r| r.role() != Role::ToolResult));
    }

    #[tokio::test]
    async fn typing_stops_when_turn_ends() {
        let h = harness(vec![Ok(ModelReply::Answer("done".into()))]);
        h.handler.handle_incoming(inbound("general", "hello", true)).await;

        let after_turn = h.channel.typing_count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.channel.typing_count(), after_turn);
    }

    #[tokio::test]
    async fn delivery_errors_are_swallowed() {
        let h = harness(vec![Ok(ModelReply::Answer("lost".into()))]);
        h.channel.fail_deliveries();

        h.handler.handle_incoming(inbound("general", "hello", true)).await;

        // The answer is still committed even though delivery failed.
        let context = h.store.get(&conv()).await;
        assert_eq!(context.messages.last().map(|r| r.role()), Some(Role::Assistant));
    }
}
