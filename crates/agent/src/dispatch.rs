//! Per-conversation serialization of turns.
//!
//! Each conversation gets its own FIFO lane: an unbounded queue drained by
//! one worker task. Turns on one conversation run strictly one at a time in
//! arrival order; different conversations run concurrently. A worker that
//! finds its queue empty retires the lane, so idle conversations hold no
//! task or map entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parley_core::channel::ChannelMessage;
use parley_core::error::ChannelError;
use parley_core::message::ConversationId;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::turn::TurnHandler;

struct Lane {
    id: u64,
    sender: mpsc::UnboundedSender<ChannelMessage>,
    worker: JoinHandle<()>,
}

type Lanes = Arc<Mutex<HashMap<ConversationId, Lane>>>;

/// Routes inbound messages to per-conversation lanes.
pub struct Dispatcher {
    handler: Arc<TurnHandler>,
    lanes: Lanes,
    next_lane_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(handler: Arc<TurnHandler>) -> Self {
        Self {
            handler,
            lanes: Arc::new(Mutex::new(HashMap::new())),
            next_lane_id: AtomicU64::new(0),
        }
    }

    /// Queue a message behind any turn already running on its conversation.
    pub async fn dispatch(&self, message: ChannelMessage) {
        let mut lanes = self.lanes.lock().await;
        let conversation_id = message.conversation_id.clone();

        let message = match lanes.get(&conversation_id) {
            Some(lane) => match lane.sender.send(message) {
                Ok(()) => return,
                // Worker is gone; start a fresh lane below.
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        debug!(conversation_id = %conversation_id, "Opening conversation lane");
        let lane = self.open_lane(conversation_id.clone());
        if lane.sender.send(message).is_err() {
            warn!(conversation_id = %conversation_id, "New lane closed before first message");
        }
        lanes.insert(conversation_id, lane);
    }

    /// Spawn the worker for a new lane.
    ///
    /// Senders only enqueue while holding the lanes lock, so checking the
    /// queue again under that lock before retiring cannot strand a message.
    fn open_lane(&self, conversation_id: ConversationId) -> Lane {
        let id = self.next_lane_id.fetch_add(1, Ordering::Relaxed);
        let (sender, mut receiver) = mpsc::unbounded_channel::<ChannelMessage>();
        let handler = self.handler.clone();
        let registry = self.lanes.clone();

        let worker = tokio::spawn(async move {
            loop {
                let message = match receiver.try_recv() {
                    Ok(message) => message,
                    Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {
                        let mut lanes = registry.lock().await;
                        match receiver.try_recv() {
                            Ok(message) => message,
                            Err(_) => {
                                if lanes.get(&conversation_id).is_some_and(|lane| lane.id == id) {
                                    lanes.remove(&conversation_id);
                                }
                                break;
                            }
                        }
                    }
                };
                handler.handle_incoming(message).await;
            }
            debug!(conversation_id = %conversation_id, "Conversation lane closed");
        });
        Lane { id, sender, worker }
    }

    /// Number of conversations with a turn running or queued.
    pub async fn lane_count(&self) -> usize {
        self.lanes.lock().await.len()
    }

    /// Dispatch everything a channel yields until it closes.
    pub async fn run(
        &self,
        mut inbound: mpsc::Receiver<Result<ChannelMessage, ChannelError>>,
    ) {
        while let Some(next) = inbound.recv().await {
            match next {
                Ok(message) => self.dispatch(message).await,
                Err(e) => warn!(error = %e, "Channel reported an error"),
            }
        }
        info!("Inbound channel closed");
    }

    /// Close every lane and wait for queued turns to finish.
    pub async fn shutdown(&self) {
        let lanes: Vec<Lane> = self.lanes.lock().await.drain().map(|(_, lane)| lane).collect();
        for Lane { sender, worker, .. } in lanes {
            drop(sender);
            if let Err(e) = worker.await {
                warn!(error = %e, "Conversation worker ended abnormally");
            }
        }
    }
}
