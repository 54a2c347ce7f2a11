//! Orchestrates history fetches, the live channel and sends for one session.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, watch};

use crate::common::{ChatError, ChatEvent, Conversation, Identity, UiCommand};
use crate::network::{
    ChannelConnector, ChannelState, ChatApi, Envelope, EnvelopeHandler, LiveChannel,
};
use crate::session::Session;
use crate::store::{self, SharedStore};

/// Outcome of `bootstrap` for the live side.
#[derive(Debug)]
pub enum LiveUpdates {
    Connected,
    /// History browsing still works.
    Unavailable(ChatError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Applied { messages: usize },
    /// A newer selection started while this one was fetching.
    Superseded,
}

pub struct ConversationController {
    identity: Identity,
    api: Arc<dyn ChatApi>,
    connector: Arc<dyn ChannelConnector>,
    store: SharedStore,
    selection: AtomicU64,
    channel: OnceLock<Arc<dyn LiveChannel>>,
    shut_down: AtomicBool,
    event_sender: mpsc::Sender<ChatEvent>,
}

impl ConversationController {
    pub fn new(
        session: &Session,
        store: SharedStore,
        event_sender: mpsc::Sender<ChatEvent>,
    ) -> Self {
        Self {
            identity: session.identity().clone(),
            api: session.api(),
            connector: session.connector(),
            store,
            selection: AtomicU64::new(0),
            channel: OnceLock::new(),
            shut_down: AtomicBool::new(false),
            event_sender,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Loads the conversation list, then opens the live channel and routes its
    /// messages into the store. A channel failure only disables live updates.
    pub async fn bootstrap(&self) -> Result<LiveUpdates, ChatError> {
        self.refresh_conversations().await?;

        if let Some(channel) = self.channel.get() {
            return Ok(live_status(channel.as_ref()));
        }

        let channel = match self.connector.open(&self.identity).await {
            Ok(channel) => channel,
            Err(err) => {
                log::warn!("Live updates unavailable for {}: {err}", self.identity);
                self.notify(ChatEvent::LiveUpdatesUnavailable(err.to_string()));
                return Ok(LiveUpdates::Unavailable(err));
            }
        };

        channel.on_envelope(self.envelope_handler());
        if self.channel.set(Arc::clone(&channel)).is_err() {
            // Another bootstrap won the race; keep a single channel per identity.
            channel.close();
            return Ok(LiveUpdates::Connected);
        }
        self.forward_channel_state(channel.watch_state());
        log::info!("Live updates connected for {}", self.identity);

        Ok(LiveUpdates::Connected)
    }

    pub async fn refresh_conversations(&self) -> Result<usize, ChatError> {
        let conversations = self.api.list_conversations().await?;
        let count = conversations.len();
        store::lock(&self.store).set_conversations(conversations);

        log::info!("Loaded {count} conversations");
        self.notify(ChatEvent::ConversationsLoaded(count));
        Ok(count)
    }

    /// Fetches the history of `chat`, installs it as the active log, then
    /// declares interest on the live channel, in that order. Results of a
    /// selection overtaken by a newer one are discarded.
    pub async fn select_conversation(&self, chat: &Conversation) -> Result<Selection, ChatError> {
        let ticket = self.selection.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Selecting chat {} (selection {ticket})", chat.id);

        let history = self.api.fetch_history(&chat.id).await?;

        let messages = {
            let mut store = store::lock(&self.store);
            if self.selection.load(Ordering::SeqCst) != ticket {
                log::debug!("History of chat {} superseded; discarded", chat.id);
                return Ok(Selection::Superseded);
            }
            store.set_active_history(&chat.id, history);
            store.active_log().len()
        };

        if let Some(channel) = self.channel.get() {
            if self.selection.load(Ordering::SeqCst) == ticket {
                if let Err(err) = channel.declare_interest(&chat.id).await {
                    log::warn!("Could not join chat {}: {err}", chat.id);
                    self.notify(ChatEvent::LiveUpdatesUnavailable(err.to_string()));
                }
            }
        }

        self.notify(ChatEvent::ActiveConversationChanged {
            chat_id: chat.id.clone(),
            messages,
        });
        Ok(Selection::Applied { messages })
    }

    /// Posts `content` to the active chat. The log only changes when the
    /// message comes back over the live channel.
    pub async fn send_message(&self, content: &str) -> Result<(), ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let chat_id = store::lock(&self.store)
            .active_chat_id()
            .map(str::to_string)
            .ok_or(ChatError::NoActiveConversation)?;

        self.api.send_message(&chat_id, content).await?;
        log::debug!("Sent message to chat {chat_id}");
        self.notify(ChatEvent::MessageSent { chat_id });
        Ok(())
    }

    /// Closes the live channel. Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(channel) = self.channel.get() {
            channel.close();
        }
        log::info!("Session of {} ended", self.identity);
    }

    /// Bootstraps, then serves UI commands until the sender side is dropped.
    /// Each command runs in its own task so a newer selection is never queued
    /// behind a slow history fetch.
    pub async fn run(self: Arc<Self>, mut command_receiver: mpsc::Receiver<UiCommand>) {
        if let Err(err) = self.bootstrap().await {
            log::error!("Bootstrap failed: {err}");
            self.notify(ChatEvent::Error(err.to_string()));
        }
        log::info!("Controller event loop started");

        while let Some(command) = command_receiver.recv().await {
            let controller = Arc::clone(&self);
            tokio::spawn(async move { controller.handle_command(command).await });
        }

        self.shutdown();
    }

    async fn handle_command(&self, command: UiCommand) {
        let result = match command {
            UiCommand::SelectConversation(chat) => {
                self.select_conversation(&chat).await.map(|_| ())
            }
            UiCommand::SendMessage(content) => self.send_message(&content).await,
            UiCommand::RefreshConversations => self.bootstrap().await.map(|_| ()),
        };

        if let Err(err) = result {
            log::warn!("{err}");
            self.notify(ChatEvent::Error(err.to_string()));
        }
    }

    fn envelope_handler(&self) -> EnvelopeHandler {
        let store = Arc::clone(&self.store);
        let event_sender = self.event_sender.clone();
        Arc::new(move |envelope: &Envelope| route_envelope(&store, &event_sender, envelope))
    }

    fn forward_channel_state(&self, mut state: watch::Receiver<ChannelState>) {
        let event_sender = self.event_sender.clone();
        let current = *state.borrow_and_update();
        self.notify(ChatEvent::LiveChannel(current));

        tokio::spawn(async move {
            while state.changed().await.is_ok() {
                let current = *state.borrow_and_update();
                if event_sender.send(ChatEvent::LiveChannel(current)).await.is_err()
                    || current == ChannelState::Closed
                {
                    break;
                }
            }
        });
    }

    fn notify(&self, event: ChatEvent) {
        notify(&self.event_sender, event);
    }
}

/// A channel dropped by the server stays dropped; reconnecting needs a new session.
fn live_status(channel: &dyn LiveChannel) -> LiveUpdates {
    match channel.state() {
        ChannelState::Open => LiveUpdates::Connected,
        state => LiveUpdates::Unavailable(ChatError::Connection(format!(
            "live channel is {state:?}"
        ))),
    }
}

fn route_envelope(
    store: &SharedStore,
    event_sender: &mpsc::Sender<ChatEvent>,
    envelope: &Envelope,
) {
    match envelope {
        Envelope::Message(message) => {
            if store::lock(store).append_live_message(message.clone()) {
                notify(
                    event_sender,
                    ChatEvent::MessageAppended {
                        chat_id: message.chat_id.clone(),
                        message_id: message.id.clone(),
                    },
                );
            } else {
                log::debug!(
                    "Live message {} for chat {} not shown",
                    message.id,
                    message.chat_id
                );
            }
        }
        Envelope::JoinAck { chat_id } => log::debug!("Join acknowledged for {chat_id:?}"),
        Envelope::Other { .. } => {
            log::debug!("Ignoring live envelope of kind {}", envelope.kind())
        }
    }
}

fn notify(event_sender: &mpsc::Sender<ChatEvent>, event: ChatEvent) {
    if let Err(err) = event_sender.try_send(event) {
        log::warn!("Failed to notify UI: {err}");
    }
}
