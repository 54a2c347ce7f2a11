//! Live duplex channel keyed by user identity.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::common::{ChatError, Identity};

use super::envelope::{Envelope, OutboundFrame};

const OUTBOUND_BUFFER: usize = 32;

pub type EnvelopeHandler = Arc<dyn Fn(&Envelope) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Subscription side of a live channel, as seen by the controller.
#[async_trait]
pub trait LiveChannel: Send + Sync {
    /// Handlers run once per inbound envelope, in arrival order.
    fn on_envelope(&self, handler: EnvelopeHandler);

    async fn declare_interest(&self, chat_id: &str) -> Result<(), ChatError>;

    /// Releases the connection. Safe to call more than once.
    fn close(&self);

    fn state(&self) -> ChannelState;

    fn watch_state(&self) -> watch::Receiver<ChannelState>;
}

/// Opens one live channel per identity. Reconnect policies wrap this.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn open(&self, identity: &Identity) -> Result<Arc<dyn LiveChannel>, ChatError>;
}

pub struct SessionChannel {
    url: String,
    handlers: Arc<RwLock<Vec<EnvelopeHandler>>>,
    state: Arc<watch::Sender<ChannelState>>,
    outbound: Mutex<Option<mpsc::Sender<WsMessage>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SessionChannel {
    pub fn new(ws_base: &str, identity: &Identity) -> Self {
        let (state, _) = watch::channel(ChannelState::Idle);
        Self {
            url: format!("{}/ws/{}", ws_base.trim_end_matches('/'), identity),
            handlers: Arc::new(RwLock::new(Vec::new())),
            state: Arc::new(state),
            outbound: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `Idle -> Connecting -> Open`, or `Connecting -> Closed` on failure.
    pub async fn open(&self) -> Result<(), ChatError> {
        let current = *self.state.borrow();
        if current != ChannelState::Idle {
            return Err(ChatError::Connection(format!(
                "channel {} cannot be opened from state {current:?}",
                self.url
            )));
        }

        self.state.send_replace(ChannelState::Connecting);
        log::info!("Opening live channel {}", self.url);

        let (stream, _) = match connect_async(self.url.as_str()).await {
            Ok(connected) => connected,
            Err(err) => {
                self.state.send_replace(ChannelState::Closed);
                return Err(ChatError::Connection(format!("{}: {err}", self.url)));
            }
        };
        let (mut sink, mut source) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(OUTBOUND_BUFFER);
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(err) = sink.send(frame).await {
                    log::warn!("Live channel write failed: {err}");
                    return;
                }
            }
            // Every sender is gone: the channel was closed locally.
            let _ = sink.send(WsMessage::Close(None)).await;
        });

        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = Some(outbound_tx);
        self.state.send_replace(ChannelState::Open);

        let handlers = Arc::clone(&self.handlers);
        let state = Arc::clone(&self.state);
        let url = self.url.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(err) => {
                            log::warn!("Dropping non UTF-8 frame on {url}: {err}");
                            continue;
                        }
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(err) => {
                        log::warn!("Live channel {url} dropped: {err}");
                        break;
                    }
                };

                match Envelope::decode(&text) {
                    Ok(envelope) => dispatch(&handlers, &envelope),
                    Err(err) => log::warn!("Dropping envelope on {url}: {err}"),
                }
            }
            state.send_replace(ChannelState::Closed);
            log::info!("Live channel {url} reader stopped");
        });
        *self.reader.lock().unwrap_or_else(PoisonError::into_inner) = Some(reader);

        Ok(())
    }

    fn release(&self) -> bool {
        let outbound = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.state.send_replace(ChannelState::Closed);

        if outbound.is_none() && reader.is_none() {
            return false;
        }
        drop(outbound);
        if let Some(reader) = reader {
            reader.abort();
        }
        true
    }
}

fn dispatch(handlers: &RwLock<Vec<EnvelopeHandler>>, envelope: &Envelope) {
    let handlers = handlers
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for handler in &handlers {
        handler(envelope);
    }
}

#[async_trait]
impl LiveChannel for SessionChannel {
    fn on_envelope(&self, handler: EnvelopeHandler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    async fn declare_interest(&self, chat_id: &str) -> Result<(), ChatError> {
        let frame = OutboundFrame::JoinChat { chat_id }.encode()?;
        let sender = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ChatError::Connection(format!("channel {} is not open", self.url)))?;

        sender
            .send(WsMessage::Text(frame))
            .await
            .map_err(|_| ChatError::Connection(format!("channel {} writer stopped", self.url)))?;
        log::debug!("Declared interest in chat {chat_id}");
        Ok(())
    }

    fn close(&self) {
        if self.release() {
            log::info!("Closed live channel {}", self.url);
        }
    }

    fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens `SessionChannel`s against `{ws_base}/ws/{identity}`.
pub struct WsConnector {
    ws_base: String,
}

impl WsConnector {
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
        }
    }
}

#[async_trait]
impl ChannelConnector for WsConnector {
    async fn open(&self, identity: &Identity) -> Result<Arc<dyn LiveChannel>, ChatError> {
        let channel = SessionChannel::new(&self.ws_base, identity);
        channel.open().await?;
        log::debug!("Live channel ready at {}", channel.url());
        Ok(Arc::new(channel))
    }
}
