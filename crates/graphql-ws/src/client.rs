//! The client side of a connection, independent of how bytes reach the server.
//!
//! [`Client`] holds the protocol state and buffers everything sent before the
//! channel opens. A driver owns the socket, forwards its events to the client
//! and implements [`ClientChannel`] to carry the client's output.

mod events;
mod queue;
#[cfg(feature = "tungstenite")]
pub mod tungstenite;

use ulid::Ulid;

pub use self::{
    events::{ClientEvent, EventKind, EventTable, ListenerId},
    queue::OutboundQueue,
};
use crate::{
    config::ClientConfig,
    messenger,
    protocol::{CloseCode, DecodeError, Message, OperationRequest, ParseError},
    transport::{CloseFrame, Frame},
};

/// Where a [`Client`] writes. Only called while the channel is open.
pub trait ClientChannel {
    fn send(&mut self, payload: String);

    fn close(&mut self, frame: CloseFrame);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

pub struct Client<C> {
    channel: C,
    config: ClientConfig,
    state: ReadyState,
    acknowledged: bool,
    queue: OutboundQueue,
    events: EventTable,
}

impl<C: ClientChannel> Client<C> {
    pub fn new(channel: C, config: ClientConfig) -> Self {
        Self {
            channel,
            config,
            state: ReadyState::Connecting,
            acknowledged: false,
            queue: OutboundQueue::new(),
            events: EventTable::default(),
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state
    }

    /// Whether the server answered `connection_init` with `connection_ack`.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts an operation under a fresh id and returns the id.
    pub fn subscribe(&mut self, request: OperationRequest) -> String {
        let id = Ulid::new().to_string();
        self.subscribe_with_id(&id, request);
        id
    }

    /// Starts an operation under an id picked by the caller. Ids must not
    /// collide with an operation that is still running.
    pub fn subscribe_with_id(&mut self, id: &str, request: OperationRequest) {
        self.send(&messenger::subscribe(id, request));
    }

    /// Stops a running operation.
    pub fn complete(&mut self, id: &str) {
        self.send(&messenger::complete(id));
    }

    pub fn ping(&mut self) {
        self.send(&messenger::ping());
    }

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&ClientEvent) + Send + 'static) -> ListenerId {
        self.events.on(kind, listener)
    }

    pub fn off(&mut self, listener: ListenerId) -> bool {
        self.events.off(listener)
    }

    /// Sends `payload` if the channel is open, buffers it while connecting and
    /// drops it once closing.
    pub fn enqueue_or_send(&mut self, payload: String) {
        match self.state {
            ReadyState::Open => self.channel.send(payload),
            ReadyState::Connecting => {
                if let Err(payload) = self.queue.push(payload) {
                    self.channel.send(payload);
                }
            }
            ReadyState::Closing | ReadyState::Closed => {
                tracing::debug!(state = %self.state, "Dropping a message sent after close");
            }
        }
    }

    fn send(&mut self, message: &Message) {
        match message.to_json() {
            Ok(payload) => self.enqueue_or_send(payload),
            Err(error) => tracing::error!("Could not serialize a {} message: {error}", message.message_type()),
        }
    }

    /// The channel is ready: sends `connection_init`, then everything buffered.
    pub fn handle_open(&mut self) {
        if self.state != ReadyState::Connecting {
            return;
        }

        self.state = ReadyState::Open;

        if self.config.connection_init {
            let payload = self.config.connection_init_payload.clone();
            self.send(&messenger::connection_init(payload));
        }

        for payload in self.queue.drain() {
            self.channel.send(payload);
        }

        self.events.emit(&ClientEvent::Open);
    }

    /// Decodes an inbound frame. Anything invalid closes the connection with a bad response.
    pub fn handle_frame(&mut self, frame: Frame) {
        let message = match frame {
            Frame::Text(text) => Message::parse(text),
            Frame::Binary(_) => Err(DecodeError::from(ParseError::NotText)),
        };

        match message {
            Ok(message) => self.handle_message(message),
            Err(error) => {
                tracing::warn!("Closing connection after an invalid server message: {error}");
                self.close(CloseFrame::new(CloseCode::BadResponse, error.close_reason()));
            }
        }
    }

    /// Only `next` reaches the application. The rest is protocol bookkeeping.
    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Next { id, payload } => self.events.emit(&ClientEvent::Next { id, payload }),
            Message::ConnectionAck { .. } => self.acknowledged = true,
            Message::Ping { .. } => self.send(&messenger::pong()),
            Message::Pong { .. } => {}
            Message::Error { id, payload } => {
                tracing::debug!(id, errors = payload.len(), "Operation failed");
            }
            Message::Complete { id } => tracing::debug!(id, "Operation completed"),
            message @ (Message::ConnectionInit { .. } | Message::Subscribe { .. }) => {
                tracing::debug!(message_type = %message.message_type(), "Ignoring a message only clients send");
            }
        }
    }

    /// Asks the channel to close. Nothing is sent afterwards.
    pub fn close(&mut self, frame: CloseFrame) {
        if matches!(self.state, ReadyState::Closing | ReadyState::Closed) {
            return;
        }

        self.state = ReadyState::Closing;
        self.channel.close(frame);
    }

    /// The channel closed, whichever side started it.
    pub fn handle_close(&mut self, code: u16, reason: String) {
        if self.state == ReadyState::Closed {
            return;
        }

        self.state = ReadyState::Closed;
        self.events.emit(&ClientEvent::Close { code, reason });
    }
}
