//! The bidirectional channel a session talks through, independent of any websocket library.

#[cfg(feature = "axum")]
pub mod axum;

use tokio::sync::mpsc;

use crate::protocol::{CloseCode, Message};

/// A data frame received from the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// What a transport reports to the session, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The channel is ready. `protocol` is the negotiated subprotocol, if any.
    Open { protocol: Option<String> },
    Frame(Frame),
    Closed { code: u16, reason: String },
}

/// Websocket close frames carry at most this many bytes of reason.
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: impl Into<u16>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Cuts the reason down to what fits in a close frame, on a char boundary.
    #[must_use]
    pub fn truncated(mut self) -> Self {
        if self.reason.len() > MAX_CLOSE_REASON_BYTES {
            let mut end = MAX_CLOSE_REASON_BYTES;
            while !self.reason.is_char_boundary(end) {
                end -= 1;
            }
            self.reason.truncate(end);
        }

        self
    }
}

impl From<CloseCode> for CloseFrame {
    fn from(code: CloseCode) -> Self {
        CloseFrame::new(code, close_reason(code))
    }
}

/// The reason sent along with a close code when nothing more specific applies.
pub fn close_reason(code: CloseCode) -> &'static str {
    match code {
        CloseCode::InternalServerError => "Internal server error",
        CloseCode::InternalClientError => "Internal client error",
        CloseCode::BadRequest => "Bad request",
        CloseCode::BadResponse => "Bad response",
        CloseCode::Unauthorized => "Unauthorized",
        CloseCode::Forbidden => "Forbidden",
        CloseCode::SubprotocolNotAcceptable => "Sub protocol is not acceptable",
        CloseCode::ConnectionInitialisationTimeout => "Connection initialisation timeout",
        CloseCode::ConnectionAcknowledgementTimeout => "Connection acknowledgement timeout",
        CloseCode::SubscriberAlreadyExists => "Subscriber already exists",
        CloseCode::TooManyInitialisationRequests => "Too many initialisation requests",
    }
}

/// What the session asks the transport to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Message(Message),
    Close(CloseFrame),
}

pub type OutgoingReceiver = mpsc::Receiver<Outgoing>;

/// The sending half handed to the session and every running operation.
///
/// Sockets usually can't be cloned, so the transport drains the receiving end
/// of this channel into the socket. Once the transport stops draining, sends
/// are dropped.
#[derive(Debug, Clone)]
pub struct Outbound {
    sender: mpsc::Sender<Outgoing>,
}

impl Outbound {
    pub fn channel(buffer: usize) -> (Self, OutgoingReceiver) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self { sender }, receiver)
    }

    /// Sends a message, returning false if the channel is gone.
    pub async fn send(&self, message: Message) -> bool {
        self.sender.send(Outgoing::Message(message)).await.is_ok()
    }

    pub async fn close(&self, frame: CloseFrame) {
        if self.sender.send(Outgoing::Close(frame)).await.is_err() {
            tracing::debug!("Transport already gone, dropping close frame");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the transport stopped accepting messages.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}
