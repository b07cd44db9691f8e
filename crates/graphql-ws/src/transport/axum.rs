//! Serving sessions over axum websockets.
//!
//! [`WebsocketService`] upgrades requests and hands the sockets to a
//! [`WebsocketAccepter`], which runs a [`Session`] for each of them.

use std::{
    convert::Infallible,
    sync::Arc,
    task::{Context, Poll},
};

use ::axum::{
    extract::{
        ws::{self, WebSocket},
        FromRequestParts as _, Request, WebSocketUpgrade,
    },
    response::{IntoResponse as _, Response},
};
use futures_util::{future::BoxFuture, stream, Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;
use ulid::Ulid;

use super::{Frame, Outbound, Outgoing, OutgoingReceiver, TransportEvent};
use crate::{config::SessionConfig, engine::ExecutionEngine, session::Session};

pub type WebsocketSender = mpsc::Sender<WebSocket>;
pub type WebsocketReceiver = mpsc::Receiver<WebSocket>;

/// Upgrades requests to websockets offering `protocol`, and sends the sockets to a [`WebsocketAccepter`].
#[derive(Clone)]
pub struct WebsocketService {
    sender: WebsocketSender,
    protocol: String,
}

impl WebsocketService {
    pub fn new(sender: WebsocketSender, protocol: impl Into<String>) -> Self {
        Self {
            sender,
            protocol: protocol.into(),
        }
    }
}

impl tower_service::Service<Request> for WebsocketService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let sender = self.sender.clone();
        let protocol = self.protocol.clone();

        Box::pin(async move {
            let (mut parts, _body) = request.into_parts();

            let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
                Ok(upgrade) => upgrade,
                Err(rejection) => return Ok(rejection.into_response()),
            };

            // A client that offers no matching protocol is still upgraded, its session rejects it.
            let response = upgrade.protocols([protocol]).on_upgrade(move |socket| async move {
                if sender.send(socket).await.is_err() {
                    tracing::warn!("Websocket accepter is gone, dropping connection");
                }
            });

            Ok(response)
        })
    }
}

/// An actor that runs a session for every socket it receives.
pub struct WebsocketAccepter<E> {
    sockets: WebsocketReceiver,
    engine: Arc<E>,
    config: SessionConfig,
}

impl<E: ExecutionEngine> WebsocketAccepter<E> {
    pub fn new(sockets: WebsocketReceiver, engine: Arc<E>, config: SessionConfig) -> Self {
        Self {
            sockets,
            engine,
            config,
        }
    }

    pub async fn handler(mut self) {
        while let Some(socket) = self.sockets.recv().await {
            let connection_id = Ulid::new();
            tracing::info!(%connection_id, "Accepted websocket connection");

            let span = tracing::info_span!("graphql-ws-session", %connection_id);

            tokio::spawn(serve_socket(socket, self.engine.clone(), self.config.clone()).instrument(span));
        }
    }
}

/// Runs a session on an upgraded socket until either side closes it.
pub async fn serve_socket<E: ExecutionEngine>(socket: WebSocket, engine: Arc<E>, config: SessionConfig) {
    let protocol = socket
        .protocol()
        .and_then(|protocol| protocol.to_str().ok())
        .map(str::to_owned);

    let (sink, receiver) = socket.split();

    // The socket sender isn't clone, so sessions and operations write to an
    // mpsc and a pump task forwards to the socket.
    let (outbound, outgoing) = Outbound::channel(16);
    tokio::spawn(pump(outgoing, sink).in_current_span());

    let events = stream::once(async move { TransportEvent::Open { protocol } }).chain(receiver.filter_map(|message| async move {
        match message {
            Ok(ws::Message::Text(text)) => Some(TransportEvent::Frame(Frame::Text(text))),
            Ok(ws::Message::Binary(bytes)) => Some(TransportEvent::Frame(Frame::Binary(bytes))),
            Ok(ws::Message::Ping(_) | ws::Message::Pong(_)) => None,
            Ok(ws::Message::Close(frame)) => Some(match frame {
                Some(frame) => TransportEvent::Closed {
                    code: frame.code,
                    reason: frame.reason.into_owned(),
                },
                None => TransportEvent::Closed {
                    code: ws::close_code::STATUS,
                    reason: String::new(),
                },
            }),
            Err(error) => {
                tracing::warn!("Error receiving websocket message: {error:?}");
                Some(TransportEvent::Closed {
                    code: ws::close_code::ABNORMAL,
                    reason: error.to_string(),
                })
            }
        }
    }));

    Session::new(engine, outbound, config).run(events).await;

    tracing::debug!("Session ended");
}

async fn pump(mut outgoing: OutgoingReceiver, mut sink: impl Sink<ws::Message> + Unpin) {
    while let Some(message) = outgoing.recv().await {
        let (message, closing) = match message {
            Outgoing::Message(message) => match message.to_json() {
                Ok(text) => (ws::Message::Text(text), false),
                Err(error) => {
                    tracing::warn!("Couldn't encode websocket message: {error:?}");
                    continue;
                }
            },
            Outgoing::Close(frame) => {
                let frame = frame.truncated();
                let frame = ws::CloseFrame {
                    code: frame.code,
                    reason: frame.reason.into(),
                };

                (ws::Message::Close(Some(frame)), true)
            }
        };

        if sink.send(message).await.is_err() || closing {
            break;
        }
    }

    // flushes the reply to a close started by the peer
    sink.close().await.ok();
}
