//! The server side of a connection: lifecycle, routing and the set of running operations.

use std::{collections::HashMap, future::pending, sync::Arc};

use futures_util::{pin_mut, Stream, StreamExt};
use tokio::{
    task::{JoinError, JoinSet},
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::SessionConfig,
    dispatcher::{Dispatcher, Outcome},
    engine::ExecutionEngine,
    messenger,
    protocol::{CloseCode, DecodeError, GraphqlError, Message, OperationRequest, ParseError},
    transport::{CloseFrame, Frame, Outbound, TransportEvent},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Phase {
    AwaitingOpen,
    Open,
    Closed,
}

struct Subscription {
    cancellation: CancellationToken,
    serial: u64,
}

/// Reported by an operation task when it ends. The serial tells a finished
/// operation apart from a newer one that reuses its id.
#[derive(Debug)]
struct Completion {
    id: String,
    serial: u64,
    outcome: Outcome,
}

/// Per-connection state, owned by the task handling that connection.
///
/// Inbound messages are handled one at a time. Operations run on their own
/// tasks and report back through [`Completion`]s, so only the session ever
/// touches the set of open subscriptions.
pub struct Session<E> {
    config: SessionConfig,
    dispatcher: Dispatcher<E>,
    outbound: Outbound,
    phase: Phase,
    initialised: bool,
    init_deadline: Option<Instant>,
    subscriptions: HashMap<String, Subscription>,
    tasks: JoinSet<Completion>,
    next_serial: u64,
    cancellation: CancellationToken,
}

impl<E: ExecutionEngine> Session<E> {
    pub fn new(engine: Arc<E>, outbound: Outbound, config: SessionConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(engine, outbound.clone()),
            outbound,
            phase: Phase::AwaitingOpen,
            initialised: false,
            init_deadline: None,
            subscriptions: HashMap::new(),
            tasks: JoinSet::new(),
            next_serial: 0,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ids of the operations currently running.
    pub fn subscriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.subscriptions.keys().map(String::as_str)
    }

    /// Drives the session from transport events until either side closes.
    pub async fn run(mut self, events: impl Stream<Item = TransportEvent>) {
        pin_mut!(events);

        let mut keep_alive = self.config.keep_alive.filter(|period| !period.is_zero()).map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        while self.phase != Phase::Closed {
            tokio::select! {
                event = events.next() => match event {
                    Some(TransportEvent::Open { protocol }) => {
                        self.open(protocol.as_deref()).await;
                    }
                    Some(TransportEvent::Frame(frame)) => self.receive(frame).await,
                    Some(TransportEvent::Closed { code, reason }) => {
                        tracing::debug!(code, reason, "Connection closed by peer");
                        self.shutdown();
                    }
                    None => self.shutdown(),
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => self.finish(joined).await,
                () = deadline(self.init_deadline) => {
                    self.close(CloseCode::ConnectionInitialisationTimeout.into()).await;
                }
                () = tick(keep_alive.as_mut()), if self.phase == Phase::Open => {
                    self.outbound.send(messenger::ping()).await;
                }
            }
        }

        self.shutdown();
    }

    /// Checks the negotiated subprotocol. Returns whether the session is now open.
    pub async fn open(&mut self, protocol: Option<&str>) -> bool {
        if self.phase != Phase::AwaitingOpen {
            return self.phase == Phase::Open;
        }

        if protocol != Some(self.config.protocol.as_str()) {
            tracing::warn!(protocol, "Rejecting connection with an unsupported subprotocol");
            self.close(CloseCode::SubprotocolNotAcceptable.into()).await;
            return false;
        }

        self.phase = Phase::Open;

        if self.config.strict_lifecycle {
            self.init_deadline = self
                .config
                .connection_init_wait_timeout
                .map(|timeout| Instant::now() + timeout);
        }

        true
    }

    /// Decodes and handles one inbound frame. Anything undecodable closes the connection.
    pub async fn receive(&mut self, frame: Frame) {
        if self.phase != Phase::Open {
            tracing::debug!(phase = %self.phase, "Ignoring a frame received outside of the open phase");
            return;
        }

        let message = match frame {
            Frame::Text(text) => Message::parse(text),
            Frame::Binary(_) => Err(DecodeError::from(ParseError::NotText)),
        };

        match message {
            Ok(message) => self.handle(message).await,
            Err(error) => {
                tracing::warn!("Closing connection after an invalid message: {error}");
                self.close(CloseFrame::new(CloseCode::BadRequest, error.close_reason()))
                    .await;
            }
        }
    }

    /// Routes a decoded message.
    pub async fn handle(&mut self, message: Message) {
        tracing::debug!(message_type = %message.message_type(), id = message.id(), "Received message");

        match message {
            Message::ConnectionInit { .. } => {
                if self.config.strict_lifecycle && self.initialised {
                    self.close(CloseCode::TooManyInitialisationRequests.into()).await;
                    return;
                }

                self.initialised = true;
                self.init_deadline = None;
                self.outbound.send(messenger::connection_ack()).await;
            }
            Message::Ping { .. } => {
                self.outbound.send(messenger::pong()).await;
            }
            Message::Pong { .. } => {}
            Message::Subscribe { id, payload } => {
                if self.config.strict_lifecycle && !self.initialised {
                    self.close(CloseCode::Unauthorized.into()).await;
                    return;
                }

                self.subscribe(id, payload).await;
            }
            Message::Complete { id } => {
                if let Some(subscription) = self.subscriptions.remove(&id) {
                    subscription.cancellation.cancel();
                }
            }
            message @ (Message::ConnectionAck { .. } | Message::Next { .. } | Message::Error { .. }) => {
                let message_type = message.message_type();

                if self.config.strict_lifecycle {
                    self.close(CloseFrame::new(
                        CloseCode::BadRequest,
                        format!("Unexpected message of type {message_type} received"),
                    ))
                    .await;
                } else {
                    tracing::debug!(%message_type, "Ignoring a message only servers send");
                }
            }
        }
    }

    async fn subscribe(&mut self, id: String, request: OperationRequest) {
        if self.subscriptions.contains_key(&id) {
            tracing::debug!(id, "Rejecting a duplicate subscription");
            let errors = vec![GraphqlError::subscriber_already_exists(&id)];
            self.outbound.send(messenger::error(&id, errors)).await;
            return;
        }

        let serial = self.next_serial;
        self.next_serial += 1;

        let cancellation = self.cancellation.child_token();
        let dispatcher = self.dispatcher.clone();

        self.subscriptions.insert(
            id.clone(),
            Subscription {
                cancellation: cancellation.clone(),
                serial,
            },
        );

        self.tasks.spawn(async move {
            let outcome = dispatcher.execute(&id, request, &cancellation).await;
            Completion { id, serial, outcome }
        });
    }

    /// Forgets a finished operation and sends its `complete`, unless the
    /// client completed it first. The id is released before `complete` goes
    /// out, so the client may reuse it as soon as it sees the `complete`.
    async fn finish(&mut self, joined: Result<Completion, JoinError>) {
        let Completion { id, serial, outcome } = match joined {
            Ok(completion) => completion,
            Err(error) => {
                tracing::error!("Operation task failed: {error}");
                return;
            }
        };

        tracing::debug!(id, ?outcome, "Operation finished");

        let current = self
            .subscriptions
            .get(&id)
            .is_some_and(|subscription| subscription.serial == serial);

        if !current {
            return;
        }

        self.subscriptions.remove(&id);

        if outcome == Outcome::Completed {
            self.outbound.send(messenger::complete(&id)).await;
        }
    }

    /// Sends a close frame and tears the session down.
    pub async fn close(&mut self, frame: CloseFrame) {
        if self.phase == Phase::Closed {
            return;
        }

        tracing::warn!(code = frame.code, reason = frame.reason, "Closing connection");

        self.shutdown();
        self.outbound.close(frame).await;
    }

    /// Cancels every running operation. The session accepts nothing afterwards.
    pub fn shutdown(&mut self) {
        self.phase = Phase::Closed;
        self.init_deadline = None;
        self.cancellation.cancel();
        self.subscriptions.clear();
    }
}

pub(crate) async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending().await,
    }
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}
