#![allow(dead_code)]

use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::StreamExt;
use graphql_ws::{
    engine::ResultStream,
    protocol::{JsonMap, GRAPHQL_TRANSPORT_WS_PROTOCOL},
    transport::{CloseFrame, OutgoingReceiver},
    ExecutionArgs, ExecutionEngine, ExecutionResult, GraphqlError, Message, OperationKind, Outbound, Outgoing, Session,
    SessionConfig, TransportEvent,
};
use serde_json::json;
use tokio::{sync::mpsc, task::JoinHandle};

const TIMEOUT: Duration = Duration::from_secs(5);

pub fn data(value: serde_json::Value) -> ExecutionResult {
    ExecutionResult::from_data(value.as_object().cloned().unwrap())
}

/// An engine driven by the text of the query:
///
/// - `syntax error` anywhere fails to parse
/// - `invalid` anywhere fails validation
/// - documents starting with `fragment` have no operation
/// - `requestError` executes into a request error, or fails to start a stream
/// - subscriptions stream from [`MockEngine::stream`] channels, or yield `a` and `b`
#[derive(Default)]
pub struct MockEngine {
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<ExecutionResult>>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next subscription streams whatever is sent on the returned sender,
    /// and ends when it's dropped.
    pub fn stream(&self) -> mpsc::UnboundedSender<ExecutionResult> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().push_back(receiver);
        sender
    }
}

pub struct MockDocument {
    query: String,
}

impl ExecutionEngine for MockEngine {
    type Document = MockDocument;

    fn parse(&self, query: &str) -> Result<Self::Document, GraphqlError> {
        if query.contains("syntax error") {
            return Err(GraphqlError::new("Syntax Error: Unexpected Name \"syntax\".").with_location(1, 1));
        }

        Ok(MockDocument {
            query: query.to_owned(),
        })
    }

    fn validate(&self, document: &Self::Document) -> Vec<GraphqlError> {
        if document.query.contains("invalid") {
            vec![GraphqlError::new("Cannot query field \"invalid\" on type \"Query\".").with_location(1, 3)]
        } else {
            Vec::new()
        }
    }

    fn operation_kind(&self, document: &Self::Document, operation_name: Option<&str>) -> Option<OperationKind> {
        let query = document.query.trim_start();
        let operations = query.matches("query ").count();

        if query.starts_with("fragment") || (operations > 1 && operation_name.is_none()) {
            None
        } else if query.starts_with("subscription") {
            Some(OperationKind::Subscription)
        } else if query.starts_with("mutation") {
            Some(OperationKind::Mutation)
        } else {
            Some(OperationKind::Query)
        }
    }

    fn execute(&self, args: ExecutionArgs<Self::Document>) -> impl Future<Output = ExecutionResult> + Send {
        async move {
            if args.document.query.contains("requestError") {
                return ExecutionResult::request_error([GraphqlError::new("Variable \"$id\" was not provided.")]);
            }

            let mut result = data(json!({"hello": "world"}));
            if let Some(name) = args.operation_name {
                result = result.with_extensions(JsonMap::from_iter([("operationName".to_owned(), json!(name))]));
            }
            result
        }
    }

    fn execute_stream(
        &self,
        args: ExecutionArgs<Self::Document>,
    ) -> impl Future<Output = Result<ResultStream, Vec<GraphqlError>>> + Send {
        let stream = if args.document.query.contains("requestError") {
            Err(vec![GraphqlError::new("Unknown field \"requestError\" on type \"Subscription\".")])
        } else {
            Ok(match self.streams.lock().unwrap().pop_front() {
                Some(receiver) => futures_util::stream::unfold(receiver, |mut receiver| async move {
                    receiver.recv().await.map(|item| (item, receiver))
                })
                .boxed(),
                None => futures_util::stream::iter([data(json!({"greetings": "a"})), data(json!({"greetings": "b"}))])
                    .boxed(),
            })
        };

        std::future::ready(stream)
    }
}

/// A session fed through channels instead of a socket.
pub struct TestConnection {
    events: mpsc::UnboundedSender<TransportEvent>,
    outgoing: OutgoingReceiver,
    session: JoinHandle<()>,
}

impl TestConnection {
    pub fn open(engine: Arc<MockEngine>, config: SessionConfig) -> Self {
        Self::open_with_protocol(engine, config, Some(GRAPHQL_TRANSPORT_WS_PROTOCOL))
    }

    pub fn open_with_protocol(engine: Arc<MockEngine>, config: SessionConfig, protocol: Option<&str>) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();
        let (outbound, outgoing) = Outbound::channel(16);

        let events_stream = futures_util::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        });

        let session = tokio::spawn(Session::new(engine, outbound, config).run(events_stream));

        events
            .send(TransportEvent::Open {
                protocol: protocol.map(str::to_owned),
            })
            .unwrap();

        Self {
            events,
            outgoing,
            session,
        }
    }

    pub fn send(&self, message: serde_json::Value) {
        self.send_text(&message.to_string());
    }

    pub fn send_text(&self, text: &str) {
        self.send_frame(graphql_ws::Frame::Text(text.to_owned()));
    }

    pub fn send_frame(&self, frame: graphql_ws::Frame) {
        self.events.send(TransportEvent::Frame(frame)).unwrap();
    }

    pub fn close(&self) {
        self.events
            .send(TransportEvent::Closed {
                code: 1000,
                reason: String::new(),
            })
            .unwrap();
    }

    pub async fn recv(&mut self) -> Outgoing {
        tokio::time::timeout(TIMEOUT, self.outgoing.recv())
            .await
            .expect("timed out waiting for the session")
            .expect("the session is gone")
    }

    pub async fn recv_message(&mut self) -> Message {
        match self.recv().await {
            Outgoing::Message(message) => message,
            Outgoing::Close(frame) => unreachable!("expected a message, got {frame:?}"),
        }
    }

    pub async fn recv_json(&mut self) -> serde_json::Value {
        serde_json::to_value(self.recv_message().await).unwrap()
    }

    pub async fn recv_close(&mut self) -> CloseFrame {
        match self.recv().await {
            Outgoing::Close(frame) => frame,
            Outgoing::Message(message) => unreachable!("expected a close, got {message:?}"),
        }
    }

    /// Round-trips a ping, so everything sent before it has been handled.
    pub async fn sync(&mut self) {
        self.send(json!({"type": "ping"}));
        assert_eq!(self.recv_json().await, json!({"type": "pong"}));
    }

    /// Waits for the session task to end.
    pub async fn finished(self) {
        tokio::time::timeout(TIMEOUT, self.session)
            .await
            .expect("the session didn't end")
            .unwrap();
    }
}
