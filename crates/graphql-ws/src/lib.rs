//! The [graphql-transport-ws][1] subprotocol: GraphQL queries, mutations and
//! subscriptions over a single websocket.
//!
//! A server runs one [`Session`] per connection, handing `subscribe` requests to
//! an [`ExecutionEngine`] through the [`Dispatcher`]. A [`Client`] buffers what
//! an application sends until its connection is ready.
//!
//! [1]: https://github.com/enisdenjo/graphql-ws/blob/master/PROTOCOL.md

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod messenger;
pub mod protocol;
pub mod pubsub;
pub mod session;
pub mod transport;

pub use client::{Client, ClientChannel, ClientEvent, EventKind};
pub use config::{ClientConfig, ConfigError, SessionConfig};
pub use dispatcher::Dispatcher;
pub use engine::{ExecutionArgs, ExecutionEngine, OperationKind};
pub use protocol::{
    CloseCode, ExecutionResult, GraphqlError, Message, MessageType, OperationRequest, GRAPHQL_TRANSPORT_WS_PROTOCOL,
};
pub use pubsub::PubSub;
pub use session::Session;
pub use transport::{CloseFrame, Frame, Outbound, Outgoing, TransportEvent};
