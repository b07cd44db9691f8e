//! The graphql-transport-ws wire format: messages, their validation and close codes.

mod close_code;
mod error;
mod graphql_error;
mod message;
mod validate;

pub use close_code::{CloseCode, NORMAL_CLOSURE};
pub use error::{DecodeError, ParseError, ValidationError};
pub use graphql_error::{GraphqlError, Location, PathSegment};
pub use message::{ExecutionResult, JsonMap, Message, MessageType, OperationRequest};
pub use validate::{validate, validate_operation_request};

/// The subprotocol token negotiated when the websocket opens.
pub const GRAPHQL_TRANSPORT_WS_PROTOCOL: &str = "graphql-transport-ws";
