//! Builders for the messages this crate sends. Inputs are trusted, so nothing here validates.

use crate::protocol::{ExecutionResult, GraphqlError, JsonMap, Message, OperationRequest};

pub fn connection_init(payload: Option<JsonMap>) -> Message {
    Message::ConnectionInit { payload }
}

pub fn connection_ack() -> Message {
    Message::ConnectionAck { payload: None }
}

pub fn ping() -> Message {
    Message::Ping { payload: None }
}

pub fn pong() -> Message {
    Message::Pong { payload: None }
}

pub fn subscribe(id: &str, request: OperationRequest) -> Message {
    Message::Subscribe {
        id: id.to_owned(),
        payload: request,
    }
}

pub fn next(id: &str, result: ExecutionResult) -> Message {
    Message::Next {
        id: id.to_owned(),
        payload: result,
    }
}

/// An `error` message must carry at least one error, so an empty list is
/// replaced by a generic one.
pub fn error(id: &str, mut errors: Vec<GraphqlError>) -> Message {
    if errors.is_empty() {
        errors.push(GraphqlError::internal_server_error());
    }

    Message::Error {
        id: id.to_owned(),
        payload: errors,
    }
}

pub fn complete(id: &str) -> Message {
    Message::Complete { id: id.to_owned() }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_wire_messages() {
        assert_eq!(pong().to_json().unwrap(), r#"{"type":"pong"}"#);
        assert_eq!(connection_ack().to_json().unwrap(), r#"{"type":"connection_ack"}"#);
        assert_eq!(complete("1").to_json().unwrap(), r#"{"type":"complete","id":"1"}"#);
        assert_eq!(
            serde_json::to_value(error("1", vec![GraphqlError::unidentified_operation()])).unwrap(),
            json!({"type": "error", "id": "1", "payload": [{"message": "Unable to identify operation"}]})
        );
    }

    #[test]
    fn error_is_never_empty() {
        let Message::Error { payload, .. } = error("1", Vec::new()) else {
            unreachable!()
        };

        assert_eq!(payload, vec![GraphqlError::internal_server_error()]);
    }
}
