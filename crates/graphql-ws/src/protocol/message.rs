//! Message definitions for the [GraphQLOverWebsocket protocol][1]
//!
//! [1]: https://github.com/graphql/graphql-over-http/blob/main/rfcs/GraphQLOverWebSocket.md

use serde::de::Error as _;

use super::{validate, DecodeError, GraphqlError, ParseError};

/// A free-form JSON object, as carried by payloads, variables and extensions.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// The `type` discriminant of every protocol message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    ConnectionInit,
    ConnectionAck,
    Ping,
    Pong,
    Subscribe,
    Next,
    Error,
    Complete,
}

impl MessageType {
    /// Whether messages of this type are scoped to a single operation and so carry an `id`.
    pub fn has_id(self) -> bool {
        matches!(
            self,
            MessageType::Subscribe | MessageType::Next | MessageType::Error | MessageType::Complete
        )
    }
}

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    ConnectionInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<JsonMap>,
    },
    ConnectionAck {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<JsonMap>,
    },
    Ping {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<JsonMap>,
    },
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<JsonMap>,
    },
    Subscribe {
        id: String,
        payload: OperationRequest,
    },
    Next {
        id: String,
        payload: ExecutionResult,
    },
    Error {
        id: String,
        payload: Vec<GraphqlError>,
    },
    Complete {
        id: String,
    },
}

impl Message {
    /// Decodes a raw text frame and validates it into a message.
    pub fn parse(raw: impl AsRef<[u8]>) -> Result<Self, DecodeError> {
        let value = serde_json::from_slice::<serde_json::Value>(raw.as_ref()).map_err(ParseError::Syntax)?;

        Ok(validate::validate(value)?)
    }

    /// Deterministic JSON encoding of the message.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ConnectionInit { .. } => MessageType::ConnectionInit,
            Message::ConnectionAck { .. } => MessageType::ConnectionAck,
            Message::Ping { .. } => MessageType::Ping,
            Message::Pong { .. } => MessageType::Pong,
            Message::Subscribe { .. } => MessageType::Subscribe,
            Message::Next { .. } => MessageType::Next,
            Message::Error { .. } => MessageType::Error,
            Message::Complete { .. } => MessageType::Complete,
        }
    }

    /// The correlation id, for operation-scoped messages.
    pub fn id(&self) -> Option<&str> {
        match self {
            Message::Subscribe { id, .. }
            | Message::Next { id, .. }
            | Message::Error { id, .. }
            | Message::Complete { id } => Some(id),
            _ => None,
        }
    }
}

impl<'de> serde::Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        validate::validate(value).map_err(D::Error::custom)
    }
}

/// GraphQL over HTTP request parameters, normalized so every optional field is present.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    /// A document containing GraphQL operations and fragments to execute.
    pub query: String,
    /// Values for any variables defined by the operation.
    #[serde(default)]
    pub variables: Option<JsonMap>,
    /// The name of the operation in the document to execute.
    #[serde(default)]
    pub operation_name: Option<String>,
    /// Reserved for implementors to extend the protocol however they see fit.
    #[serde(default)]
    pub extensions: Option<JsonMap>,
}

impl OperationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
            extensions: None,
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: JsonMap) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: JsonMap) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

/// The result of executing an operation, in the GraphQL response format.
///
/// `data` distinguishes a missing field (`None`) from an explicit `null`
/// (`Some(None)`). A result without any `data` is a request error: the
/// operation never started executing.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub data: Option<Option<JsonMap>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonMap>,
}

impl ExecutionResult {
    pub fn from_data(data: JsonMap) -> Self {
        Self {
            data: Some(Some(data)),
            ..Default::default()
        }
    }

    pub fn request_error(errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        Self {
            data: None,
            errors: errors.into_iter().collect(),
            extensions: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: GraphqlError) -> Self {
        self.errors.push(error);
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: JsonMap) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn is_request_error(&self) -> bool {
        self.data.is_none()
    }
}
