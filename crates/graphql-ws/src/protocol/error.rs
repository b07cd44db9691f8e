use super::MessageType;

/// The inbound frame could not be decoded as JSON text.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid data type. Only text frames are parsable messages.")]
    NotText,
    #[error("Invalid JSON. {0}")]
    Syntax(#[source] serde_json::Error),
}

/// Well-formed JSON that does not describe a protocol message.
///
/// Rules are checked in a fixed order and the first failing one wins. A JSON
/// value that isn't an object is the first rule, so it lands here rather than
/// in [`ParseError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid data type. Must be plain object.")]
    NotAnObject,
    #[error(r#"Missing field. Must include "type" field."#)]
    MissingType,
    #[error(r#"Invalid field. "type" field of value must be string."#)]
    NonStringType,
    #[error(r#"Invalid field. "type" field of "{0}" is not supported."#)]
    UnsupportedType(String),
    #[error(r#"Missing field. "{0}""#)]
    MissingField(&'static str),
    #[error(r#"Invalid field. "{field}" must be {expected}."#)]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error(r#"Invalid field. "id" is not allowed in "{0}" messages."#)]
    UnexpectedId(MessageType),
    #[error(r#"Invalid field. "payload" is not allowed in "{0}" messages."#)]
    UnexpectedPayload(MessageType),
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, expected: &'static str) -> Self {
        ValidationError::InvalidField { field, expected }
    }
}

/// Anything that prevents an inbound frame from becoming a [`Message`](super::Message).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DecodeError {
    /// The reason carried by the close frame when a peer sends this.
    pub fn close_reason(&self) -> String {
        format!("Invalid message received. {self}")
    }
}
