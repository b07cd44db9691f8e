use std::str::FromStr;

use serde_json::Value;

use super::{ExecutionResult, GraphqlError, JsonMap, Message, MessageType, OperationRequest, ValidationError};

/// Turns decoded JSON into a [`Message`], enforcing the per-type field rules.
pub fn validate(value: Value) -> Result<Message, ValidationError> {
    let Value::Object(mut object) = value else {
        return Err(ValidationError::NotAnObject);
    };

    let ty = match object.remove("type") {
        None => return Err(ValidationError::MissingType),
        Some(Value::String(ty)) => ty,
        Some(_) => return Err(ValidationError::NonStringType),
    };

    let ty = MessageType::from_str(&ty).map_err(|_| ValidationError::UnsupportedType(ty))?;

    if !ty.has_id() && object.contains_key("id") {
        return Err(ValidationError::UnexpectedId(ty));
    }

    let message = match ty {
        MessageType::ConnectionInit => Message::ConnectionInit {
            payload: optional_payload(&mut object)?,
        },
        MessageType::ConnectionAck => Message::ConnectionAck {
            payload: optional_payload(&mut object)?,
        },
        MessageType::Ping => Message::Ping {
            payload: optional_payload(&mut object)?,
        },
        MessageType::Pong => Message::Pong {
            payload: optional_payload(&mut object)?,
        },
        MessageType::Subscribe => {
            let id = required_id(&mut object)?;
            let payload = required(&mut object, "payload")?;

            Message::Subscribe {
                id,
                payload: validate_operation_request(payload)?,
            }
        }
        MessageType::Next => {
            let id = required_id(&mut object)?;
            let payload = required(&mut object, "payload")?;

            Message::Next {
                id,
                payload: validate_execution_result(payload)?,
            }
        }
        MessageType::Error => {
            let id = required_id(&mut object)?;
            let payload = required(&mut object, "payload")?;

            Message::Error {
                id,
                payload: validate_errors(payload)?,
            }
        }
        MessageType::Complete => {
            let id = required_id(&mut object)?;

            if object.contains_key("payload") {
                return Err(ValidationError::UnexpectedPayload(ty));
            }

            Message::Complete { id }
        }
    };

    Ok(message)
}

/// Validates the payload of a `subscribe` message and fills in the optional parameters.
pub fn validate_operation_request(value: Value) -> Result<OperationRequest, ValidationError> {
    let Value::Object(mut object) = value else {
        return Err(ValidationError::invalid("payload", "plain object"));
    };

    let query = match required(&mut object, "query")? {
        Value::String(query) if !query.is_empty() => query,
        _ => return Err(ValidationError::invalid("query", "non-empty string")),
    };

    let variables = match object.remove("variables") {
        None | Some(Value::Null) => None,
        Some(Value::Object(variables)) => Some(variables),
        Some(_) => return Err(ValidationError::invalid("variables", "plain object or null")),
    };

    let operation_name = match object.remove("operationName") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name),
        Some(_) => return Err(ValidationError::invalid("operationName", "string or null")),
    };

    let extensions = match object.remove("extensions") {
        None | Some(Value::Null) => None,
        Some(Value::Object(extensions)) => Some(extensions),
        Some(_) => return Err(ValidationError::invalid("extensions", "plain object or null")),
    };

    Ok(OperationRequest {
        query,
        variables,
        operation_name,
        extensions,
    })
}

fn validate_execution_result(value: Value) -> Result<ExecutionResult, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::invalid("payload", "plain object"));
    }

    serde_json::from_value(value).map_err(|_| ValidationError::invalid("payload", "an execution result"))
}

fn validate_errors(value: Value) -> Result<Vec<GraphqlError>, ValidationError> {
    match serde_json::from_value::<Vec<GraphqlError>>(value) {
        Ok(errors) if !errors.is_empty() => Ok(errors),
        _ => Err(ValidationError::invalid("payload", "a non-empty list of errors")),
    }
}

fn optional_payload(object: &mut JsonMap) -> Result<Option<JsonMap>, ValidationError> {
    match object.remove("payload") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(payload)) => Ok(Some(payload)),
        Some(_) => Err(ValidationError::invalid("payload", "plain object")),
    }
}

fn required_id(object: &mut JsonMap) -> Result<String, ValidationError> {
    match required(object, "id")? {
        Value::String(id) => Ok(id),
        _ => Err(ValidationError::invalid("id", "string")),
    }
}

fn required(object: &mut JsonMap, field: &'static str) -> Result<Value, ValidationError> {
    object.remove(field).ok_or(ValidationError::MissingField(field))
}
