use std::time::Duration;

use crate::protocol::{JsonMap, GRAPHQL_TRANSPORT_WS_PROTOCOL};

/// Settings for a server-side session.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// The subprotocol a connection must have negotiated. Defaults to `graphql-transport-ws`.
    pub protocol: String,
    /// Reject `subscribe` before `connection_init` and repeated `connection_init` messages.
    pub strict_lifecycle: bool,
    /// How long to wait for `connection_init` once the socket is open. Only applies
    /// with a strict lifecycle.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub connection_init_wait_timeout: Option<Duration>,
    /// Interval between server pings. No pings are sent if unset.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub keep_alive: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol: GRAPHQL_TRANSPORT_WS_PROTOCOL.to_owned(),
            strict_lifecycle: false,
            connection_init_wait_timeout: None,
            keep_alive: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("The websocket subprotocol must not be empty")]
    EmptyProtocol,
    #[error("The keep alive interval must be longer than zero")]
    ZeroKeepAlive,
    #[error("A connection init timeout requires the strict lifecycle")]
    InitTimeoutWithoutStrictLifecycle,
}

impl SessionConfig {
    /// The strict lifecycle with a 3 second `connection_init` deadline.
    pub fn strict() -> Self {
        Self {
            strict_lifecycle: true,
            connection_init_wait_timeout: Some(Duration::from_secs(3)),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol.is_empty() {
            return Err(ConfigError::EmptyProtocol);
        }

        if self.keep_alive.is_some_and(|interval| interval.is_zero()) {
            return Err(ConfigError::ZeroKeepAlive);
        }

        if self.connection_init_wait_timeout.is_some() && !self.strict_lifecycle {
            return Err(ConfigError::InitTimeoutWithoutStrictLifecycle);
        }

        Ok(())
    }
}

/// Settings for the client-side connector.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// The subprotocol requested when connecting.
    pub protocol: String,
    /// Send `connection_init` as soon as the socket opens, ahead of any queued message.
    pub connection_init: bool,
    /// Payload of the `connection_init` message.
    pub connection_init_payload: Option<JsonMap>,
    /// How long to wait for `connection_ack` before giving up on the connection.
    #[serde(deserialize_with = "duration_str::deserialize_option_duration")]
    pub connection_ack_wait_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: GRAPHQL_TRANSPORT_WS_PROTOCOL.to_owned(),
            connection_init: true,
            connection_init_payload: None,
            connection_ack_wait_timeout: None,
        }
    }
}
