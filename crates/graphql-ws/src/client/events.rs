use std::collections::HashMap;

use crate::{
    protocol::ExecutionResult,
    pubsub::{PubSub, SubscriberId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Open,
    Next,
    Close,
}

/// What the client surfaces to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Open,
    Next { id: String, payload: ExecutionResult },
    Close { code: u16, reason: String },
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Open => EventKind::Open,
            ClientEvent::Next { .. } => EventKind::Next,
            ClientEvent::Close { .. } => EventKind::Close,
        }
    }
}

/// Identifies a listener registered with [`EventTable::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    kind: EventKind,
    subscriber: SubscriberId,
}

/// Listeners keyed by event kind. Listeners of one kind run in registration order.
#[derive(Debug, Default)]
pub struct EventTable {
    listeners: HashMap<EventKind, PubSub<ClientEvent>>,
}

impl EventTable {
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&ClientEvent) + Send + 'static) -> ListenerId {
        let subscriber = self.listeners.entry(kind).or_default().subscribe(listener);

        ListenerId { kind, subscriber }
    }

    pub fn off(&mut self, listener: ListenerId) -> bool {
        self.listeners
            .get_mut(&listener.kind)
            .is_some_and(|pubsub| pubsub.unsubscribe(listener.subscriber))
    }

    pub fn emit(&mut self, event: &ClientEvent) {
        if let Some(pubsub) = self.listeners.get_mut(&event.kind()) {
            pubsub.publish(event);
        }
    }
}
