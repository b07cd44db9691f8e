use std::fmt;

/// Handle returned by [`PubSub::subscribe`], used to remove the callback again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// An ordered set of callbacks that all receive every published value.
///
/// Owned by whatever publishes, so subscribers live exactly as long as their publisher.
pub struct PubSub<T> {
    subscribers: Vec<(SubscriberId, Callback<T>)>,
    next_id: u64,
}

impl<T> Default for PubSub<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> fmt::Debug for PubSub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> PubSub<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if nothing was subscribed under `id`.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);
        self.subscribers.len() != before
    }

    /// Calls every subscriber with `value`, in subscription order.
    pub fn publish(&mut self, value: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
