use std::collections::VecDeque;

/// Serialized messages waiting for the channel to open.
///
/// The queue is drained once, when the channel opens. Anything pushed
/// afterwards is a bug in the caller and is handed straight back.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<String>,
    drained: bool,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `payload`, or returns it if the queue was already drained.
    pub fn push(&mut self, payload: String) -> Result<(), String> {
        if self.drained {
            return Err(payload);
        }

        self.pending.push_back(payload);
        Ok(())
    }

    /// Takes every buffered payload in arrival order. Later calls yield nothing.
    pub fn drain(&mut self) -> impl Iterator<Item = String> {
        self.drained = true;
        std::mem::take(&mut self.pending).into_iter()
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
