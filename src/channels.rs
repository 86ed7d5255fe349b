//! Versioned state cells.
//!
//! Each channel pairs its payload with a monotonically increasing version
//! counter. The executor bumps a channel's version exactly once per applied
//! patch that touched it, so downstream consumers (checkpoints, event
//! listeners) can tell a real update apart from an untouched step.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Common behavior for versioned state cells.
pub trait Channel {
    /// The value type exposed in read-only snapshots.
    type Snapshot;

    /// Cheap copy of the current payload for snapshotting.
    fn snapshot(&self) -> Self::Snapshot;

    /// Current version counter.
    fn version(&self) -> u32;

    fn set_version(&mut self, version: u32);

    fn bump_version(&mut self) {
        self.set_version(self.version() + 1);
    }
}

/// Append-only conversation history with a version counter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryChannel {
    items: Vec<Message>,
    version: u32,
}

impl HistoryChannel {
    #[must_use]
    pub fn new(items: Vec<Message>, version: u32) -> Self {
        Self { items, version }
    }

    #[must_use]
    pub fn get(&self) -> &Vec<Message> {
        &self.items
    }

    pub fn get_mut(&mut self) -> &mut Vec<Message> {
        &mut self.items
    }

    pub fn push(&mut self, message: Message) {
        self.items.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.items.extend(messages);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Channel for HistoryChannel {
    type Snapshot = Vec<Message>;

    fn snapshot(&self) -> Vec<Message> {
        self.items.clone()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}
