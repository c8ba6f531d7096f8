//! Correlation identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one message instance end to end across the network.
///
/// Fresh for every newly built outgoing message; carried verbatim when a
/// message is rebuilt from wire bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Wrap a raw id, e.g. one read from the wire.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// A random id for a new outgoing message.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// The raw id.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ties a local pending operation to its eventual resolution.
///
/// Requests sent on behalf of a task use the task id as their message id, so
/// the responses come back carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw task id.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TaskId> for MessageId {
    fn from(task_id: TaskId) -> Self {
        Self(task_id.0)
    }
}

impl From<MessageId> for TaskId {
    fn from(message_id: MessageId) -> Self {
        Self(message_id.0)
    }
}
