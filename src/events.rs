//! Table events and user notices
//!
//! The controller reports every outcome on an [`EventBus`]. The bus is a
//! plain value: whoever builds a controller decides which bus it publishes
//! on and hands clones to the views that want to listen.
//!
//! # Example
//!
//! ```rust
//! use lynxky::{EventBus, Notice, TableEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(TableEvent::Notice(Notice::success("table.row.added", "Row added")));
//!
//! match rx.recv().await.unwrap() {
//!     TableEvent::Notice(n) => assert_eq!(n.key, "table.row.added"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! # }
//! ```

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::model::{ColumnId, RowId};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A translated message meant for the person using the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Translation key the message was produced from.
    pub key: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn success(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, key, message)
    }

    pub fn warning(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, key, message)
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, key, message)
    }
}

/// Something that happened to a table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    Loaded {
        table: String,
        columns: usize,
        rows: usize,
    },
    RowAdded(RowId),
    RowDeleted(RowId),
    CellUpdated {
        row: RowId,
        column: ColumnId,
    },
    ColumnsChanged,
    Sorted {
        column: Option<ColumnId>,
    },
    Notice(Notice),
}

/// Publish/subscribe channel for [`TableEvent`]s.
///
/// Slow subscribers lag and lose the oldest events instead of blocking the
/// publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TableEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.sender.subscribe()
    }

    /// Publishes to current subscribers. With none, the event is dropped.
    pub fn publish(&self, event: TableEvent) {
        if self.sender.send(event).is_err() {
            trace!("No subscribers for table event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(TableEvent::RowAdded(RowId::new(7)));

        assert_eq!(a.recv().await.unwrap(), TableEvent::RowAdded(RowId::new(7)));
        assert_eq!(b.recv().await.unwrap(), TableEvent::RowAdded(RowId::new(7)));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(TableEvent::ColumnsChanged);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_notice_serializes_level() {
        let notice = Notice::error("table.load.failed", "Could not load");
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["key"], "table.load.failed");
    }
}
