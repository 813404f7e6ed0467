use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub row: Value,
}

/// Per-table change feed. Mutations made through this client publish here;
/// an embedder wiring a server-push transport feeds the same hub. Delivery
/// guarantees are those of the broadcast channel: no buffering beyond its
/// capacity, no ordering guarantee across tables.
#[derive(Default)]
pub struct ChangeHub {
    senders: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, table: &str) -> broadcast::Sender<ChangeEvent> {
        self.senders
            .lock()
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    pub fn publish(&self, event: ChangeEvent) {
        // A send error just means nobody is subscribed.
        let _ = self.sender(&event.table).send(event);
    }

    /// Subscribe to a table's change feed, optionally narrowed to rows where
    /// `column == value`. Dropping the subscription unsubscribes.
    pub fn subscribe(&self, table: &str, filter: Option<(String, Value)>) -> Subscription {
        Subscription {
            receiver: self.sender(table).subscribe(),
            filter,
        }
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: Option<(String, Value)>,
}

impl Subscription {
    /// Next matching event; `None` once the hub is gone. Missed events due
    /// to channel lag are skipped, not replayed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    let matches = match &self.filter {
                        Some((column, value)) => event.row.get(column) == Some(value),
                        None => true,
                    };
                    if matches {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
