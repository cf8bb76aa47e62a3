use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

#[allow(dead_code)]
const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for LISTEN/NOTIFY per entity (room, reservation, customer).
/// Every applied event is sent on the channel of the entity it touched.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to notifications for an entity. Creates the channel if needed.
    pub fn subscribe(&self, entity_id: Ulid) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(entity_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, entity_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&entity_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a channel (e.g. when the entity is deleted).
    #[allow(dead_code)]
    pub fn remove(&self, entity_id: &Ulid) {
        self.channels.remove(entity_id);
    }
}
