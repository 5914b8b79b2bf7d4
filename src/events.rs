use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Domain events emitted by the seat inventory core.
///
/// Distribution to clients (websockets, push, ...) is a consumer concern;
/// the core only publishes state changes on an in-process bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    SeatStateChanged {
        showtime_id: Uuid,
        available_seats: u32,
        blocked_seats: u32,
        booked_seats: u32,
    },
}

/// Broadcast bus carried in `AppState`. Lagging or absent subscribers never
/// block the booking flow.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: DomainEvent) {
        // send() only fails when there are no subscribers; that is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
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
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();
        bus.publish(DomainEvent::SeatStateChanged {
            showtime_id: id,
            available_seats: 10,
            blocked_seats: 2,
            booked_seats: 3,
        });
        match rx.recv().await.unwrap() {
            DomainEvent::SeatStateChanged { showtime_id, available_seats, .. } => {
                assert_eq!(showtime_id, id);
                assert_eq!(available_seats, 10);
            }
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new(8);
        bus.publish(DomainEvent::SeatStateChanged {
            showtime_id: Uuid::new_v4(),
            available_seats: 0,
            blocked_seats: 0,
            booked_seats: 0,
        });
    }
}
