//! Change feed: committed stock changes fanned out on the event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;
use uuid::Uuid;

use stockpool_events::{Event, EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use stockpool_inventory::StockEvent;

pub type StockEnvelope = EventEnvelope<StockEvent>;

/// Publishes `StockEvent`s after the change they describe has been stored.
///
/// Publishing is best-effort. A failed publish is logged and never undoes the
/// committed change; consumers re-read current state when they miss events.
#[derive(Debug)]
pub struct ChangeFeed {
    bus: Arc<InMemoryEventBus<StockEnvelope>>,
    sequence: AtomicU64,
}

impl ChangeFeed {
    pub fn new(bus: Arc<InMemoryEventBus<StockEnvelope>>) -> Self {
        Self {
            bus,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus<StockEnvelope>> {
        self.bus.clone()
    }

    pub fn subscribe(&self) -> Subscription<StockEnvelope> {
        self.bus.subscribe()
    }

    pub fn publish(&self, event: StockEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            event.tenant_id(),
            event.product_id(),
            event.event_type(),
            sequence,
            event.occurred_at(),
            event,
        );
        if let Err(err) = self.bus.publish(envelope) {
            warn!(error = ?err, sequence, "failed to publish stock event");
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryEventBus::new()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stockpool_core::{ProductId, TenantId};

    use super::*;

    #[test]
    fn envelopes_carry_tenant_product_and_increasing_sequence() {
        let feed = ChangeFeed::default();
        let sub = feed.subscribe();
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();

        for _ in 0..2 {
            feed.publish(StockEvent::ProductDeactivated {
                tenant_id,
                product_id,
                occurred_at: Utc::now(),
            });
        }

        let first = sub.try_recv().unwrap();
        let second = sub.try_recv().unwrap();
        assert_eq!(first.tenant_id(), tenant_id);
        assert_eq!(first.product_id(), product_id);
        assert_eq!(first.event_type(), "inventory.product.deactivated");
        assert!(second.sequence_number() > first.sequence_number());
    }
}
