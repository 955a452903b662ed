//! Change-feed events published after engine commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpool_core::{ActorId, JobId, LedgerEntryId, ProductId, ReservationId, TenantId, UnitId};
use stockpool_events::Event;

use crate::ledger::LedgerReason;
use crate::reservation::ReservationTarget;
use crate::unit::UnitStatus;
use crate::window::DateWindow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StockEvent {
    ProductCreated {
        tenant_id: TenantId,
        product_id: ProductId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    ProductDeactivated {
        tenant_id: TenantId,
        product_id: ProductId,
        occurred_at: DateTime<Utc>,
    },
    LedgerEntryAppended {
        tenant_id: TenantId,
        product_id: ProductId,
        entry_id: LedgerEntryId,
        sequence: u64,
        delta: i64,
        reason: LedgerReason,
        actor: ActorId,
        occurred_at: DateTime<Utc>,
    },
    UnitsCreated {
        tenant_id: TenantId,
        product_id: ProductId,
        unit_ids: Vec<UnitId>,
        codes: Vec<String>,
        occurred_at: DateTime<Utc>,
    },
    UnitStatusChanged {
        tenant_id: TenantId,
        product_id: ProductId,
        unit_id: UnitId,
        from: UnitStatus,
        to: UnitStatus,
        occurred_at: DateTime<Utc>,
    },
    UnitsRemoved {
        tenant_id: TenantId,
        product_id: ProductId,
        unit_ids: Vec<UnitId>,
        occurred_at: DateTime<Utc>,
    },
    ReservationCommitted {
        tenant_id: TenantId,
        product_id: ProductId,
        reservation_id: ReservationId,
        job_id: JobId,
        window: DateWindow,
        target: ReservationTarget,
        occurred_at: DateTime<Utc>,
    },
    ReservationRescheduled {
        tenant_id: TenantId,
        product_id: ProductId,
        reservation_id: ReservationId,
        window: DateWindow,
        occurred_at: DateTime<Utc>,
    },
    ReservationReleased {
        tenant_id: TenantId,
        product_id: ProductId,
        reservation_id: ReservationId,
        job_id: JobId,
        occurred_at: DateTime<Utc>,
    },
}

impl StockEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            StockEvent::ProductCreated { tenant_id, .. }
            | StockEvent::ProductDeactivated { tenant_id, .. }
            | StockEvent::LedgerEntryAppended { tenant_id, .. }
            | StockEvent::UnitsCreated { tenant_id, .. }
            | StockEvent::UnitStatusChanged { tenant_id, .. }
            | StockEvent::UnitsRemoved { tenant_id, .. }
            | StockEvent::ReservationCommitted { tenant_id, .. }
            | StockEvent::ReservationRescheduled { tenant_id, .. }
            | StockEvent::ReservationReleased { tenant_id, .. } => *tenant_id,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            StockEvent::ProductCreated { product_id, .. }
            | StockEvent::ProductDeactivated { product_id, .. }
            | StockEvent::LedgerEntryAppended { product_id, .. }
            | StockEvent::UnitsCreated { product_id, .. }
            | StockEvent::UnitStatusChanged { product_id, .. }
            | StockEvent::UnitsRemoved { product_id, .. }
            | StockEvent::ReservationCommitted { product_id, .. }
            | StockEvent::ReservationRescheduled { product_id, .. }
            | StockEvent::ReservationReleased { product_id, .. } => *product_id,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::ProductCreated { .. } => "inventory.product.created",
            StockEvent::ProductDeactivated { .. } => "inventory.product.deactivated",
            StockEvent::LedgerEntryAppended { .. } => "inventory.ledger.appended",
            StockEvent::UnitsCreated { .. } => "inventory.units.created",
            StockEvent::UnitStatusChanged { .. } => "inventory.unit.status_changed",
            StockEvent::UnitsRemoved { .. } => "inventory.units.removed",
            StockEvent::ReservationCommitted { .. } => "inventory.reservation.committed",
            StockEvent::ReservationRescheduled { .. } => "inventory.reservation.rescheduled",
            StockEvent::ReservationReleased { .. } => "inventory.reservation.released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::ProductCreated { occurred_at, .. }
            | StockEvent::ProductDeactivated { occurred_at, .. }
            | StockEvent::LedgerEntryAppended { occurred_at, .. }
            | StockEvent::UnitsCreated { occurred_at, .. }
            | StockEvent::UnitStatusChanged { occurred_at, .. }
            | StockEvent::UnitsRemoved { occurred_at, .. }
            | StockEvent::ReservationCommitted { occurred_at, .. }
            | StockEvent::ReservationRescheduled { occurred_at, .. }
            | StockEvent::ReservationReleased { occurred_at, .. } => *occurred_at,
        }
    }
}
