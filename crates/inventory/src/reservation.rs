//! Reservations: exclusive holds on bulk capacity or specific units for a window.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockpool_core::{ActorId, Entity, JobId, ProductId, ReservationId, TenantId, UnitId};

use crate::error::{InventoryError, InventoryResult};
use crate::ledger::MAX_QUANTITY;
use crate::window::DateWindow;

/// What a reservation holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ReservationTarget {
    Bulk { quantity: i64 },
    Specific { unit_ids: Vec<UnitId> },
}

impl ReservationTarget {
    pub fn mode(&self) -> &'static str {
        match self {
            ReservationTarget::Bulk { .. } => "bulk",
            ReservationTarget::Specific { .. } => "specific",
        }
    }

    /// Quantity requested: the bulk count, or the number of units.
    pub fn quantity(&self) -> i64 {
        match self {
            ReservationTarget::Bulk { quantity } => *quantity,
            ReservationTarget::Specific { unit_ids } => unit_ids.len() as i64,
        }
    }

    pub fn validate(&self) -> InventoryResult<()> {
        match self {
            ReservationTarget::Bulk { quantity } => {
                if *quantity <= 0 || *quantity > MAX_QUANTITY {
                    return Err(InventoryError::InvalidQuantity(*quantity));
                }
            }
            ReservationTarget::Specific { unit_ids } => {
                if unit_ids.is_empty() {
                    return Err(InventoryError::InvalidQuantity(0));
                }
                let mut seen = HashSet::with_capacity(unit_ids.len());
                for id in unit_ids {
                    if !seen.insert(*id) {
                        return Err(InventoryError::InvalidRequest(format!(
                            "unit {id} is listed more than once"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Active,
    Released,
}

/// A committed hold, owned by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub job_id: JobId,
    pub target: ReservationTarget,
    pub window: DateWindow,
    pub state: ReservationState,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl Entity for Reservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.state == ReservationState::Active
    }

    /// Bulk units held (0 for specific-unit reservations).
    pub fn bulk_quantity(&self) -> i64 {
        match &self.target {
            ReservationTarget::Bulk { quantity } => *quantity,
            ReservationTarget::Specific { .. } => 0,
        }
    }

    pub fn unit_ids(&self) -> &[UnitId] {
        match &self.target {
            ReservationTarget::Bulk { .. } => &[],
            ReservationTarget::Specific { unit_ids } => unit_ids,
        }
    }

    pub fn holds_unit(&self, unit_id: UnitId) -> bool {
        self.unit_ids().contains(&unit_id)
    }

    /// Active and overlapping `window`: this reservation makes stock unavailable there.
    pub fn blocks(&self, window: &DateWindow) -> bool {
        self.is_active() && self.window.overlaps(window)
    }

    /// Active and its window contains `day`.
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.is_active() && self.window.contains_day(day)
    }

    /// Active and not yet over as of `day` (current or future).
    pub fn is_pending_on(&self, day: NaiveDate) -> bool {
        self.is_active() && self.window.reaches(day)
    }

    /// Returns whether the state changed (releasing twice is a no-op).
    pub fn release(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = ReservationState::Released;
        self.released_at = Some(at);
        true
    }
}

/// A client-built allocation request, validated and committed server-side in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub product_id: ProductId,
    pub window: DateWindow,
    pub job_id: JobId,
    pub target: ReservationTarget,
}

impl AllocationRequest {
    pub fn bulk(product_id: ProductId, quantity: i64, window: DateWindow, job_id: JobId) -> Self {
        Self {
            product_id,
            window,
            job_id,
            target: ReservationTarget::Bulk { quantity },
        }
    }

    pub fn specific(
        product_id: ProductId,
        unit_ids: Vec<UnitId>, window: DateWindow, job_id: JobId,
    ) -> Self {
        Self {
            product_id,
            window,
            job_id,
            target: ReservationTarget::Specific { unit_ids },
        }
    }

    pub fn validate(&self) -> InventoryResult<()> {
        self.target.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn reservation(target: ReservationTarget, window: DateWindow) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            job_id: JobId::new(),
            target,
            window,
            state: ReservationState::Active,
            created_by: ActorId::new(),
            created_at: Utc::now(),
            released_at: None,
        }
    }

    #[test]
    fn bulk_target_requires_positive_quantity() {
        assert_eq!(
            ReservationTarget::Bulk { quantity: 0 }.validate(),
            Err(InventoryError::InvalidQuantity(0))
        );
        assert_eq!(
            ReservationTarget::Bulk { quantity: -4 }.validate(),
            Err(InventoryError::InvalidQuantity(-4))
        );
        assert!(ReservationTarget::Bulk { quantity: 1 }.validate().is_ok());
        assert_eq!(
            ReservationTarget::Bulk { quantity: i64::MAX }.validate(),
            Err(InventoryError::InvalidQuantity(i64::MAX))
        );
    }

    #[test]
    fn specific_target_rejects_empty_and_duplicate_units() {
        assert!(ReservationTarget::Specific { unit_ids: vec![] }.validate().is_err());
        let u = UnitId::new();
        assert!(matches!(
            ReservationTarget::Specific { unit_ids: vec![u, u] }.validate(),
            Err(InventoryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn released_reservations_block_nothing() {
        let window = DateWindow::new(d("2024-01-10"), Some(d("2024-01-15"))).unwrap();
        let mut r = reservation(ReservationTarget::Bulk { quantity: 3 }, window);
        let mid = DateWindow::single_day(d("2024-01-12"));
        assert!(r.blocks(&mid));
        assert!(r.release(Utc::now()));
        assert!(!r.release(Utc::now()));
        assert!(!r.blocks(&mid));
        assert!(!r.covers(d("2024-01-12")));
    }

    #[test]
    fn pending_includes_current_and_future_windows() {
        let window = DateWindow::new(d("2024-01-10"), Some(d("2024-01-15"))).unwrap();
        let r = reservation(ReservationTarget::Bulk { quantity: 1 }, window);
        assert!(r.is_pending_on(d("2024-01-01")));
        assert!(r.is_pending_on(d("2024-01-15")));
        assert!(!r.is_pending_on(d("2024-01-16")));
    }

    #[test]
    fn target_reports_mode_and_quantity() {
        let target = ReservationTarget::Bulk { quantity: 2 };
        assert_eq!(target.mode(), "bulk");
        assert_eq!(target.quantity(), 2);
        let specific = ReservationTarget::Specific { unit_ids: vec![UnitId::new(), UnitId::new()] };
        assert_eq!(specific.mode(), "specific");
        assert_eq!(specific.quantity(), 2);
    }
}
