//! Allocation Service: the only writer of reservation state.
//!
//! Every commit re-reads the product's state and re-checks availability inside
//! the product lock, so two requests racing for the same slice cannot both win.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use stockpool_core::{ActorId, JobId, ProductId, ReservationId, TenantId, UnitId};
use stockpool_inventory::{
    AllocationRequest, DateWindow, InventoryError, InventoryResult, Reservation, ReservationState,
    ReservationTarget, StockEvent,
};

use crate::engine::aggregator::TotalsCache;
use crate::engine::availability::{AvailabilityCalculator, ProductState};
use crate::engine::registry::UnitRegistry;
use crate::feed::ChangeFeed;
use crate::locks::{KeyedLocks, ProductKey};
use crate::store::TenantStore;

pub struct AllocationService {
    calculator: Arc<AvailabilityCalculator>,
    registry: Arc<UnitRegistry>,
    reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
    locks: Arc<KeyedLocks<ProductKey>>,
    cache: Arc<TotalsCache>,
    feed: Arc<ChangeFeed>,
}

impl AllocationService {
    pub fn new(
        calculator: Arc<AvailabilityCalculator>,
        registry: Arc<UnitRegistry>,
        reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
        locks: Arc<KeyedLocks<ProductKey>>,
        cache: Arc<TotalsCache>,
        feed: Arc<ChangeFeed>,
    ) -> Self {
        Self {
            calculator,
            registry,
            reservations,
            locks,
            cache,
            feed,
        }
    }

    /// Commit a validated allocation request as one atomic step.
    pub fn reserve(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        request: AllocationRequest,
        at: DateTime<Utc>,
    ) -> InventoryResult<Reservation> {
        request.validate()?;
        match request.target {
            ReservationTarget::Bulk { quantity } => self.reserve_bulk(
                tenant_id,
                actor,
                request.product_id,
                quantity,
                request.window,
                request.job_id,
                at,
            ),
            ReservationTarget::Specific { unit_ids } => self.reserve_units(
                tenant_id,
                actor,
                Some(request.product_id),
                unit_ids,
                request.window,
                request.job_id,
                at,
            ),
        }
    }

    /// Hold `quantity` of the bulk pool for `window`. Fails with
    /// `InsufficientStock` when `quantity > bulk_free` at commit time.
    #[allow(clippy::too_many_arguments)]
    pub fn reserve_bulk(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        quantity: i64,
        window: DateWindow,
        job_id: JobId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Reservation> {
        let target = ReservationTarget::Bulk { quantity };
        target.validate()?;

        self.locks.with(&(tenant_id, product_id), || {
            let state = self.calculator.load(tenant_id, product_id)?;
            state.product.ensure_active()?;

            let availability = state.availability(&window);
            if state.product.track_inventory && quantity > availability.bulk_free {
                warn!(
                    %tenant_id,
                    %product_id,
                    %window,
                    quantity,
                    bulk_free = availability.bulk_free,
                    "bulk reservation rejected"
                );
                return Err(InventoryError::InsufficientStock {
                    requested: quantity,
                    available: availability.bulk_free.max(0),
                });
            }

            self.commit(tenant_id, actor, product_id, job_id, target, window, at)
        })
    }

    /// Hold exactly `unit_ids` for `window`, all or nothing.
    ///
    /// The product is resolved from the units; units of different products are
    /// rejected with `MixedProducts`.
    pub fn reserve_specific(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        unit_ids: Vec<UnitId>,
        window: DateWindow,
        job_id: JobId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Reservation> {
        self.reserve_units(tenant_id, actor, None, unit_ids, window, job_id, at)
    }

    #[allow(clippy::too_many_arguments)]
    fn reserve_units(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        expected_product: Option<ProductId>,
        unit_ids: Vec<UnitId>,
        window: DateWindow,
        job_id: JobId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Reservation> {
        let target = ReservationTarget::Specific {
            unit_ids: unit_ids.clone(),
        };
        target.validate()?;
        let first = unit_ids.first().copied().ok_or(InventoryError::InvalidQuantity(0))?;
        let product_id = self.registry.get(tenant_id, first)?.product_id;
        if expected_product.is_some_and(|expected| expected != product_id) {
            return Err(InventoryError::MixedProducts);
        }

        self.locks.with(&(tenant_id, product_id), || {
            let state = self.calculator.load(tenant_id, product_id)?;
            state.product.ensure_active()?;
            self.check_units_belong(tenant_id, &state, &unit_ids)?;

            let availability = state.availability(&window);
            if let Some(taken) = unit_ids.iter().find(|id| !availability.is_unit_free(**id)) {
                warn!(
                    %tenant_id,
                    %product_id,
                    %window,
                    unit_id = %taken,
                    "specific reservation rejected"
                );
                return Err(InventoryError::UnitUnavailable(*taken));
            }

            let reservation =
                self.commit(tenant_id, actor, product_id, job_id, target, window, at)?;
            self.sync_flags(tenant_id, &unit_ids, at.date_naive(), at)?;
            Ok(reservation)
        })
    }

    /// Release a reservation. Idempotent: unknown or already released ids
    /// succeed and return `false`.
    pub fn release(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
        at: DateTime<Utc>,
    ) -> InventoryResult<bool> {
        let Some(found) = self.reservations.get(tenant_id, &reservation_id)? else {
            debug!(%tenant_id, %reservation_id, "release of unknown reservation ignored");
            return Ok(false);
        };
        let product_id = found.product_id;

        self.locks.with(&(tenant_id, product_id), || {
            let Some(mut reservation) = self.reservations.get(tenant_id, &reservation_id)? else {
                return Ok(false);
            };
            if !reservation.release(at) {
                debug!(%tenant_id, %reservation_id, "reservation already released");
                return Ok(false);
            }
            self.reservations.upsert(tenant_id, reservation_id, reservation.clone())?;
            self.cache.invalidate(tenant_id, product_id);
            self.sync_flags(tenant_id, reservation.unit_ids(), at.date_naive(), at)?;

            info!(
                %tenant_id,
                %product_id,
                %reservation_id,
                job_id = %reservation.job_id,
                "reservation released"
            );
            self.feed.publish(StockEvent::ReservationReleased {
                tenant_id,
                product_id,
                reservation_id,
                job_id: reservation.job_id,
                occurred_at: at,
            });
            Ok(true)
        })
    }

    /// Release every active reservation of a job (job cancelled or completed).
    pub fn release_job(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Vec<ReservationId>> {
        let mut released = Vec::new();
        for reservation in self.list_for_job(tenant_id, job_id)? {
            if reservation.is_active() && self.release(tenant_id, reservation.id, at)? {
                released.push(reservation.id);
            }
        }
        Ok(released)
    }

    /// Move an active reservation to `window` (job moved, shortened or extended).
    ///
    /// Availability is re-checked for the new window ignoring the reservation
    /// itself; on failure the old window stays in force.
    pub fn reschedule(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
        window: DateWindow,
        at: DateTime<Utc>,
    ) -> InventoryResult<Reservation> {
        let product_id = self.get(tenant_id, reservation_id)?.product_id;

        self.locks.with(&(tenant_id, product_id), || {
            let mut reservation = self.get(tenant_id, reservation_id)?;
            if !reservation.is_active() {
                return Err(InventoryError::InvalidRequest(format!(
                    "reservation {reservation_id} is released"
                )));
            }
            let state = self.calculator.load(tenant_id, product_id)?;
            let availability = state.availability_excluding(reservation_id, &window);

            match &reservation.target {
                ReservationTarget::Bulk { quantity } => {
                    if state.product.track_inventory && *quantity > availability.bulk_free {
                        warn!(
                            %tenant_id,
                            %reservation_id,
                            %window,
                            quantity,
                            "reschedule rejected"
                        );
                        return Err(InventoryError::InsufficientStock {
                            requested: *quantity,
                            available: availability.bulk_free.max(0),
                        });
                    }
                }
                ReservationTarget::Specific { unit_ids } => {
                    let taken = unit_ids.iter().find(|id| !availability.is_unit_free(**id));
                    if let Some(taken) = taken {
                        warn!(
                            %tenant_id,
                            %reservation_id,
                            %window,
                            unit_id = %taken,
                            "reschedule rejected"
                        );
                        return Err(InventoryError::UnitUnavailable(*taken));
                    }
                }
            }

            reservation.window = window;
            self.reservations.upsert(tenant_id, reservation_id, reservation.clone())?;
            self.cache.invalidate(tenant_id, product_id);
            self.sync_flags(tenant_id, reservation.unit_ids(), at.date_naive(), at)?;

            info!(%tenant_id, %product_id, %reservation_id, %window, "reservation rescheduled");
            self.feed.publish(StockEvent::ReservationRescheduled {
                tenant_id,
                product_id,
                reservation_id,
                window,
                occurred_at: at,
            });
            Ok(reservation)
        })
    }

    pub fn get(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> InventoryResult<Reservation> {
        self.reservations
            .get(tenant_id, &reservation_id)?
            .ok_or(InventoryError::ReservationNotFound(reservation_id))
    }

    pub fn list_for_job(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
    ) -> InventoryResult<Vec<Reservation>> {
        let mut found: Vec<Reservation> = self
            .reservations
            .list(tenant_id)?
            .into_iter()
            .filter(|r| r.job_id == job_id)
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    pub fn list_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        include_released: bool,
    ) -> InventoryResult<Vec<Reservation>> {
        let mut found: Vec<Reservation> = self
            .reservations
            .list(tenant_id)?
            .into_iter()
            .filter(|r| r.product_id == product_id && (include_released || r.is_active()))
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    /// Align every unit's `available`/`reserved` flag with the reservations
    /// covering `as_of`. Returns the number of units whose flag changed.
    pub fn refresh_unit_statuses(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        at: DateTime<Utc>,
    ) -> InventoryResult<usize> {
        let products: HashSet<ProductId> = self
            .reservations
            .list(tenant_id)?
            .iter()
            .map(|r| r.product_id)
            .collect();

        let mut changed = 0;
        for product_id in products {
            changed += self.locks.with(&(tenant_id, product_id), || {
                let state = self.calculator.load(tenant_id, product_id)?;
                let ids: Vec<UnitId> = state.units.iter().map(|u| u.id).collect();
                self.sync_flags(tenant_id, &ids, as_of, at)
            })?;
        }
        if changed > 0 {
            info!(%tenant_id, %as_of, changed, "unit statuses refreshed");
        }
        Ok(changed)
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        job_id: JobId,
        target: ReservationTarget,
        window: DateWindow,
        at: DateTime<Utc>,
    ) -> InventoryResult<Reservation> {
        let reservation = Reservation {
            id: ReservationId::new(),
            tenant_id,
            product_id,
            job_id,
            target,
            window,
            state: ReservationState::Active,
            created_by: actor,
            created_at: at,
            released_at: None,
        };
        self.reservations.upsert(tenant_id, reservation.id, reservation.clone())?;
        self.cache.invalidate(tenant_id, product_id);

        info!(
            %tenant_id,
            %product_id,
            reservation_id = %reservation.id,
            %job_id,
            %window,
            mode = reservation.target.mode(),
            quantity = reservation.target.quantity(),
            "reservation committed"
        );
        self.feed.publish(StockEvent::ReservationCommitted {
            tenant_id,
            product_id,
            reservation_id: reservation.id,
            job_id,
            window,
            target: reservation.target.clone(),
            occurred_at: at,
        });
        Ok(reservation)
    }

    fn check_units_belong(
        &self,
        tenant_id: TenantId,
        state: &ProductState,
        unit_ids: &[UnitId],
    ) -> InventoryResult<()> {
        for unit_id in unit_ids {
            if state.unit(*unit_id).is_none() {
                // Distinguish "exists elsewhere" from "does not exist".
                self.registry.get(tenant_id, *unit_id)?;
                return Err(InventoryError::MixedProducts);
            }
        }
        Ok(())
    }

    /// Flip `available`/`reserved` for `unit_ids` to match reservations covering `day`.
    /// Caller holds the product lock.
    fn sync_flags(
        &self,
        tenant_id: TenantId,
        unit_ids: &[UnitId],
        day: NaiveDate,
        at: DateTime<Utc>,
    ) -> InventoryResult<usize> {
        if unit_ids.is_empty() {
            return Ok(0);
        }
        let covering: Vec<Reservation> = self
            .reservations
            .list(tenant_id)?
            .into_iter()
            .filter(|r| r.covers(day))
            .collect();

        let mut changed = 0;
        for unit_id in unit_ids {
            let Ok(mut unit) = self.registry.get(tenant_id, *unit_id) else {
                continue;
            };
            let held = covering.iter().any(|r| r.holds_unit(*unit_id));
            let from = unit.status;
            if unit.sync_reserved_flag(held, at) {
                self.registry.save(&unit)?;
                changed += 1;
                self.feed.publish(StockEvent::UnitStatusChanged {
                    tenant_id,
                    product_id: unit.product_id,
                    unit_id: *unit_id,
                    from,
                    to: unit.status,
                    occurred_at: at,
                });
            }
        }
        Ok(changed)
    }
}
