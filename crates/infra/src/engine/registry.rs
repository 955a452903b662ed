//! Unit Registry: individually identified units and their code sequences.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use stockpool_core::{ProductId, ReservationId, TenantId, UnitId};
use stockpool_inventory::{
    InventoryError, InventoryResult, Product, Reservation, StockEvent, Unit, UnitAttributes,
    UnitCode, UnitStatus,
};

use crate::engine::aggregator::TotalsCache;
use crate::feed::ChangeFeed;
use crate::locks::{KeyedLocks, PrefixKey, ProductKey};
use crate::store::{CodeSequenceKey, TenantStore};

pub struct UnitRegistry {
    units: Arc<dyn TenantStore<UnitId, Unit>>,
    products: Arc<dyn TenantStore<ProductId, Product>>,
    reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
    code_sequences: Arc<dyn TenantStore<CodeSequenceKey, UnitCode>>,
    product_locks: Arc<KeyedLocks<ProductKey>>,
    prefix_locks: KeyedLocks<PrefixKey>,
    cache: Arc<TotalsCache>,
    feed: Arc<ChangeFeed>,
    code_width: usize,
}

impl UnitRegistry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        units: Arc<dyn TenantStore<UnitId, Unit>>,
        products: Arc<dyn TenantStore<ProductId, Product>>,
        reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
        code_sequences: Arc<dyn TenantStore<CodeSequenceKey, UnitCode>>,
        product_locks: Arc<KeyedLocks<ProductKey>>,
        cache: Arc<TotalsCache>,
        feed: Arc<ChangeFeed>,
        code_width: usize,
    ) -> Self {
        Self {
            units,
            products,
            reservations,
            code_sequences,
            product_locks,
            prefix_locks: KeyedLocks::new(),
            cache,
            feed,
            code_width,
        }
    }

    /// Create `count` units with sequential codes under `prefix`.
    ///
    /// Serialized per `(product, prefix)`: the next code continues from the last
    /// one issued (even if that unit was removed since) and keeps its zero-pad
    /// width. A generated code that already exists is reported as
    /// `DuplicateUnitCode` and nothing is written.
    ///
    /// Nothing is published here: the caller announces the units once the
    /// paired ledger entry has committed.
    pub fn create_units(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        count: usize,
        prefix: &str,
        attributes: UnitAttributes,
        at: DateTime<Utc>,
    ) -> InventoryResult<Vec<Unit>> {
        if count == 0 {
            return Err(InventoryError::InvalidQuantity(0));
        }
        if self.products.get(tenant_id, &product_id)?.is_none() {
            return Err(InventoryError::ProductNotFound(product_id));
        }

        let key = (tenant_id, product_id, prefix.to_string());
        let units = self.prefix_locks.with(&key, || {
            let existing = self.product_units(tenant_id, product_id)?;
            let sequence_key = (product_id, prefix.to_string());
            let last = match self.code_sequences.get(tenant_id, &sequence_key)? {
                Some(code) => Some(code),
                None => existing
                    .iter()
                    .filter(|u| u.code.prefix() == prefix)
                    .map(|u| u.code.clone())
                    .max_by_key(|c| c.number()),
            };

            let codes = UnitCode::sequence_after(last.as_ref(), prefix, count, self.code_width)?;
            let taken: HashSet<String> = existing.iter().map(|u| u.code.to_string()).collect();
            if let Some(dup) = codes.iter().find(|c| taken.contains(&c.to_string())) {
                error!(
                    %tenant_id,
                    %product_id,
                    code = %dup,
                    "unit code sequence produced a duplicate"
                );
                return Err(InventoryError::DuplicateUnitCode(dup.to_string()));
            }

            let units: Vec<Unit> = codes
                .into_iter()
                .map(|code| {
                    Unit::new(UnitId::new(), tenant_id, product_id, code, attributes.clone(), at)
                })
                .collect();
            for unit in &units {
                self.units.upsert(tenant_id, unit.id, unit.clone())?;
            }
            if let Some(last) = units.last() {
                self.code_sequences.upsert(tenant_id, sequence_key, last.code.clone())?;
            }
            Ok(units)
        })?;

        self.cache.invalidate(tenant_id, product_id);
        info!(
            %tenant_id,
            %product_id,
            prefix,
            quantity = units.len(),
            first = %units[0].code,
            "units created"
        );
        Ok(units)
    }

    pub fn get(&self, tenant_id: TenantId, unit_id: UnitId) -> InventoryResult<Unit> {
        self.units
            .get(tenant_id, &unit_id)?
            .ok_or(InventoryError::UnitNotFound(unit_id))
    }

    /// Units of a product ordered by code, optionally filtered by stored status.
    pub fn list_by_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        status: Option<UnitStatus>,
    ) -> InventoryResult<Vec<Unit>> {
        let mut units: Vec<Unit> = self
            .product_units(tenant_id, product_id)?
            .into_iter()
            .filter(|u| status.is_none_or(|s| u.status == s))
            .collect();
        units.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(units)
    }

    /// Operator status change (maintenance, retirement, back to service).
    ///
    /// A unit returning to service picks up the `reserved` flag again if a
    /// reservation covers today.
    pub fn set_status(
        &self,
        tenant_id: TenantId,
        unit_id: UnitId,
        to: UnitStatus,
        at: DateTime<Utc>,
    ) -> InventoryResult<Unit> {
        let product_id = self.get(tenant_id, unit_id)?.product_id;

        self.product_locks.with(&(tenant_id, product_id), || {
            let mut unit = self.get(tenant_id, unit_id)?;
            let from = unit.status;
            if !unit.change_status(to, at)? {
                return Ok(unit);
            }
            if unit.status == UnitStatus::Available {
                let today = at.date_naive();
                let held_now = self
                    .reservations
                    .list(tenant_id)?
                    .iter()
                    .any(|r| {
                        r.product_id == product_id && r.holds_unit(unit_id) && r.covers(today)
                    });
                unit.sync_reserved_flag(held_now, at);
            }
            self.units.upsert(tenant_id, unit_id, unit.clone())?;
            self.cache.invalidate(tenant_id, product_id);

            info!(
                %tenant_id,
                %product_id,
                %unit_id,
                %from,
                to = %unit.status,
                "unit status changed"
            );
            self.feed.publish(StockEvent::UnitStatusChanged {
                tenant_id,
                product_id,
                unit_id,
                from,
                to: unit.status,
                occurred_at: at,
            });
            Ok(unit)
        })
    }

    /// Persist a unit changed by another component. Caller holds the product lock.
    pub(crate) fn save(&self, unit: &Unit) -> InventoryResult<()> {
        self.units.upsert(unit.tenant_id, unit.id, unit.clone())?;
        self.cache.invalidate(unit.tenant_id, unit.product_id);
        Ok(())
    }

    /// Delete units outright. Caller holds the product lock and writes the ledger entry.
    pub(crate) fn delete(&self, units: &[Unit]) -> InventoryResult<()> {
        for unit in units {
            self.units.remove(unit.tenant_id, &unit.id)?;
            self.cache.invalidate(unit.tenant_id, unit.product_id);
        }
        Ok(())
    }

    /// Put back units removed by `delete` (used when the paired ledger append fails).
    pub(crate) fn restore(&self, units: &[Unit]) -> InventoryResult<()> {
        units.iter().try_for_each(|unit| self.save(unit))
    }

    fn product_units(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<Vec<Unit>> {
        Ok(self
            .units
            .list(tenant_id)?
            .into_iter()
            .filter(|u| u.product_id == product_id)
            .collect())
    }
}
