//! Stock Aggregator: master totals derived from ledger + unit table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tracing::{debug, warn};

use stockpool_core::{ProductId, TenantId};
use stockpool_inventory::{InventoryError, InventoryResult, StockTotals, compute_totals};

use crate::engine::availability::AvailabilityCalculator;
use crate::store::StoreError;

type CacheKey = (TenantId, ProductId);

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<(TenantId, ProductId, NaiveDate), StockTotals>,
    generations: HashMap<CacheKey, u64>,
}

/// Memoized totals, dropped on every ledger append, unit change or reservation change.
///
/// Each product carries a generation counter; a value computed before an
/// invalidation is discarded instead of being cached.
#[derive(Debug, Default)]
pub struct TotalsCache {
    state: RwLock<CacheState>,
}

impl TotalsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self, tenant_id: TenantId, product_id: ProductId) {
        match self.state.write() {
            Ok(mut state) => {
                *state.generations.entry((tenant_id, product_id)).or_default() += 1;
                state
                    .entries
                    .retain(|(t, p, _), _| !(*t == tenant_id && *p == product_id));
            }
            Err(_) => warn!(%tenant_id, %product_id, "totals cache poisoned; invalidation skipped"),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_compute(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        as_of: NaiveDate,
        compute: impl FnOnce() -> InventoryResult<StockTotals>,
    ) -> InventoryResult<StockTotals> {
        let generation = {
            let state = self.state.read().map_err(|_| StoreError::Poisoned("totals cache"))?;
            if let Some(hit) = state.entries.get(&(tenant_id, product_id, as_of)) {
                return Ok(hit.clone());
            }
            state.generations.get(&(tenant_id, product_id)).copied().unwrap_or(0)
        };

        let totals = compute()?;

        let mut state = self.state.write().map_err(|_| StoreError::Poisoned("totals cache"))?;
        let current = state.generations.get(&(tenant_id, product_id)).copied().unwrap_or(0);
        if current == generation {
            state.entries.insert((tenant_id, product_id, as_of), totals.clone());
        }
        Ok(totals)
    }
}

/// Read-only view over the ledger and unit registry. Holds no state of its own
/// beyond the cache.
pub struct StockAggregator {
    calculator: Arc<AvailabilityCalculator>,
    cache: Arc<TotalsCache>,
}

impl StockAggregator {
    pub fn new(calculator: Arc<AvailabilityCalculator>, cache: Arc<TotalsCache>) -> Self {
        Self { calculator, cache }
    }

    /// Totals with bulk reservations counted when their window includes `as_of`.
    pub fn current_totals(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        as_of: NaiveDate,
    ) -> InventoryResult<StockTotals> {
        self.cache.get_or_compute(tenant_id, product_id, as_of, || {
            let state = self.calculator.load(tenant_id, product_id)?;
            debug!(%tenant_id, %product_id, %as_of, "recomputing stock totals");
            Ok(compute_totals(
                &state.product,
                &state.balance,
                &state.units,
                &state.reservations,
                as_of,
            ))
        })
    }

    /// Check `master == bulk + tracked` against the ledger and that the ledger's
    /// implied unit count matches the registry.
    pub fn verify_invariant(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<()> {
        let state = self.calculator.load(tenant_id, product_id)?;
        let balance = state.balance;
        let unit_count = state.units.len() as i64;

        if !balance.is_reconciled() {
            warn!(%tenant_id, %product_id, ?balance, "ledger does not reconcile");
            return Err(InventoryError::IntegrityViolation(format!(
                "ledger master {} != bulk {} + tracked {}",
                balance.master, balance.bulk_pool, balance.tracked_units
            )));
        }
        if balance.tracked_units != unit_count {
            warn!(
                %tenant_id,
                %product_id,
                ledger = balance.tracked_units,
                registry = unit_count,
                "unit count drift"
            );
            return Err(InventoryError::IntegrityViolation(format!(
                "ledger implies {} units, registry holds {}",
                balance.tracked_units, unit_count
            )));
        }
        Ok(())
    }
}
