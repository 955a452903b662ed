//! Availability Calculator: free bulk capacity and free tracked units per window.

use std::sync::Arc;

use tracing::debug;

use stockpool_core::{ProductId, ReservationId, TenantId, UnitId};
use stockpool_inventory::{
    Availability, DateWindow, InventoryError, InventoryResult, LedgerBalance, Product, Reservation,
    Unit, compute_availability,
};

use crate::engine::ledger::StockLedger;
use crate::store::TenantStore;

/// A consistent read of everything one product's availability depends on.
///
/// Consistent only when taken under the product lock; lock-free reads may
/// interleave with a writer and are advisory.
#[derive(Debug, Clone)]
pub struct ProductState {
    pub product: Product,
    pub balance: LedgerBalance,
    pub units: Vec<Unit>,
    /// Active reservations only.
    pub reservations: Vec<Reservation>,
}

impl ProductState {
    pub fn availability(&self, window: &DateWindow) -> Availability {
        compute_availability(
            &self.product,
            self.balance.bulk_pool,
            &self.units,
            &self.reservations,
            window,
        )
    }

    /// Same as `availability`, ignoring one reservation (used when moving it).
    pub fn availability_excluding(
        &self,
        reservation_id: ReservationId,
        window: &DateWindow,
    ) -> Availability {
        let others: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.id != reservation_id)
            .cloned()
            .collect();
        compute_availability(&self.product, self.balance.bulk_pool, &self.units, &others, window)
    }

    pub fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }
}

pub struct AvailabilityCalculator {
    products: Arc<dyn TenantStore<ProductId, Product>>,
    units: Arc<dyn TenantStore<UnitId, Unit>>,
    reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
    ledger: Arc<StockLedger>,
}

impl AvailabilityCalculator {
    pub fn new(
        products: Arc<dyn TenantStore<ProductId, Product>>,
        units: Arc<dyn TenantStore<UnitId, Unit>>,
        reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
        ledger: Arc<StockLedger>,
    ) -> Self {
        Self {
            products,
            units,
            reservations,
            ledger,
        }
    }

    pub fn product(&self, tenant_id: TenantId, product_id: ProductId) -> InventoryResult<Product> {
        self.products
            .get(tenant_id, &product_id)?
            .ok_or(InventoryError::ProductNotFound(product_id))
    }

    pub fn load(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<ProductState> {
        let product = self.product(tenant_id, product_id)?;
        let balance = self.ledger.balance(tenant_id, product_id)?;
        let units = self
            .units
            .list(tenant_id)?
            .into_iter()
            .filter(|u| u.product_id == product_id)
            .collect();
        let reservations = self
            .reservations
            .list(tenant_id)?
            .into_iter()
            .filter(|r| r.product_id == product_id && r.is_active())
            .collect();

        Ok(ProductState {
            product,
            balance,
            units,
            reservations,
        })
    }

    /// Free capacity of `product_id` over `window`.
    ///
    /// Maintenance and retired units never count. Nothing here clamps or
    /// repairs an over-committed pool.
    pub fn available(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        window: &DateWindow,
    ) -> InventoryResult<Availability> {
        let state = self.load(tenant_id, product_id)?;
        let availability = state.availability(window);
        debug!(
            %tenant_id,
            %product_id,
            %window,
            bulk_free = availability.bulk_free,
            tracked_free = availability.tracked_free.len(),
            "availability computed"
        );
        Ok(availability)
    }
}
