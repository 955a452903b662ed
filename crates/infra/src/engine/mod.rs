//! The availability / allocation engine.
//!
//! ```text
//! API ─► AvailabilityCalculator (read)
//!    ─► AllocationService ─► (re-check under product lock) ─► reservations
//!    ─► ConversionService ─► UnitRegistry + StockLedger
//!                                   │
//!                     StockAggregator (cache, invalidated on every write)
//! ```
//!
//! `InventoryEngine` wires the components over one set of `Stores`, stamps
//! writes with the current time and is the surface the HTTP layer calls.

pub mod aggregator;
pub mod allocation;
pub mod availability;
pub mod catalog;
pub mod conversion;
pub mod ledger;
pub mod registry;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockpool_core::{ActorId, JobId, ProductId, ReservationId, TenantId, UnitId};
use stockpool_events::{InMemoryEventBus, Subscription};
use stockpool_inventory::{
    AllocationRequest, Availability, DateWindow, InventoryResult, LedgerEntry, NewProduct, Product,
    Reservation, StockTotals, Unit, UnitStatus,
};

pub use aggregator::{StockAggregator, TotalsCache};
pub use allocation::AllocationService;
pub use availability::{AvailabilityCalculator, ProductState};
pub use catalog::ProductCatalog;
pub use conversion::{ConversionOutcome, ConversionRequest, ConversionService};
pub use ledger::StockLedger;
pub use registry::UnitRegistry;

use crate::feed::{ChangeFeed, StockEnvelope};
use crate::locks::KeyedLocks;
use crate::store::Stores;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unit-code prefix for products created without one.
    pub default_category_prefix: String,
    /// Zero-pad width of the first code issued under a prefix.
    pub code_width: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_category_prefix: "1000".to_string(),
            code_width: 4,
        }
    }
}

/// Result of a conversion plus the totals right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub entry: LedgerEntry,
    pub units: Vec<Unit>,
    pub totals: StockTotals,
}

pub struct InventoryEngine {
    catalog: Arc<ProductCatalog>,
    ledger: Arc<StockLedger>,
    aggregator: Arc<StockAggregator>,
    registry: Arc<UnitRegistry>,
    calculator: Arc<AvailabilityCalculator>,
    allocation: Arc<AllocationService>,
    conversion: Arc<ConversionService>,
    feed: Arc<ChangeFeed>,
}

impl InventoryEngine {
    pub fn new(
        config: EngineConfig,
        stores: Stores,
        bus: Arc<InMemoryEventBus<StockEnvelope>>,
    ) -> Self {
        let feed = Arc::new(ChangeFeed::new(bus));
        let cache = Arc::new(TotalsCache::new());
        let locks = Arc::new(KeyedLocks::new());

        let catalog = Arc::new(ProductCatalog::new(
            stores.products.clone(),
            locks.clone(),
            cache.clone(),
            feed.clone(),
            config.default_category_prefix.clone(),
        ));
        let ledger = Arc::new(StockLedger::new(
            stores.ledger.clone(),
            stores.products.clone(),
            cache.clone(),
            feed.clone(),
        ));
        let registry = Arc::new(UnitRegistry::new(
            stores.units.clone(),
            stores.products.clone(),
            stores.reservations.clone(),
            stores.code_sequences.clone(),
            locks.clone(),
            cache.clone(),
            feed.clone(),
            config.code_width,
        ));
        let calculator = Arc::new(AvailabilityCalculator::new(
            stores.products.clone(),
            stores.units.clone(),
            stores.reservations.clone(),
            ledger.clone(),
        ));
        let aggregator = Arc::new(StockAggregator::new(calculator.clone(), cache.clone()));
        let allocation = Arc::new(AllocationService::new(
            calculator.clone(),
            registry.clone(),
            stores.reservations.clone(),
            locks.clone(),
            cache,
            feed.clone(),
        ));
        let conversion = Arc::new(ConversionService::new(
            calculator.clone(),
            registry.clone(),
            ledger.clone(),
            locks,
            feed.clone(),
        ));

        Self {
            catalog,
            ledger,
            aggregator,
            registry,
            calculator,
            allocation,
            conversion,
            feed,
        }
    }

    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(config, Stores::in_memory(), Arc::new(InMemoryEventBus::new()))
    }

    pub fn subscribe(&self) -> Subscription<StockEnvelope> {
        self.feed.subscribe()
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    pub fn aggregator(&self) -> &StockAggregator {
        &self.aggregator
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn calculator(&self) -> &AvailabilityCalculator {
        &self.calculator
    }

    pub fn allocation(&self) -> &AllocationService {
        &self.allocation
    }

    pub fn conversion(&self) -> &ConversionService {
        &self.conversion
    }

    // ---- products ----

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_product(
        &self,
        tenant_id: TenantId,
        input: NewProduct,
    ) -> InventoryResult<Product> {
        self.catalog.create(tenant_id, input, Utc::now())
    }

    pub fn product(&self, tenant_id: TenantId, product_id: ProductId) -> InventoryResult<Product> {
        self.catalog.get(tenant_id, product_id)
    }

    pub fn products(&self, tenant_id: TenantId) -> InventoryResult<Vec<Product>> {
        self.catalog.list(tenant_id)
    }

    #[instrument(skip(self))]
    pub fn deactivate_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<Product> {
        self.catalog.deactivate(tenant_id, product_id, Utc::now())
    }

    // ---- reads ----

    /// Free capacity between `start` and `end` (single day when `end` is absent).
    pub fn available(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> InventoryResult<Availability> {
        let window = DateWindow::query(start, end)?;
        self.calculator.available(tenant_id, product_id, &window)
    }

    /// Aggregator snapshot as of today.
    pub fn stock(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<StockTotals> {
        self.stock_as_of(tenant_id, product_id, Utc::now().date_naive())
    }

    pub fn stock_as_of(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        as_of: NaiveDate,
    ) -> InventoryResult<StockTotals> {
        self.aggregator.current_totals(tenant_id, product_id, as_of)
    }

    pub fn ledger_entries(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<Vec<LedgerEntry>> {
        self.catalog.get(tenant_id, product_id)?;
        self.ledger.entries(tenant_id, product_id)
    }

    pub fn units(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        status: Option<UnitStatus>,
    ) -> InventoryResult<Vec<Unit>> {
        self.catalog.get(tenant_id, product_id)?;
        self.registry.list_by_product(tenant_id, product_id, status)
    }

    pub fn verify_invariant(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<()> {
        self.aggregator.verify_invariant(tenant_id, product_id)
    }

    // ---- reservations ----

    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            job_id = %request.job_id,
            mode = request.target.mode()
        )
    )]
    pub fn reserve(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        request: AllocationRequest,
    ) -> InventoryResult<Reservation> {
        self.allocation.reserve(tenant_id, actor, request, Utc::now())
    }

    #[instrument(skip(self))]
    pub fn release(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> InventoryResult<bool> {
        self.allocation.release(tenant_id, reservation_id, Utc::now())
    }

    #[instrument(skip(self))]
    pub fn release_job(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
    ) -> InventoryResult<Vec<ReservationId>> {
        self.allocation.release_job(tenant_id, job_id, Utc::now())
    }

    #[instrument(skip(self))]
    pub fn reschedule(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
        window: DateWindow,
    ) -> InventoryResult<Reservation> {
        self.allocation.reschedule(tenant_id, reservation_id, window, Utc::now())
    }

    pub fn reservation(
        &self,
        tenant_id: TenantId,
        reservation_id: ReservationId,
    ) -> InventoryResult<Reservation> {
        self.allocation.get(tenant_id, reservation_id)
    }

    pub fn reservations_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        include_released: bool,
    ) -> InventoryResult<Vec<Reservation>> {
        self.allocation.list_for_product(tenant_id, product_id, include_released)
    }

    #[instrument(skip(self))]
    pub fn refresh_unit_statuses(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> InventoryResult<usize> {
        self.allocation.refresh_unit_statuses(tenant_id, as_of, Utc::now())
    }

    // ---- conversions and adjustments ----

    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            operation = %request.operation,
            quantity = request.quantity
        )
    )]
    pub fn convert(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        request: ConversionRequest,
    ) -> InventoryResult<ConversionResult> {
        let product_id = request.product_id;
        let outcome = self.conversion.convert(tenant_id, actor, request, Utc::now())?;
        let totals = self.stock(tenant_id, product_id)?;
        Ok(ConversionResult {
            entry: outcome.entry,
            units: outcome.units,
            totals,
        })
    }

    #[instrument(skip(self, note))]
    pub fn adjust(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        delta: i64,
        note: String,
    ) -> InventoryResult<LedgerEntry> {
        self.conversion.adjust(tenant_id, actor, product_id, delta, note, Utc::now())
    }

    #[instrument(skip(self, unit_ids, note), fields(quantity = unit_ids.len()))]
    pub fn remove_units(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        unit_ids: Vec<UnitId>,
        note: String,
    ) -> InventoryResult<ConversionOutcome> {
        self.conversion.remove_units(tenant_id, actor, unit_ids, note, Utc::now())
    }

    #[instrument(skip(self))]
    pub fn set_unit_status(
        &self,
        tenant_id: TenantId,
        unit_id: UnitId,
        status: UnitStatus,
    ) -> InventoryResult<Unit> {
        self.registry.set_status(tenant_id, unit_id, status, Utc::now())
    }
}
