//! Tenant-scoped persistence boundary.
//!
//! Every record lives under a `TenantId`; nothing here can read or write across
//! tenants. In-memory implementations back tests, dev and single-process
//! deployments.

pub mod ledger_store;
pub mod tenant_store;

use std::sync::Arc;

use thiserror::Error;

use stockpool_core::{ProductId, ReservationId, UnitId};
use stockpool_inventory::{InventoryError, Product, Reservation, Unit, UnitCode};

pub use ledger_store::{InMemoryLedgerStore, LedgerStore};
pub use tenant_store::{InMemoryTenantStore, TenantStore};

/// Storage-level failure (as opposed to a business rule rejection).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        InventoryError::Storage(err.to_string())
    }
}

/// Last issued code per `(product, prefix)`; survives unit removal so codes are never reused.
pub type CodeSequenceKey = (ProductId, String);

/// The engine's persisted state.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn TenantStore<ProductId, Product>>,
    pub units: Arc<dyn TenantStore<UnitId, Unit>>,
    pub reservations: Arc<dyn TenantStore<ReservationId, Reservation>>,
    pub code_sequences: Arc<dyn TenantStore<CodeSequenceKey, UnitCode>>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryTenantStore::new()),
            units: Arc::new(InMemoryTenantStore::new()),
            reservations: Arc::new(InMemoryTenantStore::new()),
            code_sequences: Arc::new(InMemoryTenantStore::new()),
            ledger: Arc::new(InMemoryLedgerStore::new()),
        }
    }
}

impl core::fmt::Debug for Stores {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
