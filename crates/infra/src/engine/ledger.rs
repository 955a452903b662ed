//! Stock Ledger: the append-only audit trail of quantity changes.

use std::sync::Arc;

use tracing::info;

use stockpool_core::{ProductId, TenantId};
use stockpool_inventory::{
    InventoryError, InventoryResult, LedgerBalance, LedgerEntry, NewLedgerEntry, Product,
    StockEvent,
};

use crate::engine::aggregator::TotalsCache;
use crate::feed::ChangeFeed;
use crate::store::{LedgerStore, TenantStore};

/// Appends and folds a product's ledger. There is no update or delete API.
pub struct StockLedger {
    store: Arc<dyn LedgerStore>,
    products: Arc<dyn TenantStore<ProductId, Product>>,
    cache: Arc<TotalsCache>,
    feed: Arc<ChangeFeed>,
}

impl StockLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        products: Arc<dyn TenantStore<ProductId, Product>>,
        cache: Arc<TotalsCache>,
        feed: Arc<ChangeFeed>,
    ) -> Self {
        Self {
            store,
            products,
            cache,
            feed,
        }
    }

    /// Append one entry. Fails on an unknown product, a delta whose sign
    /// contradicts the reason, or one that would overflow the product's
    /// totals; otherwise the write is durable once this returns.
    pub fn append(&self, entry: NewLedgerEntry) -> InventoryResult<LedgerEntry> {
        entry.validate()?;
        if self.products.get(entry.tenant_id, &entry.product_id)?.is_none() {
            return Err(InventoryError::ProductNotFound(entry.product_id));
        }
        self.balance(entry.tenant_id, entry.product_id)?
            .with(entry.reason, entry.delta)?;

        let committed = self.store.append(entry)?;
        self.cache.invalidate(committed.tenant_id(), committed.product_id());

        info!(
            tenant_id = %committed.tenant_id(),
            product_id = %committed.product_id(),
            sequence = committed.sequence(),
            delta = committed.delta(),
            reason = %committed.reason(),
            "ledger entry appended"
        );
        self.feed.publish(StockEvent::LedgerEntryAppended {
            tenant_id: committed.tenant_id(),
            product_id: committed.product_id(),
            entry_id: committed.id(),
            sequence: committed.sequence(),
            delta: committed.delta(),
            reason: committed.reason(),
            actor: committed.actor(),
            occurred_at: committed.occurred_at(),
        });

        Ok(committed)
    }

    pub fn entries(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<Vec<LedgerEntry>> {
        Ok(self.store.load_stream(tenant_id, product_id)?)
    }

    pub fn balance(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> InventoryResult<LedgerBalance> {
        let entries = self.entries(tenant_id, product_id)?;
        Ok(LedgerBalance::fold(&entries))
    }
}
