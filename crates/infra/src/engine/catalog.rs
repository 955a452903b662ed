//! Product catalog: registration and soft deletion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use stockpool_core::{ProductId, TenantId};
use stockpool_inventory::{InventoryError, InventoryResult, NewProduct, Product, StockEvent};

use crate::engine::aggregator::TotalsCache;
use crate::feed::ChangeFeed;
use crate::locks::{KeyedLocks, ProductKey};
use crate::store::TenantStore;

pub struct ProductCatalog {
    products: Arc<dyn TenantStore<ProductId, Product>>,
    locks: Arc<KeyedLocks<ProductKey>>,
    cache: Arc<TotalsCache>,
    feed: Arc<ChangeFeed>,
    default_prefix: String,
}

impl ProductCatalog {
    pub fn new(
        products: Arc<dyn TenantStore<ProductId, Product>>,
        locks: Arc<KeyedLocks<ProductKey>>,
        cache: Arc<TotalsCache>,
        feed: Arc<ChangeFeed>,
        default_prefix: impl Into<String>,
    ) -> Self {
        Self {
            products,
            locks,
            cache,
            feed,
            default_prefix: default_prefix.into(),
        }
    }

    pub fn create(
        &self,
        tenant_id: TenantId,
        input: NewProduct,
        at: DateTime<Utc>,
    ) -> InventoryResult<Product> {
        let product =
            Product::create(ProductId::new(), tenant_id, input, &self.default_prefix, at)?;
        self.products.upsert(tenant_id, product.id, product.clone())?;

        info!(%tenant_id, product_id = %product.id, name = %product.name, "product created");
        self.feed.publish(StockEvent::ProductCreated {
            tenant_id,
            product_id: product.id,
            name: product.name.clone(),
            occurred_at: at,
        });
        Ok(product)
    }

    pub fn get(&self, tenant_id: TenantId, product_id: ProductId) -> InventoryResult<Product> {
        self.products
            .get(tenant_id, &product_id)?
            .ok_or(InventoryError::ProductNotFound(product_id))
    }

    pub fn list(&self, tenant_id: TenantId) -> InventoryResult<Vec<Product>> {
        let mut products = self.products.list(tenant_id)?;
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    /// Soft delete; idempotent. History and existing reservations stay readable.
    pub fn deactivate(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Product> {
        self.locks.with(&(tenant_id, product_id), || {
            let mut product = self.get(tenant_id, product_id)?;
            if !product.deactivate(at) {
                return Ok(product);
            }
            self.products.upsert(tenant_id, product_id, product.clone())?;
            self.cache.invalidate(tenant_id, product_id);

            info!(%tenant_id, %product_id, "product deactivated");
            self.feed.publish(StockEvent::ProductDeactivated {
                tenant_id,
                product_id,
                occurred_at: at,
            });
            Ok(product)
        })
    }
}
