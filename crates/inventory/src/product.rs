use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpool_core::{Entity, ProductId, TenantId};

use crate::error::{InventoryError, InventoryResult};
use crate::unit::validate_prefix;

/// Input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub track_inventory: bool,
    pub low_stock_threshold: i64,
    /// Prefix for generated unit codes; the engine default applies when absent.
    pub default_category_prefix: Option<String>,
}

/// A stocked product: owner of one bulk pool and zero-or-more tracked units.
///
/// Products are never hard-deleted; deactivation keeps history readable while
/// blocking new reservations and conversions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub name: String,
    pub track_inventory: bool,
    pub low_stock_threshold: i64,
    pub default_category_prefix: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    pub fn create(
        id: ProductId,
        tenant_id: TenantId,
        input: NewProduct,
        fallback_prefix: &str,
        at: DateTime<Utc>,
    ) -> InventoryResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(InventoryError::InvalidRequest("name cannot be empty".to_string()));
        }
        if input.low_stock_threshold < 0 {
            return Err(InventoryError::InvalidRequest(
                "low stock threshold cannot be negative".to_string(),
            ));
        }
        let prefix = input
            .default_category_prefix
            .unwrap_or_else(|| fallback_prefix.to_string());
        validate_prefix(&prefix)?;

        Ok(Self {
            id,
            tenant_id,
            name,
            track_inventory: input.track_inventory,
            low_stock_threshold: input.low_stock_threshold,
            default_category_prefix: prefix,
            active: true,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn ensure_active(&self) -> InventoryResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(InventoryError::ProductInactive(self.id))
        }
    }

    /// Soft delete. Returns whether the product was active before.
    pub fn deactivate(&mut self, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.updated_at = at;
        true
    }
}
