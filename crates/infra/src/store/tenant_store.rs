use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use stockpool_core::TenantId;

use super::StoreError;

/// Tenant-isolated key/value store.
///
/// Individual calls are atomic; multi-record consistency is the caller's job
/// (the engine mutates a product's records inside that product's lock).
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> Result<(), StoreError>;
    fn remove(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError>;
    fn list(&self, tenant_id: TenantId) -> Result<Vec<V>, StoreError>;
    /// Clear every record of a tenant.
    fn clear_tenant(&self, tenant_id: TenantId) -> Result<(), StoreError>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> Result<(), StoreError> {
        (**self).upsert(tenant_id, key, value)
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        (**self).remove(tenant_id, key)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<V>, StoreError> {
        (**self).list(tenant_id)
    }

    fn clear_tenant(&self, tenant_id: TenantId) -> Result<(), StoreError> {
        (**self).clear_tenant(tenant_id)
    }
}

/// In-memory tenant-isolated store.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("tenant store"))?;
        Ok(map.get(&(tenant_id, key.clone())).cloned())
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("tenant store"))?;
        map.insert((tenant_id, key), value);
        Ok(())
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("tenant store"))?;
        Ok(map.remove(&(tenant_id, key.clone())))
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<V>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("tenant store"))?;
        Ok(map
            .iter()
            .filter_map(|((t, _k), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect())
    }

    fn clear_tenant(&self, tenant_id: TenantId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("tenant store"))?;
        map.retain(|(t, _k), _v| *t != tenant_id);
        Ok(())
    }
}
