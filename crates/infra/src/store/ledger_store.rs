//! Append-only ledger storage, one stream per `(tenant, product)`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use stockpool_core::{LedgerEntryId, ProductId, TenantId};
use stockpool_inventory::{LedgerEntry, NewLedgerEntry};

use super::StoreError;

/// Append-only, tenant-scoped ledger store.
///
/// - No update or delete: corrections are new offsetting entries
/// - `append` assigns `sequence = last + 1` within the product's stream
/// - `load_stream` returns entries in sequence order, empty for unknown streams
pub trait LedgerStore: Send + Sync {
    fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    fn load_stream(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        (**self).append(entry)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).load_stream(tenant_id, product_id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    product_id: ProductId,
}

/// In-memory append-only ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    streams: RwLock<HashMap<StreamKey, Vec<LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        entry
            .validate()
            .map_err(|e| StoreError::InvalidAppend(e.to_string()))?;

        let key = StreamKey {
            tenant_id: entry.tenant_id,
            product_id: entry.product_id,
        };

        let mut streams = self
            .streams
            .write()
            .map_err(|_| StoreError::Poisoned("ledger store"))?;

        let stream = streams.entry(key).or_default();
        let next = stream.last().map(|e| e.sequence()).unwrap_or(0) + 1;
        let committed = LedgerEntry::commit(entry, LedgerEntryId::new(), next);
        stream.push(committed.clone());

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| StoreError::Poisoned("ledger store"))?;

        Ok(streams
            .get(&StreamKey { tenant_id, product_id })
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stockpool_core::ActorId;
    use stockpool_inventory::LedgerReason;

    use super::*;

    fn entry(
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
        reason: LedgerReason,
    ) -> NewLedgerEntry {
        NewLedgerEntry {
            tenant_id,
            product_id,
            delta,
            reason,
            note: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn sequences_are_assigned_per_stream() {
        let store = InMemoryLedgerStore::new();
        let t = TenantId::new();
        let p1 = ProductId::new();
        let p2 = ProductId::new();

        let a = store.append(entry(t, p1, 5, LedgerReason::AddBulk)).unwrap();
        let b = store.append(entry(t, p1, -2, LedgerReason::RemoveBulk)).unwrap();
        let c = store.append(entry(t, p2, 1, LedgerReason::AddBulk)).unwrap();

        assert_eq!((a.sequence(), b.sequence(), c.sequence()), (1, 2, 1));
        let stream = store.load_stream(t, p1).unwrap();
        assert_eq!(stream.iter().map(|e| e.delta()).collect::<Vec<_>>(), vec![5, -2]);
    }

    #[test]
    fn streams_are_tenant_scoped() {
        let store = InMemoryLedgerStore::new();
        let p = ProductId::new();
        let t = TenantId::new();
        store.append(entry(t, p, 5, LedgerReason::AddBulk)).unwrap();

        assert!(store.load_stream(TenantId::new(), p).unwrap().is_empty());
    }

    #[test]
    fn rejects_deltas_with_the_wrong_sign() {
        let store = InMemoryLedgerStore::new();
        let err = store
            .append(entry(TenantId::new(), ProductId::new(), 3, LedgerReason::RemoveBulk))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAppend(_)));
    }
}
