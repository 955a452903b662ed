//! Append-only stock ledger: entries, reasons and the balance fold.
//!
//! Current totals are always a fold over the ledger plus the unit table. A
//! ledger entry is never mutated or deleted; corrections are new offsetting
//! entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpool_core::{ActorId, LedgerEntryId, ProductId, TenantId};

use crate::error::{InventoryError, InventoryResult};

/// Largest quantity a single ledger entry, conversion or bulk reservation may move.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Why a ledger entry was written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerReason {
    ManualAdjust,
    ConvertToTracked,
    AddTracked,
    AddBulk,
    RemoveBulk,
    RemoveTracked,
    ReservationSideEffectNone,
}

/// How one ledger delta moves the bulk pool, the tracked unit count and master stock.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEffect {
    pub bulk: i64,
    pub tracked: i64,
    pub master: i64,
}

impl LedgerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerReason::ManualAdjust => "manual-adjust",
            LedgerReason::ConvertToTracked => "convert-to-tracked",
            LedgerReason::AddTracked => "add-tracked",
            LedgerReason::AddBulk => "add-bulk",
            LedgerReason::RemoveBulk => "remove-bulk",
            LedgerReason::RemoveTracked => "remove-tracked",
            LedgerReason::ReservationSideEffectNone => "reservation-side-effect-none",
        }
    }

    /// Effect of `delta` under this reason.
    ///
    /// A convert entry records the bulk decrement; the matching tracked
    /// increment is implied (the units themselves are rows in the registry).
    pub fn effect(&self, delta: i64) -> LedgerEffect {
        match self {
            LedgerReason::ManualAdjust | LedgerReason::AddBulk | LedgerReason::RemoveBulk => {
                LedgerEffect {
                    bulk: delta,
                    tracked: 0,
                    master: delta,
                }
            }
            LedgerReason::ConvertToTracked => LedgerEffect {
                bulk: delta,
                tracked: -delta,
                master: 0,
            },
            LedgerReason::AddTracked | LedgerReason::RemoveTracked => LedgerEffect {
                bulk: 0,
                tracked: delta,
                master: delta,
            },
            LedgerReason::ReservationSideEffectNone => LedgerEffect::default(),
        }
    }

    /// Whether the reason moves the bulk pool.
    pub fn affects_bulk(&self) -> bool {
        matches!(
            self,
            LedgerReason::ManualAdjust
                | LedgerReason::ConvertToTracked
                | LedgerReason::AddBulk
                | LedgerReason::RemoveBulk
        )
    }

    /// Sign rules: additions are positive, removals and conversions negative,
    /// manual adjustments non-zero, audit notes zero. No entry moves more than
    /// [`MAX_QUANTITY`].
    pub fn validate_delta(&self, delta: i64) -> InventoryResult<()> {
        if delta.unsigned_abs() > MAX_QUANTITY.unsigned_abs() {
            return Err(InventoryError::InvalidQuantity(delta));
        }
        let ok = match self {
            LedgerReason::AddTracked | LedgerReason::AddBulk => delta > 0,
            LedgerReason::ConvertToTracked
            | LedgerReason::RemoveBulk
            | LedgerReason::RemoveTracked => delta < 0,
            LedgerReason::ManualAdjust => delta != 0,
            LedgerReason::ReservationSideEffectNone => delta == 0,
        };
        if ok {
            Ok(())
        } else {
            Err(InventoryError::InvalidQuantity(delta))
        }
    }
}

impl core::fmt::Display for LedgerReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger entry ready to be appended (not yet assigned an id or sequence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: LedgerReason,
    pub note: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn validate(&self) -> InventoryResult<()> {
        self.reason.validate_delta(self.delta)
    }
}

/// Immutable, committed ledger entry.
///
/// `sequence` is the 1-based position in the product's ledger stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    id: LedgerEntryId,
    sequence: u64,
    tenant_id: TenantId,
    product_id: ProductId,
    delta: i64,
    reason: LedgerReason,
    note: String,
    actor: ActorId,
    occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn commit(entry: NewLedgerEntry, id: LedgerEntryId, sequence: u64) -> Self {
        Self {
            id,
            sequence,
            tenant_id: entry.tenant_id,
            product_id: entry.product_id,
            delta: entry.delta,
            reason: entry.reason,
            note: entry.note,
            actor: entry.actor,
            occurred_at: entry.occurred_at,
        }
    }

    pub fn id(&self) -> LedgerEntryId {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn reason(&self) -> LedgerReason {
        self.reason
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn effect(&self) -> LedgerEffect {
        self.reason.effect(self.delta)
    }
}

/// Running totals derived from a product's ledger.
///
/// `tracked_units` is what the ledger implies the registry should hold; the
/// aggregator compares it with the actual row count.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBalance {
    pub bulk_pool: i64,
    pub tracked_units: i64,
    pub master: i64,
    pub entries: u64,
    pub last_sequence: u64,
}

impl LedgerBalance {
    pub fn fold<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut balance = Self::default();
        for entry in entries {
            balance.apply(entry);
        }
        balance
    }

    /// Saturates instead of panicking on a stream not vetted by [`LedgerBalance::with`].
    pub fn apply(&mut self, entry: &LedgerEntry) {
        let effect = entry.effect();
        self.bulk_pool = self.bulk_pool.saturating_add(effect.bulk);
        self.tracked_units = self.tracked_units.saturating_add(effect.tracked);
        self.master = self.master.saturating_add(effect.master);
        self.entries += 1;
        self.last_sequence = self.last_sequence.max(entry.sequence());
    }

    /// Balance after a hypothetical entry (used to vet an append before it
    /// commits). Fails with `InvalidQuantity` when a total would overflow.
    pub fn with(&self, reason: LedgerReason, delta: i64) -> InventoryResult<Self> {
        let effect = reason.effect(delta);
        let overflow = || InventoryError::InvalidQuantity(delta);
        Ok(Self {
            bulk_pool: self.bulk_pool.checked_add(effect.bulk).ok_or_else(overflow)?,
            tracked_units: self
                .tracked_units
                .checked_add(effect.tracked)
                .ok_or_else(overflow)?,
            master: self.master.checked_add(effect.master).ok_or_else(overflow)?,
            entries: self.entries + 1,
            last_sequence: self.last_sequence + 1,
        })
    }

    /// `master == bulk_pool + tracked_units`, as implied by the ledger alone.
    pub fn is_reconciled(&self) -> bool {
        self.bulk_pool.checked_add(self.tracked_units) == Some(self.master)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(reason: LedgerReason, delta: i64, sequence: u64) -> LedgerEntry {
        LedgerEntry::commit(
            NewLedgerEntry {
                tenant_id: TenantId::new(),
                product_id: ProductId::new(),
                delta,
                reason,
                note: String::new(),
                actor: ActorId::new(),
                occurred_at: Utc::now(),
            },
            LedgerEntryId::new(),
            sequence,
        )
    }

    #[test]
    fn conversion_table_matches_reason_effects() {
        let k = 10;
        assert_eq!(
            LedgerReason::ConvertToTracked.effect(-k),
            LedgerEffect { bulk: -k, tracked: k, master: 0 }
        );
        assert_eq!(
            LedgerReason::AddTracked.effect(k),
            LedgerEffect { bulk: 0, tracked: k, master: k }
        );
        assert_eq!(
            LedgerReason::AddBulk.effect(k),
            LedgerEffect { bulk: k, tracked: 0, master: k }
        );
        assert_eq!(
            LedgerReason::RemoveBulk.effect(-k),
            LedgerEffect { bulk: -k, tracked: 0, master: -k }
        );
    }

    #[test]
    fn sign_rules_reject_wrong_direction_deltas() {
        assert!(LedgerReason::AddBulk.validate_delta(0).is_err());
        assert!(LedgerReason::AddBulk.validate_delta(-1).is_err());
        assert!(LedgerReason::RemoveBulk.validate_delta(5).is_err());
        assert!(LedgerReason::ConvertToTracked.validate_delta(5).is_err());
        assert!(LedgerReason::ManualAdjust.validate_delta(0).is_err());
        assert!(LedgerReason::ManualAdjust.validate_delta(-3).is_ok());
        assert!(LedgerReason::ReservationSideEffectNone.validate_delta(1).is_err());
        assert!(LedgerReason::ReservationSideEffectNone.validate_delta(0).is_ok());
    }

    #[test]
    fn deltas_beyond_the_quantity_limit_are_rejected() {
        assert!(LedgerReason::AddBulk.validate_delta(MAX_QUANTITY).is_ok());
        assert_eq!(
            LedgerReason::AddBulk.validate_delta(MAX_QUANTITY + 1),
            Err(InventoryError::InvalidQuantity(MAX_QUANTITY + 1))
        );
        assert_eq!(
            LedgerReason::ManualAdjust.validate_delta(i64::MIN),
            Err(InventoryError::InvalidQuantity(i64::MIN))
        );
        assert!(LedgerReason::RemoveBulk.validate_delta(-MAX_QUANTITY).is_ok());
    }

    #[test]
    fn with_refuses_to_overflow_a_total() {
        let full = LedgerBalance {
            bulk_pool: i64::MAX - 1,
            tracked_units: 0,
            master: i64::MAX - 1,
            entries: 1,
            last_sequence: 1,
        };
        assert_eq!(
            full.with(LedgerReason::AddBulk, 2),
            Err(InventoryError::InvalidQuantity(2))
        );
        let next = full.with(LedgerReason::AddBulk, 1).unwrap();
        assert_eq!(next.bulk_pool, i64::MAX);
        assert_eq!(next.entries, 2);
    }

    #[test]
    fn fold_tracks_bulk_tracked_and_master() {
        let entries = vec![
            entry(LedgerReason::AddBulk, 50, 1),
            entry(LedgerReason::ConvertToTracked, -10, 2),
            entry(LedgerReason::AddTracked, 3, 3),
            entry(LedgerReason::RemoveBulk, -5, 4),
        ];
        let balance = LedgerBalance::fold(&entries);
        assert_eq!(balance.bulk_pool, 35);
        assert_eq!(balance.tracked_units, 13);
        assert_eq!(balance.master, 48);
        assert_eq!(balance.entries, 4);
        assert_eq!(balance.last_sequence, 4);
        assert!(balance.is_reconciled());
    }

    #[test]
    fn reason_serializes_kebab_case() {
        assert_eq!(LedgerReason::ConvertToTracked.as_str(), "convert-to-tracked");
        assert_eq!(
            LedgerReason::ReservationSideEffectNone.to_string(),
            "reservation-side-effect-none"
        );
    }

    fn arb_entry() -> impl Strategy<Value = (LedgerReason, i64)> {
        prop_oneof![
            (1i64..100).prop_map(|k| (LedgerReason::AddBulk, k)),
            (1i64..100).prop_map(|k| (LedgerReason::RemoveBulk, -k)),
            (1i64..100).prop_map(|k| (LedgerReason::ConvertToTracked, -k)),
            (1i64..100).prop_map(|k| (LedgerReason::AddTracked, k)),
            (1i64..100).prop_map(|k| (LedgerReason::RemoveTracked, -k)),
            (-100i64..100)
                .prop_filter("non-zero", |d| *d != 0)
                .prop_map(|d| (LedgerReason::ManualAdjust, d)),
            Just((LedgerReason::ReservationSideEffectNone, 0)),
        ]
    }

    proptest! {
        /// Every reason's effect keeps master == bulk + tracked, so any ledger does.
        #[test]
        fn any_ledger_stays_reconciled(ops in proptest::collection::vec(arb_entry(), 0..64)) {
            let entries: Vec<LedgerEntry> = ops
                .iter()
                .enumerate()
                .map(|(i, (reason, delta))| entry(*reason, *delta, i as u64 + 1))
                .collect();
            let balance = LedgerBalance::fold(&entries);
            prop_assert!(balance.is_reconciled());
        }

        #[test]
        fn with_matches_fold_after_append(ops in proptest::collection::vec(arb_entry(), 1..32)) {
            let entries: Vec<LedgerEntry> = ops
                .iter()
                .enumerate()
                .map(|(i, (reason, delta))| entry(*reason, *delta, i as u64 + 1))
                .collect();
            let (last, init) = entries.split_last().unwrap();
            let predicted = LedgerBalance::fold(init).with(last.reason(), last.delta()).unwrap();
            prop_assert_eq!(predicted, LedgerBalance::fold(&entries));
        }
    }
}
