//! Availability and stock-total math.
//!
//! Pure functions over a consistent snapshot (product, ledger balance, units,
//! reservations). Callers that act on the result must compute it inside the
//! same critical section that commits the action.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockpool_core::{ProductId, UnitId};

use crate::ledger::LedgerBalance;
use crate::product::Product;
use crate::reservation::Reservation;
use crate::unit::{Unit, UnitStatus};
use crate::window::DateWindow;

/// Free capacity of one product over one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub product_id: ProductId,
    pub window: DateWindow,
    /// `false` for products that do not track inventory (no capacity limit).
    pub tracked: bool,
    pub bulk_pool: i64,
    pub bulk_reserved: i64,
    /// `bulk_pool - bulk_reserved`; not clamped, a negative value exposes an
    /// over-committed pool.
    pub bulk_free: i64,
    /// Allocatable units with no overlapping reservation, ordered by code.
    pub tracked_free: Vec<Unit>,
}

impl Availability {
    pub fn total_free(&self) -> i64 {
        self.bulk_free.saturating_add(self.tracked_free.len() as i64)
    }

    pub fn tracked_free_ids(&self) -> HashSet<UnitId> {
        self.tracked_free.iter().map(|u| u.id).collect()
    }

    pub fn is_unit_free(&self, unit_id: UnitId) -> bool {
        self.tracked_free.iter().any(|u| u.id == unit_id)
    }
}

/// Availability of `product` over `window`.
///
/// 1. `tracked_free` = allocatable units minus units held by an active reservation
///    overlapping the window.
/// 2. `bulk_free` = bulk pool minus bulk quantities of active reservations
///    overlapping the window.
///
/// Units and reservations of other products are ignored.
pub fn compute_availability(
    product: &Product,
    bulk_pool: i64,
    units: &[Unit],
    reservations: &[Reservation],
    window: &DateWindow,
) -> Availability {
    let blocking: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.product_id == product.id && r.blocks(window))
        .collect();

    let held: HashSet<UnitId> = blocking
        .iter()
        .flat_map(|r| r.unit_ids().iter().copied())
        .collect();
    let bulk_reserved = saturating_total(blocking.iter().map(|r| r.bulk_quantity()));

    let mut tracked_free: Vec<Unit> = units
        .iter()
        .filter(|u| u.product_id == product.id && u.status.is_allocatable())
        .filter(|u| !held.contains(&u.id))
        .cloned()
        .collect();
    tracked_free.sort_by(|a, b| a.code.cmp(&b.code));

    Availability {
        product_id: product.id,
        window: *window,
        tracked: product.track_inventory,
        bulk_pool,
        bulk_reserved,
        bulk_free: bulk_pool.saturating_sub(bulk_reserved),
        tracked_free,
    }
}

/// Current master totals for a product as of a reference day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTotals {
    pub product_id: ProductId,
    pub as_of: NaiveDate,
    /// `bulk_pool_count + total_unit_count`.
    pub master_stock: i64,
    pub bulk_pool_count: i64,
    /// Bulk pool minus bulk reservations whose window includes `as_of`.
    pub bulk_pool_available: i64,
    pub bulk_reserved: i64,
    pub total_unit_count: i64,
    pub tracked_available: i64,
    pub tracked_reserved: i64,
    pub tracked_maintenance: i64,
    pub tracked_retired: i64,
    pub low_stock: bool,
}

pub fn compute_totals(
    product: &Product,
    ledger: &LedgerBalance,
    units: &[Unit],
    reservations: &[Reservation],
    as_of: NaiveDate,
) -> StockTotals {
    let current: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.product_id == product.id && r.covers(as_of))
        .collect();
    let held_now: HashSet<UnitId> = current
        .iter()
        .flat_map(|r| r.unit_ids().iter().copied())
        .collect();
    let bulk_reserved = saturating_total(current.iter().map(|r| r.bulk_quantity()));

    let mut tracked_available = 0;
    let mut tracked_reserved = 0;
    let mut tracked_maintenance = 0;
    let mut tracked_retired = 0;
    let mut total_unit_count = 0;

    for unit in units.iter().filter(|u| u.product_id == product.id) {
        total_unit_count += 1;
        match unit.status {
            UnitStatus::Available | UnitStatus::Reserved => {
                if held_now.contains(&unit.id) {
                    tracked_reserved += 1;
                } else {
                    tracked_available += 1;
                }
            }
            UnitStatus::Maintenance => tracked_maintenance += 1,
            UnitStatus::Retired => tracked_retired += 1,
        }
    }

    let bulk_pool_count = ledger.bulk_pool;
    let bulk_pool_available = bulk_pool_count.saturating_sub(bulk_reserved);
    let free_now = bulk_pool_available.saturating_add(tracked_available);
    let low_stock = product.track_inventory && free_now <= product.low_stock_threshold;

    StockTotals {
        product_id: product.id,
        as_of,
        master_stock: bulk_pool_count.saturating_add(total_unit_count),
        bulk_pool_count,
        bulk_pool_available,
        bulk_reserved,
        total_unit_count,
        tracked_available,
        tracked_reserved,
        tracked_maintenance,
        tracked_retired,
        low_stock,
    }
}

/// Untracked products take any number of bulk reservations, so the sum can
/// outgrow `i64`.
fn saturating_total(quantities: impl Iterator<Item = i64>) -> i64 {
    quantities.fold(0, i64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use stockpool_core::{ActorId, JobId, ReservationId, TenantId};

    use crate::product::NewProduct;
    use crate::reservation::{ReservationState, ReservationTarget};
    use crate::unit::{UnitAttributes, UnitCode};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn product() -> Product {
        Product::create(
            ProductId::new(),
            TenantId::new(),
            NewProduct {
                name: "Folding chair".to_string(),
                track_inventory: true,
                low_stock_threshold: 3,
                default_category_prefix: None,
            },
            "1000",
            Utc::now(),
        )
        .unwrap()
    }

    fn units(product: &Product, n: u64) -> Vec<Unit> {
        (1..=n)
            .map(|i| {
                Unit::new(
                    UnitId::new(),
                    product.tenant_id,
                    product.id,
                    UnitCode::new("1000", i, 4).unwrap(),
                    UnitAttributes::new(),
                    Utc::now(),
                )
            })
            .collect()
    }

    fn reserve(product: &Product, target: ReservationTarget, window: DateWindow) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            tenant_id: product.tenant_id,
            product_id: product.id,
            job_id: JobId::new(),
            target,
            window,
            state: ReservationState::Active,
            created_by: ActorId::new(),
            created_at: Utc::now(),
            released_at: None,
        }
    }

    fn day(s: &str) -> DateWindow {
        DateWindow::single_day(d(s))
    }

    fn span(start: &str, end: &str) -> DateWindow {
        DateWindow::new(d(start), Some(d(end))).unwrap()
    }

    fn bulk(quantity: i64) -> ReservationTarget {
        ReservationTarget::Bulk { quantity }
    }

    fn specific(unit_ids: Vec<UnitId>) -> ReservationTarget {
        ReservationTarget::Specific { unit_ids }
    }

    #[test]
    fn specific_reservation_hides_units_inside_its_window_only() {
        let p = product();
        let us = units(&p, 5);
        let held: Vec<UnitId> = us[..3].iter().map(|u| u.id).collect();
        let r = reserve(
            &p,
            ReservationTarget::Specific { unit_ids: held.clone() },
            DateWindow::new(d("2024-01-10"), Some(d("2024-01-15"))).unwrap(),
        );

        let inside = compute_availability(&p, 0, &us, &[r.clone()], &day("2024-01-12"));
        assert_eq!(inside.tracked_free.len(), 2);
        for id in &held {
            assert!(!inside.is_unit_free(*id));
        }

        let outside = compute_availability(&p, 0, &us, &[r], &day("2024-01-16"));
        assert_eq!(outside.tracked_free.len(), 5);
    }

    #[test]
    fn maintenance_and_retired_units_are_never_free() {
        let p = product();
        let mut us = units(&p, 3);
        us[0].change_status(UnitStatus::Maintenance, Utc::now()).unwrap();
        us[1].change_status(UnitStatus::Retired, Utc::now()).unwrap();

        let a = compute_availability(&p, 0, &us, &[], &DateWindow::single_day(d("2024-05-01")));
        assert_eq!(a.tracked_free.len(), 1);
        assert_eq!(a.tracked_free[0].id, us[2].id);
    }

    #[test]
    fn reserved_flag_does_not_hide_a_unit_outside_its_reservation() {
        let p = product();
        let mut us = units(&p, 1);
        us[0].sync_reserved_flag(true, Utc::now());
        let a = compute_availability(&p, 0, &us, &[], &DateWindow::single_day(d("2024-05-01")));
        assert_eq!(a.tracked_free.len(), 1);
    }

    #[test]
    fn bulk_free_subtracts_overlapping_bulk_reservations() {
        let p = product();
        let rs = vec![
            reserve(&p, bulk(4), span("2024-01-01", "2024-01-05")),
            reserve(&p, bulk(6), DateWindow::open_ended(d("2024-01-04"))),
            reserve(&p, bulk(9), day("2024-02-01")),
        ];
        let a = compute_availability(&p, 20, &[], &rs, &span("2024-01-03", "2024-01-04"));
        assert_eq!(a.bulk_reserved, 10);
        assert_eq!(a.bulk_free, 10);
        assert_eq!(a.total_free(), 10);
    }

    #[test]
    fn huge_bulk_holds_saturate_instead_of_overflowing() {
        let p = product();
        let w = DateWindow::single_day(d("2024-01-01"));
        let rs = vec![
            reserve(&p, ReservationTarget::Bulk { quantity: i64::MAX }, w),
            reserve(&p, ReservationTarget::Bulk { quantity: i64::MAX }, w),
        ];
        let a = compute_availability(&p, 3, &[], &rs, &w);
        assert_eq!(a.bulk_reserved, i64::MAX);
        assert_eq!(a.bulk_free, 3 - i64::MAX);
    }

    #[test]
    fn other_products_do_not_leak_into_availability() {
        let p = product();
        let other = product();
        let us = units(&other, 2);
        let r = reserve(&other, bulk(5), day("2024-01-01"));
        let a = compute_availability(&p, 7, &us, &[r], &DateWindow::single_day(d("2024-01-01")));
        assert_eq!(a.bulk_free, 7);
        assert!(a.tracked_free.is_empty());
    }

    #[test]
    fn totals_split_units_by_current_reservation_and_status() {
        let p = product();
        let mut us = units(&p, 4);
        us[3].change_status(UnitStatus::Maintenance, Utc::now()).unwrap();
        let rs = vec![
            reserve(&p, specific(vec![us[0].id]), span("2024-01-01", "2024-01-31")),
            reserve(&p, specific(vec![us[1].id]), day("2024-03-01")),
            reserve(&p, bulk(2), day("2024-01-15")),
        ];
        let ledger = LedgerBalance {
            bulk_pool: 5,
            tracked_units: 4,
            master: 9,
            entries: 2,
            last_sequence: 2,
        };

        let t = compute_totals(&p, &ledger, &us, &rs, d("2024-01-15"));
        assert_eq!(t.master_stock, 9);
        assert_eq!(t.bulk_pool_count, 5);
        assert_eq!(t.bulk_pool_available, 3);
        assert_eq!(t.total_unit_count, 4);
        assert_eq!(t.tracked_reserved, 1);
        assert_eq!(t.tracked_available, 2);
        assert_eq!(t.tracked_maintenance, 1);
        assert!(!t.low_stock);
    }

    #[test]
    fn low_stock_flags_free_capacity_at_or_below_threshold() {
        let p = product();
        let ledger = LedgerBalance {
            bulk_pool: 3,
            tracked_units: 0,
            master: 3,
            entries: 1,
            last_sequence: 1,
        };
        let t = compute_totals(&p, &ledger, &[], &[], d("2024-01-01"));
        assert!(t.low_stock);
    }

    proptest! {
        /// Reserving for a wider window never frees anything in a sub-window.
        #[test]
        fn wider_reservations_only_reduce_sub_window_availability(
            start in 0i64..30,
            len in 0i64..10,
            widen_before in 0i64..5,
            widen_after in 0i64..5,
            day_offset in 0i64..10,
            held in 1usize..5,
        ) {
            let p = product();
            let us = units(&p, 5);
            let base = d("2024-01-01");
            let narrow = DateWindow::new(
                base + chrono::Duration::days(start),
                Some(base + chrono::Duration::days(start + len)),
            ).unwrap();
            let wide = DateWindow::new(
                narrow.start() - chrono::Duration::days(widen_before),
                Some(narrow.end().unwrap() + chrono::Duration::days(widen_after)),
            ).unwrap();
            let ids: Vec<UnitId> = us[..held].iter().map(|u| u.id).collect();
            let on = DateWindow::single_day(
                narrow.start() + chrono::Duration::days(day_offset.min(len)),
            );

            let narrow_hold = [reserve(&p, specific(ids.clone()), narrow)];
            let wide_hold = [reserve(&p, specific(ids), wide)];
            let with_narrow = compute_availability(&p, 10, &us, &narrow_hold, &on);
            let with_wide = compute_availability(&p, 10, &us, &wide_hold, &on);

            prop_assert!(with_wide.tracked_free_ids().is_subset(&with_narrow.tracked_free_ids()));
            prop_assert!(with_wide.total_free() <= with_narrow.total_free());
        }
    }
}
