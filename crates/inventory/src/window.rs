//! Date windows for availability queries and reservations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockpool_core::ValueObject;

use crate::error::{InventoryError, InventoryResult};

/// An inclusive `[start, end]` range of calendar days.
///
/// `end == None` means the window is open-ended (unbounded to the future).
/// Reservations may be open-ended; availability queries never are, because
/// [`DateWindow::query`] defaults a missing end to the start day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl ValueObject for DateWindow {}

impl DateWindow {
    /// Window for a reservation. A missing `end` leaves the window open.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> InventoryResult<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(InventoryError::InvalidWindow(format!(
                    "end {end} is before start {start}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Window for an availability query. A missing `end` means a single day.
    pub fn query(start: NaiveDate, end: Option<NaiveDate>) -> InventoryResult<Self> {
        Self::new(start, Some(end.unwrap_or(start)))
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: Some(day),
        }
    }

    pub fn open_ended(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    fn end_or_max(&self) -> NaiveDate {
        self.end.unwrap_or(NaiveDate::MAX)
    }

    /// `a.start <= b.end && a.end >= b.start`, with open ends unbounded.
    pub fn overlaps(&self, other: &DateWindow) -> bool {
        self.start <= other.end_or_max() && self.end_or_max() >= other.start
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end_or_max()
    }

    /// `other ⊆ self`.
    pub fn contains(&self, other: &DateWindow) -> bool {
        self.start <= other.start && other.end_or_max() <= self.end_or_max()
    }

    /// Whether any day of the window is on or after `day`.
    pub fn reaches(&self, day: NaiveDate) -> bool {
        self.end_or_max() >= day
    }
}

impl core::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = DateWindow::new(d("2024-01-15"), Some(d("2024-01-10"))).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidWindow(_)));
    }

    #[test]
    fn query_without_end_is_a_single_day() {
        let w = DateWindow::query(d("2024-01-12"), None).unwrap();
        assert_eq!(w.end(), Some(d("2024-01-12")));
        assert!(!w.is_open_ended());
    }

    #[test]
    fn touching_windows_overlap_inclusively() {
        let a = DateWindow::new(d("2024-01-10"), Some(d("2024-01-15"))).unwrap();
        let b = DateWindow::single_day(d("2024-01-15"));
        let c = DateWindow::single_day(d("2024-01-16"));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn open_ended_window_overlaps_everything_after_its_start() {
        let open = DateWindow::open_ended(d("2024-03-01"));
        assert!(open.overlaps(&DateWindow::single_day(d("2099-12-31"))));
        assert!(!open.overlaps(&DateWindow::single_day(d("2024-02-29"))));
        assert!(open.contains_day(d("2030-01-01")));
    }

    fn arb_window() -> impl Strategy<Value = DateWindow> {
        (0i64..400, proptest::option::of(0i64..60)).prop_map(|(offset, len)| {
            let start = d("2024-01-01") + chrono::Duration::days(offset);
            let end = len.map(|l| start + chrono::Duration::days(l));
            DateWindow::new(start, end).unwrap()
        })
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in arb_window(), b in arb_window()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn containment_implies_overlap(a in arb_window(), b in arb_window()) {
            if a.contains(&b) {
                prop_assert!(a.overlaps(&b));
            }
        }

        #[test]
        fn a_window_overlapping_a_sub_window_overlaps_the_super_window(
            outer in arb_window(),
            inner in arb_window(),
            other in arb_window(),
        ) {
            if outer.contains(&inner) && other.overlaps(&inner) {
                prop_assert!(other.overlaps(&outer));
            }
        }
    }
}
