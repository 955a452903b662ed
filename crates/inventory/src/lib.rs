//! Inventory domain module: bulk pools, tracked units, reservations.
//!
//! This crate contains the business rules for availability and allocation,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage, no locking). The infra crate owns persistence and serialization
//! of concurrent writers; everything here is a function of the values passed in.

pub mod availability;
pub mod conversion;
pub mod error;
pub mod event;
pub mod ledger;
pub mod product;
pub mod reservation;
pub mod unit;
pub mod window;

pub use availability::{Availability, StockTotals, compute_availability, compute_totals};
pub use conversion::{ConversionOp, ConversionPlan};
pub use error::{InventoryError, InventoryResult};
pub use event::StockEvent;
pub use ledger::{
    LedgerBalance, LedgerEffect, LedgerEntry, LedgerReason, MAX_QUANTITY, NewLedgerEntry,
};
pub use product::{NewProduct, Product};
pub use reservation::{AllocationRequest, Reservation, ReservationState, ReservationTarget};
pub use unit::{Unit, UnitAttributes, UnitCode, UnitStatus};
pub use window::DateWindow;
