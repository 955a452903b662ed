//! Moving quantity between the bulk pool and the unit registry.
//!
//! | Operation            | Bulk | Tracked | Master | Ledger reason      |
//! |----------------------|------|---------|--------|--------------------|
//! | convert to tracked k | -k   | +k      | 0      | convert-to-tracked |
//! | add tracked k        | 0    | +k      | +k     | add-tracked        |
//! | add bulk k           | +k   | 0       | +k     | add-bulk           |
//! | remove bulk k        | -k   | 0       | -k     | remove-bulk        |

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};
use crate::ledger::{LedgerEffect, LedgerReason, MAX_QUANTITY};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionOp {
    #[serde(alias = "convert")]
    ConvertToTracked,
    AddTracked,
    AddBulk,
    RemoveBulk,
}

/// A vetted conversion: what to create and what to write to the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub op: ConversionOp,
    pub quantity: i64,
    pub ledger_reason: LedgerReason,
    pub ledger_delta: i64,
    pub units_to_create: usize,
}

impl ConversionPlan {
    pub fn effect(&self) -> LedgerEffect {
        self.ledger_reason.effect(self.ledger_delta)
    }
}

impl ConversionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionOp::ConvertToTracked => "convert-to-tracked",
            ConversionOp::AddTracked => "add-tracked",
            ConversionOp::AddBulk => "add-bulk",
            ConversionOp::RemoveBulk => "remove-bulk",
        }
    }

    pub fn ledger_reason(&self) -> LedgerReason {
        match self {
            ConversionOp::ConvertToTracked => LedgerReason::ConvertToTracked,
            ConversionOp::AddTracked => LedgerReason::AddTracked,
            ConversionOp::AddBulk => LedgerReason::AddBulk,
            ConversionOp::RemoveBulk => LedgerReason::RemoveBulk,
        }
    }

    pub fn creates_units(&self) -> bool {
        matches!(self, ConversionOp::ConvertToTracked | ConversionOp::AddTracked)
    }

    /// Draws down the bulk pool (requires `k <= bulk_pool_available`).
    pub fn consumes_bulk(&self) -> bool {
        matches!(self, ConversionOp::ConvertToTracked | ConversionOp::RemoveBulk)
    }

    /// Check preconditions against the bulk pool available right now.
    pub fn plan(&self, quantity: i64, bulk_available: i64) -> InventoryResult<ConversionPlan> {
        if quantity <= 0 || quantity > MAX_QUANTITY {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        if self.consumes_bulk() && quantity > bulk_available {
            return Err(InventoryError::InsufficientStock {
                requested: quantity,
                available: bulk_available.max(0),
            });
        }
        let ledger_delta = if self.consumes_bulk() { -quantity } else { quantity };
        let units_to_create = if self.creates_units() {
            usize::try_from(quantity).map_err(|_| InventoryError::InvalidQuantity(quantity))?
        } else {
            0
        };
        Ok(ConversionPlan {
            op: *self,
            quantity,
            ledger_reason: self.ledger_reason(),
            ledger_delta,
            units_to_create,
        })
    }
}

impl core::fmt::Display for ConversionOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ConversionOp {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "convert-to-tracked" | "convert" => Ok(ConversionOp::ConvertToTracked),
            "add-tracked" => Ok(ConversionOp::AddTracked),
            "add-bulk" => Ok(ConversionOp::AddBulk),
            "remove-bulk" => Ok(ConversionOp::RemoveBulk),
            other => Err(InventoryError::InvalidRequest(format!("unknown conversion '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_follow_the_conversion_table() {
        let k = 10;
        let convert = ConversionOp::ConvertToTracked.plan(k, 50).unwrap();
        assert_eq!(convert.effect(), LedgerEffect { bulk: -k, tracked: k, master: 0 });
        assert_eq!(convert.units_to_create, 10);

        let add_tracked = ConversionOp::AddTracked.plan(k, 0).unwrap();
        assert_eq!(add_tracked.effect(), LedgerEffect { bulk: 0, tracked: k, master: k });
        assert_eq!(add_tracked.units_to_create, 10);

        let add_bulk = ConversionOp::AddBulk.plan(k, 0).unwrap();
        assert_eq!(add_bulk.effect(), LedgerEffect { bulk: k, tracked: 0, master: k });
        assert_eq!(add_bulk.units_to_create, 0);

        let remove_bulk = ConversionOp::RemoveBulk.plan(k, 10).unwrap();
        assert_eq!(remove_bulk.effect(), LedgerEffect { bulk: -k, tracked: 0, master: -k });
    }

    #[test]
    fn quantity_must_be_positive() {
        assert_eq!(ConversionOp::AddBulk.plan(0, 0), Err(InventoryError::InvalidQuantity(0)));
        assert_eq!(ConversionOp::AddTracked.plan(-2, 0), Err(InventoryError::InvalidQuantity(-2)));
    }

    #[test]
    fn quantity_is_capped() {
        assert!(ConversionOp::AddBulk.plan(MAX_QUANTITY, 0).is_ok());
        assert_eq!(
            ConversionOp::AddBulk.plan(i64::MAX, 0),
            Err(InventoryError::InvalidQuantity(i64::MAX))
        );
        assert_eq!(
            ConversionOp::RemoveBulk.plan(MAX_QUANTITY + 1, i64::MAX),
            Err(InventoryError::InvalidQuantity(MAX_QUANTITY + 1))
        );
    }

    #[test]
    fn bulk_draws_are_checked_against_available_pool() {
        assert_eq!(
            ConversionOp::ConvertToTracked.plan(11, 10),
            Err(InventoryError::InsufficientStock { requested: 11, available: 10 })
        );
        assert_eq!(
            ConversionOp::RemoveBulk.plan(1, 0),
            Err(InventoryError::InsufficientStock { requested: 1, available: 0 })
        );
        // Additions never need pool headroom.
        assert!(ConversionOp::AddBulk.plan(5, -3).is_ok());
    }

    #[test]
    fn operation_names_parse() {
        assert_eq!("convert".parse::<ConversionOp>().unwrap(), ConversionOp::ConvertToTracked);
        assert_eq!("remove-bulk".parse::<ConversionOp>().unwrap(), ConversionOp::RemoveBulk);
        assert!("remove-tracked".parse::<ConversionOp>().is_err());
    }
}
