//! Conversion Service: moves quantity between the bulk pool and the unit registry.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use stockpool_core::{ActorId, ProductId, TenantId, UnitId};
use stockpool_inventory::{
    ConversionOp, DateWindow, InventoryError, InventoryResult, LedgerEntry, LedgerReason,
    NewLedgerEntry, StockEvent, Unit, UnitAttributes,
};

use crate::engine::availability::{AvailabilityCalculator, ProductState};
use crate::engine::ledger::StockLedger;
use crate::engine::registry::UnitRegistry;
use crate::feed::ChangeFeed;
use crate::locks::{KeyedLocks, ProductKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub product_id: ProductId,
    pub operation: ConversionOp,
    pub quantity: i64,
    /// Overrides the product's default prefix for generated unit codes.
    pub category_prefix: Option<String>,
    #[serde(default)]
    pub attributes: UnitAttributes,
    #[serde(default)]
    pub note: String,
}

/// What a conversion committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub entry: LedgerEntry,
    pub units: Vec<Unit>,
}

pub struct ConversionService {
    calculator: Arc<AvailabilityCalculator>,
    registry: Arc<UnitRegistry>,
    ledger: Arc<StockLedger>,
    locks: Arc<KeyedLocks<ProductKey>>,
    feed: Arc<ChangeFeed>,
}

impl ConversionService {
    pub fn new(
        calculator: Arc<AvailabilityCalculator>,
        registry: Arc<UnitRegistry>,
        ledger: Arc<StockLedger>,
        locks: Arc<KeyedLocks<ProductKey>>,
        feed: Arc<ChangeFeed>,
    ) -> Self {
        Self {
            calculator,
            registry,
            ledger,
            locks,
            feed,
        }
    }

    /// Run one conversion inside the product lock.
    ///
    /// Units are created before the ledger entry is appended; if the append
    /// fails the new units are deleted again, so the registry never holds
    /// units the ledger does not account for. `UnitsCreated` goes out only
    /// after the entry commits.
    pub fn convert(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        request: ConversionRequest,
        at: DateTime<Utc>,
    ) -> InventoryResult<ConversionOutcome> {
        let product_id = request.product_id;

        self.locks.with(&(tenant_id, product_id), || {
            let state = self.calculator.load(tenant_id, product_id)?;
            state.product.ensure_active()?;

            let bulk_available = bulk_available_on(&state, at);
            let plan = request.operation.plan(request.quantity, bulk_available).inspect_err(|err| {
                warn!(
                    %tenant_id,
                    %product_id,
                    operation = %request.operation,
                    quantity = request.quantity,
                    bulk_available,
                    error = %err,
                    "conversion rejected"
                );
            })?;

            let units = if plan.units_to_create > 0 {
                let prefix = request
                    .category_prefix
                    .as_deref()
                    .unwrap_or(&state.product.default_category_prefix);
                self.registry.create_units(
                    tenant_id,
                    product_id,
                    plan.units_to_create,
                    prefix,
                    request.attributes.clone(),
                    at,
                )?
            } else {
                Vec::new()
            };

            let appended = self.ledger.append(NewLedgerEntry {
                tenant_id,
                product_id,
                delta: plan.ledger_delta,
                reason: plan.ledger_reason,
                note: request.note.clone(),
                actor,
                occurred_at: at,
            });
            let entry = match appended {
                Ok(entry) => entry,
                Err(err) => {
                    error!(
                        %tenant_id,
                        %product_id,
                        error = %err,
                        "ledger append failed; rolling back created units"
                    );
                    self.registry.delete(&units)?;
                    return Err(err);
                }
            };

            info!(
                %tenant_id,
                %product_id,
                operation = %plan.op,
                quantity = plan.quantity,
                units_created = units.len(),
                "conversion committed"
            );
            if !units.is_empty() {
                self.feed.publish(StockEvent::UnitsCreated {
                    tenant_id,
                    product_id,
                    unit_ids: units.iter().map(|u| u.id).collect(),
                    codes: units.iter().map(|u| u.code.to_string()).collect(),
                    occurred_at: at,
                });
            }
            Ok(ConversionOutcome { entry, units })
        })
    }

    pub fn convert_to_tracked(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        quantity: i64,
        category_prefix: Option<String>,
        at: DateTime<Utc>,
    ) -> InventoryResult<ConversionOutcome> {
        self.convert(
            tenant_id,
            actor,
            simple_request(product_id, ConversionOp::ConvertToTracked, quantity, category_prefix),
            at,
        )
    }

    pub fn add_tracked(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        quantity: i64,
        category_prefix: Option<String>,
        at: DateTime<Utc>,
    ) -> InventoryResult<ConversionOutcome> {
        self.convert(
            tenant_id,
            actor,
            simple_request(product_id, ConversionOp::AddTracked, quantity, category_prefix),
            at,
        )
    }

    pub fn add_bulk(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> InventoryResult<ConversionOutcome> {
        let request = simple_request(product_id, ConversionOp::AddBulk, quantity, None);
        self.convert(tenant_id, actor, request, at)
    }

    pub fn remove_bulk(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> InventoryResult<ConversionOutcome> {
        let request = simple_request(product_id, ConversionOp::RemoveBulk, quantity, None);
        self.convert(tenant_id, actor, request, at)
    }

    /// Manual bulk-pool correction. Negative deltas may not take more than the
    /// bulk pool available today.
    pub fn adjust(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        product_id: ProductId,
        delta: i64,
        note: String,
        at: DateTime<Utc>,
    ) -> InventoryResult<LedgerEntry> {
        LedgerReason::ManualAdjust.validate_delta(delta)?;

        self.locks.with(&(tenant_id, product_id), || {
            let state = self.calculator.load(tenant_id, product_id)?;
            state.product.ensure_active()?;
            let bulk_available = bulk_available_on(&state, at);
            if delta < 0 && -delta > bulk_available {
                warn!(%tenant_id, %product_id, delta, bulk_available, "adjustment rejected");
                return Err(InventoryError::InsufficientStock {
                    requested: -delta,
                    available: bulk_available.max(0),
                });
            }
            self.ledger.append(NewLedgerEntry {
                tenant_id,
                product_id,
                delta,
                reason: LedgerReason::ManualAdjust,
                note,
                actor,
                occurred_at: at,
            })
        })
    }

    /// Destroy tracked units explicitly.
    ///
    /// Every unit must belong to the same product and have no active
    /// reservation that is current or still to come. Writes one
    /// `remove-tracked` entry for the whole batch.
    pub fn remove_units(
        &self,
        tenant_id: TenantId,
        actor: ActorId,
        unit_ids: Vec<UnitId>,
        note: String,
        at: DateTime<Utc>,
    ) -> InventoryResult<ConversionOutcome> {
        let first = unit_ids.first().copied().ok_or(InventoryError::InvalidQuantity(0))?;
        let distinct: HashSet<UnitId> = unit_ids.iter().copied().collect();
        if distinct.len() != unit_ids.len() {
            return Err(InventoryError::InvalidRequest("duplicate unit ids".to_string()));
        }
        let product_id = self.registry.get(tenant_id, first)?.product_id;

        self.locks.with(&(tenant_id, product_id), || {
            let state = self.calculator.load(tenant_id, product_id)?;
            state.product.ensure_active()?;
            let today = at.date_naive();

            let mut doomed = Vec::with_capacity(unit_ids.len());
            for unit_id in &unit_ids {
                let Some(unit) = state.unit(*unit_id) else {
                    self.registry.get(tenant_id, *unit_id)?;
                    return Err(InventoryError::MixedProducts);
                };
                if state
                    .reservations
                    .iter()
                    .any(|r| r.holds_unit(*unit_id) && r.is_pending_on(today))
                {
                    warn!(%tenant_id, %product_id, %unit_id, "unit removal blocked by reservation");
                    return Err(InventoryError::UnitUnavailable(*unit_id));
                }
                doomed.push(unit.clone());
            }

            self.registry.delete(&doomed)?;
            let appended = self.ledger.append(NewLedgerEntry {
                tenant_id,
                product_id,
                delta: -(doomed.len() as i64),
                reason: LedgerReason::RemoveTracked,
                note: note.clone(),
                actor,
                occurred_at: at,
            });
            let entry = match appended {
                Ok(entry) => entry,
                Err(err) => {
                    error!(
                        %tenant_id,
                        %product_id,
                        error = %err,
                        "ledger append failed; restoring units"
                    );
                    self.registry.restore(&doomed)?;
                    return Err(err);
                }
            };

            info!(%tenant_id, %product_id, quantity = doomed.len(), "tracked units removed");
            self.feed.publish(StockEvent::UnitsRemoved {
                tenant_id,
                product_id,
                unit_ids: doomed.iter().map(|u| u.id).collect(),
                occurred_at: at,
            });
            Ok(ConversionOutcome { entry, units: doomed })
        })
    }
}

/// Bulk pool minus bulk reservations covering the day of `at`.
fn bulk_available_on(state: &ProductState, at: DateTime<Utc>) -> i64 {
    state.availability(&DateWindow::single_day(at.date_naive())).bulk_free
}

fn simple_request(
    product_id: ProductId,
    operation: ConversionOp,
    quantity: i64,
    category_prefix: Option<String>,
) -> ConversionRequest {
    ConversionRequest {
        product_id,
        operation,
        quantity,
        category_prefix,
        attributes: UnitAttributes::new(),
        note: String::new(),
    }
}
