//! Request/response bodies (camelCase JSON) and their mapping to engine types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockpool_core::{ActorId, JobId, LedgerEntryId, ProductId, ReservationId, UnitId};
use stockpool_infra::{ConversionRequest, ConversionResult};
use stockpool_inventory::{
    AllocationRequest, Availability, ConversionOp, DateWindow, InventoryError, InventoryResult,
    LedgerEntry, LedgerReason, NewProduct, Product, Reservation, ReservationState,
    ReservationTarget, StockTotals, Unit, UnitAttributes, UnitStatus,
};

// ---- shared ----

/// `{start, end?}`; a missing `end` is open-ended for reservations.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct WindowDto {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl WindowDto {
    pub fn into_window(self) -> InventoryResult<DateWindow> {
        DateWindow::new(self.start, self.end)
    }
}

impl From<DateWindow> for WindowDto {
    fn from(w: DateWindow) -> Self {
        Self {
            start: w.start(),
            end: w.end(),
        }
    }
}

// ---- availability / stock ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub product_id: String,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeUnitDto {
    pub id: UnitId,
    pub code: String,
    pub attributes: UnitAttributes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub product_id: ProductId,
    pub window: WindowDto,
    pub tracked: bool,
    pub bulk_pool: i64,
    pub bulk_reserved: i64,
    pub bulk_free: i64,
    pub tracked_free: Vec<FreeUnitDto>,
}

impl From<Availability> for AvailabilityResponse {
    fn from(a: Availability) -> Self {
        Self {
            product_id: a.product_id,
            window: a.window.into(),
            tracked: a.tracked,
            bulk_pool: a.bulk_pool,
            bulk_reserved: a.bulk_reserved,
            bulk_free: a.bulk_free,
            tracked_free: a
                .tracked_free
                .into_iter()
                .map(|u| FreeUnitDto {
                    id: u.id,
                    code: u.code.to_string(),
                    attributes: u.attributes,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub product_id: ProductId,
    pub as_of: NaiveDate,
    pub master_stock: i64,
    pub bulk_pool_count: i64,
    pub bulk_pool_available: i64,
    pub bulk_reserved: i64,
    pub total_unit_count: i64,
    pub tracked_available: i64,
    pub tracked_reserved: i64,
    pub tracked_maintenance: i64,
    pub tracked_retired: i64,
    pub low_stock: bool,
}

impl From<StockTotals> for StockResponse {
    fn from(t: StockTotals) -> Self {
        Self {
            product_id: t.product_id,
            as_of: t.as_of,
            master_stock: t.master_stock,
            bulk_pool_count: t.bulk_pool_count,
            bulk_pool_available: t.bulk_pool_available,
            bulk_reserved: t.bulk_reserved,
            total_unit_count: t.total_unit_count,
            tracked_available: t.tracked_available,
            tracked_reserved: t.tracked_reserved,
            tracked_maintenance: t.tracked_maintenance,
            tracked_retired: t.tracked_retired,
            low_stock: t.low_stock,
        }
    }
}

// ---- reservations ----

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationMode {
    Bulk,
    Specific,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub product_id: ProductId,
    pub window: WindowDto,
    pub mode: ReservationMode,
    pub quantity: Option<i64>,
    pub unit_ids: Option<Vec<UnitId>>,
    pub job_id: JobId,
}

impl CreateReservationRequest {
    pub fn into_allocation(self) -> InventoryResult<AllocationRequest> {
        let window = self.window.into_window()?;
        match (self.mode, self.quantity, self.unit_ids) {
            (ReservationMode::Bulk, Some(quantity), None) => {
                Ok(AllocationRequest::bulk(self.product_id, quantity, window, self.job_id))
            }
            (ReservationMode::Specific, None, Some(unit_ids)) => {
                Ok(AllocationRequest::specific(self.product_id, unit_ids, window, self.job_id))
            }
            (ReservationMode::Bulk, _, _) => Err(InventoryError::InvalidRequest(
                "bulk reservations take `quantity` and no `unitIds`".into(),
            )),
            (ReservationMode::Specific, _, _) => Err(InventoryError::InvalidRequest(
                "specific reservations take `unitIds` and no `quantity`".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: ReservationId,
    pub product_id: ProductId,
    pub job_id: JobId,
    pub mode: &'static str,
    pub quantity: i64,
    pub unit_ids: Vec<UnitId>,
    pub window: WindowDto,
    pub state: ReservationState,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        let unit_ids = match &r.target {
            ReservationTarget::Specific { unit_ids } => unit_ids.clone(),
            ReservationTarget::Bulk { .. } => Vec::new(),
        };
        Self {
            reservation_id: r.id,
            product_id: r.product_id,
            job_id: r.job_id,
            mode: r.target.mode(),
            quantity: r.target.quantity(),
            unit_ids,
            window: r.window.into(),
            state: r.state,
            created_by: r.created_by,
            created_at: r.created_at,
            released_at: r.released_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub reservation_id: ReservationId,
    /// `false` when the reservation was already released or never existed.
    pub released: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseJobResponse {
    pub job_id: JobId,
    pub released: Vec<ReservationId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsQuery {
    #[serde(default)]
    pub include_released: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatusesRequest {
    /// Defaults to today.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatusesResponse {
    pub as_of: NaiveDate,
    pub changed: usize,
}

// ---- conversions / adjustments ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequestDto {
    pub product_id: ProductId,
    pub operation: ConversionOp,
    pub quantity: i64,
    pub category_prefix: Option<String>,
    #[serde(default)]
    pub attributes: UnitAttributes,
    #[serde(default)]
    pub note: String,
}

impl From<ConversionRequestDto> for ConversionRequest {
    fn from(d: ConversionRequestDto) -> Self {
        Self {
            product_id: d.product_id,
            operation: d.operation,
            quantity: d.quantity,
            category_prefix: d.category_prefix,
            attributes: d.attributes,
            note: d.note,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub entry: LedgerEntryResponse,
    pub units: Vec<UnitResponse>,
    pub totals: StockResponse,
}

impl From<ConversionResult> for ConversionResponse {
    fn from(r: ConversionResult) -> Self {
        Self {
            entry: r.entry.into(),
            units: r.units.into_iter().map(Into::into).collect(),
            totals: r.totals.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub delta: i64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub id: LedgerEntryId,
    pub sequence: u64,
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: LedgerReason,
    pub note: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id(),
            sequence: e.sequence(),
            product_id: e.product_id(),
            delta: e.delta(),
            reason: e.reason(),
            note: e.note().to_string(),
            actor: e.actor(),
            occurred_at: e.occurred_at(),
        }
    }
}

// ---- products ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default = "default_true")]
    pub track_inventory: bool,
    #[serde(default)]
    pub low_stock_threshold: i64,
    pub default_category_prefix: Option<String>,
}

fn default_true() -> bool {
    true
}

impl From<CreateProductRequest> for NewProduct {
    fn from(d: CreateProductRequest) -> Self {
        Self {
            name: d.name,
            track_inventory: d.track_inventory,
            low_stock_threshold: d.low_stock_threshold,
            default_category_prefix: d.default_category_prefix,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub track_inventory: bool,
    pub low_stock_threshold: i64,
    pub default_category_prefix: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            track_inventory: p.track_inventory,
            low_stock_threshold: p.low_stock_threshold,
            default_category_prefix: p.default_category_prefix,
            active: p.active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// ---- units ----

#[derive(Debug, Deserialize)]
pub struct UnitsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitResponse {
    pub id: UnitId,
    pub product_id: ProductId,
    pub code: String,
    pub status: UnitStatus,
    pub attributes: UnitAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Unit> for UnitResponse {
    fn from(u: Unit) -> Self {
        Self {
            id: u.id,
            product_id: u.product_id,
            code: u.code.to_string(),
            status: u.status,
            attributes: u.attributes,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnitStatusRequest {
    pub status: UnitStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUnitsRequest {
    pub unit_ids: Vec<UnitId>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUnitsResponse {
    pub entry: LedgerEntryResponse,
    pub removed: Vec<UnitResponse>,
}
