//! `stockpool-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::ParseIdError;
pub use id::{ActorId, JobId, LedgerEntryId, ProductId, ReservationId, TenantId, UnitId};
pub use value_object::ValueObject;
