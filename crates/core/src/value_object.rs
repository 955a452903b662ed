//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A date window or a
/// unit code is a value object; a unit is an entity.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (`DateWindow { 2024-01-10 ..= 2024-01-15 }` equals any
///   other window with the same bounds)
/// - **Entity**: Has identity (two units with the same code in different products are
///   different units)
///
/// To "modify" a value object, create a new one with the new values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
