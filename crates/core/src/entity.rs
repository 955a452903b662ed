//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products, units and reservations are entities: two units with identical
/// attributes are still different units.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
