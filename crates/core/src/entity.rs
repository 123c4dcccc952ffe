//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Published services are entities: two listings with the same id are the same
/// listing even if their copy differs.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
