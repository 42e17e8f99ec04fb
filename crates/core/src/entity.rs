//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Roles, schools and branches are entities: two snapshots with the same id
/// describe the same thing even when their names or permission sets differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether `other` refers to the same entity (regardless of its state).
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
