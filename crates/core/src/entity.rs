//! Entity trait: identity + continuity across state changes.

use std::collections::HashSet;

/// Entity marker + minimal interface.
///
/// Rules and catalog entries are entities: two rules with the same id are the
/// same rule, even if a newer snapshot changed their conditions.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// First id that occurs more than once, in iteration order.
pub fn first_duplicate_id<'a, E, I>(entities: I) -> Option<&'a E::Id>
where
    E: Entity + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let mut seen = HashSet::new();
    entities.into_iter().map(Entity::id).find(|id| !seen.insert(*id))
}
