//! Group id generation.
//!
//! Fresh [`GroupId`]s come from an external collaborator; the default source
//! is UUID v4, whose collision probability is negligible.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use parley_shared::GroupId;

/// Supplies fresh group identifiers, non-colliding with any prior id.
pub trait IdSource: Send + Sync {
    fn next_group_id(&self) -> GroupId;
}

/// Random UUID v4 ids.  The production source.
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_group_id(&self) -> GroupId {
        GroupId::new()
    }
}

/// Deterministic, sequential ids for tests.
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn next_group_id(&self) -> GroupId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        GroupId(Uuid::from_u128(n as u128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_distinct() {
        let ids = SequentialIds::new();
        let a = ids.next_group_id();
        let b = ids.next_group_id();
        assert_ne!(a, b);
    }
}
