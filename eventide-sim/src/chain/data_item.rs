//! Data items flowing through the chain.

use serde::{Deserialize, Serialize};

/// Entity passed from stage to stage.
///
/// Owned by exactly one stage process at a time; ownership moves to the
/// next stage when the previous one finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    /// Sequence number in generation order
    pub id: u32,
    /// Display name, `item-{id}`
    pub name: String,
    /// Counter bumped by every stage that acquires a resource
    pub value: i64,
}

impl DataItem {
    /// Creates item `id` with a zero counter.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: format!("item-{id}"),
            value: 0,
        }
    }

    /// Increments the counter and returns the new value.
    pub fn bump(&mut self) -> i64 {
        self.value += 1;
        self.value
    }
}
