//! Domain identifiers (strongly-typed IDs).
//!
//! Tasks, items and sellers are all plain non-negative integers on the wire
//! and in the store. `Id<T>` keeps them apart at compile time with a phantom
//! marker type, so a `TaskId` can never be passed where an `ItemId` is expected.
//!
//! ```ignore
//! let task_id = TaskId::new(1);
//! let item_id = ItemId::new(1);
//! // task_id == item_id  <- does not compile
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for each ID kind.
///
/// Provides the prefix used by `Display` ("task-", "item-", ...).
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic integer ID.
///
/// Serialized transparently as the bare integer so the JSON wire format stays
/// `{"task_id": 1, "item_id": 2, ...}`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<T: IdMarker> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Moderation task marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Advertisement (item under review) marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Item {}

impl IdMarker for Item {
    fn prefix() -> &'static str {
        "item-"
    }
}

/// Seller marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Seller {}

impl IdMarker for Seller {
    fn prefix() -> &'static str {
        "seller-"
    }
}

pub type TaskId = Id<Task>;
pub type ItemId = Id<Item>;
pub type SellerId = Id<Seller>;
