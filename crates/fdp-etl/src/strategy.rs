//! Fetch strategies
//!
//! A strategy decides, per work item, whether a network fetch must happen
//! before the item can proceed. Pure decision logic: absence of cached
//! storage is "not required yet", never an error.

use crate::item::WorkItem;

/// Decides whether an item needs a network fetch
pub trait FetchStrategy: Send + Sync {
    fn is_fetch_required(&self, item: &WorkItem) -> bool;
}

/// Fetch only what has never been cached (append-only accumulation)
pub struct AppendStrategy;

impl FetchStrategy for AppendStrategy {
    fn is_fetch_required(&self, item: &WorkItem) -> bool {
        !item.store.exists()
    }
}

/// Always fetch (unconditional refresh)
pub struct ReplaceStrategy;

impl FetchStrategy for ReplaceStrategy {
    fn is_fetch_required(&self, _item: &WorkItem) -> bool {
        true
    }
}

/// Fetch when storage is absent or the item carries the `replace` flag
///
/// Lets a driver always refresh in-progress periods (the current season,
/// today's schedule) while leaving closed historical periods untouched.
pub struct ReplaceOnFlagStrategy;

impl FetchStrategy for ReplaceOnFlagStrategy {
    fn is_fetch_required(&self, item: &WorkItem) -> bool {
        !item.store.exists() || item.replace_flag()
    }
}
