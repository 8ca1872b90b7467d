//! The event bus and staged chain substrate. See `DESIGN.md`.
//!
//! Two topic flavors live here: plain notification topics (fan-out,
//! side-effecting) and chained topics (fan-out registration followed by
//! ordered, per-stage mutation of a shared event value). Stage ordering is
//! the chain's public contract — see [`Stage`].

mod chain;
mod notification;

pub use chain::{Chain, ChainTopic, Stage};
pub use notification::NotificationTopic;

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle returned by `subscribe`/`subscribe_with_chain`. Only
/// meaningful to the topic that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[cfg(test)]
impl SubscriptionId {
    pub(crate) fn for_test(n: u64) -> Self {
        Self(n)
    }
}

#[derive(Default)]
pub(crate) struct IdAllocator(AtomicU64);

impl IdAllocator {
    pub(crate) fn next(&self) -> SubscriptionId {
        SubscriptionId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}
