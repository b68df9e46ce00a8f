//! Process-wide subscription counters (spec.md §6).
//!
//! `subs.c` increments/decrements two broker-global counters
//! (`db.subscription_count`, `db.shared_subscription_count`) on leaf
//! add/remove; these are their Rust equivalents, plain atomics rather than
//! a counter owned by a metrics subsystem (out of scope here — see
//! `subs::tree::SubscriptionTree::subscribed_topics_payload` for the
//! related `$SYS` diagnostic).

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Telemetry {
    total_subscriptions: AtomicU64,
    shared_subscriptions: AtomicU64,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_leaf_added(&self, shared: bool) {
        self.total_subscriptions.fetch_add(1, Ordering::Relaxed);
        if shared {
            self.shared_subscriptions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn on_leaf_removed(&self, shared: bool) {
        self.total_subscriptions.fetch_sub(1, Ordering::Relaxed);
        if shared {
            self.shared_subscriptions.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn total_subscriptions(&self) -> u64 {
        self.total_subscriptions.load(Ordering::Relaxed)
    }

    pub fn shared_subscriptions(&self) -> u64 {
        self.shared_subscriptions.load(Ordering::Relaxed)
    }
}
