//! Subscription routing core: topic trie, client index, subscribe/
//! unsubscribe, and publish dispatch (ACL, QoS, retain, no-local, shared
//! subscriptions).
//!
//! See spec.md for the full component breakdown (C1-C9); each submodule
//! here names the component(s) it implements.

pub mod arena;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod node;
pub mod telemetry;
pub mod tree;

pub use dispatch::{Acl, AclDecision, Delivery, EnqueueError, MidGenerator, NoPersistence, OutgoingQueue, PersistenceHooks, RetainStore};
pub use error::{PublishOutcome, SubsError, SubscribeOutcome, UnsubscribeReason};
pub use ids::{LeafId, NodeId, ShareId, SubscriptionId};
pub use telemetry::Telemetry;
pub use tree::{SubscriptionTree, TreeConfig};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::{ProtocolVersion, QoS, SubscriptionOptions};

/// Thread-safe wrapper matching spec.md §5's single-writer-lock
/// requirement: every call serializes on one `parking_lot::Mutex`, the
/// same dependency the teacher codebase uses for its own shared state.
pub struct SharedSubscriptionTree<M> {
    inner: Mutex<SubscriptionTree<M>>,
}

impl<M> SharedSubscriptionTree<M> {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            inner: Mutex::new(SubscriptionTree::new(config)),
        }
    }

    pub fn subscribe(
        &self,
        client: Arc<str>,
        filter: &str,
        options: SubscriptionOptions,
        identifier: Option<SubscriptionId>,
        protocol_version: ProtocolVersion,
    ) -> Result<SubscribeOutcome, SubsError> {
        self.inner
            .lock()
            .subscribe(client, filter, options, identifier, protocol_version)
    }

    pub fn unsubscribe(&self, client: &str, filter: &str) -> Result<UnsubscribeReason, SubsError> {
        self.inner.lock().unsubscribe(client, filter)
    }

    pub fn clean_session(&self, client: &str, hooks: &mut dyn PersistenceHooks) {
        self.inner.lock().clean_session(client, hooks)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn publish(
        &self,
        source_id: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
        msg: Arc<M>,
        acl: &dyn Acl,
        queue: &mut dyn OutgoingQueue<M>,
        mid_gen: &mut dyn MidGenerator,
    ) -> Result<PublishOutcome, SubsError> {
        self.inner
            .lock()
            .publish(source_id, topic, qos, retain, msg, acl, queue, mid_gen)
    }

    pub fn print_tree(&self) -> String {
        self.inner.lock().print_tree()
    }

    pub fn subscribed_topics_payload(&self) -> Vec<(String, usize)> {
        self.inner.lock().subscribed_topics_payload()
    }

    pub fn telemetry_snapshot(&self) -> (u64, u64) {
        let tree = self.inner.lock();
        (
            tree.telemetry().total_subscriptions(),
            tree.telemetry().shared_subscriptions(),
        )
    }
}
