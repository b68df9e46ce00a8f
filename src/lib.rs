//! vibemq-subs - subscription routing core for an MQTT-style broker
//!
//! Owns the topic trie, the per-client subscription index, and publish
//! dispatch (ACL, QoS, retain, no-local, shared-subscription round robin).
//! Transport, the wire codec, the outgoing queue, the retained-message
//! store, the ACL backend, `$SYS` publication and persistence are all
//! external collaborators this crate only defines trait boundaries for —
//! see `subs::dispatch` and `config`.

pub mod acl;
pub mod config;
pub mod protocol;
pub mod subs;
pub mod topic;

pub use acl::AclProvider;
pub use config::Config;
pub use protocol::{ProtocolVersion, QoS, RetainHandling, SubscriptionOptions};
pub use subs::{
    Acl, AclDecision, Delivery, EnqueueError, MidGenerator, OutgoingQueue, PersistenceHooks,
    PublishOutcome, SharedSubscriptionTree, SubsError, SubscribeOutcome, SubscriptionId,
    SubscriptionTree, Telemetry, TreeConfig, UnsubscribeReason,
};
