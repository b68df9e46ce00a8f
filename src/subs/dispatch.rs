//! Collaborator trait boundaries.
//!
//! `subs.c` calls straight into broker-global functions
//! (`acl_check`, `message_insert_outgoing`, `mid_generate`, `retain__store`,
//! `persist_subscription_delete`). This crate has no transport, codec,
//! retained-message store, or persistence layer of its own (see spec.md §1)
//! so each of those becomes a trait a caller implements, passed in by
//! reference for the duration of one `publish`/`subscribe`/`unsubscribe`/
//! `clean_session` call.
//!
//! Per §5, none of these may suspend the caller back to an event loop while
//! a traversal is in progress, so every method here is a plain `fn`, not
//! `async fn` — a deliberate departure from the teacher's `#[async_trait]`
//! `Hooks` trait.

use std::num::NonZeroU16;
use std::sync::Arc;

use crate::protocol::QoS;

/// Per-recipient ACL read check (`acl_check(..., READ)`).
pub trait Acl {
    fn check_read(&self, client_id: &str, topic: &str, qos: QoS, retain: bool) -> AclDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclDecision {
    Allow,
    Deny,
}

/// A fully-prepared delivery, handed to the outgoing queue for one recipient.
pub struct Delivery<'a, M> {
    pub client_id: &'a str,
    pub dup: bool,
    pub mid: u16,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Arc<M>,
    pub subscription_identifier: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    /// Aborts the whole publish traversal (spec §7).
    NoMem,
    /// Recorded on the `PublishOutcome` but does not stop other recipients.
    Other(String),
}

/// Stands in for `message_insert_outgoing`.
pub trait OutgoingQueue<M> {
    fn enqueue(&mut self, delivery: Delivery<'_, M>) -> Result<(), EnqueueError>;
}

/// Stands in for `mid_generate`; must return a non-zero packet id.
pub trait MidGenerator {
    fn next_packet_id(&mut self, client_id: &str) -> NonZeroU16;
}

/// Stands in for `retain__store`. The subscription core never calls this
/// itself (retained delivery happens on subscribe, outside this crate's
/// scope per spec.md §1) but the trait is part of the external-interface
/// surface a broker built on this core needs.
pub trait RetainStore<M> {
    fn store(&mut self, topic: &str, msg: Arc<M>);
}

/// Stands in for `persist_subscription_delete`. Default no-op, matching
/// spec.md's framing of persistence as an optional collaborator.
pub trait PersistenceHooks {
    fn on_subscription_deleted(&mut self, _client_id: &str, _filter: &str) {}
}

/// A hooks implementation that does nothing, for callers with no
/// persistence layer wired up.
pub struct NoPersistence;

impl PersistenceHooks for NoPersistence {}
