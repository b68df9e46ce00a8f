//! Error and outcome types for the subscription core.
//!
//! Manual `Display`/`Error` impls, matching the style of
//! `vibemq::protocol::error` rather than reaching for `thiserror`.

use std::fmt;

/// Failure modes for `subscribe`/`unsubscribe`/`publish`.
///
/// `subs.c` overloads a single `mosq_err_t` for validation failures,
/// allocation failures, and the outgoing-queue's own errors. This splits
/// the case that must abort a traversal (`NoMem`) from the one that never
/// reaches routing (`Inval`, caught at the tokenizer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsError {
    /// Malformed filter: bad wildcard placement, bad `$share/` form, or an
    /// oversized level.
    Inval(&'static str),
    /// Allocation failure. Per spec §7 this is the only error that aborts
    /// an in-progress publish traversal; partial state created before the
    /// failure is rolled back at the point of failure.
    NoMem,
}

impl fmt::Display for SubsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inval(msg) => write!(f, "invalid subscription: {}", msg),
            Self::NoMem => write!(f, "allocation failure"),
        }
    }
}

impl std::error::Error for SubsError {}

/// Result of `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new leaf was created.
    Success,
    /// An existing (client, filter) leaf had its options/identifier
    /// overwritten in place. Surfaced as-is for v3.1/v5; swallowed to
    /// `Success` for v3.1.1 by the caller (`ProtocolVersion::surfaces_sub_exists`).
    SubExists,
}

/// Result of `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeReason {
    Removed,
    NoSubscriptionExisted,
}

/// Result of a publish routing call.
///
/// `had_errors` is set when a recipient's `OutgoingQueue::enqueue` returned
/// a transient error; per spec §7 such errors do not abort the traversal of
/// the remaining recipients, so they are accumulated here rather than
/// short-circuiting like `SubsError::NoMem` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    NoSubscribers,
    Delivered { had_errors: bool },
}

impl PublishOutcome {
    pub fn matched(self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
