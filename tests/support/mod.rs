//! Shared test doubles for the subscription-core integration tests.
//!
//! These stand in for the collaborators `spec.md` §6 treats as external:
//! the ACL backend, the outgoing message queue, and the packet-id
//! generator.

use std::collections::HashSet;
use std::num::NonZeroU16;

use vibemq_subs::{Acl, AclDecision, Delivery, EnqueueError, MidGenerator, OutgoingQueue, QoS};

pub struct AllowAll;
impl Acl for AllowAll {
    fn check_read(&self, _client_id: &str, _topic: &str, _qos: QoS, _retain: bool) -> AclDecision {
        AclDecision::Allow
    }
}

pub struct DenyClients(pub HashSet<&'static str>);
impl Acl for DenyClients {
    fn check_read(&self, client_id: &str, _topic: &str, _qos: QoS, _retain: bool) -> AclDecision {
        if self.0.contains(client_id) {
            AclDecision::Deny
        } else {
            AclDecision::Allow
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
    pub client_id: String,
    pub qos: QoS,
    pub retain: bool,
    pub mid: u16,
}

#[derive(Default)]
pub struct RecordingQueue {
    pub deliveries: Vec<Recorded>,
}

impl OutgoingQueue<&'static str> for RecordingQueue {
    fn enqueue(&mut self, delivery: Delivery<'_, &'static str>) -> Result<(), EnqueueError> {
        self.deliveries.push(Recorded {
            client_id: delivery.client_id.to_string(),
            qos: delivery.qos,
            retain: delivery.retain,
            mid: delivery.mid,
        });
        Ok(())
    }
}

pub struct SeqMid(pub u16);
impl Default for SeqMid {
    fn default() -> Self {
        Self(1)
    }
}
impl MidGenerator for SeqMid {
    fn next_packet_id(&mut self, _client_id: &str) -> NonZeroU16 {
        let id = self.0;
        self.0 = self.0.wrapping_add(1).max(1);
        NonZeroU16::new(id).unwrap()
    }
}
