//! Minimal end-to-end walkthrough of the subscription routing core:
//! subscribe a few clients (including a shared-subscription group and a
//! wildcard), publish a couple of messages, and print what got delivered.
//!
//! Run with `cargo run --example basic_routing`.

use std::num::NonZeroU16;
use std::sync::Arc;

use vibemq_subs::{
    Acl, AclDecision, Delivery, EnqueueError, MidGenerator, OutgoingQueue, ProtocolVersion, QoS,
    SubscriptionOptions, SubscriptionTree, TreeConfig,
};

struct AllowAll;
impl Acl for AllowAll {
    fn check_read(&self, _client_id: &str, _topic: &str, _qos: QoS, _retain: bool) -> AclDecision {
        AclDecision::Allow
    }
}

struct PrintingQueue;
impl OutgoingQueue<&'static str> for PrintingQueue {
    fn enqueue(&mut self, delivery: Delivery<'_, &'static str>) -> Result<(), EnqueueError> {
        println!(
            "  -> {:<10} qos={:?} retain={} mid={} payload={:?}",
            delivery.client_id, delivery.qos, delivery.retain, delivery.mid, delivery.payload
        );
        Ok(())
    }
}

struct SeqMid(u16);
impl MidGenerator for SeqMid {
    fn next_packet_id(&mut self, _client_id: &str) -> NonZeroU16 {
        self.0 += 1;
        NonZeroU16::new(self.0).unwrap()
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut tree: SubscriptionTree<&'static str> = SubscriptionTree::new(TreeConfig::default());

    tree.subscribe(
        Arc::from("dashboard"),
        "sensors/+/temperature",
        SubscriptionOptions {
            qos: QoS::AtLeastOnce,
            ..Default::default()
        },
        None,
        ProtocolVersion::V5,
    )
    .unwrap();

    for worker in ["worker-1", "worker-2", "worker-3"] {
        tree.subscribe(
            Arc::from(worker),
            "$share/workers/jobs/new",
            SubscriptionOptions {
                qos: QoS::AtLeastOnce,
                ..Default::default()
            },
            None,
            ProtocolVersion::V5,
        )
        .unwrap();
    }

    let acl = AllowAll;
    let mut queue = PrintingQueue;
    let mut mid = SeqMid(0);

    println!("publish sensors/kitchen/temperature:");
    tree.publish(
        None,
        "sensors/kitchen/temperature",
        QoS::AtLeastOnce,
        false,
        Arc::new("21.5C"),
        &acl,
        &mut queue,
        &mut mid,
    )
    .unwrap();

    println!("publish jobs/new x4 (round-robin across the shared group):");
    for _ in 0..4 {
        tree.publish(
            None,
            "jobs/new",
            QoS::AtLeastOnce,
            false,
            Arc::new("job-payload"),
            &acl,
            &mut queue,
            &mut mid,
        )
        .unwrap();
    }

    println!("\ntree dump:\n{}", tree.print_tree());
}
