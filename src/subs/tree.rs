//! The subscription routing core: trie + client index + publish dispatch.
//!
//! This is the Rust counterpart of `subs.c`'s `sub__add`/`sub__remove`/
//! `sub__search`/`sub__process`/`sub__clean_session`, rebuilt around the
//! arena/index representation from `super::arena` and `super::ids` instead
//! of raw back-pointers. See spec.md §4 for the algorithm this follows
//! step for step.

use std::sync::Arc;

use ahash::AHashMap;
use compact_str::CompactString;
use smallvec::SmallVec;

use crate::protocol::{ProtocolVersion, QoS, SubscriptionOptions};
use crate::topic::tokenize::tokenize_filter;

use super::arena::Arena;
use super::dispatch::{AclDecision, Delivery, EnqueueError};
use super::error::{PublishOutcome, SubsError, SubscribeOutcome, UnsubscribeReason};
use super::ids::{LeafId, NodeId, ShareId, SubscriptionId};
use super::node::{ClientSubIndex, ShareGroup, SubLeaf, TrieNode};
use super::telemetry::Telemetry;
use super::{Acl, MidGenerator, OutgoingQueue, PersistenceHooks};

/// The subset of broker-wide feature flags this core reads. See
/// `crate::config::Config` for where these come from in a full broker.
#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    /// If set, delivered QoS always equals the subscriber's QoS instead of
    /// `min(publish_qos, subscriber_qos)`.
    pub upgrade_outgoing_qos: bool,
    /// 0 = unlimited.
    pub max_topic_levels: usize,
    pub wildcard_subscriptions: bool,
    pub shared_subscriptions: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            upgrade_outgoing_qos: false,
            max_topic_levels: 0,
            wildcard_subscriptions: true,
            shared_subscriptions: true,
        }
    }
}

enum DeliverOutcome {
    Delivered,
    Denied,
    Skipped,
    QueueError,
}

pub struct SubscriptionTree<M> {
    root: NodeId,
    nodes: Arena<TrieNode>,
    leaves: Arena<SubLeaf>,
    shares: Arena<ShareGroup>,
    clients: AHashMap<Arc<str>, ClientSubIndex>,
    telemetry: Telemetry,
    config: TreeConfig,
    _marker: std::marker::PhantomData<fn(M)>,
}

impl<M> SubscriptionTree<M> {
    pub fn new(config: TreeConfig) -> Self {
        let mut nodes = Arena::new();
        let root = NodeId(nodes.insert(TrieNode::root()));
        Self {
            root,
            nodes,
            leaves: Arena::new(),
            shares: Arena::new(),
            clients: AHashMap::new(),
            telemetry: Telemetry::new(),
            config,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    // ---- C6: subscribe --------------------------------------------------

    pub fn subscribe(
        &mut self,
        client: Arc<str>,
        filter: &str,
        options: SubscriptionOptions,
        identifier: Option<SubscriptionId>,
        protocol_version: ProtocolVersion,
    ) -> Result<SubscribeOutcome, SubsError> {
        let tokenized = tokenize_filter(filter)?;

        if self.config.max_topic_levels > 0 && tokenized.levels.len() > self.config.max_topic_levels
        {
            return Err(SubsError::Inval("topic filter exceeds maximum allowed levels"));
        }
        if !self.config.wildcard_subscriptions
            && tokenized.levels.iter().any(|l| *l == "+" || *l == "#")
        {
            return Err(SubsError::Inval("wildcard subscriptions are disabled"));
        }
        if tokenized.share_group.is_some() && !self.config.shared_subscriptions {
            return Err(SubsError::Inval("shared subscriptions are disabled"));
        }

        let node = self.walk_or_create(&tokenized.levels);
        let topic_filter: Arc<str> = Arc::from(filter);
        let outcome = self.add_leaf(
            node,
            tokenized.share_group,
            client,
            options,
            identifier,
            topic_filter,
        );

        let outcome = if outcome == SubscribeOutcome::SubExists
            && !protocol_version.surfaces_sub_exists()
        {
            SubscribeOutcome::Success
        } else {
            outcome
        };

        tracing::debug!(filter, outcome = ?outcome, "subscribe");
        Ok(outcome)
    }

    fn walk_or_create(&mut self, levels: &[&str]) -> NodeId {
        let mut current = self.root;
        for level in levels {
            let parent = current;
            let existing = self
                .nodes
                .get(parent.0)
                .expect("node must exist")
                .children
                .get(*level)
                .copied();
            current = match existing {
                Some(id) => id,
                None => {
                    let id = NodeId(self.nodes.insert(TrieNode::new_child(level, parent)));
                    self.nodes
                        .get_mut(parent.0)
                        .expect("parent must exist")
                        .children
                        .insert(CompactString::new(*level), id);
                    id
                }
            };
        }
        current
    }

    fn add_leaf(
        &mut self,
        node: NodeId,
        share_name: Option<&str>,
        client: Arc<str>,
        options: SubscriptionOptions,
        identifier: Option<SubscriptionId>,
        topic_filter: Arc<str>,
    ) -> SubscribeOutcome {
        let shared_id = share_name.map(|name| self.find_or_create_share(node, name));

        let existing_leaf_id = match shared_id {
            Some(sid) => self
                .shares
                .get(sid.0)
                .expect("share group must exist")
                .subs
                .iter()
                .copied()
                .find(|&lid| self.leaf_client(lid) == client.as_ref()),
            None => self
                .nodes
                .get(node.0)
                .expect("node must exist")
                .subs
                .iter()
                .copied()
                .find(|&lid| self.leaf_client(lid) == client.as_ref()),
        };

        if let Some(lid) = existing_leaf_id {
            let leaf = self.leaves.get_mut(lid.0).expect("leaf must exist");
            leaf.options = options;
            leaf.identifier = identifier;
            return SubscribeOutcome::SubExists;
        }

        let leaf_id = LeafId(self.leaves.insert(SubLeaf {
            client: Arc::clone(&client),
            options,
            identifier,
            topic_filter,
            hier: node,
            shared: shared_id,
        }));

        match shared_id {
            Some(sid) => {
                self.shares
                    .get_mut(sid.0)
                    .expect("share group must exist")
                    .subs
                    .push_back(leaf_id);
            }
            None => {
                self.nodes
                    .get_mut(node.0)
                    .expect("node must exist")
                    .subs
                    .push(leaf_id);
            }
        }

        self.clients.entry(client).or_default().insert(leaf_id);
        self.telemetry.on_leaf_added(shared_id.is_some());
        SubscribeOutcome::Success
    }

    fn find_or_create_share(&mut self, node: NodeId, name: &str) -> ShareId {
        let existing = self
            .nodes
            .get(node.0)
            .expect("node must exist")
            .shared
            .get(name)
            .copied();
        match existing {
            Some(id) => id,
            None => {
                let id = ShareId(self.shares.insert(ShareGroup::new(name)));
                self.nodes
                    .get_mut(node.0)
                    .expect("node must exist")
                    .shared
                    .insert(CompactString::new(name), id);
                id
            }
        }
    }

    fn leaf_client(&self, leaf: LeafId) -> &str {
        &self.leaves.get(leaf.0).expect("leaf must exist").client
    }

    // ---- C6: unsubscribe -------------------------------------------------

    pub fn unsubscribe(
        &mut self,
        client: &str,
        filter: &str,
    ) -> Result<UnsubscribeReason, SubsError> {
        let tokenized = tokenize_filter(filter)?;

        let mut current = self.root;
        for level in tokenized.levels.iter() {
            match self
                .nodes
                .get(current.0)
                .expect("node must exist")
                .children
                .get(*level)
                .copied()
            {
                Some(id) => current = id,
                None => return Ok(UnsubscribeReason::NoSubscriptionExisted),
            }
        }

        let leaf_id = match tokenized.share_group {
            Some(name) => {
                let share_id = self
                    .nodes
                    .get(current.0)
                    .expect("node must exist")
                    .shared
                    .get(name)
                    .copied();
                share_id.and_then(|sid| {
                    self.shares
                        .get(sid.0)
                        .expect("share group must exist")
                        .subs
                        .iter()
                        .copied()
                        .find(|&lid| self.leaf_client(lid) == client)
                })
            }
            None => self
                .nodes
                .get(current.0)
                .expect("node must exist")
                .subs
                .iter()
                .copied()
                .find(|&lid| self.leaf_client(lid) == client),
        };

        let Some(leaf_id) = leaf_id else {
            return Ok(UnsubscribeReason::NoSubscriptionExisted);
        };

        let owning_node = self.detach_and_free_leaf(leaf_id);
        self.prune_upward(owning_node);
        tracing::debug!(filter, "unsubscribe");
        Ok(UnsubscribeReason::Removed)
    }

    fn detach_and_free_leaf(&mut self, leaf_id: LeafId) -> NodeId {
        let leaf = self.leaves.remove(leaf_id.0).expect("leaf must exist");

        if let Some(index) = self.clients.get_mut(&leaf.client) {
            index.remove(leaf_id);
            if index.is_empty() {
                self.clients.remove(&leaf.client);
            }
        }

        self.telemetry.on_leaf_removed(leaf.shared.is_some());

        if let Some(share_id) = leaf.shared {
            if let Some(group) = self.shares.get_mut(share_id.0) {
                group.subs.retain(|&l| l != leaf_id);
                if group.subs.is_empty() {
                    let name = group.name.clone();
                    self.shares.remove(share_id.0);
                    if let Some(node) = self.nodes.get_mut(leaf.hier.0) {
                        node.shared.remove(&name);
                    }
                }
            }
        } else if let Some(node) = self.nodes.get_mut(leaf.hier.0) {
            node.subs.retain(|&l| l != leaf_id);
        }

        leaf.hier
    }

    fn prune_upward(&mut self, mut node: NodeId) {
        loop {
            let (parent, empty) = {
                let n = self.nodes.get(node.0).expect("node must exist");
                (n.parent, n.is_empty())
            };
            let Some(parent) = parent else {
                break; // root, never pruned
            };
            if !empty {
                break;
            }
            let token = self
                .nodes
                .get(node.0)
                .expect("node must exist")
                .topic
                .clone();
            if let Some(p) = self.nodes.get_mut(parent.0) {
                p.children.remove(&token);
            }
            self.nodes.remove(node.0);
            node = parent;
        }
    }

    // ---- C6: clean-session ------------------------------------------------

    pub fn clean_session(&mut self, client: &str, hooks: &mut dyn PersistenceHooks) {
        let Some(index) = self.clients.remove(client) else {
            return;
        };

        let leaf_ids: Vec<LeafId> = index.iter().collect();
        for leaf_id in leaf_ids {
            if let Some(leaf) = self.leaves.get(leaf_id.0) {
                hooks.on_subscription_deleted(client, &leaf.topic_filter);
            }
            let owning_node = self.detach_and_free_leaf(leaf_id);
            self.prune_upward(owning_node);
        }
    }

    // ---- C7/C8: publish ----------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn publish(
        &mut self,
        source_id: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
        msg: Arc<M>,
        acl: &dyn Acl,
        queue: &mut dyn OutgoingQueue<M>,
        mid_gen: &mut dyn MidGenerator,
    ) -> Result<PublishOutcome, SubsError> {
        let tokens: SmallVec<[&str; 8]> = topic.split('/').collect();
        let root = self.root;
        let (matched, had_errors) = self.search(
            root, &tokens, true, source_id, topic, qos, retain, &msg, acl, queue, mid_gen,
        )?;

        let outcome = if matched {
            PublishOutcome::Delivered { had_errors }
        } else {
            PublishOutcome::NoSubscribers
        };
        tracing::trace!(topic, outcome = ?outcome, "publish routed");
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &mut self,
        node: NodeId,
        tokens: &[&str],
        at_root: bool,
        source_id: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
        msg: &Arc<M>,
        acl: &dyn Acl,
        queue: &mut dyn OutgoingQueue<M>,
        mid_gen: &mut dyn MidGenerator,
    ) -> Result<(bool, bool), SubsError> {
        let mut matched = false;
        let mut had_errors = false;

        // A leading `$` in the very first published level must never match
        // a root `+`/`#` subscription (spec.md §4.4).
        let skip_wildcards_here = at_root && tokens.first().is_some_and(|t| t.starts_with('$'));

        if let Some((first, rest)) = tokens.split_first() {
            let literal_child = self
                .nodes
                .get(node.0)
                .expect("node must exist")
                .children
                .get(*first)
                .copied();
            if let Some(child) = literal_child {
                let (m, e) = self.search(
                    child, rest, false, source_id, topic, qos, retain, msg, acl, queue, mid_gen,
                )?;
                matched |= m;
                had_errors |= e;
                if rest.is_empty() {
                    let (m2, e2) =
                        self.dispatch_node(child, source_id, topic, qos, retain, msg, acl, queue, mid_gen)?;
                    matched |= m2;
                    had_errors |= e2;
                }
            }

            if !skip_wildcards_here {
                let plus_child = self
                    .nodes
                    .get(node.0)
                    .expect("node must exist")
                    .children
                    .get("+")
                    .copied();
                if let Some(child) = plus_child {
                    let (m, e) = self.search(
                        child, rest, false, source_id, topic, qos, retain, msg, acl, queue,
                        mid_gen,
                    )?;
                    matched |= m;
                    had_errors |= e;
                    if rest.is_empty() {
                        let (m2, e2) = self.dispatch_node(
                            child, source_id, topic, qos, retain, msg, acl, queue, mid_gen,
                        )?;
                        matched |= m2;
                        had_errors |= e2;
                    }
                }
            }
        }

        if !skip_wildcards_here {
            let hash_child = self
                .nodes
                .get(node.0)
                .expect("node must exist")
                .children
                .get("#")
                .copied();
            if let Some(child) = hash_child {
                debug_assert!(
                    self.nodes
                        .get(child.0)
                        .expect("node must exist")
                        .children
                        .is_empty(),
                    "a '#' node must never have children (enforced at tokenize time)"
                );
                let (m, e) = self.dispatch_node(child, source_id, topic, qos, retain, msg, acl, queue, mid_gen)?;
                matched |= m;
                had_errors |= e;
            }
        }

        Ok((matched, had_errors))
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_node(
        &mut self,
        node: NodeId,
        source_id: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
        msg: &Arc<M>,
        acl: &dyn Acl,
        queue: &mut dyn OutgoingQueue<M>,
        mid_gen: &mut dyn MidGenerator,
    ) -> Result<(bool, bool), SubsError> {
        let (share_ids, direct_leaves, has_subscribers) = {
            let n = self.nodes.get(node.0).expect("node must exist");
            let share_ids: SmallVec<[ShareId; 4]> = n.shared.values().copied().collect();
            let direct_leaves: Vec<LeafId> = n.subs.clone();
            (share_ids, direct_leaves, !n.subs.is_empty() || !n.shared.is_empty())
        };

        let mut had_errors = false;

        // Shared dispatch: rotate the head to the tail unconditionally,
        // even on denial/failure, so a permanently-failing member never
        // starves the rest of the group (spec.md §9).
        for share_id in share_ids {
            let head = self
                .shares
                .get_mut(share_id.0)
                .expect("share group must exist")
                .subs
                .pop_front();
            if let Some(leaf_id) = head {
                let result = self.deliver_to_leaf(
                    leaf_id, source_id, topic, qos, retain, msg, acl, queue, mid_gen, true,
                );
                // Rotate the head to the tail before ever propagating an
                // error: the cursor must advance regardless of outcome
                // (spec.md §9), and `NoMem` must not leave this leaf
                // permanently dropped out of the group's round robin.
                self.shares
                    .get_mut(share_id.0)
                    .expect("share group must exist")
                    .subs
                    .push_back(leaf_id);
                let outcome = result?;
                if matches!(outcome, DeliverOutcome::QueueError) {
                    had_errors = true;
                }
            }
        }

        for leaf_id in direct_leaves {
            let outcome = self.deliver_to_leaf(
                leaf_id, source_id, topic, qos, retain, msg, acl, queue, mid_gen, false,
            )?;
            if matches!(outcome, DeliverOutcome::QueueError) {
                had_errors = true;
            }
        }

        Ok((has_subscribers, had_errors))
    }

    #[allow(clippy::too_many_arguments)]
    fn deliver_to_leaf(
        &mut self,
        leaf_id: LeafId,
        source_id: Option<&str>,
        topic: &str,
        qos: QoS,
        retain: bool,
        msg: &Arc<M>,
        acl: &dyn Acl,
        queue: &mut dyn OutgoingQueue<M>,
        mid_gen: &mut dyn MidGenerator,
        is_shared: bool,
    ) -> Result<DeliverOutcome, SubsError> {
        let leaf = self.leaves.get(leaf_id.0).expect("leaf must exist");

        if !is_shared {
            if let Some(src) = source_id {
                if leaf.options.no_local && leaf.client.as_ref() == src {
                    return Ok(DeliverOutcome::Skipped);
                }
            }
        }

        if acl.check_read(&leaf.client, topic, qos, retain) == AclDecision::Deny {
            return Ok(DeliverOutcome::Denied);
        }

        let client_qos = leaf.options.qos;
        let msg_qos = if self.config.upgrade_outgoing_qos {
            client_qos
        } else {
            qos.min(client_qos)
        };
        let mid: u16 = if msg_qos != QoS::AtMostOnce {
            mid_gen.next_packet_id(&leaf.client).get()
        } else {
            0
        };
        let effective_retain = leaf.options.retain_as_published && retain;
        let subscription_identifier = leaf.identifier.map(SubscriptionId::get);

        let delivery = Delivery {
            client_id: &leaf.client,
            dup: false,
            mid,
            qos: msg_qos,
            retain: effective_retain,
            payload: Arc::clone(msg),
            subscription_identifier,
        };

        match queue.enqueue(delivery) {
            Ok(()) => Ok(DeliverOutcome::Delivered),
            Err(EnqueueError::NoMem) => Err(SubsError::NoMem),
            Err(EnqueueError::Other(_)) => Ok(DeliverOutcome::QueueError),
        }
    }

    // ---- C9: diagnostics ----------------------------------------------------

    /// A human-readable dump of the trie, for debugging. Grounded in
    /// `subs.c`'s `sub__tree_print`.
    pub fn print_tree(&self) -> String {
        let mut out = String::new();
        self.print_node(self.root, 0, &mut out);
        out
    }

    fn print_node(&self, node: NodeId, depth: usize, out: &mut String) {
        let n = self.nodes.get(node.0).expect("node must exist");
        if depth > 0 {
            out.push_str(&"  ".repeat(depth - 1));
            out.push_str(&format!(
                "{} (subs={}, shared_groups={})\n",
                n.topic,
                n.subs.len(),
                n.shared.len()
            ));
        }
        let mut children: Vec<&CompactString> = n.children.keys().collect();
        children.sort();
        for key in children {
            let child = *n.children.get(key).expect("key came from this map");
            self.print_node(child, depth + 1, out);
        }
    }

    /// `$SYS/broker/subscribed_topics/...` payloads: one `(topic, count)`
    /// pair per node with at least one direct subscriber. Grounded in
    /// `subs.c`'s `sub__update_subscribed_topics`/`sub__build_full_topic`;
    /// publishing them is the caller's job (out of scope here, spec.md §1).
    pub fn subscribed_topics_payload(&self) -> Vec<(String, usize)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_subscribed_topics(self.root, &mut path, &mut out);
        out
    }

    fn collect_subscribed_topics(
        &self,
        node: NodeId,
        path: &mut Vec<CompactString>,
        out: &mut Vec<(String, usize)>,
    ) {
        let n = self.nodes.get(node.0).expect("node must exist");
        if !path.is_empty() && !n.subs.is_empty() {
            let topic = path
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join("/");
            out.push((format!("$SYS/broker/subscribed_topics/{topic}"), n.subs.len()));
        }
        let mut children: Vec<&CompactString> = n.children.keys().collect();
        children.sort();
        for key in children {
            let child = *n.children.get(key).expect("key came from this map");
            path.push(key.clone());
            self.collect_subscribed_topics(child, path, out);
            path.pop();
        }
    }
}
