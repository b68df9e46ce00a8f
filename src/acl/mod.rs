//! ACL (Access Control List) Module
//!
//! A sample `subs::Acl` implementation with:
//! - MQTT wildcards (# and +)
//! - Variable substitution (%c = client_id)
//! - Role-based permissions, assigned per client id
//!
//! The teacher's `AclProvider` resolves a role through its `auth::AuthProvider`
//! (username -> role); authentication is out of this crate's scope (spec.md
//! §1), so roles are looked up directly by client id here, and `%u`
//! username substitution is dropped along with it.

use std::collections::HashMap;

use crate::config::AclConfig;
use crate::protocol::QoS;
use crate::subs::{Acl, AclDecision};

#[cfg(test)]
mod tests;

/// ACL provider
pub struct AclProvider {
    enabled: bool,
    roles: HashMap<String, AclRoleEntry>,
    client_roles: HashMap<String, String>,
    default_publish: Vec<String>,
    default_subscribe: Vec<String>,
}

struct AclRoleEntry {
    publish: Vec<String>,
    subscribe: Vec<String>,
}

impl AclProvider {
    pub fn new(config: &AclConfig) -> Self {
        let mut roles = HashMap::new();
        for role in &config.roles {
            roles.insert(
                role.name.clone(),
                AclRoleEntry {
                    publish: role.publish.clone(),
                    subscribe: role.subscribe.clone(),
                },
            );
        }

        let client_roles = config
            .clients
            .iter()
            .map(|c| (c.client_id.clone(), c.role.clone()))
            .collect();

        Self {
            enabled: config.enabled,
            roles,
            client_roles,
            default_publish: config.default.publish.clone(),
            default_subscribe: config.default.subscribe.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn matches_pattern(pattern: &str, topic: &str, client_id: &str) -> bool {
        let pattern = pattern.replace("%c", client_id);
        Self::mqtt_pattern_match(&pattern, topic)
    }

    fn mqtt_pattern_match(pattern: &str, topic: &str) -> bool {
        let pattern_parts: Vec<&str> = pattern.split('/').collect();
        let topic_parts: Vec<&str> = topic.split('/').collect();

        let mut p_idx = 0;
        let mut t_idx = 0;

        while p_idx < pattern_parts.len() && t_idx < topic_parts.len() {
            let p = pattern_parts[p_idx];
            let t = topic_parts[t_idx];

            if p == "#" {
                return true;
            } else if p == "+" {
                p_idx += 1;
                t_idx += 1;
            } else if p == t {
                p_idx += 1;
                t_idx += 1;
            } else {
                return false;
            }
        }

        p_idx == pattern_parts.len() && t_idx == topic_parts.len()
    }

    fn check_patterns(patterns: &[String], topic: &str, client_id: &str) -> bool {
        patterns
            .iter()
            .any(|p| Self::matches_pattern(p, topic, client_id))
    }

    fn role_for(&self, client_id: &str) -> Option<&AclRoleEntry> {
        let role_name = self.client_roles.get(client_id)?;
        self.roles.get(role_name)
    }

    fn check(&self, client_id: &str, topic: &str, patterns_of: impl Fn(&AclRoleEntry) -> &[String], default: &[String]) -> AclDecision {
        if !self.enabled {
            return AclDecision::Allow;
        }
        if let Some(role) = self.role_for(client_id) {
            if Self::check_patterns(patterns_of(role), topic, client_id) {
                return AclDecision::Allow;
            }
        }
        if Self::check_patterns(default, topic, client_id) {
            return AclDecision::Allow;
        }
        AclDecision::Deny
    }

    /// Check whether `client_id` may publish to `topic` (used by the
    /// caller's publish handler before calling `SubscriptionTree::publish`;
    /// the tree itself only ever issues the read-side check below).
    pub fn check_publish(&self, client_id: &str, topic: &str) -> AclDecision {
        self.check(client_id, topic, |r| &r.publish, &self.default_publish)
    }

    pub fn check_subscribe(&self, client_id: &str, filter: &str) -> AclDecision {
        self.check(client_id, filter, |r| &r.subscribe, &self.default_subscribe)
    }
}

impl Acl for AclProvider {
    fn check_read(&self, client_id: &str, topic: &str, _qos: QoS, _retain: bool) -> AclDecision {
        self.check(client_id, topic, |r| &r.subscribe, &self.default_subscribe)
    }
}
