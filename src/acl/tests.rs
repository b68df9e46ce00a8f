//! ACL module tests

use super::*;
use crate::config::{AclClientRole, AclConfig, AclPermissions, AclRole};

fn make_test_acl_config() -> AclConfig {
    AclConfig {
        enabled: true,
        roles: vec![
            AclRole {
                name: "admin".to_string(),
                publish: vec!["#".to_string()],
                subscribe: vec!["#".to_string()],
            },
            AclRole {
                name: "device".to_string(),
                publish: vec!["sensors/%c/#".to_string()],
                subscribe: vec!["commands/%c/#".to_string()],
            },
            AclRole {
                name: "reader".to_string(),
                publish: vec![],
                subscribe: vec!["sensors/#".to_string()],
            },
        ],
        clients: vec![
            AclClientRole {
                client_id: "admin_client".to_string(),
                role: "admin".to_string(),
            },
            AclClientRole {
                client_id: "sensor_client".to_string(),
                role: "device".to_string(),
            },
            AclClientRole {
                client_id: "reader_client".to_string(),
                role: "reader".to_string(),
            },
        ],
        default: AclPermissions {
            publish: vec![],
            subscribe: vec!["$SYS/broker/+".to_string()],
        },
    }
}

#[test]
fn test_acl_disabled_allows_all() {
    let acl_config = AclConfig {
        enabled: false,
        ..Default::default()
    };
    let provider = AclProvider::new(&acl_config);
    assert_eq!(
        provider.check_publish("client1", "any/topic"),
        AclDecision::Allow
    );
}

#[test]
fn test_admin_can_publish_anywhere() {
    let provider = AclProvider::new(&make_test_acl_config());
    assert_eq!(
        provider.check_publish("admin_client", "any/topic/here"),
        AclDecision::Allow
    );
}

#[test]
fn test_device_can_publish_to_own_topic_only() {
    let provider = AclProvider::new(&make_test_acl_config());
    assert_eq!(
        provider.check_publish("sensor_client", "sensors/sensor_client/temperature"),
        AclDecision::Allow
    );
    assert_eq!(
        provider.check_publish("sensor_client", "sensors/other_client/temperature"),
        AclDecision::Deny
    );
}

#[test]
fn test_readonly_cannot_publish() {
    let provider = AclProvider::new(&make_test_acl_config());
    assert_eq!(
        provider.check_publish("reader_client", "sensors/temp"),
        AclDecision::Deny
    );
}

#[test]
fn test_readonly_can_subscribe_to_sensors_not_commands() {
    let provider = AclProvider::new(&make_test_acl_config());
    assert_eq!(
        provider.check_subscribe("reader_client", "sensors/temperature"),
        AclDecision::Allow
    );
    assert_eq!(
        provider.check_subscribe("reader_client", "commands/device1"),
        AclDecision::Deny
    );
}

#[test]
fn test_unknown_client_falls_back_to_default_permissions() {
    let provider = AclProvider::new(&make_test_acl_config());
    assert_eq!(
        provider.check_subscribe("stranger", "$SYS/broker/uptime"),
        AclDecision::Allow
    );
    assert_eq!(
        provider.check_publish("stranger", "sensors/temp"),
        AclDecision::Deny
    );
}

#[test]
fn test_check_read_matches_subscribe_patterns() {
    let provider = AclProvider::new(&make_test_acl_config());
    assert_eq!(
        provider.check_read("reader_client", "sensors/temperature", QoS::AtMostOnce, false),
        AclDecision::Allow
    );
    assert_eq!(
        provider.check_read("reader_client", "commands/device1", QoS::AtMostOnce, false),
        AclDecision::Deny
    );
}

#[test]
fn test_pattern_matching() {
    assert!(AclProvider::mqtt_pattern_match("foo/bar", "foo/bar"));
    assert!(!AclProvider::mqtt_pattern_match("foo/bar", "foo/baz"));
    assert!(AclProvider::mqtt_pattern_match("foo/+/bar", "foo/xxx/bar"));
    assert!(!AclProvider::mqtt_pattern_match("foo/+/bar", "foo/xxx/baz"));
    assert!(AclProvider::mqtt_pattern_match("foo/#", "foo/bar/baz"));
    assert!(AclProvider::mqtt_pattern_match("#", "any/topic/here"));
}

#[test]
fn test_variable_substitution() {
    assert!(AclProvider::matches_pattern(
        "sensors/%c/data",
        "sensors/client1/data",
        "client1",
    ));
    assert!(!AclProvider::matches_pattern(
        "sensors/%c/data",
        "sensors/other/data",
        "client1",
    ));
}
