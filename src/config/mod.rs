//! Configuration
//!
//! TOML-based configuration for the subscription routing core, with
//! support for:
//! - Logging level
//! - Routing feature flags (QoS upgrade, wildcard/shared subscriptions, topic depth)
//! - ACL roles
//! - Environment variable overrides (`VIBEMQ_SUBS_*` prefix)
//!
//! Everything network-, session- or persistence-shaped
//! (`server`/`limits`/`session`/`auth`/`bridge`/`cluster`/`metrics`) lived
//! on the teacher's `Config` but has no reader left in this crate, so it is
//! not reproduced here.

use std::path::Path;

use config::{Environment, File, FileFormat};
use serde::Deserialize;


/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Config(config::ConfigError),
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub routing: RoutingConfig,
    pub acl: AclConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Subscription routing feature flags (`subs::tree::TreeConfig` as loaded
/// from TOML — previously `vibemq::config::MqttConfig`, trimmed to the
/// knobs this core actually reads).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// If set, delivered QoS always equals the subscriber's QoS instead of
    /// `min(publish_qos, subscriber_qos)`.
    #[serde(default)]
    pub upgrade_outgoing_qos: bool,
    /// Whether `+`/`#` filters are accepted by `subscribe`.
    #[serde(default = "default_true")]
    pub wildcard_subscriptions: bool,
    /// Whether `$share/<group>/...` filters are accepted by `subscribe`.
    #[serde(default = "default_true")]
    pub shared_subscriptions: bool,
    /// Whether `subscribed_topics_payload` is meaningful to publish.
    #[serde(default = "default_true")]
    pub sys_topics: bool,
    /// Maximum topic levels in a filter or topic name (0 = unlimited).
    #[serde(default)]
    pub max_topic_levels: usize,
}

fn default_true() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            upgrade_outgoing_qos: false,
            wildcard_subscriptions: true,
            shared_subscriptions: true,
            sys_topics: true,
            max_topic_levels: 0,
        }
    }
}

impl From<&RoutingConfig> for crate::subs::TreeConfig {
    fn from(c: &RoutingConfig) -> Self {
        crate::subs::TreeConfig {
            upgrade_outgoing_qos: c.upgrade_outgoing_qos,
            max_topic_levels: c.max_topic_levels,
            wildcard_subscriptions: c.wildcard_subscriptions,
            shared_subscriptions: c.shared_subscriptions,
        }
    }
}

/// ACL configuration.
///
/// The teacher assigns a role to a username, resolved through its
/// `auth::AuthProvider`. Authentication is out of this crate's scope
/// (spec.md §1), so roles are assigned directly to client ids instead of
/// being mediated through a username lookup.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AclConfig {
    pub enabled: bool,
    #[serde(default)]
    pub roles: Vec<AclRole>,
    /// client_id -> role name
    #[serde(default)]
    pub clients: Vec<AclClientRole>,
    #[serde(default)]
    pub default: AclPermissions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AclRole {
    pub name: String,
    #[serde(default)]
    pub publish: Vec<String>,
    #[serde(default)]
    pub subscribe: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AclClientRole {
    pub client_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AclPermissions {
    pub publish: Vec<String>,
    pub subscribe: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file with environment variable
    /// overrides (`VIBEMQ_SUBS__SECTION__FIELD`, double underscore
    /// separating nested keys, matching the teacher's `VIBEMQ__` scheme).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("routing.upgrade_outgoing_qos", false)?
            .set_default("routing.wildcard_subscriptions", true)?
            .set_default("routing.shared_subscriptions", true)?
            .set_default("routing.sys_topics", true)?
            .set_default("routing.max_topic_levels", 0)?
            .set_default("acl.enabled", false)?;

        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                builder = builder.add_source(File::from_str(&content, FileFormat::Toml));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ConfigError::Io(e)),
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix("VIBEMQ_SUBS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides only (no file).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new(""))
    }

    /// Parse configuration from a string (for testing, no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.acl.enabled {
            let role_names: std::collections::HashSet<_> =
                self.acl.roles.iter().map(|r| &r.name).collect();
            for client in &self.acl.clients {
                if !role_names.contains(&client.role) {
                    return Err(ConfigError::Validation(format!(
                        "client '{}' references unknown role '{}'",
                        client.client_id, client.role
                    )));
                }
            }
        }
        Ok(())
    }
}
