//! Relay configuration
//!
//! The operator-facing settings surface arrives from a UI layer as a weak
//! string-keyed map; [`RelayConfig::from_settings`] parses it once at the
//! boundary into a strongly typed struct, defaulting malformed enumerated
//! values with a warning. Only the effective webhook URL is a hard error,
//! and that is checked per delivery, before any network I/O.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Authentication applied to outgoing webhook requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No authentication
    #[default]
    None,

    /// `Authorization: Bearer <token>`
    Bearer,

    /// Custom header carrying the token
    Header,
}

/// Serialization format of the outgoing request body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendFormat {
    /// JSON object body
    #[default]
    Json,

    /// Form-urlencoded flattening of the top-level payload keys
    Form,
}

/// Provider-level relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Default webhook endpoint; a rule-level override takes precedence
    pub webhook_url: String,

    pub auth_mode: AuthMode,
    pub auth_token: Option<String>,

    /// Header name used when `auth_mode` is [`AuthMode::Header`]
    pub header_name: String,

    /// Optional message template with `{title}`, `{message}`, `{url}` placeholders
    pub message_template: Option<String>,

    pub send_format: SendFormat,

    /// Carry the raw inbound attribute list in the payload
    pub include_attributes: bool,

    /// Emit one activity-log line per delivery attempt
    pub debug_log: bool,

    /// Base URL of the host system, stamped into `meta.system_url`
    pub system_url: Option<String>,

    /// Timeout for the single delivery attempt
    pub timeout: Duration,

    /// User-Agent header for outgoing requests
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            auth_mode: AuthMode::None,
            auth_token: None,
            header_name: "X-API-Key".to_string(),
            message_template: None,
            send_format: SendFormat::Json,
            include_attributes: false,
            debug_log: false,
            system_url: None,
            timeout: Duration::from_secs(20),
            user_agent: format!("hookrelay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RelayConfig {
    /// Create a configuration with defaults and the given webhook URL
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            ..Default::default()
        }
    }

    /// Create a builder for custom configuration
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::new()
    }

    /// Parse a weak string-keyed settings map into a typed configuration.
    ///
    /// Unknown keys are ignored; malformed enumerated values fall back to
    /// their defaults with a warning.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = non_empty(settings, "webhook_url") {
            config.webhook_url = url;
        }
        if let Some(mode) = non_empty(settings, "auth_mode") {
            config.auth_mode = match mode.to_lowercase().as_str() {
                "none" => AuthMode::None,
                "bearer" => AuthMode::Bearer,
                "header" => AuthMode::Header,
                other => {
                    warn!("unknown auth_mode '{}', defaulting to none", other);
                    AuthMode::None
                }
            };
        }
        config.auth_token = non_empty(settings, "auth_token");
        if let Some(name) = non_empty(settings, "header_name") {
            config.header_name = name;
        }
        config.message_template = non_empty(settings, "message_template");
        if let Some(format) = non_empty(settings, "send_format") {
            config.send_format = match format.to_lowercase().as_str() {
                "json" => SendFormat::Json,
                "form" => SendFormat::Form,
                other => {
                    warn!("unknown send_format '{}', defaulting to json", other);
                    SendFormat::Json
                }
            };
        }
        config.include_attributes = flag(settings, "include_attributes");
        config.debug_log = flag(settings, "debug_log");
        config.system_url = non_empty(settings, "system_url");

        config
    }

    /// Resolve the URL a delivery should target: rule override first, then
    /// the configured default. Fails before any network work when neither
    /// yields a well-formed absolute http(s) URL.
    pub fn effective_url(&self, rule: Option<&RuleSettings>) -> Result<Url, RelayError> {
        let candidate = rule
            .and_then(|r| r.webhook_url.as_deref())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.webhook_url.trim());

        if candidate.is_empty() {
            return Err(RelayError::Config(
                "webhook URL missing (rule override or default)".to_string(),
            ));
        }

        let url = Url::parse(candidate)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::Config(format!(
                "webhook URL must be http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(url)
    }

    /// Resolve the message template a delivery should use
    pub fn effective_template(&self, rule: Option<&RuleSettings>) -> Option<String> {
        rule.and_then(|r| r.message_template.clone())
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.message_template.clone())
    }
}

/// Per-rule overrides of the provider configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Overrides the default webhook URL when non-empty
    pub webhook_url: Option<String>,

    /// Overrides the provider message template when non-empty
    pub message_template: Option<String>,
}

impl RuleSettings {
    /// Parse rule-level overrides from a weak settings map
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        Self {
            webhook_url: non_empty(settings, "webhook_url"),
            message_template: non_empty(settings, "message_template"),
        }
    }
}

/// Builder for [`RelayConfig`]
#[derive(Debug, Clone, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Set the default webhook URL
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.webhook_url = url.into();
        self
    }

    /// Authenticate with a bearer token
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_mode = AuthMode::Bearer;
        self.config.auth_token = Some(token.into());
        self
    }

    /// Authenticate with a custom header
    pub fn header_token(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.config.auth_mode = AuthMode::Header;
        self.config.header_name = name.into();
        self.config.auth_token = Some(token.into());
        self
    }

    /// Set the message template
    pub fn message_template(mut self, template: impl Into<String>) -> Self {
        self.config.message_template = Some(template.into());
        self
    }

    /// Set the body serialization format
    pub fn send_format(mut self, format: SendFormat) -> Self {
        self.config.send_format = format;
        self
    }

    /// Carry the raw attribute list in payloads
    pub fn include_attributes(mut self, include: bool) -> Self {
        self.config.include_attributes = include;
        self
    }

    /// Emit one activity-log line per delivery attempt
    pub fn debug_log(mut self, enabled: bool) -> Self {
        self.config.debug_log = enabled;
        self
    }

    /// Set the host system base URL
    pub fn system_url(mut self, url: impl Into<String>) -> Self {
        self.config.system_url = Some(url.into());
        self
    }

    /// Set the delivery timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the delivery timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = Duration::from_secs(secs);
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> RelayConfig {
        self.config
    }
}

fn non_empty(settings: &HashMap<String, String>, key: &str) -> Option<String> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn flag(settings: &HashMap<String, String>, key: &str) -> bool {
    match settings.get(key).map(|v| v.trim().to_lowercase()) {
        Some(v) if ["yes", "true", "1", "on"].contains(&v.as_str()) => true,
        Some(v) if ["no", "false", "0", "off", ""].contains(&v.as_str()) => false,
        Some(v) => {
            warn!("unknown boolean setting {}='{}', defaulting to false", key, v);
            false
        }
        None => false,
    }
}
