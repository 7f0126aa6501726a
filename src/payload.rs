//! Payload assembly
//!
//! Combines a classification, the enriched entity snapshots, and message
//! templating into the single canonical record handed to the delivery
//! gateway. `meta.timestamp` is always present (assembly time, UTC,
//! second-precision RFC 3339); optional entity sections appear only when
//! their id resolved and the row existed.

use crate::classifier::{Category, Classification};
use crate::enrich::Snapshots;
use crate::event::{Attribute, Event};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static source marker stamped into `meta.source`
pub const SOURCE: &str = "hookrelay";

/// The final delivery unit sent to the webhook endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub meta: Meta,
    pub notification: Notification,

    /// Raw inbound attributes, when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_manager_admin: Option<Value>,
}

/// Assembly metadata, always present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    /// Assembly time, UTC, second-precision RFC 3339 with `Z` suffix
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_url: Option<String>,

    pub category: Category,
    pub operation_code: String,
    pub operation_label: String,
    pub source: String,
}

impl Meta {
    /// Stamp metadata for a classification at the current instant
    pub fn now(classification: &Classification, system_url: Option<String>) -> Self {
        Self {
            timestamp: format_timestamp(Utc::now()),
            system_url,
            category: classification.category,
            operation_code: classification.operation_code.to_string(),
            operation_label: classification.operation_label.to_string(),
            source: SOURCE.to_string(),
        }
    }
}

/// The notification body of the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub url: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub operation_code: String,
    pub operation_label: String,
}

/// Caller-supplied knobs for [`assemble`]
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Optional message template with `{title}`, `{message}`, `{url}` placeholders
    pub message_template: Option<String>,

    /// Base URL of the host system, stamped into `meta.system_url`
    pub system_url: Option<String>,

    /// Whether to carry the raw attribute list in the payload
    pub include_attributes: bool,
}

/// Assemble the delivery payload for one event.
pub fn assemble(
    event: &Event,
    classification: &Classification,
    snapshots: &Snapshots,
    options: &AssembleOptions,
) -> Payload {
    let message = match options.message_template.as_deref() {
        Some(template) if !template.trim().is_empty() => {
            render_template(template, &event.title, &event.message, &event.url)
        }
        _ => event.message.clone(),
    };

    let mut payload = Payload {
        meta: Meta::now(classification, options.system_url.clone()),
        notification: Notification {
            title: event.title.clone(),
            message: message.clone(),
            url: event.url.clone(),
            subject: None,
            body: Some(message.clone()),
            operation_code: classification.operation_code.to_string(),
            operation_label: classification.operation_label.to_string(),
        },
        attributes: options
            .include_attributes
            .then(|| event.attributes.clone()),
        ticket: None,
        order: None,
        invoice: None,
        service: None,
        domain: None,
        client: None,
        account_manager_admin: None,
    };

    if let Some(ticket) = &snapshots.ticket {
        let mut ticket = ticket.clone();
        if let Some(map) = ticket.as_object_mut() {
            map.insert(
                "operation_code".to_string(),
                Value::String(classification.operation_code.to_string()),
            );
            map.insert(
                "operation_label".to_string(),
                Value::String(classification.operation_label.to_string()),
            );

            payload.notification.subject = Some(
                string_field(map, "subject").unwrap_or_else(|| event.title.clone()),
            );
            payload.notification.body = Some(
                string_field(map, "last_reply_message")
                    .or_else(|| string_field(map, "initial_message"))
                    .unwrap_or(message),
            );
        }
        payload.ticket = Some(ticket);
    }

    payload.order = snapshots.order.clone();
    payload.invoice = snapshots.invoice.clone();
    payload.service = snapshots.service.clone();
    payload.domain = snapshots.domain.clone();
    payload.client = snapshots.client.clone();
    payload.account_manager_admin = snapshots.account_manager.clone();

    payload
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Format a timestamp the way `meta.timestamp` requires
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Interpolate `{title}`, `{message}`, and `{url}` into a template.
///
/// Substitution is literal and single-pass: placeholders introduced by a
/// substituted value are not expanded again, and unknown placeholders are
/// left verbatim.
pub fn render_template(template: &str, title: &str, message: &str, url: &str) -> String {
    let mut out = String::with_capacity(template.len() + message.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let close = tail.find('}');
        let next_open = tail[1..].find('{').map(|i| i + 1);

        match close {
            Some(c) if next_open.is_none_or(|o| o > c) => {
                match &tail[..=c] {
                    "{title}" => out.push_str(title),
                    "{message}" => out.push_str(message),
                    "{url}" => out.push_str(url),
                    unknown => out.push_str(unknown),
                }
                rest = &tail[c + 1..];
            }
            _ => {
                // Unterminated or immediately re-opened brace: emit as-is.
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Normalize string values in a snapshot: trim every string, and turn
/// empty-after-trim strings into null. Recurses into nested objects and
/// arrays; idempotent.
pub fn nullify_empty_strings(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else if trimmed.len() == s.len() {
                Value::String(s)
            } else {
                Value::String(trimmed.to_string())
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, nullify_empty_strings(v)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(nullify_empty_strings).collect())
        }
        other => other,
    }
}
