//! Delivery gateway
//!
//! The HTTP transport boundary: exactly one synchronous delivery attempt
//! per call, bounded by the configured timeout. A 2xx status is success;
//! anything else, or a transport failure, surfaces as an error carrying the
//! status code and a truncated response body for diagnostics. Retry policy,
//! if any, belongs to the caller.

use crate::config::{AuthMode, RelayConfig, SendFormat};
use crate::error::RelayError;
use crate::payload::Payload;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Maximum response-body length kept for diagnostics
pub const RESPONSE_BODY_LIMIT: usize = 500;

/// Record of one successful delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Unique receipt id
    pub id: String,

    /// Endpoint the payload was sent to
    pub url: String,

    /// HTTP status returned by the endpoint
    pub status_code: u16,

    /// Response body, truncated to [`RESPONSE_BODY_LIMIT`]
    pub body: Option<String>,

    /// When the attempt completed
    pub delivered_at: DateTime<Utc>,
}

/// Sends assembled payloads over HTTP
#[derive(Debug, Clone)]
pub struct DeliveryGateway {
    http: reqwest::Client,
}

impl DeliveryGateway {
    /// Create a gateway with the configured timeout and user agent
    pub fn new(config: &RelayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to create HTTP client");

        Self { http }
    }

    /// Deliver a payload in one attempt.
    pub async fn deliver(
        &self,
        url: &Url,
        payload: &Payload,
        config: &RelayConfig,
    ) -> Result<DeliveryReceipt> {
        let (request, format) = match config.send_format {
            SendFormat::Json => (self.http.post(url.clone()).json(payload), "json"),
            SendFormat::Form => (
                self.http.post(url.clone()).form(&flatten_for_form(payload)?),
                "form",
            ),
        };
        let request = apply_auth(request, config);

        debug!("delivering {} payload to {}", format, url);
        let response = request.send().await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .ok()
            .map(|body| truncate(&body, RESPONSE_BODY_LIMIT));

        if status.is_success() {
            debug!("webhook delivered to {} with HTTP {}", url, status.as_u16());
            Ok(DeliveryReceipt {
                id: Uuid::new_v4().to_string(),
                url: url.to_string(),
                status_code: status.as_u16(),
                body,
                delivered_at: Utc::now(),
            })
        } else {
            warn!("webhook delivery to {} failed with HTTP {}", url, status.as_u16());
            Err(RelayError::DeliveryFailed {
                status: status.as_u16(),
                body: body.unwrap_or_default(),
            })
        }
    }
}

fn apply_auth(request: reqwest::RequestBuilder, config: &RelayConfig) -> reqwest::RequestBuilder {
    let token = config
        .auth_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match (config.auth_mode, token) {
        (AuthMode::Bearer, Some(token)) => request.bearer_auth(token),
        (AuthMode::Header, Some(token)) if !config.header_name.trim().is_empty() => {
            request.header(config.header_name.trim(), token)
        }
        _ => request,
    }
}

/// Flatten a payload for form encoding: top-level keys become form fields,
/// nested objects and arrays are JSON-stringified per field.
fn flatten_for_form(payload: &Payload) -> Result<BTreeMap<String, String>> {
    let value = serde_json::to_value(payload)?;
    let Value::Object(map) = value else {
        return Err(RelayError::Payload("payload is not an object".to_string()));
    };

    let mut fields = BTreeMap::new();
    for (key, value) in map {
        let encoded = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            nested @ (Value::Object(_) | Value::Array(_)) => serde_json::to_string(&nested)?,
        };
        fields.insert(key, encoded);
    }

    Ok(fields)
}

/// Truncate a string to a maximum number of characters
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
