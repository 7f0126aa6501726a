//! Relay orchestration
//!
//! [`WebhookRelay`] wires the pipeline together for one event: validate the
//! effective URL, classify, resolve ids, enrich snapshots, assemble the
//! payload, and hand it to the delivery gateway. Each event is processed in
//! isolation; no state crosses invocations.

use crate::activity::{ActivityLog, LogLevel, TracingActivityLog};
use crate::classifier::{classify, Category, Classification};
use crate::config::{RelayConfig, RuleSettings};
use crate::enrich::enrich;
use crate::error::RelayError;
use crate::event::Event;
use crate::gateway::{DeliveryGateway, DeliveryReceipt};
use crate::payload::{assemble, AssembleOptions, Meta, Notification, Payload};
use crate::repository::EntityRepository;
use crate::resolver::resolve;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Relays classified, enriched events to a configured webhook endpoint
pub struct WebhookRelay {
    config: RelayConfig,
    repository: Arc<dyn EntityRepository>,
    gateway: DeliveryGateway,
    activity: Arc<dyn ActivityLog>,
}

impl WebhookRelay {
    /// Create a relay over the given repository
    pub fn new(config: RelayConfig, repository: Arc<dyn EntityRepository>) -> Self {
        let gateway = DeliveryGateway::new(&config);
        Self {
            config,
            repository,
            gateway,
            activity: Arc::new(TracingActivityLog),
        }
    }

    /// Replace the activity-log collaborator
    pub fn with_activity_log(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relay one event using the provider configuration.
    pub async fn notify(&self, event: &Event) -> Result<DeliveryReceipt> {
        self.notify_with(event, None).await
    }

    /// Relay one event, honoring per-rule overrides.
    ///
    /// Enrichment degrades softly; only a missing/invalid webhook URL or the
    /// delivery outcome itself can fail this call.
    pub async fn notify_with(
        &self,
        event: &Event,
        rule: Option<&RuleSettings>,
    ) -> Result<DeliveryReceipt> {
        let url = self.config.effective_url(rule)?;

        let classification = classify(&event.message, &event.url);
        let resolved = resolve(event, self.repository.as_ref()).await;
        let snapshots = enrich(&resolved, self.repository.as_ref()).await;

        let options = AssembleOptions {
            message_template: self.config.effective_template(rule),
            system_url: self.config.system_url.clone(),
            include_attributes: self.config.include_attributes,
        };
        let payload = assemble(event, &classification, &snapshots, &options);

        info!(
            "relaying {} ({}) to {}",
            classification.operation_code, classification.category, url
        );
        let outcome = self.gateway.deliver(&url, &payload, &self.config).await;
        self.log_outcome(&url, &outcome);
        outcome
    }

    /// Post a static test payload to the default webhook URL.
    ///
    /// Succeeds on a 2xx response; used by operators to verify connectivity
    /// before wiring up rules.
    pub async fn test_connection(&self) -> Result<DeliveryReceipt> {
        let url = self.config.effective_url(None)?;

        let classification = Classification {
            category: Category::Generic,
            operation_code: "test",
            operation_label: "Test Connection",
        };
        let payload = Payload {
            meta: Meta::now(&classification, self.config.system_url.clone()),
            notification: Notification {
                title: "Webhook Relay Test".to_string(),
                message: "Connectivity test from the webhook relay.".to_string(),
                url: self.config.system_url.clone().unwrap_or_default(),
                subject: None,
                body: None,
                operation_code: classification.operation_code.to_string(),
                operation_label: classification.operation_label.to_string(),
            },
            attributes: None,
            ticket: None,
            order: None,
            invoice: None,
            service: None,
            domain: None,
            client: None,
            account_manager_admin: None,
        };

        let outcome = self.gateway.deliver(&url, &payload, &self.config).await;
        self.log_outcome(&url, &outcome);
        outcome
    }

    fn log_outcome(&self, url: &url::Url, outcome: &Result<DeliveryReceipt>) {
        if !self.config.debug_log {
            return;
        }

        match outcome {
            Ok(receipt) => self.activity.log(
                LogLevel::Info,
                &format!("HTTP {} to {}", receipt.status_code, url),
            ),
            Err(RelayError::DeliveryFailed { status, .. }) => self
                .activity
                .log(LogLevel::Warn, &format!("HTTP {} to {}", status, url)),
            Err(e) => self
                .activity
                .log(LogLevel::Error, &format!("delivery to {} failed: {}", url, e)),
        }
    }
}
