//! Event-to-Webhook Relay
//!
//! This crate relays business events (a support ticket reply, an invoice
//! being paid, an order placed) from a host application to an externally
//! configured HTTP endpoint. Each event is classified into a
//! category/operation taxonomy, enriched with related records from the
//! host's relational store, assembled into one canonical JSON payload, and
//! delivered in a single attempt.
//!
//! # Pipeline
//!
//! - **Resolution**: candidate entity ids are extracted from labeled
//!   attributes, URL patterns, and ticket references in the title.
//! - **Classification**: message text and URL hints map to a
//!   (category, operation code, operation label) triple.
//! - **Enrichment**: rows for resolved ids are fetched through an
//!   [`EntityRepository`] and joined into flat, null-safe snapshots.
//! - **Assembly**: classification, snapshots, and optional message
//!   templating merge into a single [`Payload`].
//! - **Delivery**: one HTTP POST, JSON or form-encoded, with optional
//!   bearer or custom-header authentication.
//!
//! # Example
//!
//! ```rust,no_run
//! use hookrelay::{Event, MemoryRepository, RelayConfig, WebhookRelay};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::builder()
//!         .webhook_url("https://flow.example.com/webhook/abc123")
//!         .bearer_token("secret")
//!         .build();
//!
//!     let repository = Arc::new(MemoryRepository::new());
//!     let relay = WebhookRelay::new(config, repository);
//!
//!     let event = Event::new(
//!         "Ticket Closed #SUP-100045",
//!         "Ticket has been closed",
//!         "https://example.com/supporttickets.php?id=501",
//!     );
//!
//!     let receipt = relay.notify(&event).await?;
//!     println!("delivered with HTTP {}", receipt.status_code);
//!     Ok(())
//! }
//! ```
//!
//! Enrichment is best-effort by design: repository misses and lookup
//! failures degrade to absent payload sections. Only configuration errors
//! and the delivery outcome itself are surfaced as hard results.

mod activity;
mod classifier;
mod config;
mod enrich;
mod error;
mod event;
mod gateway;
mod payload;
mod relay;
mod repository;
mod resolver;

pub use activity::{ActivityLog, LogLevel, TracingActivityLog};
pub use classifier::{classify, Category, Classification};
pub use config::{AuthMode, RelayConfig, RelayConfigBuilder, RuleSettings, SendFormat};
pub use enrich::{enrich, Snapshots};
pub use error::RelayError;
pub use event::{Attribute, AttributeValue, Event};
pub use gateway::{DeliveryGateway, DeliveryReceipt, RESPONSE_BODY_LIMIT};
pub use payload::{
    assemble, format_timestamp, nullify_empty_strings, render_template, AssembleOptions, Meta,
    Notification, Payload, SOURCE,
};
pub use relay::WebhookRelay;
pub use repository::{
    AdminRecord, ClientRecord, DomainRecord, EntityRepository, InvoiceItemRecord, InvoiceRecord,
    MemoryRepository, OrderRecord, RepoResult, RepositoryError, ServiceRecord, TicketRecord,
    TicketReplyRecord, CLIENT_CUSTOM_FIELDS,
};
pub use resolver::{extract, resolve, ResolvedIds};

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
