//! Identifier resolution
//!
//! Extracts candidate entity identifiers from an event's weak signals, in
//! precedence order per id kind:
//!
//! 1. Labeled attributes: the first attribute whose label contains the
//!    kind's keyword (case-insensitive) and whose value is numeric.
//! 2. URL patterns: a kind-specific path with a numeric `id` query
//!    parameter, consulted only when no attribute matched for that kind.
//! 3. Ticket only: a `#<reference>` token in the title, looked up against
//!    the repository's ticket-number field.
//!
//! Kinds resolve independently; several may resolve on one event, and a
//! miss for any kind is never an error.

use crate::event::Event;
use crate::repository::EntityRepository;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static TICKET_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)supporttickets\.php.*[?&]id=([0-9]+)").unwrap());

static ORDER_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:orders\.php|orderdetails\.php).*[?&]id=([0-9]+)").unwrap());

static INVOICE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)viewinvoice\.php.*[?&]id=([0-9]+)").unwrap());

static SERVICE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:clientsservices\.php|productdetails).*[?&]id=([0-9]+)").unwrap()
});

static DOMAIN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:clientsdomains\.php|domaindetails).*[?&]id=([0-9]+)").unwrap()
});

static TICKET_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([A-Za-z0-9][A-Za-z0-9-]*)").unwrap());

/// Candidate identifiers resolved from one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedIds {
    pub ticket_id: Option<i64>,
    pub order_id: Option<i64>,
    pub invoice_id: Option<i64>,
    pub service_id: Option<i64>,
    pub domain_id: Option<i64>,
    pub client_id: Option<i64>,
}

impl ResolvedIds {
    /// Whether no id of any kind resolved
    pub fn is_empty(&self) -> bool {
        self.ticket_id.is_none()
            && self.order_id.is_none()
            && self.invoice_id.is_none()
            && self.service_id.is_none()
            && self.domain_id.is_none()
            && self.client_id.is_none()
    }
}

/// Resolve candidate ids from an event, including the repository-backed
/// ticket-reference fallback.
pub async fn resolve(event: &Event, repository: &dyn EntityRepository) -> ResolvedIds {
    let mut ids = extract(event);

    if ids.ticket_id.is_none() {
        if let Some(reference) = ticket_reference(&event.title) {
            match repository.ticket_by_number(&reference).await {
                Ok(Some(ticket)) => ids.ticket_id = Some(ticket.id),
                Ok(None) => {}
                Err(e) => warn!("ticket reference lookup failed for #{}: {}", reference, e),
            }
        }
    }

    ids
}

/// Pure signal extraction: labeled attributes first, then URL patterns.
pub fn extract(event: &Event) -> ResolvedIds {
    let mut ids = ResolvedIds::default();

    for attribute in &event.attributes {
        let label = attribute.label.to_lowercase();
        let value = attribute.value.as_id();

        let Some(value) = value else { continue };

        if ids.ticket_id.is_none() && label.contains("ticket") {
            ids.ticket_id = Some(value);
        }
        if ids.order_id.is_none() && label.contains("order") {
            ids.order_id = Some(value);
        }
        if ids.invoice_id.is_none() && label.contains("invoice") {
            ids.invoice_id = Some(value);
        }
        if ids.service_id.is_none() && label.contains("service") {
            ids.service_id = Some(value);
        }
        if ids.domain_id.is_none() && label.contains("domain") {
            ids.domain_id = Some(value);
        }
        if ids.client_id.is_none() && label.contains("client") {
            ids.client_id = Some(value);
        }
    }

    if !event.url.is_empty() {
        if ids.ticket_id.is_none() {
            ids.ticket_id = capture_id(&TICKET_URL, &event.url);
        }
        if ids.order_id.is_none() {
            ids.order_id = capture_id(&ORDER_URL, &event.url);
        }
        if ids.invoice_id.is_none() {
            ids.invoice_id = capture_id(&INVOICE_URL, &event.url);
        }
        if ids.service_id.is_none() {
            ids.service_id = capture_id(&SERVICE_URL, &event.url);
        }
        if ids.domain_id.is_none() {
            ids.domain_id = capture_id(&DOMAIN_URL, &event.url);
        }
    }

    ids
}

/// Find a `#<reference>` ticket token in a title
pub(crate) fn ticket_reference(title: &str) -> Option<String> {
    TICKET_REFERENCE
        .captures(title)
        .map(|c| c[1].to_string())
}

fn capture_id(pattern: &Regex, url: &str) -> Option<i64> {
    pattern
        .captures(url)
        .and_then(|c| c[1].parse().ok())
}
