//! Entity repository boundary
//!
//! Read-only accessors over the host's relational store. Every lookup is by
//! integer id, point-in-time and non-transactional, returning either a
//! populated record or "not found". The relay treats repository failures as
//! soft: a failed lookup degrades to an absent payload section and never
//! blocks delivery of the base notification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a repository implementation
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying storage failed
    #[error("storage error: {0}")]
    Storage(String),

    /// The backing schema does not support this lookup
    #[error("unsupported lookup: {0}")]
    Unsupported(&'static str),
}

/// Result type for repository operations
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Custom client field names fetched in one batched call
pub const CLIENT_CUSTOM_FIELDS: &[&str] = &["Sales Manager", "Account Manager"];

/// A support ticket row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: i64,
    /// Human-readable reference (e.g. "SUP-100045")
    pub number: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub opened_at: Option<String>,
    pub last_reply_at: Option<String>,
    pub department_id: Option<i64>,
    pub client_id: Option<i64>,
    pub initial_message: Option<String>,
}

/// A single reply on a support ticket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketReplyRecord {
    pub ticket_id: i64,
    /// Staff member name when the reply came from staff
    pub admin: Option<String>,
    /// Submitter name for client replies
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub replied_at: Option<String>,
}

impl TicketReplyRecord {
    /// Whether this reply was authored by staff
    pub fn is_staff(&self) -> bool {
        self.admin.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

/// An order row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub number: Option<String>,
    pub status: Option<String>,
    pub client_id: Option<i64>,
    pub placed_at: Option<String>,
    pub amount: Option<String>,
    pub invoice_id: Option<i64>,
}

/// An invoice row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: i64,
    pub number: Option<String>,
    pub status: Option<String>,
    pub client_id: Option<i64>,
    pub issued_at: Option<String>,
    pub due_at: Option<String>,
    pub subtotal: Option<String>,
    pub total: Option<String>,
}

/// A line item on an invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItemRecord {
    pub invoice_id: i64,
    pub description: Option<String>,
    pub amount: Option<String>,
}

/// A provisioned service row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub client_id: Option<i64>,
    pub product_id: Option<i64>,
    pub domain: Option<String>,
    pub status: Option<String>,
    pub billing_cycle: Option<String>,
    pub amount: Option<String>,
    pub next_due_at: Option<String>,
}

/// A registered domain row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: i64,
    pub client_id: Option<i64>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub registrar: Option<String>,
    pub registered_at: Option<String>,
    pub expires_at: Option<String>,
}

/// A client profile row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    /// Owning admin id, when the schema carries the relation
    pub owner_id: Option<i64>,
}

/// An admin (staff) row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Read-only access to the host's entity tables
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Fetch a ticket by id
    async fn ticket(&self, id: i64) -> RepoResult<Option<TicketRecord>>;

    /// Fetch a ticket by its human-readable reference.
    ///
    /// Returns a row only when exactly one ticket matches the reference.
    async fn ticket_by_number(&self, number: &str) -> RepoResult<Option<TicketRecord>>;

    /// Resolve a ticket department id to its display name
    async fn ticket_department_name(&self, department_id: i64) -> RepoResult<Option<String>>;

    /// Fetch the most recent reply on a ticket
    async fn latest_ticket_reply(&self, ticket_id: i64) -> RepoResult<Option<TicketReplyRecord>>;

    /// Fetch an order by id
    async fn order(&self, id: i64) -> RepoResult<Option<OrderRecord>>;

    /// Fetch an invoice by id
    async fn invoice(&self, id: i64) -> RepoResult<Option<InvoiceRecord>>;

    /// Fetch the line items of an invoice
    async fn invoice_items(&self, invoice_id: i64) -> RepoResult<Vec<InvoiceItemRecord>>;

    /// Fetch a service by id
    async fn service(&self, id: i64) -> RepoResult<Option<ServiceRecord>>;

    /// Resolve a product id to its display name
    async fn product_name(&self, product_id: i64) -> RepoResult<Option<String>>;

    /// Fetch a domain by id
    async fn domain(&self, id: i64) -> RepoResult<Option<DomainRecord>>;

    /// Fetch a client profile by id
    async fn client(&self, id: i64) -> RepoResult<Option<ClientRecord>>;

    /// Fetch named custom-field values for a client in one batched call.
    ///
    /// The returned map contains every requested name; fields without a
    /// stored value map to `None`.
    async fn client_custom_field_values(
        &self,
        client_id: i64,
        field_names: &[&str],
    ) -> RepoResult<HashMap<String, Option<String>>>;

    /// Fetch the admin who owns a client account.
    ///
    /// Implementations over schemas without the owner relation must return
    /// `Ok(None)` rather than error.
    async fn account_manager(&self, client_id: i64) -> RepoResult<Option<AdminRecord>>;
}

/// In-memory [`EntityRepository`] for tests and demos
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tickets: HashMap<i64, TicketRecord>,
    replies: Vec<TicketReplyRecord>,
    departments: HashMap<i64, String>,
    orders: HashMap<i64, OrderRecord>,
    invoices: HashMap<i64, InvoiceRecord>,
    invoice_items: Vec<InvoiceItemRecord>,
    services: HashMap<i64, ServiceRecord>,
    products: HashMap<i64, String>,
    domains: HashMap<i64, DomainRecord>,
    clients: HashMap<i64, ClientRecord>,
    custom_fields: HashMap<(i64, String), String>,
    admins: HashMap<i64, AdminRecord>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ticket row
    pub fn with_ticket(mut self, ticket: TicketRecord) -> Self {
        self.tickets.insert(ticket.id, ticket);
        self
    }

    /// Add a ticket reply; later additions count as more recent
    pub fn with_ticket_reply(mut self, reply: TicketReplyRecord) -> Self {
        self.replies.push(reply);
        self
    }

    /// Add a ticket department
    pub fn with_department(mut self, id: i64, name: impl Into<String>) -> Self {
        self.departments.insert(id, name.into());
        self
    }

    /// Add an order row
    pub fn with_order(mut self, order: OrderRecord) -> Self {
        self.orders.insert(order.id, order);
        self
    }

    /// Add an invoice row
    pub fn with_invoice(mut self, invoice: InvoiceRecord) -> Self {
        self.invoices.insert(invoice.id, invoice);
        self
    }

    /// Add an invoice line item
    pub fn with_invoice_item(mut self, item: InvoiceItemRecord) -> Self {
        self.invoice_items.push(item);
        self
    }

    /// Add a service row
    pub fn with_service(mut self, service: ServiceRecord) -> Self {
        self.services.insert(service.id, service);
        self
    }

    /// Add a product name
    pub fn with_product(mut self, id: i64, name: impl Into<String>) -> Self {
        self.products.insert(id, name.into());
        self
    }

    /// Add a domain row
    pub fn with_domain(mut self, domain: DomainRecord) -> Self {
        self.domains.insert(domain.id, domain);
        self
    }

    /// Add a client row
    pub fn with_client(mut self, client: ClientRecord) -> Self {
        self.clients.insert(client.id, client);
        self
    }

    /// Set a custom-field value for a client
    pub fn with_custom_field(
        mut self,
        client_id: i64,
        field_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.custom_fields
            .insert((client_id, field_name.into()), value.into());
        self
    }

    /// Add an admin row
    pub fn with_admin(mut self, admin: AdminRecord) -> Self {
        self.admins.insert(admin.id, admin);
        self
    }
}

#[async_trait]
impl EntityRepository for MemoryRepository {
    async fn ticket(&self, id: i64) -> RepoResult<Option<TicketRecord>> {
        Ok(self.tickets.get(&id).cloned())
    }

    async fn ticket_by_number(&self, number: &str) -> RepoResult<Option<TicketRecord>> {
        let mut matches = self
            .tickets
            .values()
            .filter(|t| t.number.as_deref() == Some(number));

        match (matches.next(), matches.next()) {
            (Some(ticket), None) => Ok(Some(ticket.clone())),
            _ => Ok(None),
        }
    }

    async fn ticket_department_name(&self, department_id: i64) -> RepoResult<Option<String>> {
        Ok(self.departments.get(&department_id).cloned())
    }

    async fn latest_ticket_reply(&self, ticket_id: i64) -> RepoResult<Option<TicketReplyRecord>> {
        Ok(self
            .replies
            .iter()
            .rev()
            .find(|r| r.ticket_id == ticket_id)
            .cloned())
    }

    async fn order(&self, id: i64) -> RepoResult<Option<OrderRecord>> {
        Ok(self.orders.get(&id).cloned())
    }

    async fn invoice(&self, id: i64) -> RepoResult<Option<InvoiceRecord>> {
        Ok(self.invoices.get(&id).cloned())
    }

    async fn invoice_items(&self, invoice_id: i64) -> RepoResult<Vec<InvoiceItemRecord>> {
        Ok(self
            .invoice_items
            .iter()
            .filter(|i| i.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn service(&self, id: i64) -> RepoResult<Option<ServiceRecord>> {
        Ok(self.services.get(&id).cloned())
    }

    async fn product_name(&self, product_id: i64) -> RepoResult<Option<String>> {
        Ok(self.products.get(&product_id).cloned())
    }

    async fn domain(&self, id: i64) -> RepoResult<Option<DomainRecord>> {
        Ok(self.domains.get(&id).cloned())
    }

    async fn client(&self, id: i64) -> RepoResult<Option<ClientRecord>> {
        Ok(self.clients.get(&id).cloned())
    }

    async fn client_custom_field_values(
        &self,
        client_id: i64,
        field_names: &[&str],
    ) -> RepoResult<HashMap<String, Option<String>>> {
        let mut out = HashMap::with_capacity(field_names.len());
        for name in field_names {
            let value = self
                .custom_fields
                .get(&(client_id, name.to_string()))
                .cloned();
            out.insert(name.to_string(), value);
        }
        Ok(out)
    }

    async fn account_manager(&self, client_id: i64) -> RepoResult<Option<AdminRecord>> {
        let owner = self
            .clients
            .get(&client_id)
            .and_then(|client| client.owner_id);

        Ok(owner.and_then(|id| self.admins.get(&id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> MemoryRepository {
        MemoryRepository::new()
            .with_ticket(TicketRecord {
                id: 501,
                number: Some("SUP-100045".into()),
                subject: Some("Billing question".into()),
                client_id: Some(7),
                department_id: Some(2),
                ..Default::default()
            })
            .with_department(2, "Billing")
            .with_client(ClientRecord {
                id: 7,
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                owner_id: Some(3),
                ..Default::default()
            })
            .with_admin(AdminRecord {
                id: 3,
                first_name: Some("Sam".into()),
                ..Default::default()
            })
    }

    #[tokio::test]
    async fn test_ticket_lookup() {
        let repo = repo();
        let ticket = repo.ticket(501).await.unwrap().unwrap();
        assert_eq!(ticket.subject.as_deref(), Some("Billing question"));
        assert!(repo.ticket(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ticket_by_number_requires_unique_match() {
        let repo = repo();
        let ticket = repo.ticket_by_number("SUP-100045").await.unwrap().unwrap();
        assert_eq!(ticket.id, 501);

        // A duplicated reference is ambiguous and yields nothing.
        let repo = repo.with_ticket(TicketRecord {
            id: 502,
            number: Some("SUP-100045".into()),
            ..Default::default()
        });
        assert!(repo.ticket_by_number("SUP-100045").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_reply_wins() {
        let repo = repo()
            .with_ticket_reply(TicketReplyRecord {
                ticket_id: 501,
                name: Some("Jane".into()),
                message: Some("first".into()),
                ..Default::default()
            })
            .with_ticket_reply(TicketReplyRecord {
                ticket_id: 501,
                admin: Some("Sam".into()),
                message: Some("second".into()),
                ..Default::default()
            });

        let reply = repo.latest_ticket_reply(501).await.unwrap().unwrap();
        assert_eq!(reply.message.as_deref(), Some("second"));
        assert!(reply.is_staff());
    }

    #[tokio::test]
    async fn test_custom_fields_include_absent_names() {
        let repo = repo().with_custom_field(7, "Sales Manager", "Alice");
        let fields = repo
            .client_custom_field_values(7, CLIENT_CUSTOM_FIELDS)
            .await
            .unwrap();

        assert_eq!(fields["Sales Manager"].as_deref(), Some("Alice"));
        assert_eq!(fields["Account Manager"], None);
    }

    #[tokio::test]
    async fn test_account_manager_absent_is_ok() {
        let repo = MemoryRepository::new().with_client(ClientRecord {
            id: 9,
            owner_id: None,
            ..Default::default()
        });
        assert!(repo.account_manager(9).await.unwrap().is_none());
        assert!(repo.account_manager(404).await.unwrap().is_none());
    }
}
