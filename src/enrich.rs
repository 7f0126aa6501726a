//! Snapshot enrichment
//!
//! Fetches rows for every resolved id and joins related lookups (department
//! names, latest replies, product names, client custom fields, the owning
//! admin) into flat, null-safe snapshots. Kinds are independent and fetched
//! concurrently. Every failure here is soft: a repository error or a missing
//! row degrades to "section absent" and never blocks delivery.

use crate::payload::nullify_empty_strings;
use crate::repository::{
    ClientRecord, EntityRepository, RepoResult, TicketReplyRecord, CLIENT_CUSTOM_FIELDS,
};
use crate::resolver::ResolvedIds;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

/// Normalized entity sections fetched for one event
#[derive(Debug, Clone, Default)]
pub struct Snapshots {
    pub ticket: Option<Value>,
    pub order: Option<Value>,
    pub invoice: Option<Value>,
    pub service: Option<Value>,
    pub domain: Option<Value>,
    pub client: Option<Value>,
    pub account_manager: Option<Value>,
}

/// Fetch and join snapshots for every resolved id.
///
/// If the client id did not resolve directly but a ticket or order row
/// carries its owning client, that id back-fills before the client profile
/// is fetched (ticket wins over order).
pub async fn enrich(resolved: &ResolvedIds, repository: &dyn EntityRepository) -> Snapshots {
    let mut snapshots = Snapshots::default();

    let (ticket, order, invoice, service, domain) = futures::join!(
        fetch_ticket(repository, resolved.ticket_id),
        fetch_order(repository, resolved.order_id),
        fetch_invoice(repository, resolved.invoice_id),
        fetch_service(repository, resolved.service_id),
        fetch_domain(repository, resolved.domain_id),
    );

    let (ticket, ticket_client) = ticket;
    let (order, order_client) = order;

    snapshots.ticket = ticket;
    snapshots.order = order;
    snapshots.invoice = invoice;
    snapshots.service = service;
    snapshots.domain = domain;

    let client_id = resolved.client_id.or(ticket_client).or(order_client);
    if let Some(client_id) = client_id {
        if let Some(client) = soft(repository.client(client_id).await, "client") {
            let fields = match repository
                .client_custom_field_values(client_id, CLIENT_CUSTOM_FIELDS)
                .await
            {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("client custom field lookup failed: {}", e);
                    HashMap::new()
                }
            };
            snapshots.client = Some(client_snapshot(&client, &fields));
        }

        if let Some(admin) = soft(repository.account_manager(client_id).await, "account manager")
        {
            snapshots.account_manager = Some(nullify_empty_strings(json!({
                "id": admin.id,
                "firstname": admin.first_name,
                "lastname": admin.last_name,
                "name": full_name(admin.first_name.as_deref(), admin.last_name.as_deref()),
                "email": admin.email,
            })));
        }
    }

    snapshots
}

async fn fetch_ticket(
    repository: &dyn EntityRepository,
    id: Option<i64>,
) -> (Option<Value>, Option<i64>) {
    let Some(id) = id else { return (None, None) };
    let Some(ticket) = soft(repository.ticket(id).await, "ticket") else {
        return (None, None);
    };

    let department = match ticket.department_id {
        Some(department_id) => soft(
            repository.ticket_department_name(department_id).await,
            "ticket department",
        ),
        None => None,
    };
    let reply = soft(repository.latest_ticket_reply(id).await, "ticket reply");

    let snapshot = nullify_empty_strings(json!({
        "id": ticket.id,
        "tid": ticket.number,
        "subject": ticket.subject,
        "status": ticket.status,
        "priority": ticket.priority,
        "date": ticket.opened_at,
        "lastreply": ticket.last_reply_at,
        "department_id": ticket.department_id,
        "department": department,
        "client_id": ticket.client_id,
        "initial_message": ticket.initial_message,
        "last_reply_type": reply.as_ref().map(reply_type),
        "last_reply_message": reply.as_ref().and_then(|r| r.message.clone()),
        "last_reply_date": reply.as_ref().and_then(|r| r.replied_at.clone()),
        "last_reply_by_name": reply.as_ref().and_then(reply_author),
        "last_reply_by_email": reply.as_ref().and_then(|r| r.email.clone()),
    }));

    (Some(snapshot), ticket.client_id)
}

async fn fetch_order(
    repository: &dyn EntityRepository,
    id: Option<i64>,
) -> (Option<Value>, Option<i64>) {
    let Some(id) = id else { return (None, None) };
    let Some(order) = soft(repository.order(id).await, "order") else {
        return (None, None);
    };

    let snapshot = nullify_empty_strings(json!({
        "id": order.id,
        "ordernum": order.number,
        "status": order.status,
        "client_id": order.client_id,
        "date": order.placed_at,
        "amount": order.amount,
        "invoice_id": order.invoice_id,
    }));

    (Some(snapshot), order.client_id)
}

async fn fetch_invoice(repository: &dyn EntityRepository, id: Option<i64>) -> Option<Value> {
    let id = id?;
    let invoice = soft(repository.invoice(id).await, "invoice")?;
    let items = match repository.invoice_items(id).await {
        Ok(items) => items,
        Err(e) => {
            warn!("invoice item lookup failed: {}", e);
            Vec::new()
        }
    };

    let items: Vec<Value> = items
        .into_iter()
        .map(|item| {
            json!({
                "description": item.description,
                "amount": item.amount,
            })
        })
        .collect();

    Some(nullify_empty_strings(json!({
        "id": invoice.id,
        "invoicenum": invoice.number,
        "status": invoice.status,
        "client_id": invoice.client_id,
        "date": invoice.issued_at,
        "duedate": invoice.due_at,
        "subtotal": invoice.subtotal,
        "total": invoice.total,
        "items": items,
    })))
}

async fn fetch_service(repository: &dyn EntityRepository, id: Option<i64>) -> Option<Value> {
    let id = id?;
    let service = soft(repository.service(id).await, "service")?;

    let product = match service.product_id {
        Some(product_id) => soft(repository.product_name(product_id).await, "product name"),
        None => None,
    };

    Some(nullify_empty_strings(json!({
        "id": service.id,
        "client_id": service.client_id,
        "product_id": service.product_id,
        "product": product,
        "domain": service.domain,
        "status": service.status,
        "billingcycle": service.billing_cycle,
        "amount": service.amount,
        "nextduedate": service.next_due_at,
    })))
}

async fn fetch_domain(repository: &dyn EntityRepository, id: Option<i64>) -> Option<Value> {
    let id = id?;
    let domain = soft(repository.domain(id).await, "domain")?;

    Some(nullify_empty_strings(json!({
        "id": domain.id,
        "client_id": domain.client_id,
        "domain": domain.name,
        "status": domain.status,
        "registrar": domain.registrar,
        "registrationdate": domain.registered_at,
        "expirydate": domain.expires_at,
    })))
}

fn client_snapshot(client: &ClientRecord, fields: &HashMap<String, Option<String>>) -> Value {
    nullify_empty_strings(json!({
        "id": client.id,
        "firstname": client.first_name,
        "lastname": client.last_name,
        "name": full_name(client.first_name.as_deref(), client.last_name.as_deref()),
        "companyname": client.company,
        "email": client.email,
        "phone": client.phone,
        "country": client.country,
        "state": client.state,
        "sales_manager": fields.get("Sales Manager").cloned().flatten(),
        "account_manager": fields.get("Account Manager").cloned().flatten(),
    }))
}

fn reply_type(reply: &TicketReplyRecord) -> &'static str {
    if reply.is_staff() {
        "staff"
    } else {
        "client"
    }
}

fn reply_author(reply: &TicketReplyRecord) -> Option<String> {
    if reply.is_staff() {
        reply.admin.clone()
    } else {
        reply.name.clone()
    }
}

fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Collapse a repository failure into "absent", with a warning.
fn soft<T>(result: RepoResult<Option<T>>, what: &str) -> Option<T> {
    match result {
        Ok(row) => row,
        Err(e) => {
            warn!("enrichment lookup for {} failed, section skipped: {}", what, e);
            None
        }
    }
}
