//! Event classification
//!
//! Maps raw message text and the event URL to a (category, operation code,
//! operation label) triple via an ordered rule table. Classification is a
//! pure function: case-insensitive on both inputs, first matching rule wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity category an event relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ticket,
    Invoice,
    Order,
    Service,
    Domain,
    Generic,
}

impl Category {
    /// Stable lowercase name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Invoice => "invoice",
            Self::Order => "order",
            Self::Service => "service",
            Self::Domain => "domain",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived description of what happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub operation_code: &'static str,
    pub operation_label: &'static str,
}

/// One row of a keyword table: any needle present selects (code, label).
type Rule = (&'static [&'static str], &'static str, &'static str);

const TICKET_RULES: &[Rule] = &[
    (&["new support ticket", "new ticket"], "ticket_new", "New Ticket"),
    (
        &[
            "customer reply",
            "client reply",
            "reply has been received from the client",
            "reply has been posted by the client",
            "new reply has been posted by a customer",
            "posted by a customer",
            "posted by the customer",
        ],
        "ticket_reply_client",
        "New Customer Reply",
    ),
    (
        &[
            "staff reply",
            "admin reply",
            "new reply has been posted by a staff member",
            "posted by a staff member",
            "reply has been posted by an admin",
        ],
        "ticket_reply_staff",
        "New Staff Reply",
    ),
    (
        &["department has been changed", "department change"],
        "ticket_department_change",
        "Department Change",
    ),
    (
        &["priority has been changed", "priority change"],
        "ticket_priority_change",
        "Priority Change",
    ),
    (
        &["status has been changed", "status change"],
        "ticket_status_change",
        "Status Change",
    ),
    (
        &["has been assigned", "ticket assigned"],
        "ticket_assigned",
        "Ticket Assigned",
    ),
    (
        &["has been closed", "ticket closed"],
        "ticket_closed",
        "Ticket Closed",
    ),
];

const INVOICE_RULES: &[Rule] = &[
    (
        &[
            "payment received",
            "invoice payment confirmation",
            "has been paid",
        ],
        "invoice_paid",
        "Invoice Paid",
    ),
    (
        &["invoice created", "new invoice"],
        "invoice_created",
        "Invoice Created",
    ),
    (&["refunded", "refund"], "invoice_refunded", "Invoice Refunded"),
    (
        &["cancelled", "canceled"],
        "invoice_cancelled",
        "Invoice Cancelled",
    ),
];

const ORDER_RULES: &[Rule] = &[
    (&["new order", "order placed"], "order_new", "New Order"),
    (
        &["order accepted", "order active"],
        "order_accepted",
        "Order Accepted",
    ),
    (
        &["order cancelled", "order canceled"],
        "order_cancelled",
        "Order Cancelled",
    ),
];

// "unsuspended" contains "suspended", so the longer needle must come first.
const SERVICE_RULES: &[Rule] = &[
    (&["unsuspended"], "service_unsuspended", "Service Unsuspended"),
    (&["suspended"], "service_suspended", "Service Suspended"),
    (
        &["terminated", "cancelled", "canceled"],
        "service_terminated",
        "Service Terminated",
    ),
    (&["created", "new service"], "service_created", "New Service"),
];

/// Classify an event's message and URL.
///
/// Category is taken from the URL first (fixed rule order, no fallthrough
/// once matched), then the operation is selected from the category's keyword
/// table, falling back to the category's terminal `_generic` operation.
pub fn classify(message: &str, url: &str) -> Classification {
    let msg = message.to_lowercase();
    let link = url.to_lowercase();

    let category = if link.contains("supporttickets.php") {
        Category::Ticket
    } else if link.contains("viewinvoice.php") {
        Category::Invoice
    } else if link.contains("orders.php") {
        Category::Order
    } else if link.contains("clientarea.php") && msg.contains("service") {
        Category::Service
    } else {
        Category::Generic
    };

    let (operation_code, operation_label) = match category {
        Category::Ticket => match_rules(&msg, TICKET_RULES, "ticket_generic", "Ticket Event"),
        Category::Invoice => match_rules(&msg, INVOICE_RULES, "invoice_generic", "Invoice Event"),
        Category::Order => match_rules(&msg, ORDER_RULES, "order_generic", "Order Event"),
        Category::Service => match_rules(&msg, SERVICE_RULES, "service_generic", "Service Event"),
        Category::Domain => ("domain_generic", "Domain Event"),
        Category::Generic => ("generic_event", "Generic Event"),
    };

    Classification {
        category,
        operation_code,
        operation_label,
    }
}

fn match_rules(
    msg: &str,
    rules: &[Rule],
    fallback_code: &'static str,
    fallback_label: &'static str,
) -> (&'static str, &'static str) {
    for &(needles, code, label) in rules {
        if needles.iter().any(|needle| msg.contains(needle)) {
            return (code, label);
        }
    }
    (fallback_code, fallback_label)
}
