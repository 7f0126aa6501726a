//! Inbound event types
//!
//! An [`Event`] is the business notification handed over by the host
//! application: a title, a human-readable message, a deep link into the host
//! UI, and an ordered list of labeled attributes. The relay never mutates an
//! event; it is consumed once per delivery attempt.

use serde::{Deserialize, Serialize};

/// A business event received from the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Short human-readable title
    pub title: String,

    /// Message text describing what happened
    pub message: String,

    /// Deep link into the host application (may be empty)
    pub url: String,

    /// Labeled attributes in host insertion order
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// Create a new event with no attributes
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            url: url.into(),
            attributes: Vec::new(),
        }
    }

    /// Append a labeled attribute
    pub fn with_attribute(
        mut self,
        label: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.push(Attribute::new(label, value));
        self
    }
}

/// A labeled attribute attached to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Host-supplied label (e.g. "Ticket #")
    pub label: String,

    /// Attribute value
    pub value: AttributeValue,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(label: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// An attribute value: a string, a number, or null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Numeric value
    Number(i64),

    /// Text value
    Text(String),

    /// No value
    Null,
}

impl AttributeValue {
    /// Interpret the value as an integer identifier, if possible.
    ///
    /// Text values qualify when they parse as a whole number after trimming.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
