//! Webhook event envelope and typed payload access.

use serde::{Deserialize, Serialize};

use super::errors::WebhookError;
use super::event_type::{EventCategory, EventType};
use super::objects::{RemoteCheckoutSession, RemoteInvoice, RemoteSubscription};
use crate::domain::foundation::Timestamp;

/// Decoded webhook event envelope.
///
/// Additional envelope fields sent by the processor are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WebhookEvent {
    /// `evt_...`; the idempotency key.
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds at which the processor created the event.
    pub created: i64,

    pub data: EventData,

    #[serde(default)]
    pub livemode: bool,

    pub api_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventData {
    /// Shape depends on the event category.
    pub object: serde_json::Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

/// The nested object, discriminated by its `object` field.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Subscription(RemoteSubscription),
    Invoice(RemoteInvoice),
    CheckoutSession(RemoteCheckoutSession),
    /// Any object shape reconciliation does not read.
    Other(serde_json::Value),
}

impl WebhookEvent {
    /// Decodes a verified raw body.
    pub fn decode(body: &[u8]) -> Result<Self, WebhookError> {
        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        if event.id.trim().is_empty() {
            return Err(WebhookError::MissingField("id"));
        }
        if event.event_type.trim().is_empty() {
            return Err(WebhookError::MissingField("type"));
        }
        Ok(event)
    }

    /// Business type, if this event mutates local state.
    pub fn business_type(&self) -> Option<EventType> {
        EventType::parse(&self.event_type)
    }

    pub fn category(&self) -> EventCategory {
        EventCategory::of(&self.event_type)
    }

    pub fn created_at(&self) -> Result<Timestamp, WebhookError> {
        Timestamp::from_unix_secs(self.created)
            .ok_or_else(|| WebhookError::MalformedPayload(format!("bad created {}", self.created)))
    }

    /// `data.object.object`, e.g. `"subscription"`.
    pub fn object_kind(&self) -> Option<&str> {
        self.data.object.get("object").and_then(|v| v.as_str())
    }

    /// Typed view of `data.object`.
    pub fn payload(&self) -> Result<EventPayload, WebhookError> {
        match self.object_kind() {
            Some("subscription") => self.decode_object().map(EventPayload::Subscription),
            Some("invoice") => self.decode_object().map(EventPayload::Invoice),
            Some("checkout.session") => self.decode_object().map(EventPayload::CheckoutSession),
            _ => Ok(EventPayload::Other(self.data.object.clone())),
        }
    }

    pub fn subscription(&self) -> Result<RemoteSubscription, WebhookError> {
        match self.payload()? {
            EventPayload::Subscription(sub) => Ok(sub),
            _ => Err(self.unexpected_object("subscription")),
        }
    }

    pub fn invoice(&self) -> Result<RemoteInvoice, WebhookError> {
        match self.payload()? {
            EventPayload::Invoice(invoice) => Ok(invoice),
            _ => Err(self.unexpected_object("invoice")),
        }
    }

    pub fn checkout_session(&self) -> Result<RemoteCheckoutSession, WebhookError> {
        match self.payload()? {
            EventPayload::CheckoutSession(session) => Ok(session),
            _ => Err(self.unexpected_object("checkout.session")),
        }
    }

    fn decode_object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        T::deserialize(&self.data.object).map_err(|e| {
            WebhookError::MalformedPayload(format!("{} object: {}", self.event_type, e))
        })
    }

    fn unexpected_object(&self, expected: &str) -> WebhookError {
        WebhookError::MalformedPayload(format!(
            "{} carries {:?}, expected {}",
            self.event_type,
            self.object_kind(),
            expected
        ))
    }
}

/// Builder for test events.
#[cfg(test)]
pub struct WebhookEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl WebhookEventBuilder {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: format!("evt_{}", uuid::Uuid::new_v4().simple()),
            event_type: event_type.into(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> WebhookEvent {
        WebhookEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: EventData {
                object: self.object,
                previous_attributes: None,
            },
            livemode: false,
            api_version: Some("2024-06-20".to_string()),
        }
    }
}
