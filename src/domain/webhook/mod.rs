//! Webhook domain - verification, decoding and classification of inbound
//! payment processor events.

mod errors;
mod event;
mod event_type;
mod objects;
mod verifier;

pub use errors::WebhookError;
pub use event::{EventData, EventPayload, WebhookEvent};
pub use event_type::{is_known_event_type, EventCategory, EventType, KNOWN_EVENT_TYPES};
pub use objects::{
    Expandable, ExpandedRef, RemoteCheckoutSession, RemoteCustomerDetails, RemoteInvoice,
    RemoteInvoiceTransitions, RemoteLineItem, RemoteList, RemotePrice, RemoteRecurring,
    RemoteSubscription, RemoteSubscriptionItem,
};
pub use verifier::{SignatureHeader, WebhookVerifier, DEFAULT_TOLERANCE_SECS, MAX_CLOCK_SKEW_SECS};

#[cfg(test)]
pub(crate) use event::WebhookEventBuilder;
