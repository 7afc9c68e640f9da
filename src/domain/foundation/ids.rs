//! Strongly-typed identifier value objects.
//!
//! Local rows are keyed by UUID newtypes. Identifiers issued by the remote
//! payment processor (`sub_...`, `si_...`, `price_...`) stay plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Local subscription row identifier.
    SubscriptionId
);
uuid_id!(
    /// Local customer identifier.
    CustomerId
);
uuid_id!(
    /// Local product identifier.
    ProductId
);
uuid_id!(
    /// Local price identifier.
    PriceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_id_generates_unique_values() {
        assert_ne!(SubscriptionId::new(), SubscriptionId::new());
    }

    #[test]
    fn price_id_parses_from_valid_string() {
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        let id: PriceId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn customer_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<CustomerId>().is_err());
    }

    #[test]
    fn product_id_serializes_transparently() {
        let uuid = Uuid::new_v4();
        let id = ProductId::from_uuid(uuid);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", uuid));
        assert_eq!(id.as_uuid(), &uuid);
    }
}
