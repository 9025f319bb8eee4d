//! Identifier newtypes shared across components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner `Uuid`.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
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
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a principal (user account).
    PrincipalId
);

uuid_id!(
    /// Unique identifier for a listing.
    ListingId
);

uuid_id!(
    /// Unique identifier for an order.
    OrderId
);

/// The principal on whose behalf an operation runs.
///
/// Built by the presentation layer from a resolved session; the market
/// components trust it as given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Acting principal.
    pub principal_id: PrincipalId,
    /// Whether the acting principal holds the administrator role.
    pub is_admin: bool,
}

impl Actor {
    /// An ordinary (non-admin) actor.
    #[must_use]
    pub const fn member(principal_id: PrincipalId) -> Self {
        Self {
            principal_id,
            is_admin: false,
        }
    }

    /// An administrator actor.
    #[must_use]
    pub const fn admin(principal_id: PrincipalId) -> Self {
        Self {
            principal_id,
            is_admin: true,
        }
    }

    /// Returns `true` if this actor is `owner` or an administrator.
    #[must_use]
    pub fn may_manage(&self, owner: PrincipalId) -> bool {
        self.is_admin || self.principal_id == owner
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_roundtrip_through_display() {
        let id = ListingId::new();
        assert_eq!(id.to_string().parse::<ListingId>(), Ok(id));
    }

    #[test]
    fn test_malformed_id_is_rejected() {
        assert!("not-a-uuid".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_plain_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&PrincipalId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn test_actor_may_manage() {
        let owner = PrincipalId::new();
        let stranger = PrincipalId::new();

        assert!(Actor::member(owner).may_manage(owner));
        assert!(!Actor::member(stranger).may_manage(owner));
        assert!(Actor::admin(stranger).may_manage(owner));
    }
}
