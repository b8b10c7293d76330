//! Typed IDs for type-safe document references.
//!
//! Using typed IDs prevents accidentally passing a `LotId` where a `HistoryId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deterministic item ids.
const ITEM_NAMESPACE: Uuid = Uuid::from_u128(0x7c4e_19d2_5b3a_4f08_9e61_2d8a_b5c0_f317);

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr, time_ordered) => {
        typed_id!($name, $doc);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(
    ItemId,
    "Identifier of a balance aggregate, derived from its owner and kind."
);
typed_id!(LotId, "Identifier of a credited lot.", time_ordered);
typed_id!(HistoryId, "Identifier of an audit history record.", time_ordered);

impl ItemId {
    /// Derives the id of the aggregate owned by `user_id` for `kind`.
    ///
    /// The same pair always yields the same id, so there is at most one
    /// aggregate per user and kind.
    #[must_use]
    pub fn for_owner(user_id: &str, kind: &str) -> Self {
        Self(Uuid::new_v5(
            &ITEM_NAMESPACE,
            format!("{user_id}:{kind}").as_bytes(),
        ))
    }
}
