//! Strongly typed row identifiers.
//!
//! Every persisted entity is keyed by a 64-bit integer. Wrapping each key in
//! its own type stops an order id from being passed where a courier id is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the raw integer key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a customer order.
    OrderId
);
define_id!(
    /// Identifier of a courier (delivery person).
    CourierId
);
define_id!(
    /// Identifier of the distributor that owns orders and dispatches couriers.
    DistributorId
);
define_id!(
    /// Identifier of the buyer who placed an order.
    BuyerId
);
define_id!(
    /// Identifier of a courier-to-order assignment.
    AssignmentId
);
define_id!(
    /// Identifier of one assignment batch run.
    BatchId
);
define_id!(
    /// Identifier of a route optimization session.
    SessionId
);
