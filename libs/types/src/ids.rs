//! Identifier types for book entities
//!
//! Every entity in the book is addressed by a numeric identifier handed out
//! by an identity generator. Each kind gets its own newtype so a race id can
//! never be passed where a horse id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw identifier
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a horse
    HorseId,
    "horse"
);

numeric_id!(
    /// Unique identifier for a race
    ///
    /// Stable across every version of the race; versions are addressed
    /// through the race itself.
    RaceId,
    "race"
);

numeric_id!(
    /// Unique identifier for a race meeting
    EventId,
    "event"
);

numeric_id!(
    /// Unique identifier for a user account
    UserId,
    "user"
);

numeric_id!(
    /// Unique identifier for a placed bet
    BetId,
    "bet"
);
