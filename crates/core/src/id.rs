//! Strongly-typed identifiers used across the domain.
//!
//! All records use store-assigned serial keys.

use serde::{Deserialize, Serialize};

/// Identifier of a camp row (the public key is the moniker).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampId(i64);

/// Identifier of a talk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TalkId(i64);

/// Identifier of a speaker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerId(i64);

macro_rules! impl_serial_id {
    ($t:ty) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_serial_id!(CampId);
impl_serial_id!(TalkId);
impl_serial_id!(SpeakerId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_i64() {
        let id = TalkId::from(42);
        assert_eq!(id.get(), 42);
        assert_eq!(i64::from(SpeakerId::new(7)), 7);
        assert_eq!(CampId::new(3).to_string(), "3");
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&TalkId::new(5)).unwrap(), "5");
        assert_eq!(serde_json::from_str::<SpeakerId>("2").unwrap(), SpeakerId::new(2));
    }
}
