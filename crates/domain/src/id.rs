//! Stable string-backed identifiers.
//!
//! Unlike opaque surrogate keys, these ids are part of the wire protocol:
//! a `DeviceId` is used verbatim as the `{id}` segment of every MQTT topic
//! the device publishes, so it must be a caller-supplied, human-meaningful
//! string rather than a generated UUID.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_string_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string as an identifier.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Stable identifier of a device, e.g. `tv1`. Appears verbatim in MQTT topics.
    DeviceId
);

define_string_id!(
    /// Stable identifier of a scenario, e.g. `movie_night`.
    ScenarioId
);

define_string_id!(
    /// Stable identifier of a room, e.g. `living_room`.
    RoomId
);
