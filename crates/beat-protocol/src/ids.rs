//! Request identifiers.

use crate::errors::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest integer a JSON number can carry without losing precision.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Identifier tagging one in-flight request.
///
/// Unique only among requests that are currently outstanding; an id may be
/// handed out again once its request has settled. Ids carry no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw value, rejecting anything above [`MAX_SAFE_INTEGER`].
    pub fn new(raw: u64) -> Result<Self, ProtocolError> {
        if raw > MAX_SAFE_INTEGER {
            return Err(ProtocolError::IdOutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// Wrap a raw value, clamping it into the JSON-safe range.
    #[must_use]
    pub fn clamped(raw: u64) -> Self {
        Self(raw.min(MAX_SAFE_INTEGER))
    }

    /// The raw integer value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RequestId {
    type Error = ProtocolError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<RequestId> for u64 {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
