use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Client-generated reference attached to every queued record so a remote
/// dedup shim can recognize a resubmission of the same event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClientRef(Uuid);

impl ClientRef {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ClientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
