use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ThingId;

/// Free-form key/value document attached to a thing.
pub type Metadata = Map<String, Value>;

/// A registered device or resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    /// Caller-assigned identifier, immutable after creation.
    pub id: ThingId,
    /// Owning principal; scopes every read and write except key lookup.
    pub owner: String,
    /// Human-readable label, may be empty.
    #[serde(default)]
    pub name: String,
    /// Authentication secret, rotated through `update_key` only.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Thing {
    /// Creates a thing with empty name and metadata.
    #[must_use]
    pub fn new(id: ThingId, owner: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id,
            owner: owner.into(),
            name: String::new(),
            key: key.into(),
            metadata: Metadata::new(),
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the metadata document.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Window and total of a listing result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Number of matching rows irrespective of `offset`/`limit`.
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Ordered slice of things plus its unwindowed total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub things: Vec<Thing>,
    #[serde(flatten)]
    pub metadata: PageMetadata,
}

impl Page {
    #[must_use]
    pub fn new(things: Vec<Thing>, total: u64, offset: u64, limit: u64) -> Self {
        Self {
            things,
            metadata: PageMetadata {
                total,
                offset,
                limit,
            },
        }
    }
}
