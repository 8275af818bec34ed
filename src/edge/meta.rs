use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key/value pairs attached to an edge when it is created.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Identifier of a single metadata row.
pub type MetaId = u64;

/// Outcome of [`MetaAdapter::update_meta`](crate::adapters::MetaAdapter::update_meta).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaUpdate {
    /// No row carried the key; a new one was added.
    Added(MetaId),
    /// Number of existing rows rewritten.
    Updated(u64),
}
