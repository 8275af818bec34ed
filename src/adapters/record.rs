use serde::{Deserialize, Serialize};

use crate::{edge::MetaId, identity::ObjectId};

/// Identifier of a stored edge.
pub type EdgeId = u64;

/// One row of the edge table. Endpoints are stored `from`-role first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub rel_from: ObjectId,
    pub rel_to: ObjectId,
}

impl EdgeRecord {
    /// The endpoint opposite `id`; `rel_from` when `id` is on neither end.
    pub fn other_end(&self, id: ObjectId) -> ObjectId {
        if self.rel_from == id {
            self.rel_to
        } else {
            self.rel_from
        }
    }
}

/// One row of the edge metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub meta_id: MetaId,
    pub edge_id: EdgeId,
    pub key: String,
    pub value: serde_json::Value,
}
