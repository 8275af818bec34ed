#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub(crate) mod helper;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod record;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
pub use memory::MemoryAdapter;
pub use record::*;
use serde::{Deserialize, Serialize};

use crate::{
    edge::{Column, ConnectionQuery, EdgeColumn, MetaId, MetaUpdate},
    error::Error,
    identity::ObjectId,
    relationship::Direction,
};

/// -----------------------------
/// Adapter contract
/// -----------------------------

/// Key/value metadata owned by edges. Deleting an edge deletes its rows.
#[async_trait]
pub trait MetaAdapter: Send + Sync {
    /// `None` when `unique` is set and the edge already has `key`.
    /// Fails with [`Error::NotFound`] when the edge does not exist.
    async fn add_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
        unique: bool,
    ) -> Result<Option<MetaId>, Error>;

    /// Rows of `edge_id` with `key`, or every row of the edge when `key` is `None`.
    async fn get_meta(&self, edge_id: EdgeId, key: Option<&str>)
    -> Result<Vec<MetaRecord>, Error>;

    /// Rewrites every row of `edge_id` with `key`, adding one if none exists.
    /// Adding to a missing edge fails with [`Error::NotFound`].
    async fn update_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetaUpdate, Error>;

    /// Deletes rows with `key` (and `value`, when given). `delete_all`
    /// ignores `edge_id` and deletes across every edge.
    async fn delete_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: Option<&serde_json::Value>,
        delete_all: bool,
    ) -> Result<bool, Error>;
}

#[async_trait]
pub trait Adapter: MetaAdapter + Send + Sync + 'static {
    /// Inserts one edge. In `To` direction the pair is stored swapped so
    /// rows always hold the `from`-role id in `rel_from`.
    async fn create(
        &self,
        type_name: &str,
        from: ObjectId,
        to: ObjectId,
        direction: Direction,
    ) -> Result<EdgeId, Error>;

    /// Deletes edges and their metadata, returning the number of edges removed.
    async fn delete(&self, ids: &[EdgeId]) -> Result<u64, Error>;

    async fn get(&self, id: EdgeId) -> Result<Option<EdgeRecord>, Error>;

    async fn find(&self, type_name: &str, query: ConnectionQuery)
    -> Result<Vec<EdgeRecord>, Error>;

    /// Values of a single column for the edges matching `query`.
    async fn pluck(
        &self,
        type_name: &str,
        query: ConnectionQuery,
        column: EdgeColumn,
    ) -> Result<Vec<u64>, Error>;

    /// Number of matching edges; any limit on `query` is ignored.
    async fn count(&self, type_name: &str, query: ConnectionQuery) -> Result<u64, Error>;

    async fn first(
        &self,
        type_name: &str,
        query: ConnectionQuery,
    ) -> Result<Option<EdgeRecord>, Error> {
        let records = self
            .find(type_name, query.with_limit(1).column(Column::All))
            .await?;
        Ok(records.into_iter().next())
    }
}

/// Physical `(rel_from, rel_to)` for a logical pair written in `direction`.
pub(crate) fn oriented(
    from: ObjectId,
    to: ObjectId,
    direction: Direction,
) -> Result<(ObjectId, ObjectId), Error> {
    if from == 0 {
        return Err(Error::InvalidFirstParameter);
    }
    if to == 0 {
        return Err(Error::InvalidSecondParameter);
    }

    match direction {
        Direction::To => Ok((to, from)),
        Direction::From | Direction::Any => Ok((from, to)),
    }
}

/// Table naming for the SQL backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub prefix: String,
}

impl TableConfig {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn edge_table(&self) -> String {
        format!("{}relationships", self.prefix)
    }

    pub fn meta_table(&self) -> String {
        format!("{}relationshipmeta", self.prefix)
    }

    /// Column of the meta table that points at the owning edge.
    pub fn meta_owner_column(&self) -> String {
        format!("{}relationship_id", self.prefix)
    }
}
