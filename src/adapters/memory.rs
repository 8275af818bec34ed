use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    adapters::{Adapter, EdgeId, EdgeRecord, MetaAdapter, MetaRecord, oriented},
    edge::{Column, ConnectionQuery, EdgeColumn, MetaId, MetaUpdate},
    error::Error,
    identity::ObjectId,
    relationship::Direction,
};

#[derive(Default)]
struct Tables {
    edges: BTreeMap<EdgeId, EdgeRecord>,
    meta: BTreeMap<MetaId, MetaRecord>,
    next_edge_id: EdgeId,
    next_meta_id: MetaId,
}

impl Tables {
    fn insert_meta(&mut self, edge_id: EdgeId, key: &str, value: serde_json::Value) -> MetaId {
        self.next_meta_id += 1;
        let meta_id = self.next_meta_id;
        self.meta.insert(
            meta_id,
            MetaRecord {
                meta_id,
                edge_id,
                key: key.to_string(),
                value,
            },
        );
        meta_id
    }
}

/// Process-local adapter. Rows live in ordered maps, so results come back in
/// insertion (id) order just like the SQL backends without an `ORDER BY`.
#[derive(Clone, Default)]
pub struct MemoryAdapter {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables
            .lock()
            .map_err(|_| Error::Storage("memory adapter lock poisoned".to_string()))
    }

    fn select(&self, type_name: &str, query: &ConnectionQuery) -> Result<Vec<EdgeRecord>, Error> {
        let predicate = query.build(type_name);
        let tables = self.lock()?;

        let matching = tables
            .edges
            .values()
            .filter(|record| predicate.matches(record))
            .cloned();

        Ok(match predicate.limit {
            Some(limit) => matching.take(limit as usize).collect(),
            None => matching.collect(),
        })
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(
        &self,
        type_name: &str,
        from: ObjectId,
        to: ObjectId,
        direction: Direction,
    ) -> Result<EdgeId, Error> {
        let (rel_from, rel_to) = oriented(from, to, direction)?;
        let mut tables = self.lock()?;

        tables.next_edge_id += 1;
        let id = tables.next_edge_id;
        tables.edges.insert(
            id,
            EdgeRecord {
                id,
                type_name: type_name.to_string(),
                rel_from,
                rel_to,
            },
        );

        Ok(id)
    }

    async fn delete(&self, ids: &[EdgeId]) -> Result<u64, Error> {
        let mut tables = self.lock()?;

        let mut deleted = 0;
        for id in ids {
            if tables.edges.remove(id).is_some() {
                deleted += 1;
            }
        }
        tables.meta.retain(|_, meta| !ids.contains(&meta.edge_id));

        Ok(deleted)
    }

    async fn get(&self, id: EdgeId) -> Result<Option<EdgeRecord>, Error> {
        Ok(self.lock()?.edges.get(&id).cloned())
    }

    async fn find(
        &self,
        type_name: &str,
        query: ConnectionQuery,
    ) -> Result<Vec<EdgeRecord>, Error> {
        self.select(type_name, &query.column(Column::All))
    }

    async fn pluck(
        &self,
        type_name: &str,
        query: ConnectionQuery,
        column: EdgeColumn,
    ) -> Result<Vec<u64>, Error> {
        let records = self.select(type_name, &query.column(Column::Field(column)))?;
        Ok(records.iter().map(|record| column.value(record)).collect())
    }

    async fn count(&self, type_name: &str, query: ConnectionQuery) -> Result<u64, Error> {
        let records = self.select(type_name, &query.column(Column::Count))?;
        Ok(records.len() as u64)
    }
}

#[async_trait]
impl MetaAdapter for MemoryAdapter {
    async fn add_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
        unique: bool,
    ) -> Result<Option<MetaId>, Error> {
        let mut tables = self.lock()?;
        if !tables.edges.contains_key(&edge_id) {
            return Err(Error::NotFound);
        }

        if unique
            && tables
                .meta
                .values()
                .any(|meta| meta.edge_id == edge_id && meta.key == key)
        {
            return Ok(None);
        }

        Ok(Some(tables.insert_meta(edge_id, key, value)))
    }

    async fn get_meta(
        &self,
        edge_id: EdgeId,
        key: Option<&str>,
    ) -> Result<Vec<MetaRecord>, Error> {
        let tables = self.lock()?;

        Ok(tables
            .meta
            .values()
            .filter(|meta| meta.edge_id == edge_id && key.is_none_or(|key| meta.key == key))
            .cloned()
            .collect())
    }

    async fn update_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetaUpdate, Error> {
        let mut tables = self.lock()?;

        let mut updated = 0;
        for meta in tables.meta.values_mut() {
            if meta.edge_id == edge_id && meta.key == key {
                meta.value = value.clone();
                updated += 1;
            }
        }

        if updated == 0 {
            if !tables.edges.contains_key(&edge_id) {
                return Err(Error::NotFound);
            }
            return Ok(MetaUpdate::Added(tables.insert_meta(edge_id, key, value)));
        }

        Ok(MetaUpdate::Updated(updated))
    }

    async fn delete_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: Option<&serde_json::Value>,
        delete_all: bool,
    ) -> Result<bool, Error> {
        let mut tables = self.lock()?;

        let before = tables.meta.len();
        tables.meta.retain(|_, meta| {
            let matches = (delete_all || meta.edge_id == edge_id)
                && meta.key == key
                && value.is_none_or(|value| &meta.value == value);
            !matches
        });

        Ok(tables.meta.len() < before)
    }
}
