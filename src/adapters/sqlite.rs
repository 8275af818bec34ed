use async_trait::async_trait;
use sqlx::{
    Row, Sqlite,
    query::Query as SqlxQuery,
    sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow},
};
use tracing::info;

use crate::{
    adapters::{
        Adapter, EdgeId, EdgeRecord, MetaAdapter, MetaRecord, TableConfig,
        helper::{Placeholder, SqlValue, from_sql_id, id_list, render_select, to_sql_id},
        oriented,
    },
    edge::{Column, ConnectionQuery, EdgeColumn, MetaId, MetaUpdate},
    error::Error,
    identity::ObjectId,
    relationship::Direction,
};

/// Edge ids bound per `DELETE` statement.
pub(crate) const DELETE_CHUNK: usize = 500;

/// SQLite adapter over one edge table and one metadata table.
///
/// Schema (default prefix):
/// ```sql
/// CREATE TABLE relationships (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     type TEXT NOT NULL DEFAULT '',
///     rel_from INTEGER NOT NULL,
///     rel_to INTEGER NOT NULL
/// );
///
/// CREATE TABLE relationshipmeta (
///     meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
///     relationship_id INTEGER NOT NULL,
///     meta_key TEXT,
///     meta_value TEXT
/// );
/// ```
pub struct SqliteAdapter {
    pub(crate) pool: SqlitePool,
    tables: TableConfig,
}

impl SqliteAdapter {
    /// Create a new SQLite adapter with a file-based database
    pub async fn new_file(path: &str) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", path))
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Self::from_pool(pool))
    }

    /// Create a new SQLite adapter with an in-memory database
    pub async fn new_memory() -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Self::from_pool(pool))
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            tables: TableConfig::default(),
        }
    }

    pub fn with_tables(mut self, tables: TableConfig) -> Self {
        self.tables = tables;
        self
    }

    pub fn tables(&self) -> &TableConfig {
        &self.tables
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<(), Error> {
        let edges = self.tables.edge_table();
        let meta = self.tables.meta_table();
        let owner = self.tables.meta_owner_column();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| Error::Storage(err.to_string()))?;

        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {edges} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    type TEXT NOT NULL DEFAULT '',
                    rel_from INTEGER NOT NULL,
                    rel_to INTEGER NOT NULL
                )
                "#
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{edges}_type ON {edges}(type)"),
            format!("CREATE INDEX IF NOT EXISTS idx_{edges}_rel_from ON {edges}(rel_from)"),
            format!("CREATE INDEX IF NOT EXISTS idx_{edges}_rel_to ON {edges}(rel_to)"),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {meta} (
                    meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    {owner} INTEGER NOT NULL,
                    meta_key TEXT DEFAULT NULL,
                    meta_value TEXT NULL
                )
                "#
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{meta}_owner ON {meta}({owner})"),
            format!("CREATE INDEX IF NOT EXISTS idx_{meta}_key ON {meta}(meta_key)"),
        ];

        for statement in &statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        info!(table = %edges, "sqlite relationship schema ready");
        Ok(())
    }

    fn bind_values<'q>(
        mut query: SqlxQuery<'q, Sqlite, SqliteArguments<'q>>,
        binds: Vec<SqlValue>,
    ) -> SqlxQuery<'q, Sqlite, SqliteArguments<'q>> {
        for value in binds {
            query = match value {
                SqlValue::Text(text) => query.bind(text),
                SqlValue::Int(int) => query.bind(int),
            };
        }
        query
    }

    fn map_row_to_edge_record(row: SqliteRow) -> Result<EdgeRecord, Error> {
        let de = |e: sqlx::Error| Error::Deserialize(e.to_string());

        Ok(EdgeRecord {
            id: from_sql_id(row.try_get::<i64, _>("id").map_err(de)?)?,
            type_name: row.try_get::<String, _>("type").map_err(de)?,
            rel_from: from_sql_id(row.try_get::<i64, _>("rel_from").map_err(de)?)?,
            rel_to: from_sql_id(row.try_get::<i64, _>("rel_to").map_err(de)?)?,
        })
    }

    fn map_row_to_meta_record(&self, row: SqliteRow) -> Result<MetaRecord, Error> {
        let de = |e: sqlx::Error| Error::Deserialize(e.to_string());

        let value: Option<String> = row.try_get("meta_value").map_err(de)?;
        let value = match value {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| Error::Deserialize(e.to_string()))?
            }
            None => serde_json::Value::Null,
        };

        Ok(MetaRecord {
            meta_id: from_sql_id(row.try_get::<i64, _>("meta_id").map_err(de)?)?,
            edge_id: from_sql_id(
                row.try_get::<i64, _>(self.tables.meta_owner_column().as_str())
                    .map_err(de)?,
            )?,
            key: row
                .try_get::<Option<String>, _>("meta_key")
                .map_err(de)?
                .unwrap_or_default(),
            value,
        })
    }

    async fn select_rows(
        &self,
        type_name: &str,
        query: &ConnectionQuery,
    ) -> Result<Vec<SqliteRow>, Error> {
        let statement = render_select(
            &self.tables.edge_table(),
            &query.build(type_name),
            Placeholder::Question,
        )?;

        Self::bind_values(sqlx::query(&statement.sql), statement.binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))
    }

    async fn insert_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<MetaId, Error> {
        let value = serde_json::to_string(value).map_err(|e| Error::Serialize(e.to_string()))?;

        let edge_id = to_sql_id(edge_id)?;

        // The owning edge must exist; there is no foreign key to enforce it.
        let result = sqlx::query(&format!(
            "INSERT INTO {} ({}, meta_key, meta_value) \
             SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM {} WHERE id = ?)",
            self.tables.meta_table(),
            self.tables.meta_owner_column(),
            self.tables.edge_table()
        ))
        .bind(edge_id)
        .bind(key)
        .bind(value)
        .bind(edge_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        from_sql_id(result.last_insert_rowid())
    }
}

#[async_trait]
impl Adapter for SqliteAdapter {
    async fn create(
        &self,
        type_name: &str,
        from: ObjectId,
        to: ObjectId,
        direction: Direction,
    ) -> Result<EdgeId, Error> {
        let (rel_from, rel_to) = oriented(from, to, direction)?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (type, rel_from, rel_to) VALUES (?, ?, ?)",
            self.tables.edge_table()
        ))
        .bind(type_name)
        .bind(to_sql_id(rel_from)?)
        .bind(to_sql_id(rel_to)?)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        from_sql_id(result.last_insert_rowid())
    }

    async fn delete(&self, ids: &[EdgeId]) -> Result<u64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql_ids = ids
            .iter()
            .map(|id| to_sql_id(*id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut deleted = 0;
        // Stay under SQLite's bound-parameter limit.
        for chunk in sql_ids.chunks(DELETE_CHUNK) {
            let placeholders = id_list(chunk.len(), 0, Placeholder::Question);

            let delete_edges = format!(
                "DELETE FROM {} WHERE id IN ({})",
                self.tables.edge_table(),
                placeholders
            );
            let mut query = sqlx::query(&delete_edges);
            for id in chunk {
                query = query.bind(*id);
            }
            deleted += query
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?
                .rows_affected();

            let delete_meta = format!(
                "DELETE FROM {} WHERE {} IN ({})",
                self.tables.meta_table(),
                self.tables.meta_owner_column(),
                placeholders
            );
            let mut query = sqlx::query(&delete_meta);
            for id in chunk {
                query = query.bind(*id);
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(deleted)
    }

    async fn get(&self, id: EdgeId) -> Result<Option<EdgeRecord>, Error> {
        let Ok(id) = to_sql_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query(&format!(
            "SELECT id, type, rel_from, rel_to FROM {} WHERE id = ? LIMIT 1",
            self.tables.edge_table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;

        row.map(Self::map_row_to_edge_record).transpose()
    }

    async fn find(
        &self,
        type_name: &str,
        query: ConnectionQuery,
    ) -> Result<Vec<EdgeRecord>, Error> {
        self.select_rows(type_name, &query.column(Column::All))
            .await?
            .into_iter()
            .map(Self::map_row_to_edge_record)
            .collect()
    }

    async fn pluck(
        &self,
        type_name: &str,
        query: ConnectionQuery,
        column: EdgeColumn,
    ) -> Result<Vec<u64>, Error> {
        self.select_rows(type_name, &query.column(Column::Field(column)))
            .await?
            .into_iter()
            .map(|row| {
                let value = row
                    .try_get::<i64, _>(column.as_str())
                    .map_err(|e| Error::Deserialize(e.to_string()))?;
                from_sql_id(value)
            })
            .collect()
    }

    async fn count(&self, type_name: &str, query: ConnectionQuery) -> Result<u64, Error> {
        let rows = self
            .select_rows(type_name, &query.column(Column::Count))
            .await?;

        let count = match rows.into_iter().next() {
            Some(row) => row
                .try_get::<i64, _>("count")
                .map_err(|e| Error::Deserialize(e.to_string()))?,
            None => 0,
        };

        Ok(count as u64)
    }
}

#[async_trait]
impl MetaAdapter for SqliteAdapter {
    async fn add_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
        unique: bool,
    ) -> Result<Option<MetaId>, Error> {
        if unique && !self.get_meta(edge_id, Some(key)).await?.is_empty() {
            return Ok(None);
        }

        self.insert_meta(edge_id, key, &value).await.map(Some)
    }

    async fn get_meta(
        &self,
        edge_id: EdgeId,
        key: Option<&str>,
    ) -> Result<Vec<MetaRecord>, Error> {
        let owner = self.tables.meta_owner_column();
        let mut sql = format!(
            "SELECT meta_id, {owner}, meta_key, meta_value FROM {} WHERE {owner} = ?",
            self.tables.meta_table()
        );
        if key.is_some() {
            sql.push_str(" AND meta_key = ?");
        }
        sql.push_str(" ORDER BY meta_id ASC");

        let mut query = sqlx::query(&sql).bind(to_sql_id(edge_id)?);
        if let Some(key) = key {
            query = query.bind(key);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|row| self.map_row_to_meta_record(row))
            .collect()
    }

    async fn update_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetaUpdate, Error> {
        let raw = serde_json::to_string(&value).map_err(|e| Error::Serialize(e.to_string()))?;

        let updated = sqlx::query(&format!(
            "UPDATE {} SET meta_value = ? WHERE {} = ? AND meta_key = ?",
            self.tables.meta_table(),
            self.tables.meta_owner_column()
        ))
        .bind(raw)
        .bind(to_sql_id(edge_id)?)
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            let meta_id = self.insert_meta(edge_id, key, &value).await?;
            return Ok(MetaUpdate::Added(meta_id));
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
        let mut sql = format!("DELETE FROM {} WHERE meta_key = ?", self.tables.meta_table());
        if !delete_all {
            sql.push_str(&format!(" AND {} = ?", self.tables.meta_owner_column()));
        }
        if value.is_some() {
            sql.push_str(" AND meta_value = ?");
        }

        let mut query = sqlx::query(&sql).bind(key);
        if !delete_all {
            query = query.bind(to_sql_id(edge_id)?);
        }
        if let Some(value) = value {
            let raw =
                serde_json::to_string(value).map_err(|e| Error::Serialize(e.to_string()))?;
            query = query.bind(raw);
        }

        let deleted = query
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
            .rows_affected();

        Ok(deleted > 0)
    }
}
