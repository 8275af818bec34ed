//! SQL rendering of connection predicates, shared by the sqlx backends.

use crate::{
    edge::{Column, ConnectionPredicate, RelClause},
    error::Error,
    identity::ObjectId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// `?` (SQLite)
    Question,
    /// `$1, $2, ...` (Postgres)
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SqlValue {
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SqlStatement {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

struct Renderer {
    style: Placeholder,
    binds: Vec<SqlValue>,
}

impl Renderer {
    fn push(&mut self, value: SqlValue) -> String {
        self.binds.push(value);
        match self.style {
            Placeholder::Question => "?".to_string(),
            Placeholder::Numbered => format!("${}", self.binds.len()),
        }
    }

    fn ids_condition(&mut self, column: &str, ids: &[ObjectId]) -> Result<String, Error> {
        if ids.is_empty() {
            return Ok("1 = 0".to_string());
        }
        if let [id] = ids {
            let placeholder = self.push(SqlValue::Int(to_sql_id(*id)?));
            return Ok(format!("{} = {}", column, placeholder));
        }

        let mut placeholders = Vec::with_capacity(ids.len());
        for id in ids {
            placeholders.push(self.push(SqlValue::Int(to_sql_id(*id)?)));
        }
        Ok(format!("{} IN ({})", column, placeholders.join(", ")))
    }

    fn clause(&mut self, clause: &RelClause) -> Result<String, Error> {
        let mut conditions = Vec::with_capacity(2);
        if let Some(ids) = &clause.rel_from {
            conditions.push(self.ids_condition("rel_from", ids)?);
        }
        if let Some(ids) = &clause.rel_to {
            conditions.push(self.ids_condition("rel_to", ids)?);
        }
        Ok(conditions.join(" AND "))
    }
}

pub(crate) fn to_sql_id(id: u64) -> Result<i64, Error> {
    i64::try_from(id).map_err(|_| Error::Storage(format!("identifier {} out of range", id)))
}

pub(crate) fn from_sql_id(id: i64) -> Result<u64, Error> {
    u64::try_from(id).map_err(|_| Error::Deserialize(format!("negative identifier {}", id)))
}

/// `SELECT ... FROM <table> WHERE type = ? [AND ((..) OR (..))] [LIMIT n]`
pub(crate) fn render_select(
    table: &str,
    predicate: &ConnectionPredicate,
    style: Placeholder,
) -> Result<SqlStatement, Error> {
    let mut renderer = Renderer {
        style,
        binds: Vec::new(),
    };

    let select = match predicate.column {
        Column::All => "id, type, rel_from, rel_to",
        Column::Count => "COUNT(*) AS count",
        Column::Field(column) => column.as_str(),
    };

    let type_placeholder = renderer.push(SqlValue::Text(predicate.type_name.clone()));
    let mut sql = format!(
        "SELECT {} FROM {} WHERE type = {}",
        select, table, type_placeholder
    );

    let mut clauses = Vec::with_capacity(predicate.clauses.len());
    for clause in &predicate.clauses {
        clauses.push(format!("({})", renderer.clause(clause)?));
    }
    if !clauses.is_empty() {
        sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
    }

    if predicate.column != Column::Count {
        sql.push_str(" ORDER BY id ASC");
        if let Some(limit) = predicate.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
    }

    Ok(SqlStatement {
        sql,
        binds: renderer.binds,
    })
}

/// Comma-separated placeholders for a list of ids, starting after `offset` binds.
pub(crate) fn id_list(count: usize, offset: usize, style: Placeholder) -> String {
    (1..=count)
        .map(|i| match style {
            Placeholder::Question => "?".to_string(),
            Placeholder::Numbered => format!("${}", offset + i),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
