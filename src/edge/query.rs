use crate::{adapters::EdgeRecord, identity::ObjectId, relationship::Direction};

/// -----------------------------
/// Connection Query (storage contract)
/// -----------------------------

/// Candidate identifiers for one endpoint of a connection query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Ids {
    /// Wildcard (`*`): no condition on this endpoint.
    #[default]
    Any,
    Only(Vec<ObjectId>),
}

impl Ids {
    /// Positive, de-duplicated ids in first-seen order. `None` for a
    /// wildcard or an empty input; `Some(vec![])` when every given id was
    /// invalid, which matches nothing.
    pub fn normalized(&self) -> Option<Vec<ObjectId>> {
        let Ids::Only(ids) = self else {
            return None;
        };
        if ids.is_empty() {
            return None;
        }

        let mut out: Vec<ObjectId> = Vec::with_capacity(ids.len());
        for id in ids {
            if *id > 0 && !out.contains(id) {
                out.push(*id);
            }
        }

        Some(out)
    }
}

impl From<ObjectId> for Ids {
    fn from(id: ObjectId) -> Self {
        Ids::Only(vec![id])
    }
}

impl From<Option<ObjectId>> for Ids {
    fn from(id: Option<ObjectId>) -> Self {
        match id {
            Some(id) => Ids::Only(vec![id]),
            None => Ids::Any,
        }
    }
}

impl From<Vec<ObjectId>> for Ids {
    fn from(ids: Vec<ObjectId>) -> Self {
        Ids::Only(ids)
    }
}

impl From<&[ObjectId]> for Ids {
    fn from(ids: &[ObjectId]) -> Self {
        Ids::Only(ids.to_vec())
    }
}

impl<const N: usize> From<[ObjectId; N]> for Ids {
    fn from(ids: [ObjectId; N]) -> Self {
        Ids::Only(ids.to_vec())
    }
}

/// Numeric edge columns that can be projected on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeColumn {
    Id,
    RelFrom,
    RelTo,
}

impl EdgeColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeColumn::Id => "id",
            EdgeColumn::RelFrom => "rel_from",
            EdgeColumn::RelTo => "rel_to",
        }
    }

    pub fn value(self, record: &EdgeRecord) -> u64 {
        match self {
            EdgeColumn::Id => record.id,
            EdgeColumn::RelFrom => record.rel_from,
            EdgeColumn::RelTo => record.rel_to,
        }
    }
}

/// What a connection query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Column {
    #[default]
    All,
    Count,
    Field(EdgeColumn),
}

/// Logical filter over the edges of one relationship.
///
/// `from` and `to` are logical endpoints; [`ConnectionQuery::build`] maps
/// them onto the physical `rel_from`/`rel_to` columns per direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionQuery {
    pub from: Ids,
    pub to: Ids,
    pub direction: Direction,
    pub limit: Option<u32>,
    pub column: Column,
}

impl Default for ConnectionQuery {
    fn default() -> Self {
        Self {
            from: Ids::Any,
            to: Ids::Any,
            direction: Direction::From,
            limit: None,
            column: Column::All,
        }
    }
}

impl ConnectionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, ids: impl Into<Ids>) -> Self {
        self.from = ids.into();
        self
    }

    pub fn to(mut self, ids: impl Into<Ids>) -> Self {
        self.to = ids.into();
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// A limit of zero means unlimited.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.column = column;
        self
    }

    /// Expands the query into the predicate a backend evaluates:
    /// `type = ? AND (clause_1 OR clause_2 ...)`, one clause per concrete
    /// orientation. In `To` orientation the logical pair is swapped, since
    /// rows are always stored `from`-role first.
    pub fn build(&self, type_name: &str) -> ConnectionPredicate {
        let from = self.from.normalized();
        let to = self.to.normalized();

        let mut clauses = Vec::with_capacity(2);
        for direction in self.direction.expand() {
            let (rel_from, rel_to) = match direction {
                Direction::To => (to.clone(), from.clone()),
                _ => (from.clone(), to.clone()),
            };

            let clause = RelClause { rel_from, rel_to };
            if !clause.is_wildcard() {
                clauses.push(clause);
            }
        }

        let limit = match self.column {
            Column::Count => None,
            _ => self.limit,
        };

        ConnectionPredicate {
            type_name: type_name.to_string(),
            clauses,
            limit,
            column: self.column,
        }
    }
}

/// Conjunction over the physical endpoint columns; `None` means unconstrained,
/// an empty set means no row can match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelClause {
    pub rel_from: Option<Vec<ObjectId>>,
    pub rel_to: Option<Vec<ObjectId>>,
}

impl RelClause {
    pub fn is_wildcard(&self) -> bool {
        self.rel_from.is_none() && self.rel_to.is_none()
    }

    pub fn matches(&self, rel_from: ObjectId, rel_to: ObjectId) -> bool {
        let from_ok = self
            .rel_from
            .as_ref()
            .is_none_or(|ids| ids.contains(&rel_from));
        let to_ok = self.rel_to.as_ref().is_none_or(|ids| ids.contains(&rel_to));
        from_ok && to_ok
    }
}

/// Backend-neutral form of a connection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPredicate {
    pub type_name: String,
    /// OR-connected; empty matches every edge of `type_name`.
    pub clauses: Vec<RelClause>,
    pub limit: Option<u32>,
    pub column: Column,
}

impl ConnectionPredicate {
    pub fn matches(&self, record: &EdgeRecord) -> bool {
        record.type_name == self.type_name
            && (self.clauses.is_empty()
                || self
                    .clauses
                    .iter()
                    .any(|clause| clause.matches(record.rel_from, record.rel_to)))
    }
}
