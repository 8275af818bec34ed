use std::time::Instant;

use metrics::{counter, histogram};
use tracing::debug;

use crate::{
    adapters::{EdgeId, EdgeRecord},
    edge::{ConnectionQuery, EdgeColumn, Ids, Metadata},
    error::Error,
    identity::{Identify, ObjectId},
    relationship::{Cardinality, DirectedKind, Direction, Relationship, Side},
};

/// A relationship bound to one direction.
///
/// Views are built on demand by [`Relationship::direction`] and carry no
/// state of their own; two views are equal when they wrap the same
/// relationship in the same direction.
#[derive(Clone, Copy)]
pub struct Directed<'a> {
    relationship: &'a Relationship,
    direction: Direction,
    kind: DirectedKind,
}

impl<'a> Directed<'a> {
    pub(crate) fn new(relationship: &'a Relationship, direction: Direction) -> Self {
        Self {
            relationship,
            direction,
            kind: relationship.strategy().directed_kind(),
        }
    }

    pub fn relationship(&self) -> &'a Relationship {
        self.relationship
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> DirectedKind {
        self.kind
    }

    /// The side items passed first belong to. `Any` selects like `From`.
    pub fn current(&self) -> &'a Side {
        self.relationship.side(self.current_direction())
    }

    pub fn opposite(&self) -> &'a Side {
        self.relationship.side(self.current_direction().flip())
    }

    pub fn flip(&self) -> Directed<'a> {
        Directed::new(self.relationship, self.direction.flip())
    }

    fn current_direction(&self) -> Direction {
        match self.direction {
            Direction::To => Direction::To,
            Direction::From | Direction::Any => Direction::From,
        }
    }

    /// Reciprocal edges match in either orientation.
    fn query_direction(&self) -> Direction {
        match self.kind {
            DirectedKind::Directed => self.direction,
            DirectedKind::Reciprocal => Direction::Any,
        }
    }

    /// Reciprocal edges are always written in the canonical orientation.
    fn write_direction(&self) -> Direction {
        match self.kind {
            DirectedKind::Directed => self.direction,
            DirectedKind::Reciprocal => Direction::From,
        }
    }

    fn resolve(
        &self,
        from: &dyn Identify,
        to: &dyn Identify,
    ) -> Result<(ObjectId, ObjectId), Error> {
        let from = self
            .current()
            .parse_object_id(from)
            .ok_or(Error::InvalidFirstParameter)?;
        let to = self
            .opposite()
            .parse_object_id(to)
            .ok_or(Error::InvalidSecondParameter)?;
        Ok((from, to))
    }

    fn pair_query(&self, from: impl Into<Ids>, to: impl Into<Ids>) -> ConnectionQuery {
        ConnectionQuery::new()
            .from(from)
            .to(to)
            .direction(self.query_direction())
    }

    /// Whether an edge joins the two items. An item that does not resolve
    /// is dropped from the filter instead of failing.
    pub async fn has(&self, from: &dyn Identify, to: &dyn Identify) -> Result<bool, Error> {
        let from = self.current().parse_object_id(from);
        let to = self.opposite().parse_object_id(to);

        let count = self
            .relationship
            .count(self.pair_query(from, to).with_limit(1))
            .await?;
        Ok(count > 0)
    }

    pub async fn connect(&self, from: &dyn Identify, to: &dyn Identify) -> Result<EdgeId, Error> {
        self.connect_with_meta(from, to, &Metadata::new()).await
    }

    /// Validates and stores a new edge, then attaches `metadata` to it.
    /// Validation failures return before anything is written.
    pub async fn connect_with_meta(
        &self,
        from: &dyn Identify,
        to: &dyn Identify,
        metadata: &Metadata,
    ) -> Result<EdgeId, Error> {
        let result = self.try_connect(from, to, metadata).await;
        if let Err(err) = &result {
            debug!(
                relationship = %self.relationship.name(),
                direction = %self.direction,
                error = %err,
                "connection rejected"
            );
        }
        result
    }

    async fn try_connect(
        &self,
        from: &dyn Identify,
        to: &dyn Identify,
        metadata: &Metadata,
    ) -> Result<EdgeId, Error> {
        let relationship = self.relationship;
        let (from, to) = self.resolve(from, to)?;

        if from == to && !relationship.allow_self_connections() {
            return Err(Error::SelfConnection);
        }

        if !relationship.allow_duplicate_connections()
            && relationship
                .count(self.pair_query(from, to).with_limit(1))
                .await?
                > 0
        {
            return Err(Error::DuplicateConnection);
        }

        if relationship.enforces_cardinality() {
            if self.opposite().cardinality() == Cardinality::One
                && self.count_connections_of(from).await? > 0
            {
                return Err(Error::CardinalityExceeded(
                    self.current_direction().flip(),
                ));
            }

            if self.current().cardinality() == Cardinality::One
                && self.flip().count_connections_of(to).await? > 0
            {
                return Err(Error::CardinalityExceeded(self.current_direction()));
            }
        }

        let adapter = relationship.adapter();
        let id = adapter
            .create(relationship.name(), from, to, self.write_direction())
            .await?;

        for (key, value) in metadata {
            if let Err(err) = adapter.add_meta(id, key, value.clone(), false).await {
                // Leave no half-written edge behind.
                adapter.delete(&[id]).await?;
                return Err(err);
            }
        }

        counter!("schesis.connections.created", "type" => relationship.name().to_string())
            .increment(1);
        debug!(
            relationship = %relationship.name(),
            edge = id,
            from,
            to,
            direction = %self.direction,
            "connected"
        );

        Ok(id)
    }

    /// Deletes the first edge joining the two items.
    pub async fn disconnect(&self, from: &dyn Identify, to: &dyn Identify) -> Result<bool, Error> {
        let relationship = self.relationship;
        let (from, to) = self.resolve(from, to)?;

        let Some(edge) = relationship.first(self.pair_query(from, to)).await? else {
            debug!(relationship = %relationship.name(), from, to, "no edge to disconnect");
            return Err(Error::NotFound);
        };

        let deleted = relationship.adapter().delete(&[edge.id]).await?;

        counter!("schesis.connections.deleted", "type" => relationship.name().to_string())
            .increment(deleted);
        debug!(
            relationship = %relationship.name(),
            edge = edge.id,
            from,
            to,
            "disconnected"
        );

        Ok(deleted > 0)
    }

    /// Deletes every edge of `item` in this direction, metadata included.
    pub async fn disconnect_all(&self, item: &dyn Identify) -> Result<u64, Error> {
        let relationship = self.relationship;
        let id = self
            .current()
            .parse_object_id(item)
            .ok_or(Error::InvalidFirstParameter)?;

        let edges = relationship
            .adapter()
            .pluck(
                relationship.name(),
                self.pair_query(id, Ids::Any),
                EdgeColumn::Id,
            )
            .await?;
        let deleted = relationship.adapter().delete(&edges).await?;

        counter!("schesis.connections.deleted", "type" => relationship.name().to_string())
            .increment(deleted);
        debug!(relationship = %relationship.name(), item = id, deleted, "disconnected all");

        Ok(deleted)
    }

    pub async fn count_connections(&self, item: &dyn Identify) -> Result<u64, Error> {
        let id = self
            .current()
            .parse_object_id(item)
            .ok_or(Error::InvalidFirstParameter)?;
        self.count_connections_of(id).await
    }

    async fn count_connections_of(&self, id: ObjectId) -> Result<u64, Error> {
        self.relationship
            .count(self.pair_query(id, Ids::Any))
            .await
    }

    /// Identifiers on the opposite side connected to `item`, in edge order.
    pub async fn connected(&self, item: &dyn Identify) -> Result<Vec<ObjectId>, Error> {
        let relationship = self.relationship;
        let id = self
            .current()
            .parse_object_id(item)
            .ok_or(Error::InvalidFirstParameter)?;
        let direction = self.query_direction();
        let query = self.pair_query(id, Ids::Any);

        let start = Instant::now();
        let ids = match direction {
            Direction::From => {
                relationship
                    .adapter()
                    .pluck(relationship.name(), query, EdgeColumn::RelTo)
                    .await?
            }
            Direction::To => {
                relationship
                    .adapter()
                    .pluck(relationship.name(), query, EdgeColumn::RelFrom)
                    .await?
            }
            Direction::Any => relationship
                .adapter()
                .find(relationship.name(), query)
                .await?
                .iter()
                .map(|edge| edge.other_end(id))
                .collect(),
        };
        histogram!("schesis.query.duration_ms",
            "type" => relationship.name().to_string()
        )
        .record(start.elapsed().as_millis() as f64);

        Ok(ids)
    }

    /// Runs `query` in this view's direction.
    pub async fn find(&self, query: ConnectionQuery) -> Result<Vec<EdgeRecord>, Error> {
        self.relationship
            .find(query.direction(self.query_direction()))
            .await
    }

    pub async fn count(&self, query: ConnectionQuery) -> Result<u64, Error> {
        self.relationship
            .count(query.direction(self.query_direction()))
            .await
    }
}

impl PartialEq for Directed<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.relationship, other.relationship) && self.direction == other.direction
    }
}

impl Eq for Directed<'_> {}

impl std::fmt::Debug for Directed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directed")
            .field("relationship", &self.relationship.name())
            .field("direction", &self.direction)
            .field("kind", &self.kind)
            .finish()
    }
}
