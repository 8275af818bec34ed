pub mod directed;
pub mod direction;
pub mod side;

use std::{fmt::Display, sync::Arc, time::Instant};

use metrics::histogram;
use serde::{Deserialize, Serialize};

pub use directed::Directed;
pub use direction::{DirectedKind, Direction, DirectionStrategy};
pub use side::{Cardinality, Side, SideDefinition};

use crate::{
    adapters::{Adapter, EdgeId, EdgeRecord, MetaRecord},
    edge::{ConnectionQuery, MetaId, MetaUpdate, Metadata},
    error::Error,
    identity::{Identify, ObjectId},
};

/// Behavior switches of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipOptions {
    /// `"<from>-to-<to>"` with `one` or `many` on each end.
    pub cardinality: String,
    /// Symmetric edges: `a - b` and `b - a` are the same connection.
    pub reciprocal: bool,
    pub self_connections: bool,
    pub duplicate_connections: bool,
    /// Reject connections that would give a `one` side a second edge.
    pub enforce_cardinality: bool,
}

impl Default for RelationshipOptions {
    fn default() -> Self {
        Self {
            cardinality: "many-to-many".to_string(),
            reciprocal: false,
            self_connections: false,
            duplicate_connections: false,
            enforce_cardinality: false,
        }
    }
}

impl RelationshipOptions {
    pub fn with_cardinality(mut self, cardinality: impl Into<String>) -> Self {
        self.cardinality = cardinality.into();
        self
    }

    pub fn reciprocal(mut self, reciprocal: bool) -> Self {
        self.reciprocal = reciprocal;
        self
    }

    pub fn self_connections(mut self, allow: bool) -> Self {
        self.self_connections = allow;
        self
    }

    pub fn duplicate_connections(mut self, allow: bool) -> Self {
        self.duplicate_connections = allow;
        self
    }

    pub fn enforce_cardinality(mut self, enforce: bool) -> Self {
        self.enforce_cardinality = enforce;
        self
    }
}

/// Serializable declaration of a relationship, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    pub name: String,
    pub from: SideDefinition,
    pub to: SideDefinition,
    #[serde(default)]
    pub options: RelationshipOptions,
}

impl RelationshipDefinition {
    pub fn new(
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from: SideDefinition::new(from),
            to: SideDefinition::new(to),
            options: RelationshipOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RelationshipOptions) -> Self {
        self.options = options;
        self
    }
}

/// Parses `"(one|many)-to-(one|many)"`, case-insensitively, into the
/// cardinalities of the `from` and `to` sides.
pub fn parse_cardinality(cardinality: &str) -> Result<(Cardinality, Cardinality), Error> {
    let invalid = || Error::InvalidCardinality(cardinality.to_string());

    let lowered = cardinality.to_ascii_lowercase();
    let (from, to) = lowered.split_once("-to-").ok_or_else(invalid)?;

    let from = from.parse::<Cardinality>().map_err(|_| invalid())?;
    let to = to.parse::<Cardinality>().map_err(|_| invalid())?;
    Ok((from, to))
}

/// A named, typed connection between two sides, bound to a storage adapter.
///
/// Immutable once built; share it behind a reference or an `Arc`.
pub struct Relationship {
    name: String,
    from: Side,
    to: Side,
    strategy: DirectionStrategy,
    options: RelationshipOptions,
    adapter: Arc<dyn Adapter>,
}

impl Relationship {
    /// Builds a relationship, deriving side cardinalities from
    /// `options.cardinality`.
    pub fn new(
        name: impl Into<String>,
        mut from: Side,
        mut to: Side,
        options: RelationshipOptions,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self, Error> {
        let (from_cardinality, to_cardinality) = parse_cardinality(&options.cardinality)?;
        from.set_cardinality(from_cardinality);
        to.set_cardinality(to_cardinality);

        Ok(Self {
            name: name.into(),
            from,
            to,
            strategy: DirectionStrategy::new(options.reciprocal),
            options,
            adapter,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &RelationshipOptions {
        &self.options
    }

    pub fn strategy(&self) -> DirectionStrategy {
        self.strategy
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// The `to` side for `Direction::To`, otherwise the `from` side.
    pub fn side(&self, direction: Direction) -> &Side {
        match direction {
            Direction::To => &self.to,
            Direction::From | Direction::Any => &self.from,
        }
    }

    pub fn object_type(&self, direction: Direction) -> &str {
        self.side(direction).object_type()
    }

    pub fn has_object_type(&self, object_type: &str) -> bool {
        self.from.object_type() == object_type || self.to.object_type() == object_type
    }

    pub fn allow_self_connections(&self) -> bool {
        self.options.self_connections
    }

    pub fn allow_duplicate_connections(&self) -> bool {
        self.options.duplicate_connections
    }

    pub fn enforces_cardinality(&self) -> bool {
        self.options.enforce_cardinality
    }

    /// The direction `item` works in: the first side that accepts it, passed
    /// through the direction strategy. `None` when neither side does.
    pub fn find_direction(&self, item: &dyn Identify) -> Option<Direction> {
        [Direction::From, Direction::To]
            .into_iter()
            .find(|side| self.side(*side).parse_object_id(item).is_some())
            .map(|side| self.strategy.choose_direction(side))
    }

    pub fn direction(&self, direction: Direction) -> Directed<'_> {
        Directed::new(self, direction)
    }

    /// [`direction`](Self::direction) from a name such as `"to"`.
    pub fn direction_named(&self, direction: &str) -> Result<Directed<'_>, Error> {
        Ok(self.direction(direction.parse()?))
    }

    pub fn inverse(&self) -> Directed<'_> {
        self.direction(Direction::To)
    }

    pub fn describe(&self) -> String {
        format!(
            "{} {} {}",
            self.from.label(),
            self.strategy.arrow(),
            self.to.label()
        )
    }

    fn directed_for(&self, item: &dyn Identify) -> Result<Directed<'_>, Error> {
        self.find_direction(item)
            .map(|direction| self.direction(direction))
            .ok_or(Error::CardinalityOpposite)
    }

    pub async fn has(&self, from: &dyn Identify, to: &dyn Identify) -> Result<bool, Error> {
        let direction = self.find_direction(from).unwrap_or(Direction::From);
        self.direction(direction).has(from, to).await
    }

    pub async fn connect(&self, from: &dyn Identify, to: &dyn Identify) -> Result<EdgeId, Error> {
        self.directed_for(from)?.connect(from, to).await
    }

    pub async fn connect_with_meta(
        &self,
        from: &dyn Identify,
        to: &dyn Identify,
        metadata: &Metadata,
    ) -> Result<EdgeId, Error> {
        self.directed_for(from)?
            .connect_with_meta(from, to, metadata)
            .await
    }

    pub async fn disconnect(&self, from: &dyn Identify, to: &dyn Identify) -> Result<bool, Error> {
        self.directed_for(from)?.disconnect(from, to).await
    }

    pub async fn connected(&self, item: &dyn Identify) -> Result<Vec<ObjectId>, Error> {
        self.directed_for(item)?.connected(item).await
    }

    /// Edges of this relationship matching `query` as given.
    pub async fn find(&self, query: ConnectionQuery) -> Result<Vec<EdgeRecord>, Error> {
        let start = Instant::now();
        let records = self.adapter.find(&self.name, query).await?;
        histogram!("schesis.query.duration_ms",
            "type" => self.name.clone()
        )
        .record(start.elapsed().as_millis() as f64);
        Ok(records)
    }

    pub async fn first(&self, query: ConnectionQuery) -> Result<Option<EdgeRecord>, Error> {
        let start = Instant::now();
        let record = self.adapter.first(&self.name, query).await?;
        histogram!("schesis.query.duration_ms",
            "type" => self.name.clone()
        )
        .record(start.elapsed().as_millis() as f64);
        Ok(record)
    }

    pub async fn count(&self, query: ConnectionQuery) -> Result<u64, Error> {
        let start = Instant::now();
        let count = self.adapter.count(&self.name, query).await?;
        histogram!("schesis.query.duration_ms",
            "type" => self.name.clone()
        )
        .record(start.elapsed().as_millis() as f64);
        Ok(count)
    }

    pub async fn get(&self, id: EdgeId) -> Result<Option<EdgeRecord>, Error> {
        let record = self.adapter.get(id).await?;
        Ok(record.filter(|record| record.type_name == self.name))
    }

    pub async fn add_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
        unique: bool,
    ) -> Result<Option<MetaId>, Error> {
        self.adapter.add_meta(edge_id, key, value, unique).await
    }

    pub async fn get_meta(
        &self,
        edge_id: EdgeId,
        key: Option<&str>,
    ) -> Result<Vec<MetaRecord>, Error> {
        self.adapter.get_meta(edge_id, key).await
    }

    /// First value stored under `key`.
    pub async fn get_single_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, Error> {
        let records = self.adapter.get_meta(edge_id, Some(key)).await?;
        Ok(records.into_iter().next().map(|record| record.value))
    }

    pub async fn update_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetaUpdate, Error> {
        self.adapter.update_meta(edge_id, key, value).await
    }

    pub async fn delete_meta(
        &self,
        edge_id: EdgeId,
        key: &str,
        value: Option<&serde_json::Value>,
        delete_all: bool,
    ) -> Result<bool, Error> {
        self.adapter
            .delete_meta(edge_id, key, value, delete_all)
            .await
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::fmt::Debug for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relationship")
            .field("name", &self.name)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("strategy", &self.strategy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::MemoryAdapter, identity::ObjectRef};

    fn build(options: RelationshipOptions) -> Result<Relationship, Error> {
        Relationship::new(
            "room_to_hotel",
            Side::new("room").with_label("Rooms"),
            Side::new("hotel").with_label("Hotels"),
            options,
            Arc::new(MemoryAdapter::new()),
        )
    }

    #[test]
    fn cardinality_strings() {
        use Cardinality::*;

        assert_eq!(parse_cardinality("many-to-many"), Ok((Many, Many)));
        assert_eq!(parse_cardinality("one-to-many"), Ok((One, Many)));
        assert_eq!(parse_cardinality("Many-To-ONE"), Ok((Many, One)));
        assert_eq!(
            parse_cardinality("uno-to-many"),
            Err(Error::InvalidCardinality("uno-to-many".to_string()))
        );
        assert!(parse_cardinality("one-to-").is_err());
        assert!(parse_cardinality("one-many").is_err());
        assert!(parse_cardinality("one-to-many-to-many").is_err());
    }

    #[test]
    fn construction_sets_side_cardinality() {
        let relationship =
            build(RelationshipOptions::default().with_cardinality("one-to-many")).unwrap();

        assert_eq!(relationship.side(Direction::From).cardinality(), Cardinality::One);
        assert_eq!(relationship.side(Direction::To).cardinality(), Cardinality::Many);

        let err = build(RelationshipOptions::default().with_cardinality("few-to-many"));
        assert!(matches!(err, Err(Error::InvalidCardinality(_))));
    }

    #[test]
    fn accessors_and_description() {
        let relationship = build(RelationshipOptions::default()).unwrap();

        assert_eq!(relationship.object_type(Direction::From), "room");
        assert_eq!(relationship.object_type(Direction::To), "hotel");
        assert!(relationship.has_object_type("hotel"));
        assert!(!relationship.has_object_type("user"));
        assert!(!relationship.allow_self_connections());
        assert!(!relationship.allow_duplicate_connections());
        assert_eq!(relationship.describe(), "Rooms -> Hotels");

        let reciprocal = build(RelationshipOptions::default().reciprocal(true)).unwrap();
        assert_eq!(reciprocal.to_string(), "Rooms <-> Hotels");
    }

    #[test]
    fn find_direction_by_side() {
        let relationship = build(RelationshipOptions::default()).unwrap();

        assert_eq!(
            relationship.find_direction(&ObjectRef::new("room", 1)),
            Some(Direction::From)
        );
        assert_eq!(
            relationship.find_direction(&ObjectRef::new("hotel", 1)),
            Some(Direction::To)
        );
        assert_eq!(relationship.find_direction(&ObjectRef::new("user", 1)), None);
        assert_eq!(relationship.find_direction(&7u64), Some(Direction::From));
        assert_eq!(relationship.find_direction(&0u64), None);

        let reciprocal = build(RelationshipOptions::default().reciprocal(true)).unwrap();
        assert_eq!(
            reciprocal.find_direction(&ObjectRef::new("hotel", 1)),
            Some(Direction::From)
        );
    }

    #[test]
    fn named_directions() {
        let relationship = build(RelationshipOptions::default()).unwrap();

        assert_eq!(
            relationship.direction_named("TO").unwrap(),
            relationship.inverse()
        );
        assert_eq!(
            relationship.direction_named("up").unwrap_err(),
            Error::InvalidDirection("up".to_string())
        );
    }

    #[tokio::test]
    async fn first_returns_the_lowest_matching_edge() {
        let relationship = build(RelationshipOptions::default()).unwrap();
        let adapter = relationship.adapter();

        adapter.create("other", 1, 2, Direction::From).await.unwrap();
        let low = adapter
            .create("room_to_hotel", 1, 3, Direction::From)
            .await
            .unwrap();
        adapter
            .create("room_to_hotel", 1, 4, Direction::From)
            .await
            .unwrap();

        let edge = relationship
            .first(ConnectionQuery::new().from(1u64))
            .await
            .unwrap()
            .unwrap();
        assert_eq!((edge.id, edge.rel_to), (low, 3));

        let none = relationship
            .first(ConnectionQuery::new().from(9u64))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn options_from_json() {
        let definition: RelationshipDefinition = serde_json::from_str(
            r#"{
                "name": "room_to_hotel",
                "from": { "object_type": "room" },
                "to": { "object_type": "hotel", "label": "Hotels" },
                "options": { "cardinality": "many-to-one", "self_connections": true }
            }"#,
        )
        .unwrap();

        assert_eq!(definition.options.cardinality, "many-to-one");
        assert!(definition.options.self_connections);
        assert!(!definition.options.reciprocal);
        assert_eq!(definition.to.label.as_deref(), Some("Hotels"));

        let bare: RelationshipDefinition = serde_json::from_str(
            r#"{"name": "a", "from": {"object_type": "x"}, "to": {"object_type": "y"}}"#,
        )
        .unwrap();
        assert_eq!(bare.options, RelationshipOptions::default());
    }
}
