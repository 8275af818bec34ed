#![allow(dead_code)]

use std::sync::Arc;

use schesis::{
    Adapter, Cardinality, ConnectionQuery, Direction, Engine, Error, Identify, IdentityResolver,
    MetaUpdate, Metadata, ObjectRef, RelationshipDefinition, RelationshipOptions,
};
use serde_json::json;

fn engine(adapter: &Arc<dyn Adapter>) -> Engine {
    Engine::from_arc(adapter.clone())
}

fn lenient() -> RelationshipOptions {
    RelationshipOptions::default()
        .self_connections(true)
        .duplicate_connections(true)
}

pub async fn connect_has_disconnect(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let demo = engine
        .register(RelationshipDefinition::new("round_trip", "post", "user"))
        .unwrap();

    let id = demo.connect(&1u64, &2u64).await.unwrap();
    assert!(id > 0);
    assert!(demo.has(&1u64, &2u64).await.unwrap());

    let record = demo.get(id).await.unwrap().unwrap();
    assert_eq!((record.rel_from, record.rel_to), (1, 2));

    assert!(demo.disconnect(&1u64, &2u64).await.unwrap());
    assert!(!demo.has(&1u64, &2u64).await.unwrap());
    assert_eq!(demo.disconnect(&1u64, &2u64).await, Err(Error::NotFound));
}

pub async fn self_connections(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let strict = engine
        .register(RelationshipDefinition::new("self_strict", "post", "post"))
        .unwrap();
    let relaxed = engine
        .register(
            RelationshipDefinition::new("self_relaxed", "post", "post")
                .with_options(RelationshipOptions::default().self_connections(true)),
        )
        .unwrap();

    assert_eq!(strict.connect(&5u64, &5u64).await, Err(Error::SelfConnection));
    assert!(!strict.has(&5u64, &5u64).await.unwrap());

    relaxed.connect(&5u64, &5u64).await.unwrap();
    assert!(relaxed.has(&5u64, &5u64).await.unwrap());
}

pub async fn duplicate_connections(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let strict = engine
        .register(RelationshipDefinition::new("dup_strict", "post", "user"))
        .unwrap();
    let relaxed = engine
        .register(
            RelationshipDefinition::new("dup_relaxed", "post", "user")
                .with_options(RelationshipOptions::default().duplicate_connections(true)),
        )
        .unwrap();

    strict.connect(&1u64, &2u64).await.unwrap();
    assert_eq!(
        strict.connect(&1u64, &2u64).await,
        Err(Error::DuplicateConnection)
    );

    relaxed.connect(&1u64, &2u64).await.unwrap();
    relaxed.connect(&1u64, &2u64).await.unwrap();
    let count = relaxed
        .count(ConnectionQuery::new().from(1u64).to(2u64))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

pub async fn direction_swap_on_insert(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let demo = engine
        .register(RelationshipDefinition::new("demo", "post", "post").with_options(lenient()))
        .unwrap();

    demo.connect(&1u64, &2u64).await.unwrap();
    demo.direction(Direction::To)
        .connect(&10u64, &20u64)
        .await
        .unwrap();

    let rows: Vec<(u64, u64)> = demo
        .find(ConnectionQuery::new())
        .await
        .unwrap()
        .iter()
        .map(|record| (record.rel_from, record.rel_to))
        .collect();
    assert_eq!(rows, vec![(1, 2), (20, 10)]);

    let count = |query: ConnectionQuery| {
        let demo = demo.clone();
        async move { demo.count(query).await.unwrap() }
    };
    assert_eq!(count(ConnectionQuery::new().from(1u64).to(2u64)).await, 1);
    assert_eq!(
        count(ConnectionQuery::new().from(1u64).to([2u64, 99])).await,
        1
    );
    assert_eq!(
        count(ConnectionQuery::new().from(1u64)).await,
        count(ConnectionQuery::new().from([1u64])).await
    );
    assert_eq!(
        count(
            ConnectionQuery::new()
                .from(10u64)
                .to(20u64)
                .direction(Direction::To)
        )
        .await,
        1
    );
    assert_eq!(count(ConnectionQuery::new().from(10u64).to(20u64)).await, 0);
}

pub async fn any_direction_fan_out(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let fan = engine
        .register(RelationshipDefinition::new("fan", "post", "post"))
        .unwrap();

    fan.connect(&1u64, &4u64).await.unwrap();
    fan.direction(Direction::To)
        .connect(&2u64, &5u64)
        .await
        .unwrap();
    fan.connect(&7u64, &8u64).await.unwrap();

    let query = ConnectionQuery::new().from([1u64, 2, 3]).to([4u64, 5]);
    assert_eq!(
        fan.count(query.clone().direction(Direction::Any)).await.unwrap(),
        2
    );
    assert_eq!(fan.count(query.clone()).await.unwrap(), 1);
    assert_eq!(fan.count(query.direction(Direction::To)).await.unwrap(), 1);

    let limited = fan
        .find(ConnectionQuery::new().direction(Direction::Any).with_limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(fan.count(ConnectionQuery::new().with_limit(1)).await.unwrap(), 3);
}

pub async fn reciprocal_relationships(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let friends = engine
        .register(
            RelationshipDefinition::new("friends", "user", "user")
                .with_options(RelationshipOptions::default().reciprocal(true)),
        )
        .unwrap();
    let follows = engine
        .register(RelationshipDefinition::new("follows", "user", "user"))
        .unwrap();

    friends.connect(&1u64, &2u64).await.unwrap();
    assert!(friends.has(&2u64, &1u64).await.unwrap());
    assert_eq!(
        friends.connect(&2u64, &1u64).await,
        Err(Error::DuplicateConnection)
    );
    assert_eq!(friends.connected(&1u64).await.unwrap(), vec![2]);
    assert_eq!(friends.connected(&2u64).await.unwrap(), vec![1]);
    assert_eq!(friends.describe(), "user <-> user");

    follows.connect(&1u64, &2u64).await.unwrap();
    assert!(!follows.has(&2u64, &1u64).await.unwrap());
    assert_eq!(follows.connected(&2u64).await.unwrap(), Vec::<u64>::new());
    assert_eq!(
        follows.inverse().connected(&2u64).await.unwrap(),
        vec![1]
    );
}

pub async fn typed_sides(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let rooms = engine
        .register(RelationshipDefinition::new("room_in_hotel", "room", "hotel"))
        .unwrap();

    let room = ObjectRef::new("room", 12);
    let hotel = ObjectRef::new("hotel", 3);

    // The hotel matches the `to` side, so the edge is written in `To` direction.
    rooms.connect(&hotel, &room).await.unwrap();
    assert!(rooms.has(&room, &hotel).await.unwrap());
    assert_eq!(rooms.connected(&room).await.unwrap(), vec![3]);
    assert_eq!(rooms.connected(&hotel).await.unwrap(), vec![12]);

    assert_eq!(
        rooms.connect(&ObjectRef::new("user", 1), &hotel).await,
        Err(Error::CardinalityOpposite)
    );
    assert_eq!(
        rooms.connect(&room, &ObjectRef::new("room", 13)).await,
        Err(Error::InvalidSecondParameter)
    );
    assert_eq!(
        rooms.disconnect(&ObjectRef::new("user", 1), &hotel).await,
        Err(Error::CardinalityOpposite)
    );

    assert!(rooms.disconnect(&hotel, &room).await.unwrap());
    assert!(!rooms.has(&room, &hotel).await.unwrap());
}

pub async fn cardinality_enforcement(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let stays = engine
        .register(
            RelationshipDefinition::new("stays", "guest", "hotel").with_options(
                RelationshipOptions::default()
                    .with_cardinality("many-to-one")
                    .enforce_cardinality(true),
            ),
        )
        .unwrap();
    let parents = engine
        .register(
            RelationshipDefinition::new("parents", "person", "person").with_options(
                RelationshipOptions::default()
                    .with_cardinality("one-to-many")
                    .enforce_cardinality(true),
            ),
        )
        .unwrap();
    let descriptive = engine
        .register(
            RelationshipDefinition::new("visits", "guest", "hotel").with_options(
                RelationshipOptions::default().with_cardinality("many-to-one"),
            ),
        )
        .unwrap();

    assert_eq!(
        stays.side(Direction::To).cardinality(),
        Cardinality::One
    );

    stays.connect(&1u64, &100u64).await.unwrap();
    assert_eq!(
        stays.connect(&1u64, &101u64).await,
        Err(Error::CardinalityExceeded(Direction::To))
    );
    stays.connect(&2u64, &100u64).await.unwrap();

    parents.connect(&1u64, &10u64).await.unwrap();
    parents.connect(&1u64, &11u64).await.unwrap();
    assert_eq!(
        parents.connect(&2u64, &10u64).await,
        Err(Error::CardinalityExceeded(Direction::From))
    );

    descriptive.connect(&1u64, &100u64).await.unwrap();
    descriptive.connect(&1u64, &101u64).await.unwrap();
}

pub async fn metadata(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let booking = engine
        .register(RelationshipDefinition::new("booking", "room", "hotel"))
        .unwrap();

    let metadata = Metadata::from([
        ("seats".to_string(), json!(2)),
        ("note".to_string(), json!({ "late": true })),
    ]);
    let id = booking
        .connect_with_meta(&1u64, &2u64, &metadata)
        .await
        .unwrap();

    assert_eq!(
        booking.get_single_meta(id, "seats").await.unwrap(),
        Some(json!(2))
    );
    assert_eq!(
        booking.get_single_meta(id, "note").await.unwrap(),
        Some(json!({ "late": true }))
    );
    assert_eq!(booking.get_meta(id, None).await.unwrap().len(), 2);

    assert!(
        booking
            .add_meta(id, "seats", json!(3), true)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        booking.update_meta(id, "seats", json!(4)).await.unwrap(),
        MetaUpdate::Updated(1)
    );
    assert!(matches!(
        booking.update_meta(id, "floor", json!(1)).await.unwrap(),
        MetaUpdate::Added(_)
    ));
    assert!(
        booking
            .delete_meta(id, "floor", Some(&json!(1)), false)
            .await
            .unwrap()
    );
    assert_eq!(booking.get_single_meta(id, "floor").await.unwrap(), None);

    assert!(booking.disconnect(&1u64, &2u64).await.unwrap());
    assert!(booking.get_meta(id, None).await.unwrap().is_empty());
}

pub async fn metadata_requires_edge(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let stays = engine
        .register(RelationshipDefinition::new("stays", "guest", "room"))
        .unwrap();

    let id = stays.connect(&1u64, &2u64).await.unwrap();
    assert!(stays.disconnect(&1u64, &2u64).await.unwrap());

    assert_eq!(
        stays.add_meta(id, "nights", json!(3), false).await,
        Err(Error::NotFound)
    );
    assert_eq!(
        stays.update_meta(id, "nights", json!(4)).await,
        Err(Error::NotFound)
    );
    assert!(stays.get_meta(id, None).await.unwrap().is_empty());
}

pub async fn invalid_ids_match_nothing(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let links = engine
        .register(RelationshipDefinition::new("invalid_ids", "post", "user"))
        .unwrap();

    links.connect(&1u64, &2u64).await.unwrap();
    links.connect(&3u64, &4u64).await.unwrap();

    assert_eq!(links.count(ConnectionQuery::new()).await.unwrap(), 2);
    assert_eq!(
        links
            .count(ConnectionQuery::new().from(vec![0u64]))
            .await
            .unwrap(),
        0
    );
    assert!(
        links
            .find(ConnectionQuery::new().from(vec![0u64]).to(vec![0u64]))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        links
            .count(ConnectionQuery::new().from(vec![0u64, 3]))
            .await
            .unwrap(),
        1
    );
}

pub async fn bulk_disconnect(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);
    let tags = engine
        .register(RelationshipDefinition::new("tags", "post", "term"))
        .unwrap();

    tags.connect(&1u64, &10u64).await.unwrap();
    tags.connect(&1u64, &11u64).await.unwrap();
    tags.connect(&2u64, &10u64).await.unwrap();

    let from = tags.direction(Direction::From);
    assert_eq!(from.count_connections(&1u64).await.unwrap(), 2);
    assert_eq!(tags.inverse().count_connections(&10u64).await.unwrap(), 2);

    assert_eq!(from.disconnect_all(&1u64).await.unwrap(), 2);
    assert_eq!(from.count_connections(&1u64).await.unwrap(), 0);
    assert_eq!(tags.inverse().count_connections(&10u64).await.unwrap(), 1);
    assert_eq!(from.disconnect_all(&1u64).await.unwrap(), 0);
    assert_eq!(
        from.count_connections(&0u64).await,
        Err(Error::InvalidFirstParameter)
    );
}

pub async fn registry(adapter: Arc<dyn Adapter>) {
    let mut engine = engine(&adapter);

    engine
        .register(RelationshipDefinition::new("registry_rooms", "room", "hotel"))
        .unwrap();
    engine
        .register(RelationshipDefinition::new("registry_staff", "user", "hotel"))
        .unwrap();

    assert_eq!(
        engine
            .register(RelationshipDefinition::new("registry_rooms", "room", "hotel"))
            .unwrap_err(),
        Error::DuplicateRelationship("registry_rooms".to_string())
    );
    assert!(matches!(
        engine.register(
            RelationshipDefinition::new("registry_bad", "room", "hotel").with_options(
                RelationshipOptions::default().with_cardinality("some-to-many")
            )
        ),
        Err(Error::InvalidCardinality(_))
    ));
    assert_eq!(
        engine.relationship("registry_bad").unwrap_err(),
        Error::UnknownRelationship("registry_bad".to_string())
    );

    assert_eq!(engine.relationships().count(), 2);
    assert_eq!(engine.for_object_type("hotel").len(), 2);
    assert_eq!(engine.for_object_type("user").len(), 1);
    assert!(engine.for_object_type("term").is_empty());

    let small_ids: Arc<dyn IdentityResolver> =
        Arc::new(|_: &str, item: &dyn Identify| item.object_id().filter(|id| *id < 100));
    let limited = engine
        .register_with_resolver(
            RelationshipDefinition::new("registry_limited", "room", "hotel"),
            small_ids,
        )
        .unwrap();
    assert_eq!(
        limited.connect(&1u64, &200u64).await,
        Err(Error::InvalidSecondParameter)
    );
    limited.connect(&1u64, &2u64).await.unwrap();

    let loaded: RelationshipDefinition = serde_json::from_str(
        r#"{
            "name": "registry_json",
            "from": { "object_type": "room", "label": "Rooms" },
            "to": { "object_type": "hotel", "label": "Hotels" },
            "options": { "reciprocal": false, "cardinality": "Many-To-One" }
        }"#,
    )
    .unwrap();
    let from_json = engine.register(loaded).unwrap();
    assert_eq!(from_json.to_string(), "Rooms -> Hotels");
    assert_eq!(
        engine.relationship("registry_json").unwrap().name(),
        "registry_json"
    );
}

pub async fn run_all(adapter: Arc<dyn Adapter>) {
    connect_has_disconnect(adapter.clone()).await;
    self_connections(adapter.clone()).await;
    duplicate_connections(adapter.clone()).await;
    direction_swap_on_insert(adapter.clone()).await;
    any_direction_fan_out(adapter.clone()).await;
    reciprocal_relationships(adapter.clone()).await;
    typed_sides(adapter.clone()).await;
    cardinality_enforcement(adapter.clone()).await;
    metadata(adapter.clone()).await;
    metadata_requires_edge(adapter.clone()).await;
    invalid_ids_match_nothing(adapter.clone()).await;
    bulk_disconnect(adapter.clone()).await;
    registry(adapter).await;
}
