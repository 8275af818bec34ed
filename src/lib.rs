//! # Schesis
//!
//! *σχέσις — Ancient Greek for "relation" or "state of being related".*
//!
//! Schesis stores typed, directed (or symmetric) relationships between
//! arbitrary entities in a single edge table, with a key/value metadata
//! table hanging off every edge.
//!
//! ## What's inside
//!
//! ### Relationships
//! A relationship is declared once between two sides. Each side names an
//! object type, a display label and a cardinality (`one` or `many`). The
//! options decide whether edges are reciprocal and whether self or
//! duplicate connections are allowed.
//!
//! ### Directions
//! Every edge is stored `from`-role first. A [`Directed`] view binds a
//! relationship to `From`, `To` or the query-only `Any`, and takes care of
//! swapping endpoints on writes and fanning `Any` out into both
//! orientations on reads.
//!
//! ```rust,ignore
//! use schesis::{Engine, ObjectRef, RelationshipDefinition, adapters::MemoryAdapter};
//!
//! let mut engine = Engine::new(Box::new(MemoryAdapter::new()));
//! engine.register(RelationshipDefinition::new("room_to_hotel", "room", "hotel"))?;
//!
//! let rooms = engine.relationship("room_to_hotel")?;
//! rooms.connect(&ObjectRef::new("room", 12), &ObjectRef::new("hotel", 3)).await?;
//! assert!(rooms.has(&12u64, &3u64).await?);
//! ```
//!
//! ### Storage
//! Backends implement [`Adapter`] and [`MetaAdapter`](adapters::MetaAdapter).
//! Queries reach them as a [`ConnectionQuery`], which each backend expands
//! into the same backend-neutral predicate.
//!
//! ## Feature flags
//!
//! | Flag       | Default | Description                        |
//! |------------|---------|------------------------------------|
//! | `postgres` | ✓       | PostgreSQL adapter via sqlx        |
//! | `sqlite`   | ✓       | SQLite adapter (in-memory or file) |
//!
//! The in-memory adapter is always available.

pub mod adapters;
pub mod edge;
pub mod error;
pub mod identity;
pub mod relationship;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

pub use crate::adapters::{Adapter, EdgeId, EdgeRecord, MetaRecord, TableConfig};
pub use crate::edge::*;
pub use crate::error::Error;
pub use crate::identity::*;
pub use crate::relationship::*;

/// The Engine owns the storage adapter and the registry of relationships
/// bound to it. Build it during bootstrap, register everything, then share
/// it read-only.
pub struct Engine {
    adapter: Arc<dyn Adapter>,
    relationships: BTreeMap<String, Arc<Relationship>>,
}

impl Engine {
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::from_arc(Arc::from(adapter))
    }

    pub fn from_arc(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            relationships: BTreeMap::new(),
        }
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// Registers a relationship whose sides use the default resolver.
    pub fn register(
        &mut self,
        definition: RelationshipDefinition,
    ) -> Result<Arc<Relationship>, Error> {
        self.register_sides(
            definition.name,
            definition.from.into(),
            definition.to.into(),
            definition.options,
        )
    }

    /// Registers a relationship whose sides both resolve items with `resolver`.
    pub fn register_with_resolver(
        &mut self,
        definition: RelationshipDefinition,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Result<Arc<Relationship>, Error> {
        let from = Side::from(definition.from).with_resolver(resolver.clone());
        let to = Side::from(definition.to).with_resolver(resolver);
        self.register_sides(definition.name, from, to, definition.options)
    }

    pub fn register_sides(
        &mut self,
        name: impl Into<String>,
        from: Side,
        to: Side,
        options: RelationshipOptions,
    ) -> Result<Arc<Relationship>, Error> {
        let name = name.into();
        if self.relationships.contains_key(&name) {
            return Err(Error::DuplicateRelationship(name));
        }

        let relationship = Arc::new(Relationship::new(
            name.clone(),
            from,
            to,
            options,
            self.adapter.clone(),
        )?);

        info!(relationship = %name, sides = %relationship.describe(), "registered relationship");
        self.relationships.insert(name, relationship.clone());
        Ok(relationship)
    }

    pub fn relationship(&self, name: &str) -> Result<Arc<Relationship>, Error> {
        self.relationships
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownRelationship(name.to_string()))
    }

    /// Registered relationships in name order.
    pub fn relationships(&self) -> impl Iterator<Item = &Arc<Relationship>> {
        self.relationships.values()
    }

    /// Relationships with `object_type` on either side.
    pub fn for_object_type(&self, object_type: &str) -> Vec<Arc<Relationship>> {
        self.relationships
            .values()
            .filter(|relationship| relationship.has_object_type(object_type))
            .cloned()
            .collect()
    }
}
