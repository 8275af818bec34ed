use std::{fmt::Display, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    identity::{Identify, IdentityResolver, ObjectId, TypedResolver},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    #[default]
    Many,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        }
    }
}

impl Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("one") {
            Ok(Cardinality::One)
        } else if s.eq_ignore_ascii_case("many") {
            Ok(Cardinality::Many)
        } else {
            Err(Error::InvalidCardinality(s.to_string()))
        }
    }
}

/// One endpoint role of a relationship.
#[derive(Clone)]
pub struct Side {
    object_type: String,
    label: String,
    cardinality: Cardinality,
    resolver: Arc<dyn IdentityResolver>,
}

impl Side {
    /// A side for `object_type`, labelled with the object type itself.
    pub fn new(object_type: impl Into<String>) -> Self {
        let object_type = object_type.into();
        Self {
            label: object_type.clone(),
            object_type,
            cardinality: Cardinality::Many,
            resolver: Arc::new(TypedResolver),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Only called while the owning relationship is being constructed.
    pub(crate) fn set_cardinality(&mut self, cardinality: Cardinality) {
        self.cardinality = cardinality;
    }

    /// The identifier of `item` on this side, `None` when the item is not
    /// one of this side's objects.
    pub fn parse_object_id(&self, item: &dyn Identify) -> Option<ObjectId> {
        self.resolver
            .parse_object_id(&self.object_type, item)
            .filter(|id| *id > 0)
    }
}

impl std::fmt::Debug for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Side")
            .field("object_type", &self.object_type)
            .field("label", &self.label)
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

/// Serializable declaration of a side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideDefinition {
    pub object_type: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl SideDefinition {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            label: None,
        }
    }
}

impl From<SideDefinition> for Side {
    fn from(definition: SideDefinition) -> Self {
        let side = Side::new(definition.object_type);
        match definition.label {
            Some(label) => side.with_label(label),
            None => side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ObjectRef;

    #[test]
    fn parse_cardinality_word() {
        assert_eq!("ONE".parse::<Cardinality>(), Ok(Cardinality::One));
        assert_eq!("many".parse::<Cardinality>(), Ok(Cardinality::Many));
        assert!("uno".parse::<Cardinality>().is_err());
    }

    #[test]
    fn side_resolves_own_objects_only() {
        let side = Side::new("post").with_label("Posts");

        assert_eq!(side.label(), "Posts");
        assert_eq!(side.parse_object_id(&ObjectRef::new("post", 3)), Some(3));
        assert_eq!(side.parse_object_id(&ObjectRef::new("user", 3)), None);
        assert_eq!(side.parse_object_id(&0u64), None);
    }

    #[test]
    fn custom_resolver() {
        let resolver = |_: &str, item: &dyn Identify| item.object_id().map(|id| id + 1000);
        let side = Side::new("user").with_resolver(Arc::new(resolver));

        assert_eq!(side.parse_object_id(&1u64), Some(1001));
    }

    #[test]
    fn definition_defaults_label_to_object_type() {
        let definition: SideDefinition =
            serde_json::from_str(r#"{"object_type": "room"}"#).unwrap();
        let side = Side::from(definition);

        assert_eq!(side.label(), "room");
        assert_eq!(side.cardinality(), Cardinality::Many);
    }
}
