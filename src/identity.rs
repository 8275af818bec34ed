//! Normalization of caller-supplied items into stable object identifiers.
//!
//! A relationship never stores host objects, only the positive integer that
//! names them inside their object-type namespace. Anything that can yield
//! such a number implements [`Identify`]; each [`Side`](crate::Side) then asks
//! its [`IdentityResolver`] whether the item belongs to its object type.

use serde::{Deserialize, Serialize};

/// Positive identifier of an entity within one object-type namespace.
pub type ObjectId = u64;

/// Something a relationship side can turn into an [`ObjectId`].
pub trait Identify: Sync {
    /// The raw identifier, `None` when the item carries none (or zero).
    fn object_id(&self) -> Option<ObjectId>;

    /// The object type the item declares, if any. Untyped items (raw ids)
    /// are accepted by every side.
    fn object_type(&self) -> Option<&str> {
        None
    }
}

macro_rules! identify_integer {
    ($($ty:ty),*) => {
        $(
            impl Identify for $ty {
                fn object_id(&self) -> Option<ObjectId> {
                    (*self > 0).then_some(*self as ObjectId)
                }
            }
        )*
    };
}

identify_integer!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Identify for str {
    fn object_id(&self) -> Option<ObjectId> {
        self.trim().parse::<ObjectId>().ok().filter(|id| *id > 0)
    }
}

impl Identify for String {
    fn object_id(&self) -> Option<ObjectId> {
        self.as_str().object_id()
    }
}

impl<T: Identify + ?Sized> Identify for &T {
    fn object_id(&self) -> Option<ObjectId> {
        (**self).object_id()
    }

    fn object_type(&self) -> Option<&str> {
        (**self).object_type()
    }
}

impl<T: Identify> Identify for Option<T> {
    fn object_id(&self) -> Option<ObjectId> {
        self.as_ref().and_then(Identify::object_id)
    }

    fn object_type(&self) -> Option<&str> {
        self.as_ref().and_then(Identify::object_type)
    }
}

/// A typed reference to a host object (`post #12`, `term #4`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: String,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, id: ObjectId) -> Self {
        Self {
            object_type: object_type.into(),
            id,
        }
    }
}

impl Identify for ObjectRef {
    fn object_id(&self) -> Option<ObjectId> {
        (self.id > 0).then_some(self.id)
    }

    fn object_type(&self) -> Option<&str> {
        Some(&self.object_type)
    }
}

/// Decides whether an item belongs to a side's object type and, if so,
/// which identifier it has. Must be total: unresolvable input is `None`.
pub trait IdentityResolver: Send + Sync {
    fn parse_object_id(&self, object_type: &str, item: &dyn Identify) -> Option<ObjectId>;
}

/// Accepts untyped ids everywhere and typed items only on a matching side.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedResolver;

impl IdentityResolver for TypedResolver {
    fn parse_object_id(&self, object_type: &str, item: &dyn Identify) -> Option<ObjectId> {
        match item.object_type() {
            Some(declared) if declared != object_type => None,
            _ => item.object_id(),
        }
    }
}

impl<F> IdentityResolver for F
where
    F: Fn(&str, &dyn Identify) -> Option<ObjectId> + Send + Sync,
{
    fn parse_object_id(&self, object_type: &str, item: &dyn Identify) -> Option<ObjectId> {
        self(object_type, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ids_must_be_positive() {
        assert_eq!(5u64.object_id(), Some(5));
        assert_eq!(0u64.object_id(), None);
        assert_eq!((-3i64).object_id(), None);
        assert_eq!(7i32.object_id(), Some(7));
    }

    #[test]
    fn numeric_strings_are_ids() {
        assert_eq!("42".object_id(), Some(42));
        assert_eq!(" 42 ".to_string().object_id(), Some(42));
        assert_eq!("0".object_id(), None);
        assert_eq!("post".object_id(), None);
    }

    #[test]
    fn optional_items() {
        assert_eq!(Some(3u64).object_id(), Some(3));
        assert_eq!(None::<u64>.object_id(), None);
    }

    #[test]
    fn typed_resolver_checks_object_type() {
        let resolver = TypedResolver;
        let post = ObjectRef::new("post", 12);

        assert_eq!(resolver.parse_object_id("post", &post), Some(12));
        assert_eq!(resolver.parse_object_id("term", &post), None);
        assert_eq!(resolver.parse_object_id("term", &12u64), Some(12));
        assert_eq!(
            resolver.parse_object_id("post", &ObjectRef::new("post", 0)),
            None
        );
    }

    #[test]
    fn closures_are_resolvers() {
        let only_even = |_: &str, item: &dyn Identify| item.object_id().filter(|id| id % 2 == 0);

        assert_eq!(only_even.parse_object_id("post", &4u64), Some(4));
        assert_eq!(only_even.parse_object_id("post", &5u64), None);
    }
}
