use std::fmt::Display;

use crate::relationship::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A direction name outside of `from`, `to` and `any`.
    InvalidDirection(String),
    /// A cardinality string that is not `(one|many)-to-(one|many)`.
    InvalidCardinality(String),
    /// Neither side of the relationship claims the first item.
    CardinalityOpposite,
    InvalidFirstParameter,
    InvalidSecondParameter,
    SelfConnection,
    DuplicateConnection,
    /// A `one` side already holds its single connection.
    CardinalityExceeded(Direction),
    NotFound,
    DuplicateRelationship(String),
    UnknownRelationship(String),
    Serialize(String),
    Deserialize(String),
    Storage(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidDirection(direction) => write!(
                f,
                "Invalid direction '{}'. The direction must be one of: from, to, any",
                direction
            ),
            Error::InvalidCardinality(cardinality) => {
                write!(f, "Invalid cardinality: {}", cardinality)
            }
            Error::CardinalityOpposite => {
                write!(f, "The first item does not belong to either side")
            }
            Error::InvalidFirstParameter => write!(f, "Invalid first parameter"),
            Error::InvalidSecondParameter => write!(f, "Invalid second parameter"),
            Error::SelfConnection => write!(
                f,
                "Connection between an element and itself is not allowed"
            ),
            Error::DuplicateConnection => write!(f, "Duplicate connections are not allowed"),
            Error::CardinalityExceeded(side) => {
                write!(f, "Cardinality problem on the '{}' side", side)
            }
            Error::NotFound => write!(f, "Not found"),
            Error::DuplicateRelationship(name) => {
                write!(f, "Relationship '{}' is already registered", name)
            }
            Error::UnknownRelationship(name) => write!(f, "Unknown relationship '{}'", name),
            Error::Serialize(err) => write!(f, "Serialization error: {}", err),
            Error::Deserialize(err) => write!(f, "Deserialization error: {}", err),
            Error::Storage(err) => write!(f, "Storage error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

