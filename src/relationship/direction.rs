use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Orientation of an edge. `From` and `To` are the two stored endpoints;
/// `Any` is a query-time wildcard that is never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    From,
    To,
    Any,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::From, Direction::To, Direction::Any];

    /// `From <-> To`; `Any` flips to itself.
    pub fn flip(self) -> Self {
        match self {
            Direction::From => Direction::To,
            Direction::To => Direction::From,
            Direction::Any => Direction::Any,
        }
    }

    /// The concrete orientations a query in this direction covers.
    pub fn expand(self) -> &'static [Direction] {
        match self {
            Direction::From => &[Direction::From],
            Direction::To => &[Direction::To],
            Direction::Any => &[Direction::From, Direction::To],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::From => "from",
            Direction::To => "to",
            Direction::Any => "any",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "from" => Ok(Direction::From),
            "to" => Ok(Direction::To),
            "any" => Ok(Direction::Any),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

/// Which directed behavior a relationship hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectedKind {
    /// Reads and writes follow the view's own direction.
    Directed,
    /// Writes use the canonical orientation, reads cover both.
    Reciprocal,
}

/// Relationship-wide direction semantics, derived from the `reciprocal` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionStrategy {
    Determinate,
    Reciprocal,
}

impl DirectionStrategy {
    pub fn new(reciprocal: bool) -> Self {
        if reciprocal {
            DirectionStrategy::Reciprocal
        } else {
            DirectionStrategy::Determinate
        }
    }

    /// Maps the side an item matched (`From` or `To`) to the direction the
    /// relationship works in. Symmetric edges always use `From`.
    pub fn choose_direction(self, side: Direction) -> Direction {
        match self {
            DirectionStrategy::Determinate => side,
            DirectionStrategy::Reciprocal => Direction::From,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            DirectionStrategy::Determinate => "->",
            DirectionStrategy::Reciprocal => "<->",
        }
    }

    pub fn directed_kind(self) -> DirectedKind {
        match self {
            DirectionStrategy::Determinate => DirectedKind::Directed,
            DirectionStrategy::Reciprocal => DirectedKind::Reciprocal,
        }
    }
}
