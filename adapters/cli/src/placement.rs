//! Parsing of `--place <kind>@<x>,<y>` arguments.

use std::{fmt, str::FromStr};

use gridguard_core::TowerTypeId;

/// Tower placement requested on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlacementArg {
    pub(crate) kind: TowerTypeId,
    pub(crate) x: u32,
    pub(crate) y: u32,
}

impl FromStr for PlacementArg {
    type Err = PlacementArgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, coordinates) = value
            .trim()
            .split_once('@')
            .ok_or(PlacementArgError::MissingSeparator)?;
        if kind.is_empty() {
            return Err(PlacementArgError::MissingKind);
        }
        let (x, y) = coordinates
            .split_once(',')
            .ok_or(PlacementArgError::MissingCoordinate)?;
        let x = x
            .trim()
            .parse()
            .map_err(|_| PlacementArgError::InvalidCoordinate(x.to_owned()))?;
        let y = y
            .trim()
            .parse()
            .map_err(|_| PlacementArgError::InvalidCoordinate(y.to_owned()))?;

        Ok(Self {
            kind: TowerTypeId::new(kind),
            x,
            y,
        })
    }
}

/// Errors raised while parsing a placement argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlacementArgError {
    /// The `@` between kind and coordinates is missing.
    MissingSeparator,
    /// No tower kind precedes the `@`.
    MissingKind,
    /// The coordinates are not written as `x,y`.
    MissingCoordinate,
    /// A coordinate is not a non-negative integer.
    InvalidCoordinate(String),
}

impl fmt::Display for PlacementArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => f.write_str("expected <kind>@<x>,<y>"),
            Self::MissingKind => f.write_str("tower kind must not be empty"),
            Self::MissingCoordinate => f.write_str("coordinates must be written as <x>,<y>"),
            Self::InvalidCoordinate(value) => write!(f, "invalid coordinate `{value}`"),
        }
    }
}

impl std::error::Error for PlacementArgError {}
