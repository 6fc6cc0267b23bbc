use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Storage kind of a component column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Vec2D,
    Bool,
    Int,
    Float64,
    Time,
    TimeAccumulator,
    String,
    TagList,
    IntMap,
    FloatMap,
    Generic,
    Custom,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 12] = [
        ComponentKind::Vec2D,
        ComponentKind::Bool,
        ComponentKind::Int,
        ComponentKind::Float64,
        ComponentKind::Time,
        ComponentKind::TimeAccumulator,
        ComponentKind::String,
        ComponentKind::TagList,
        ComponentKind::IntMap,
        ComponentKind::FloatMap,
        ComponentKind::Generic,
        ComponentKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Vec2D => "Vec2D",
            ComponentKind::Bool => "Bool",
            ComponentKind::Int => "Int",
            ComponentKind::Float64 => "Float64",
            ComponentKind::Time => "Time",
            ComponentKind::TimeAccumulator => "TimeAccumulator",
            ComponentKind::String => "String",
            ComponentKind::TagList => "TagList",
            ComponentKind::IntMap => "IntMap",
            ComponentKind::FloatMap => "FloatMap",
            ComponentKind::Generic => "Generic",
            ComponentKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = ComponentSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ComponentSpecError::UnknownKind {
                kind: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentSpecError {
    #[error("component spec '{spec}' is not of the form \"Kind,Name\"")]
    Malformed { spec: String },

    #[error("unknown component kind '{kind}'")]
    UnknownKind { kind: String },
}

/// Parsed `"Kind,Name"` component spec, e.g. `"Vec2D,Position"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub kind: ComponentKind,
    pub name: String,
}

impl ComponentSpec {
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl FromStr for ComponentSpec {
    type Err = ComponentSpecError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let malformed = || ComponentSpecError::Malformed {
            spec: spec.to_string(),
        };
        let (kind, name) = spec.split_once(',').ok_or_else(malformed)?;
        let name = name.trim();
        if name.is_empty() || name.contains(',') {
            return Err(malformed());
        }
        Ok(Self {
            kind: kind.trim().parse()?,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.kind, self.name)
    }
}
