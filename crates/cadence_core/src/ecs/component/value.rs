use super::kind::{ComponentKind, ComponentSpec};
use super::tag_list::TagList;
use crate::time::TimeAccumulator;
use glam::DVec2;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

pub type IntMap = HashMap<String, i64>;
pub type FloatMap = HashMap<String, f64>;
/// Opaque payload of a `Generic` column.
pub type GenericValue = Box<dyn Any + Send + Sync>;

/// One component value, tagged with its kind.
pub enum ComponentValue {
    Vec2D(DVec2),
    Bool(bool),
    Int(i64),
    Float64(f64),
    Time(Instant),
    TimeAccumulator(TimeAccumulator),
    String(String),
    TagList(TagList),
    IntMap(IntMap),
    FloatMap(FloatMap),
    Generic(GenericValue),
}

impl ComponentValue {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentValue::Vec2D(_) => ComponentKind::Vec2D,
            ComponentValue::Bool(_) => ComponentKind::Bool,
            ComponentValue::Int(_) => ComponentKind::Int,
            ComponentValue::Float64(_) => ComponentKind::Float64,
            ComponentValue::Time(_) => ComponentKind::Time,
            ComponentValue::TimeAccumulator(_) => ComponentKind::TimeAccumulator,
            ComponentValue::String(_) => ComponentKind::String,
            ComponentValue::TagList(_) => ComponentKind::TagList,
            ComponentValue::IntMap(_) => ComponentKind::IntMap,
            ComponentValue::FloatMap(_) => ComponentKind::FloatMap,
            ComponentValue::Generic(_) => ComponentKind::Generic,
        }
    }
}

impl fmt::Debug for ComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentValue::Vec2D(v) => f.debug_tuple("Vec2D").field(v).finish(),
            ComponentValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            ComponentValue::Int(v) => f.debug_tuple("Int").field(v).finish(),
            ComponentValue::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            ComponentValue::Time(v) => f.debug_tuple("Time").field(v).finish(),
            ComponentValue::TimeAccumulator(v) => {
                f.debug_tuple("TimeAccumulator").field(v).finish()
            }
            ComponentValue::String(v) => f.debug_tuple("String").field(v).finish(),
            ComponentValue::TagList(v) => f.debug_tuple("TagList").field(v).finish(),
            ComponentValue::IntMap(v) => f.debug_tuple("IntMap").field(v).finish(),
            ComponentValue::FloatMap(v) => f.debug_tuple("FloatMap").field(v).finish(),
            ComponentValue::Generic(_) => f.write_str("Generic(..)"),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ComponentValue {
                fn from(value: $ty) -> Self {
                    ComponentValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_value! {
    DVec2 => Vec2D,
    bool => Bool,
    i64 => Int,
    f64 => Float64,
    Instant => Time,
    TimeAccumulator => TimeAccumulator,
    String => String,
    TagList => TagList,
    IntMap => IntMap,
    FloatMap => FloatMap,
    GenericValue => Generic,
}

impl From<&str> for ComponentValue {
    fn from(value: &str) -> Self {
        ComponentValue::String(value.to_string())
    }
}

/// Component values keyed by parsed spec, as applied to one entity.
#[derive(Debug, Default)]
pub struct ComponentSet {
    entries: Vec<(ComponentSpec, ComponentValue)>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the value for `spec`.
    pub fn insert(&mut self, spec: ComponentSpec, value: ComponentValue) {
        match self.entries.iter_mut().find(|(s, _)| s.name == spec.name) {
            Some(entry) => *entry = (spec, value),
            None => self.entries.push((spec, value)),
        }
    }

    pub fn with(mut self, spec: ComponentSpec, value: impl Into<ComponentValue>) -> Self {
        self.insert(spec, value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ComponentSpec, ComponentValue)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(spec, _)| spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ComponentSet {
    type Item = (ComponentSpec, ComponentValue);
    type IntoIter = std::vec::IntoIter<(ComponentSpec, ComponentValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
