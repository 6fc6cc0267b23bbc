use super::custom::CustomComponent;
use super::kind::ComponentKind;
use super::tag_list::TagList;
use super::value::{ComponentValue, FloatMap, GenericValue, IntMap};
use crate::time::TimeAccumulator;
use glam::DVec2;
use std::time::Instant;

/// Storage for one component across every entity slot.
pub enum Column {
    Vec2D(Vec<DVec2>),
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float64(Vec<f64>),
    /// Slots start at the table's epoch.
    Time(Vec<Instant>),
    TimeAccumulator(Vec<TimeAccumulator>),
    String(Vec<String>),
    TagList(Vec<TagList>),
    IntMap(Vec<IntMap>),
    FloatMap(Vec<FloatMap>),
    Generic(Vec<Option<GenericValue>>),
    Custom(Box<dyn CustomComponent>),
}

impl Column {
    /// Empty-valued column of `kind` sized to `capacity`.
    ///
    /// # Panics
    /// For [`ComponentKind::Custom`]; custom columns are built from their
    /// implementation.
    pub fn with_capacity(kind: ComponentKind, capacity: usize, epoch: Instant) -> Self {
        match kind {
            ComponentKind::Vec2D => Column::Vec2D(vec![DVec2::ZERO; capacity]),
            ComponentKind::Bool => Column::Bool(vec![false; capacity]),
            ComponentKind::Int => Column::Int(vec![0; capacity]),
            ComponentKind::Float64 => Column::Float64(vec![0.0; capacity]),
            ComponentKind::Time => Column::Time(vec![epoch; capacity]),
            ComponentKind::TimeAccumulator => {
                Column::TimeAccumulator(vec![TimeAccumulator::default(); capacity])
            }
            ComponentKind::String => Column::String(vec![String::new(); capacity]),
            ComponentKind::TagList => Column::TagList(vec![TagList::new(); capacity]),
            ComponentKind::IntMap => Column::IntMap(vec![IntMap::new(); capacity]),
            ComponentKind::FloatMap => Column::FloatMap(vec![FloatMap::new(); capacity]),
            ComponentKind::Generic => Column::Generic((0..capacity).map(|_| None).collect()),
            ComponentKind::Custom => panic!("custom columns are registered with their implementation"),
        }
    }

    pub fn custom(mut implementation: Box<dyn CustomComponent>, capacity: usize) -> Self {
        implementation.allocate_table(capacity);
        Column::Custom(implementation)
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Column::Vec2D(_) => ComponentKind::Vec2D,
            Column::Bool(_) => ComponentKind::Bool,
            Column::Int(_) => ComponentKind::Int,
            Column::Float64(_) => ComponentKind::Float64,
            Column::Time(_) => ComponentKind::Time,
            Column::TimeAccumulator(_) => ComponentKind::TimeAccumulator,
            Column::String(_) => ComponentKind::String,
            Column::TagList(_) => ComponentKind::TagList,
            Column::IntMap(_) => ComponentKind::IntMap,
            Column::FloatMap(_) => ComponentKind::FloatMap,
            Column::Generic(_) => ComponentKind::Generic,
            Column::Custom(_) => ComponentKind::Custom,
        }
    }

    /// Append `n` empty-valued slots.
    pub fn expand(&mut self, n: usize, epoch: Instant) {
        fn grow<T: Clone>(values: &mut Vec<T>, n: usize, fill: T) {
            values.resize(values.len() + n, fill);
        }
        match self {
            Column::Vec2D(v) => grow(v, n, DVec2::ZERO),
            Column::Bool(v) => grow(v, n, false),
            Column::Int(v) => grow(v, n, 0),
            Column::Float64(v) => grow(v, n, 0.0),
            Column::Time(v) => grow(v, n, epoch),
            Column::TimeAccumulator(v) => grow(v, n, TimeAccumulator::default()),
            Column::String(v) => grow(v, n, String::new()),
            Column::TagList(v) => grow(v, n, TagList::new()),
            Column::IntMap(v) => grow(v, n, IntMap::new()),
            Column::FloatMap(v) => grow(v, n, FloatMap::new()),
            Column::Generic(v) => v.extend((0..n).map(|_| None)),
            Column::Custom(c) => c.expand_table(n),
        }
    }

    /// Store `value` at slot `id`. Returns the value back if its kind does
    /// not match the column.
    pub fn write(&mut self, id: usize, value: ComponentValue) -> Result<(), ComponentValue> {
        match (self, value) {
            (Column::Vec2D(v), ComponentValue::Vec2D(x)) => v[id] = x,
            (Column::Bool(v), ComponentValue::Bool(x)) => v[id] = x,
            (Column::Int(v), ComponentValue::Int(x)) => v[id] = x,
            (Column::Float64(v), ComponentValue::Float64(x)) => v[id] = x,
            (Column::Time(v), ComponentValue::Time(x)) => v[id] = x,
            (Column::TimeAccumulator(v), ComponentValue::TimeAccumulator(x)) => v[id] = x,
            (Column::String(v), ComponentValue::String(x)) => v[id] = x,
            (Column::TagList(v), ComponentValue::TagList(x)) => v[id] = x,
            (Column::IntMap(v), ComponentValue::IntMap(x)) => v[id] = x,
            (Column::FloatMap(v), ComponentValue::FloatMap(x)) => v[id] = x,
            (Column::Generic(v), ComponentValue::Generic(x)) => v[id] = Some(x),
            (_, value) => return Err(value),
        }
        Ok(())
    }
}

/// Rust type stored in a built-in column kind.
pub trait ComponentData: Sized + 'static {
    const KIND: ComponentKind;

    fn column(column: &Column) -> Option<&[Self]>;

    fn column_mut(column: &mut Column) -> Option<&mut [Self]>;
}

macro_rules! impl_component_data {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ComponentData for $ty {
                const KIND: ComponentKind = ComponentKind::$variant;

                fn column(column: &Column) -> Option<&[Self]> {
                    match column {
                        Column::$variant(values) => Some(values.as_slice()),
                        _ => None,
                    }
                }

                fn column_mut(column: &mut Column) -> Option<&mut [Self]> {
                    match column {
                        Column::$variant(values) => Some(values.as_mut_slice()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_component_data! {
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
}
