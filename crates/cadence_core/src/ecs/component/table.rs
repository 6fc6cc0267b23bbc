use super::bits::ComponentBitSet;
use super::column::{Column, ComponentData};
use super::custom::CustomComponent;
use super::kind::{ComponentKind, ComponentSpec};
use super::value::{ComponentSet, GenericValue};
use std::any::Any;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Columns for every registered component, indexed by entity ID.
///
/// A component's bit index is its registration order and never changes.
pub struct ComponentTable {
    capacity: usize,
    epoch: Instant,
    columns: Vec<Column>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ComponentTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            epoch: Instant::now(),
            columns: Vec::new(),
            names: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a component column. Registering an existing name is a
    /// warned no-op; the existing bit index is returned either way.
    ///
    /// # Panics
    /// For [`ComponentKind::Custom`]; use [`add_custom_component`](Self::add_custom_component).
    pub fn add_component(&mut self, kind: ComponentKind, name: &str) -> usize {
        if let Some(&bit) = self.index.get(name) {
            warn!(
                component = name,
                kind = %kind,
                existing = %self.columns[bit].kind(),
                "component registered twice; keeping the first registration"
            );
            return bit;
        }
        self.push_column(name, Column::with_capacity(kind, self.capacity, self.epoch))
    }

    /// Register from a `"Kind,Name"` spec string.
    ///
    /// # Panics
    /// If the spec is malformed or names an unknown kind.
    pub fn add_component_spec(&mut self, spec: &str) -> usize {
        match spec.parse::<ComponentSpec>() {
            Ok(spec) => self.add_component(spec.kind, &spec.name),
            Err(err) => panic!("{err}"),
        }
    }

    pub fn add_custom_component(&mut self, implementation: Box<dyn CustomComponent>) -> usize {
        let name = implementation.name().to_string();
        if let Some(&bit) = self.index.get(&name) {
            warn!(component = name.as_str(), "custom component registered twice; ignoring");
            return bit;
        }
        self.push_column(&name, Column::custom(implementation, self.capacity))
    }

    fn push_column(&mut self, name: &str, column: Column) -> usize {
        let bit = self.columns.len();
        debug!(component = name, kind = %column.kind(), bit, "registered component");
        self.columns.push(column);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), bit);
        bit
    }

    /// Whether `spec` is registered under the same name and kind.
    pub fn component_exists(&self, spec: &ComponentSpec) -> bool {
        self.kind_of(&spec.name) == Some(spec.kind)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn kind_of(&self, name: &str) -> Option<ComponentKind> {
        self.index_of(name).map(|bit| self.columns[bit].kind())
    }

    pub fn name_of(&self, bit: usize) -> Option<&str> {
        self.names.get(bit).map(String::as_str)
    }

    /// Number of registered components (the bitset width).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grow every column by `n` slots.
    pub fn expand(&mut self, n: usize) {
        for column in &mut self.columns {
            column.expand(n, self.epoch);
        }
        self.capacity += n;
    }

    /// # Panics
    /// If any entry is unregistered or registered under a different kind.
    pub fn assert_valid_component_set(&self, set: &ComponentSet) {
        for (spec, value) in set.iter() {
            match self.kind_of(&spec.name) {
                None => panic!("component {} is not registered", spec.name),
                Some(kind) if kind != spec.kind || kind != value.kind() => panic!(
                    "component {} is registered as {kind}, got spec {} with a {} value",
                    spec.name,
                    spec.kind,
                    value.kind()
                ),
                Some(_) => {}
            }
        }
    }

    /// Write every value of `set` at slot `id`.
    ///
    /// # Panics
    /// Same conditions as [`assert_valid_component_set`](Self::assert_valid_component_set).
    pub fn apply_component_set(&mut self, id: usize, set: ComponentSet) {
        self.assert_valid_component_set(&set);
        for (spec, value) in set {
            let bit = self.index[&spec.name];
            if let Err(value) = self.columns[bit].write(id, value) {
                panic!("component {} cannot hold a {} value", spec.name, value.kind());
            }
        }
    }

    /// Store a custom component value. Returns false when the name is not a
    /// custom column or the implementation rejected the value.
    pub fn apply_custom(&mut self, id: usize, name: &str, value: Box<dyn Any + Send>) -> bool {
        match self.index_of(name).map(|bit| &mut self.columns[bit]) {
            Some(Column::Custom(custom)) => custom.set(id, value),
            _ => false,
        }
    }

    /// # Panics
    /// If any name is unregistered.
    pub fn bits_from_names<S: AsRef<str>>(&self, names: &[S]) -> ComponentBitSet {
        let mut bits = ComponentBitSet::new(self.width());
        for name in names {
            let name = name.as_ref();
            match self.index_of(name) {
                Some(bit) => bits.set(bit),
                None => panic!("component {name} is not registered"),
            }
        }
        bits
    }

    pub fn bits_from_component_set(&self, set: &ComponentSet) -> ComponentBitSet {
        let names: Vec<&str> = set.names().collect();
        self.bits_from_names(&names)
    }

    /// Comma-separated names of the set bits, in bit order.
    pub fn bits_to_string(&self, bits: &ComponentBitSet) -> String {
        bits.iter_ones()
            .filter_map(|bit| self.name_of(bit))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn typed_column<T: ComponentData>(&self, name: &str) -> Option<&[T]> {
        let column = &self.columns[self.index_of(name)?];
        match T::column(column) {
            Some(values) => Some(values),
            None => panic!(
                "component {name} is {}, not {}",
                column.kind(),
                T::KIND
            ),
        }
    }

    fn typed_column_mut<T: ComponentData>(&mut self, name: &str) -> Option<&mut [T]> {
        let bit = self.index_of(name)?;
        let kind = self.columns[bit].kind();
        match T::column_mut(&mut self.columns[bit]) {
            Some(values) => Some(values),
            None => panic!("component {name} is {kind}, not {}", T::KIND),
        }
    }

    /// Value at slot `id`, `None` for an unregistered name.
    ///
    /// # Panics
    /// If `T` does not match the column kind.
    pub fn get<T: ComponentData>(&self, id: usize, name: &str) -> Option<&T> {
        self.typed_column::<T>(name).and_then(|values| values.get(id))
    }

    /// Mutable value at slot `id`, `None` for an unregistered name.
    ///
    /// # Panics
    /// If `T` does not match the column kind.
    pub fn get_mut<T: ComponentData>(&mut self, id: usize, name: &str) -> Option<&mut T> {
        self.typed_column_mut::<T>(name)
            .and_then(|values| values.get_mut(id))
    }

    /// Whole column, indexed by entity ID.
    pub fn slice<T: ComponentData>(&self, name: &str) -> Option<&[T]> {
        self.typed_column::<T>(name)
    }

    pub fn slice_mut<T: ComponentData>(&mut self, name: &str) -> Option<&mut [T]> {
        self.typed_column_mut::<T>(name)
    }

    pub fn get_generic(&self, id: usize, name: &str) -> Option<&(dyn Any + Send + Sync)> {
        match self.columns.get(self.index_of(name)?)? {
            Column::Generic(values) => values.get(id)?.as_deref(),
            _ => None,
        }
    }

    pub fn set_generic(&mut self, id: usize, name: &str, value: GenericValue) -> bool {
        let Some(bit) = self.index_of(name) else {
            return false;
        };
        match &mut self.columns[bit] {
            Column::Generic(values) if id < values.len() => {
                values[id] = Some(value);
                true
            }
            _ => false,
        }
    }

    pub fn custom(&self, name: &str) -> Option<&dyn CustomComponent> {
        match self.columns.get(self.index_of(name)?)? {
            Column::Custom(custom) => Some(custom.as_ref()),
            _ => None,
        }
    }
}
