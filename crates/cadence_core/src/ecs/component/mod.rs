//! Typed component storage.
//!
//! Every registered component name owns one column pre-sized to the entity
//! capacity and a fixed bit in each entity's [`ComponentBitSet`]. Values are
//! carried as the [`ComponentValue`] variant matching the column's
//! [`ComponentKind`]; typed access goes through [`ComponentData`].

mod bits;
mod column;
mod custom;
mod kind;
mod table;
mod tag_list;
mod value;

pub use bits::ComponentBitSet;
pub use column::{Column, ComponentData};
pub use custom::CustomComponent;
#[cfg(test)]
pub(crate) use custom::testing;
pub use kind::{ComponentKind, ComponentSpec, ComponentSpecError};
pub use table::ComponentTable;
pub use tag_list::TagList;
pub use value::{ComponentSet, ComponentValue, FloatMap, GenericValue, IntMap};

/// Tag list component every entity manager registers.
pub const GENERIC_TAGS: &str = "GenericTags";
/// Spec string of [`GENERIC_TAGS`].
pub const GENERIC_TAGS_SPEC: &str = "TagList,GenericTags";
