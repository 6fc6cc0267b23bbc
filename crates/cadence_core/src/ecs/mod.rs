//! Entity Component System core types.
//!
//! Entities are generation-checked IDs into fixed-capacity column storage.
//! The [`EntityManager`] owns their lifecycle, components, tags and the
//! filtered live lists systems iterate; the [`World`] drives systems,
//! world logic and entity logic through the time-budgeted scheduler in
//! [`crate::runtime`].

pub mod component;
mod entity;
mod funcs;
mod id_allocator;
mod list;
mod manager;
mod spawn;
mod system;
mod system_descriptor;
mod system_handle;
mod system_registration_error;
mod system_registry;
mod tags;
mod world;

pub use entity::{Entity, EntityRef};
pub use funcs::{EntityFunc, FuncSet, WorldFunc};
pub use id_allocator::{AllocError, EntityIdAllocator};
pub use list::{
    EntityFilter, EntitySignal, FilterPredicate, ListId, SignalCallback, SignalKind,
    UpdatedEntityList,
};
pub use manager::EntityManager;
pub use spawn::{parse_logic_name, EntityLogicFn, SpawnError, SpawnRequest};
pub use system::{system_ref, with_system, AsAny, System, SystemDependency, SystemRef};
pub use system_descriptor::SystemDescriptor;
pub use system_handle::SystemHandle;
pub use system_registration_error::SystemRegistrationError;
pub(crate) use system_registry::SystemRegistry;
pub use world::{World, UPDATE_TOTAL_KEY};

/// Spawn an entity with `"Kind,Name" => value` components.
///
/// Expands to [`SpawnRequest::new`] plus one `with` per pair, passed to
/// `$target.spawn`: an [`Entity`] from a [`World`], a `Result` from an
/// [`EntityManager`].
#[macro_export]
macro_rules! spawn {
    ($target:expr $(, $spec:literal => $value:expr)* $(,)?) => {{
        let request = $crate::ecs::SpawnRequest::new()
            $(.with($spec, $value))*;
        $target.spawn(request)
    }};
}
