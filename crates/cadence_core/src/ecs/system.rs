//! The contract between the world and the systems it drives.
//!
//! A system declares the components it needs and the sibling systems it
//! talks to. At registration the world registers those components, hands
//! the system the entity manager to set up its lists, links each declared
//! dependency, and binds [`System::update`] as a logic unit in the
//! `"systems"` runner.

use crate::ecs::EntityManager;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Upcast helper so a `dyn System` can be downcast to its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait System: AsAny + Send {
    /// Unique name; also the name of the system's logic unit.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// `"Kind,Name"` specs registered before `link_world`.
    fn component_deps(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Sibling systems handed to `link_dependency` at registration.
    fn dependencies(&self) -> Vec<SystemDependency> {
        Vec::new()
    }

    /// Called once at registration, after components are registered.
    fn link_world(&mut self, _em: &mut EntityManager) {}

    fn link_dependency(&mut self, _dependency: &SystemDependency, _system: SystemRef) {}

    fn update(&mut self, em: &mut EntityManager, dt_ms: f64);

    /// Entity capacity grew by `n`.
    fn expand(&mut self, _n: usize) {}
}

/// Shared, lockable system. Linked siblings hold clones of this.
pub type SystemRef = Arc<Mutex<dyn System>>;

pub fn system_ref<S: System + 'static>(system: S) -> SystemRef {
    Arc::new(Mutex::new(system))
}

/// Lock `system` and run `f` on it as an `S`. `None` if it is another type.
pub fn with_system<S, R>(system: &SystemRef, f: impl FnOnce(&mut S) -> R) -> Option<R>
where
    S: System + 'static,
{
    let mut guard = system.lock();
    let system: &mut dyn System = &mut *guard;
    system.as_any_mut().downcast_mut::<S>().map(f)
}

/// A typed requirement on another registered system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemDependency {
    pub type_id: TypeId,
    pub name: &'static str,
}

impl SystemDependency {
    pub fn of<S: System + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }

    pub fn is<S: System + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<S>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gravity {
        g: f64,
    }

    impl System for Gravity {
        fn update(&mut self, _em: &mut EntityManager, _dt_ms: f64) {}
    }

    struct Named;

    impl System for Named {
        fn name(&self) -> &str {
            "named"
        }

        fn update(&mut self, _em: &mut EntityManager, _dt_ms: f64) {}
    }

    #[test]
    fn test_default_name_is_type_name() {
        let system = system_ref(Gravity { g: 9.8 });
        assert!(system.lock().name().ends_with("Gravity"));
        assert_eq!(system_ref(Named).lock().name(), "named");
    }

    #[test]
    fn test_with_system_downcasts() {
        let system = system_ref(Gravity { g: 9.8 });
        assert_eq!(with_system(&system, |g: &mut Gravity| g.g), Some(9.8));
        with_system(&system, |g: &mut Gravity| g.g = 1.6);
        assert_eq!(with_system(&system, |g: &mut Gravity| g.g), Some(1.6));
        assert_eq!(with_system(&system, |_: &mut Named| ()), None);
    }

    #[test]
    fn test_dependency_identity() {
        let dep = SystemDependency::of::<Gravity>();
        assert!(dep.is::<Gravity>());
        assert!(!dep.is::<Named>());
        let gravity = system_ref(Gravity { g: 0.0 });
        let guard = gravity.lock();
        let system: &dyn System = &*guard;
        assert_eq!(dep.type_id, system.as_any().type_id());
    }
}
