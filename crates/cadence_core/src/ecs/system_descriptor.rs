use crate::ecs::{System, SystemDependency};
use std::any::TypeId;

/// What the world needs to know about a system to register it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    type_id: TypeId,
    components: Vec<&'static str>,
    dependencies: Vec<SystemDependency>,
}

impl SystemDescriptor {
    /// Snapshot the declarations of `system`.
    pub fn of(system: &dyn System) -> Self {
        let mut components = system.component_deps();
        components.sort_unstable();
        components.dedup();
        Self {
            name: system.name().to_string(),
            type_id: system.as_any().type_id(),
            components,
            dependencies: system.dependencies(),
        }
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Declared `"Kind,Name"` component specs, deduplicated.
    pub fn components(&self) -> &[&'static str] {
        &self.components
    }

    pub fn dependencies(&self) -> &[SystemDependency] {
        &self.dependencies
    }
}
