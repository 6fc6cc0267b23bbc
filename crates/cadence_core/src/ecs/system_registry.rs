use crate::ecs::{
    SystemDependency, SystemDescriptor, SystemHandle, SystemRef, SystemRegistrationError,
};
use crate::runtime::LogicId;
use std::any::TypeId;
use std::collections::HashMap;

pub(crate) struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
    type_lookup: HashMap<TypeId, SystemHandle>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            name_lookup: HashMap::new(),
            type_lookup: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        descriptor: SystemDescriptor,
        system: SystemRef,
        logic: LogicId,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let name_key = descriptor.name().to_string();
        if self.name_lookup.contains_key(&name_key) {
            return Err(SystemRegistrationError::DuplicateName { name: name_key });
        }
        if descriptor
            .dependencies()
            .iter()
            .any(|dep| dep.type_id == descriptor.type_id())
        {
            return Err(SystemRegistrationError::SelfDependency { name: name_key });
        }

        let handle = SystemHandle::new(self.systems.len());
        self.name_lookup.insert(name_key, handle);
        self.type_lookup
            .entry(descriptor.type_id())
            .or_insert(handle);
        self.systems.push(RegisteredSystem {
            handle,
            descriptor,
            system,
            logic,
        });

        Ok(handle)
    }

    /// The first registered system of the dependency's type.
    pub fn resolve(&self, dependency: &SystemDependency) -> Option<SystemRef> {
        self.type_lookup
            .get(&dependency.type_id)
            .map(|handle| self.systems[handle.slot()].system.clone())
    }

    /// Check that every dependency of `handle` resolves.
    pub fn check_dependencies(&self, handle: SystemHandle) -> Result<(), SystemRegistrationError> {
        let Some(registered) = self.systems.get(handle.slot()) else {
            return Ok(());
        };
        for dependency in registered.descriptor.dependencies() {
            if !self.type_lookup.contains_key(&dependency.type_id) {
                return Err(SystemRegistrationError::UnresolvedDependency {
                    system: registered.descriptor.name().to_string(),
                    dependency: dependency.name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems
            .get(handle.slot())
            .map(|system| &system.descriptor)
    }

    pub fn system(&self, handle: SystemHandle) -> Option<&SystemRef> {
        self.systems
            .get(handle.slot())
            .map(|system| &system.system)
    }

    pub fn logic(&self, handle: SystemHandle) -> Option<LogicId> {
        self.systems
            .get(handle.slot())
            .map(|system| system.logic)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor, &SystemRef)> {
        self.systems
            .iter()
            .map(|system| (system.handle, &system.descriptor, &system.system))
    }
}

struct RegisteredSystem {
    handle: SystemHandle,
    descriptor: SystemDescriptor,
    system: SystemRef,
    logic: LogicId,
}
