#![allow(dead_code)]

use std::rc::Rc;

use machina_shared::{Metadata, ResourceKind, ResourceRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestResource {
    Iron,
    Copper,
    Water,
    /// Declares its own per-slot cap, below most slot capacities.
    Charge,
}

impl ResourceKind for TestResource {
    fn declared_capacity(&self) -> Option<u64> {
        match self {
            TestResource::Charge => Some(16),
            _ => None,
        }
    }

    fn display_name(&self) -> &str {
        match self {
            TestResource::Iron => "iron",
            TestResource::Copper => "copper",
            TestResource::Water => "water",
            TestResource::Charge => "charge",
        }
    }
}

pub fn registry() -> Rc<ResourceRegistry<TestResource>> {
    let mut registry = ResourceRegistry::new();
    registry.register(TestResource::Iron);
    registry.register(TestResource::Copper);
    registry.register(TestResource::Water);
    registry.register(TestResource::Charge);
    Rc::new(registry)
}

pub fn meta() -> Metadata {
    Metadata::empty()
}

pub fn tagged_meta() -> Metadata {
    let mut metadata = Metadata::empty();
    metadata.insert("temperature", vec![0x03, 0xe8]);
    metadata
}
