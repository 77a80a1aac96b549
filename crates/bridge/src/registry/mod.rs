mod catalog;
mod hash;
mod slot;

use std::collections::HashMap;

use thiserror::Error;

pub use hash::message_id;
pub use slot::{AXIS_SUFFIXES, Access, Bounds, Slot, SlotId, SlotKind, SlotSpec, axis_key};

use hash::Fingerprint;

/// Layout version written to the store header, the shared-memory header and
/// the offsets file. Bump whenever the catalog changes.
pub const STORE_FORMAT_VERSION: u32 = 3;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("catalog is empty")]
    Empty,
    #[error("duplicate slot name {0}")]
    DuplicateName(&'static str),
    #[error("slot {second} hashes to id {id:#018x}, already taken by {first}")]
    DuplicateId {
        id: SlotId,
        first: &'static str,
        second: &'static str,
    },
    #[error("flattened key {key} of {vector} collides with another slot")]
    KeyCollision { key: String, vector: &'static str },
    #[error("text slot {0} needs a capacity of at least 2")]
    TextCapacity(&'static str),
    #[error("default text of {0} does not fit its capacity")]
    DefaultTooLong(&'static str),
}

/// Immutable dispatch table from simulation message id and canonical name to
/// the slot describing where the value lives in the store.
#[derive(Debug)]
pub struct Registry {
    slots: Vec<Slot>,
    by_id: HashMap<SlotId, usize>,
    by_name: HashMap<&'static str, usize>,
    region_size: usize,
    fingerprint: u64,
}

impl Registry {
    /// Builds the registry from the built-in catalog.
    pub fn new() -> Result<Self, RegistryError> {
        Self::build(catalog::CATALOG)
    }

    pub fn build(specs: &[SlotSpec]) -> Result<Self, RegistryError> {
        if specs.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut slots = Vec::with_capacity(specs.len());
        let mut by_id = HashMap::with_capacity(specs.len());
        let mut by_name = HashMap::with_capacity(specs.len());
        let mut offset = 0;
        let mut fingerprint = Fingerprint::new();

        for (index, spec) in specs.iter().enumerate() {
            if let SlotKind::Text { capacity } = spec.kind {
                if capacity < 2 {
                    return Err(RegistryError::TextCapacity(spec.name));
                }
                if spec.default_text.len() >= capacity {
                    return Err(RegistryError::DefaultTooLong(spec.name));
                }
            }

            let id = message_id(spec.name);
            if by_name.insert(spec.name, index).is_some() {
                return Err(RegistryError::DuplicateName(spec.name));
            }
            if let Some(&first) = by_id.get(&id) {
                let first: &Slot = &slots[first];
                return Err(RegistryError::DuplicateId {
                    id,
                    first: first.name,
                    second: spec.name,
                });
            }
            by_id.insert(id, index);

            let width = spec.kind.width();
            fingerprint.write(spec.name.as_bytes());
            fingerprint.write(spec.kind.as_str().as_bytes());
            fingerprint.write_u64(offset as u64);
            fingerprint.write_u64(width as u64);

            slots.push(Slot {
                index,
                id,
                name: spec.name,
                kind: spec.kind,
                access: spec.access,
                bounds: spec.bounds,
                default_text: spec.default_text,
                offset,
                width,
            });
            offset += width;
        }

        let registry = Self {
            slots,
            by_id,
            by_name,
            region_size: offset,
            fingerprint: fingerprint.finish(),
        };
        registry.check_flattened_keys()?;
        Ok(registry)
    }

    fn check_flattened_keys(&self) -> Result<(), RegistryError> {
        for slot in &self.slots {
            if !matches!(slot.kind, SlotKind::Vector2 | SlotKind::Vector3) {
                continue;
            }
            for axis in 0..slot.kind.axes() {
                let key = axis_key(slot.name, axis);
                if self.by_name.contains_key(key.as_str()) {
                    return Err(RegistryError::KeyCollision {
                        key,
                        vector: slot.name,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn by_id(&self, id: SlotId) -> Option<&Slot> {
        self.by_id.get(&id).map(|&i| &self.slots[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&Slot> {
        self.by_name.get(name).map(|&i| &self.slots[i])
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total bytes of the value region described by this registry.
    pub fn region_size(&self) -> usize {
        self.region_size
    }

    /// FNV-1a over every slot's name, kind, offset and width, in order.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds() {
        let registry = Registry::new().unwrap();
        assert!(registry.len() >= 350);
        assert_eq!(
            registry.region_size(),
            registry.iter().map(|s| s.width).sum::<usize>()
        );
    }

    #[test]
    fn id_and_name_resolve_to_same_slot() {
        let registry = Registry::new().unwrap();
        for slot in registry.iter() {
            let a = registry.by_id(slot.id).unwrap();
            let b = registry.by_name(slot.name).unwrap();
            assert_eq!(a.index, b.index);
            assert_eq!(a.index, slot.index);
            assert_eq!(slot.id, message_id(slot.name));
        }
    }

    #[test]
    fn offsets_are_contiguous_and_aligned() {
        let registry = Registry::new().unwrap();
        let mut expected = 0;
        for slot in registry.iter() {
            assert_eq!(slot.offset, expected, "{}", slot.name);
            assert_eq!(slot.offset % 8, 0, "{}", slot.name);
            expected += slot.width;
        }
    }

    #[test]
    fn layout_is_pinned_to_format_version() {
        let registry = Registry::new().unwrap();
        assert_eq!(
            (STORE_FORMAT_VERSION, registry.len(), registry.region_size()),
            (3, 388, 3608),
            "catalog changed: bump STORE_FORMAT_VERSION and update this test"
        );
    }

    #[test]
    fn duplicate_name_is_fatal() {
        let specs = [SlotSpec::scalar("A.B"), SlotSpec::scalar("A.B")];
        assert!(matches!(
            Registry::build(&specs),
            Err(RegistryError::DuplicateName("A.B"))
        ));
    }

    #[test]
    fn flattened_key_collision_is_fatal() {
        let specs = [SlotSpec::vector3("View.Eye"), SlotSpec::scalar("View.Eye.Y")];
        assert!(matches!(
            Registry::build(&specs),
            Err(RegistryError::KeyCollision { .. })
        ));
    }

    #[test]
    fn text_default_must_fit() {
        let specs = [SlotSpec::text("A.Ident", 4).default_text("----")];
        assert!(matches!(
            Registry::build(&specs),
            Err(RegistryError::DefaultTooLong("A.Ident"))
        ));
    }

    #[test]
    fn read_only_and_event_slots() {
        let registry = Registry::new().unwrap();
        assert!(registry.by_name("Aircraft.NearestAirportName").unwrap().is_read_only());
        assert!(registry.by_name("Controls.GearToggle").unwrap().is_internal());
        let throttle = registry.by_name("Controls.Throttle").unwrap();
        assert_eq!(throttle.bounds, Some(Bounds::UNIT));
        assert!(!throttle.is_read_only());
    }
}
