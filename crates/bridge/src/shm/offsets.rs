use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::registry::{Registry, STORE_FORMAT_VERSION};
use crate::serializer::SCHEMA_NAME;

use super::layout::{HEADER_FIELDS, HEADER_SIZE, total_size};

/// Default file name of the offsets descriptor.
pub const OFFSETS_FILE_NAME: &str = "AeroflyBridge_offsets.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub offset: usize,
    pub kind: String,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOffset {
    pub name: String,
    pub id: u64,
    pub kind: String,
    /// Absolute offset from the start of the mapping.
    pub offset: usize,
    pub width: usize,
    pub read_only: bool,
    pub internal: bool,
}

/// Self-describing layout of the shared mapping, written next to it at
/// startup so readers never hardcode offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetsDescriptor {
    pub layout_version: u32,
    pub schema: String,
    pub mapping_name: String,
    pub header_size: usize,
    pub total_size: usize,
    pub fingerprint: String,
    pub count: usize,
    pub header_fields: Vec<HeaderField>,
    pub variables: Vec<VariableOffset>,
}

impl OffsetsDescriptor {
    pub fn from_registry(registry: &Registry, mapping_name: &str) -> Self {
        let header_fields = HEADER_FIELDS
            .iter()
            .map(|&(name, offset)| HeaderField {
                name: name.to_owned(),
                offset,
                kind: "uint32".to_owned(),
                width: 4,
            })
            .collect();

        let variables = registry
            .iter()
            .map(|slot| VariableOffset {
                name: slot.name.to_owned(),
                id: slot.id,
                kind: slot.kind.as_str().to_owned(),
                offset: HEADER_SIZE + slot.offset,
                width: slot.width,
                read_only: slot.is_read_only(),
                internal: slot.is_internal(),
            })
            .collect();

        Self {
            layout_version: STORE_FORMAT_VERSION,
            schema: SCHEMA_NAME.to_owned(),
            mapping_name: mapping_name.to_owned(),
            header_size: HEADER_SIZE,
            total_size: total_size(registry),
            fingerprint: format!("{:016x}", registry.fingerprint()),
            count: registry.len(),
            header_fields,
            variables,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableOffset> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Writes the descriptor through a temporary file so readers never see a
    /// partial document.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }

    pub fn read_from(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_every_slot_with_absolute_offsets() {
        let registry = Registry::new().unwrap();
        let descriptor = OffsetsDescriptor::from_registry(&registry, "AeroflyBridgeData");
        assert_eq!(descriptor.count, registry.len());
        assert_eq!(descriptor.variables.len(), registry.len());
        assert_eq!(descriptor.total_size, HEADER_SIZE + registry.region_size());
        assert_eq!(descriptor.layout_version, STORE_FORMAT_VERSION);

        let first = &descriptor.variables[0];
        assert_eq!(first.offset, HEADER_SIZE);

        let name = descriptor.variable("Aircraft.NearestAirportName").unwrap();
        let slot = registry.by_name("Aircraft.NearestAirportName").unwrap();
        assert_eq!(name.offset, HEADER_SIZE + slot.offset);
        assert_eq!(name.kind, "string");
        assert!(name.read_only);

        let toggle = descriptor.variable("Controls.GearToggle").unwrap();
        assert!(toggle.internal);
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OFFSETS_FILE_NAME);
        let registry = Registry::new().unwrap();
        let descriptor = OffsetsDescriptor::from_registry(&registry, "Test");
        descriptor.write_to(&path).unwrap();
        assert_eq!(OffsetsDescriptor::read_from(&path).unwrap(), descriptor);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
