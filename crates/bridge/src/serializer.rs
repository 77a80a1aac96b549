//! Renders the store into the telemetry JSON document.
//!
//! Every published slot appears under its canonical name in `variables`.
//! Vector slots are flattened into one key per axis (`Aircraft.Position.X`,
//! `.Y`, `.Z`). Event slots are write-only and never appear.

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{Registry, SlotId, SlotKind, axis_key};
use crate::store::{SlotValue, StoreView};

pub const SCHEMA_NAME: &str = "aerofly-bridge-telemetry";
pub const SCHEMA_VERSION: u32 = 1;
pub const TIMESTAMP_UNIT: &str = "microseconds";

#[derive(Debug, Clone)]
struct Key {
    name: String,
    slot: usize,
    axis: usize,
}

#[derive(Debug, Clone, Copy)]
enum Entry<'a> {
    Number(f64),
    Integer(u32),
    Text(&'a str),
}

impl Serialize for Entry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Number(v) => serializer.serialize_f64(*v),
            Entry::Integer(v) => serializer.serialize_u32(*v),
            Entry::Text(v) => serializer.serialize_str(v),
        }
    }
}

struct Variables<'a> {
    keys: &'a [Key],
    entries: &'a [Entry<'a>],
}

impl Serialize for Variables<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in self.keys.iter().zip(self.entries) {
            map.serialize_entry(&key.name, entry)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct Document<'a> {
    schema: &'static str,
    schema_version: u32,
    timestamp: u64,
    timestamp_unit: &'static str,
    data_valid: u8,
    update_counter: u32,
    variables: Variables<'a>,
}

pub struct SnapshotSerializer {
    keys: Vec<Key>,
    non_finite: HashSet<SlotId>,
}

impl SnapshotSerializer {
    pub fn new(registry: &Registry) -> Self {
        let mut keys = Vec::new();
        for slot in registry.iter().filter(|s| !s.is_internal()) {
            match slot.kind {
                SlotKind::Vector2 | SlotKind::Vector3 => {
                    for axis in 0..slot.kind.axes() {
                        keys.push(Key {
                            name: axis_key(slot.name, axis),
                            slot: slot.index,
                            axis,
                        });
                    }
                }
                _ => keys.push(Key {
                    name: slot.name.to_owned(),
                    slot: slot.index,
                    axis: 0,
                }),
            }
        }
        Self {
            keys,
            non_finite: HashSet::new(),
        }
    }

    /// Number of keys in the `variables` map.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn render(&mut self, view: &StoreView<'_>) -> String {
        let registry = view.registry();
        let mut entries = Vec::with_capacity(self.keys.len());

        for key in &self.keys {
            let Some(slot) = registry.get(key.slot) else {
                continue;
            };
            let entry = match view.value(slot) {
                SlotValue::Number(v) => Entry::Number(v),
                SlotValue::Code(v) => Entry::Integer(v),
                SlotValue::Vector2(v) => Entry::Number(v[key.axis]),
                SlotValue::Vector3(v) => Entry::Number(v[key.axis]),
                SlotValue::Text(text) => Entry::Text(text),
            };
            let entry = match entry {
                Entry::Number(v) if !v.is_finite() => {
                    if self.non_finite.insert(slot.id) {
                        warn!("{} is {}, publishing 0", key.name, v);
                    } else {
                        debug!("{} is {}, publishing 0", key.name, v);
                    }
                    Entry::Number(0.0)
                }
                entry => entry,
            };
            entries.push(entry);
        }

        let header = view.header();
        let document = Document {
            schema: SCHEMA_NAME,
            schema_version: SCHEMA_VERSION,
            timestamp: header.timestamp_us,
            timestamp_unit: TIMESTAMP_UNIT,
            data_valid: header.data_valid as u8,
            update_counter: header.update_counter,
            variables: Variables {
                keys: &self.keys,
                entries: &entries,
            },
        };

        match serde_json::to_string(&document) {
            Ok(json) => json,
            Err(e) => {
                // Only reachable through a serde_json bug: every entry is finite.
                warn!("failed to render snapshot: {}", e);
                String::from("{}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Number(f64),
    Vector(Vec<f64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSnapshot {
    pub schema: String,
    pub schema_version: u32,
    pub timestamp: u64,
    pub data_valid: bool,
    pub update_counter: u32,
    pub variables: BTreeMap<String, ParsedValue>,
}

#[derive(Deserialize)]
struct RawDocument {
    schema: String,
    schema_version: u32,
    timestamp: u64,
    data_valid: u8,
    update_counter: u32,
    variables: serde_json::Map<String, Value>,
}

/// Parses a rendered document back into canonical names, reassembling
/// flattened vector keys. Keys the registry does not know are kept as-is.
pub fn parse_snapshot(registry: &Registry, json: &str) -> serde_json::Result<ParsedSnapshot> {
    let mut raw: RawDocument = serde_json::from_str(json)?;
    let mut variables = BTreeMap::new();

    for slot in registry.iter().filter(|s| !s.is_internal()) {
        if matches!(slot.kind, SlotKind::Vector2 | SlotKind::Vector3) {
            let axes: Option<Vec<f64>> = (0..slot.kind.axes())
                .map(|axis| raw.variables.remove(&axis_key(slot.name, axis)))
                .map(|value| value.and_then(|v| v.as_f64()))
                .collect();
            if let Some(axes) = axes {
                variables.insert(slot.name.to_owned(), ParsedValue::Vector(axes));
            }
        }
    }

    for (key, value) in raw.variables {
        let value = match value {
            Value::String(text) => ParsedValue::Text(text),
            other => match other.as_f64() {
                Some(v) => ParsedValue::Number(v),
                None => continue,
            },
        };
        variables.insert(key, value);
    }

    Ok(ParsedSnapshot {
        schema: raw.schema,
        schema_version: raw.schema_version,
        timestamp: raw.timestamp,
        data_valid: raw.data_valid != 0,
        update_counter: raw.update_counter,
        variables,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::DVec3;

    use super::*;
    use crate::store::CanonicalStore;

    fn setup() -> (Arc<Registry>, CanonicalStore) {
        let registry = Arc::new(Registry::new().unwrap());
        let store = CanonicalStore::new(Arc::clone(&registry));
        (registry, store)
    }

    #[test]
    fn document_header_fields() {
        let (registry, store) = setup();
        let mut serializer = SnapshotSerializer::new(&registry);
        store.write_tick(|_| {});

        let json = serializer.render(&store.read());
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema"], SCHEMA_NAME);
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["timestamp_unit"], "microseconds");
        assert_eq!(value["data_valid"], 1);
        assert_eq!(value["update_counter"], 1);
        assert!(value["variables"].is_object());
    }

    #[test]
    fn no_flat_array_of_values() {
        let (registry, store) = setup();
        let mut serializer = SnapshotSerializer::new(&registry);
        let json = serializer.render(&store.read());
        let value: Value = serde_json::from_str(&json).unwrap();

        let object = value.as_object().unwrap();
        assert!(!object.contains_key("all_variables"));
        assert!(object.values().all(|v| !v.is_array()));
        assert!(value["variables"].as_object().unwrap().values().all(|v| !v.is_array()));
    }

    #[test]
    fn vectors_are_flattened_and_events_hidden() {
        let (registry, store) = setup();
        let mut serializer = SnapshotSerializer::new(&registry);
        let position = registry.by_name("Aircraft.Position").unwrap();
        store.write_tick(|w| w.set_vector3(position, DVec3::new(1.5, -2.0, 3.25)));

        let json = serializer.render(&store.read());
        let value: Value = serde_json::from_str(&json).unwrap();
        let variables = &value["variables"];
        assert_eq!(variables["Aircraft.Position.X"], 1.5);
        assert_eq!(variables["Aircraft.Position.Y"], -2.0);
        assert_eq!(variables["Aircraft.Position.Z"], 3.25);
        assert!(variables.get("Aircraft.Position").is_none());
        assert!(variables.get("Controls.GearToggle").is_none());
        assert_eq!(variables["Aircraft.NearestAirportIdentifier"], "----");
        assert_eq!(
            variables.as_object().unwrap().len(),
            serializer.key_count()
        );
    }

    #[test]
    fn non_finite_becomes_zero() {
        let (registry, store) = setup();
        let mut serializer = SnapshotSerializer::new(&registry);
        let altitude = registry.by_name("Aircraft.Altitude").unwrap();
        let velocity = registry.by_name("Aircraft.Velocity").unwrap();
        store.write_tick(|w| {
            w.set_scalar(altitude, f64::NAN);
            w.set_vector3(velocity, DVec3::new(f64::INFINITY, 1.0, 2.0));
        });

        for _ in 0..2 {
            let json = serializer.render(&store.read());
            let value: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["variables"]["Aircraft.Altitude"], 0.0);
            assert_eq!(value["variables"]["Aircraft.Velocity.X"], 0.0);
            assert_eq!(value["variables"]["Aircraft.Velocity.Y"], 1.0);
        }
    }

    #[test]
    fn round_trip_reproduces_writable_slots() {
        let (registry, store) = setup();
        let mut serializer = SnapshotSerializer::new(&registry);

        store.write_tick(|w| {
            for (i, slot) in registry.iter().enumerate() {
                let base = i as f64 * 0.5 + 0.25;
                match slot.kind {
                    SlotKind::Scalar => w.set_scalar(slot, base),
                    SlotKind::Code => w.set_code(slot, i as u32),
                    SlotKind::Vector2 => w.set_vector2(slot, glam::DVec2::new(base, -base)),
                    SlotKind::Vector3 => w.set_vector3(slot, DVec3::new(base, -base, base * 2.0)),
                    SlotKind::Text { .. } => w.set_text(slot, &format!("T{i}")),
                };
            }
        });

        let view = store.read();
        let parsed = parse_snapshot(&registry, &serializer.render(&view)).unwrap();
        assert_eq!(parsed.update_counter, 1);
        assert!(parsed.data_valid);

        for slot in registry.iter().filter(|s| !s.is_read_only() && !s.is_internal()) {
            let expected = match view.value(slot) {
                SlotValue::Number(v) => ParsedValue::Number(v),
                SlotValue::Code(v) => ParsedValue::Number(v as f64),
                SlotValue::Vector2(v) => ParsedValue::Vector(v.to_array().to_vec()),
                SlotValue::Vector3(v) => ParsedValue::Vector(v.to_array().to_vec()),
                SlotValue::Text(t) => ParsedValue::Text(t.to_owned()),
            };
            assert_eq!(parsed.variables.get(slot.name), Some(&expected), "{}", slot.name);
        }
    }
}
