//! Types crossing the boundary between the bridge and the host simulation.

use glam::{DVec2, DVec3};

use crate::command::CommandValue;
use crate::registry::{SlotId, message_id};

/// A raw value delivered by the simulation for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SimMessage {
    pub id: SlotId,
    pub value: SimValue,
}

impl SimMessage {
    pub fn new(id: SlotId, value: SimValue) -> Self {
        Self { id, value }
    }

    /// Builds a message addressed by canonical name.
    pub fn named(name: &str, value: impl Into<SimValue>) -> Self {
        Self {
            id: message_id(name),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimValue {
    Double(f64),
    Vector2(DVec2),
    Vector3(DVec3),
    Text(String),
    Code(u32),
}

impl From<f64> for SimValue {
    fn from(value: f64) -> Self {
        SimValue::Double(value)
    }
}

impl From<DVec2> for SimValue {
    fn from(value: DVec2) -> Self {
        SimValue::Vector2(value)
    }
}

impl From<DVec3> for SimValue {
    fn from(value: DVec3) -> Self {
        SimValue::Vector3(value)
    }
}

impl From<&str> for SimValue {
    fn from(value: &str) -> Self {
        SimValue::Text(value.to_owned())
    }
}

impl From<u32> for SimValue {
    fn from(value: u32) -> Self {
        SimValue::Code(value)
    }
}

/// A validated write request handed back to the simulation, drained once per
/// tick.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingCommand {
    pub id: SlotId,
    pub name: &'static str,
    pub value: CommandValue,
}
