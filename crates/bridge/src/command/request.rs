use std::time::Instant;

use glam::{DVec2, DVec3};
use serde_json::Value;

use crate::net::Transport;
use crate::registry::SlotId;

use super::CommandError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandValue {
    Scalar(f64),
    Vector2(DVec2),
    Vector3(DVec3),
}

impl CommandValue {
    pub fn arity(&self) -> usize {
        match self {
            CommandValue::Scalar(_) => 1,
            CommandValue::Vector2(_) => 2,
            CommandValue::Vector3(_) => 3,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            CommandValue::Scalar(v) => v.is_finite(),
            CommandValue::Vector2(v) => v.is_finite(),
            CommandValue::Vector3(v) => v.is_finite(),
        }
    }
}

impl From<f64> for CommandValue {
    fn from(value: f64) -> Self {
        CommandValue::Scalar(value)
    }
}

/// A validated command waiting in the queue for the next simulation tick.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: &'static str,
    pub id: SlotId,
    pub value: CommandValue,
    pub arrived: Instant,
    pub source: Transport,
}

/// One `{"variable": ..., "value": ...}` object, not yet validated against
/// the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct WireCommand {
    pub variable: String,
    pub value: CommandValue,
}

/// Splits a payload into commands. A payload is a single command object or a
/// JSON array of them; each element parses independently.
pub fn parse_payload(payload: &[u8]) -> Result<Vec<Result<WireCommand, CommandError>>, CommandError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| CommandError::Malformed("payload is not valid UTF-8".into()))?
        .trim();
    if text.is_empty() {
        return Err(CommandError::EmptyPayload);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| CommandError::Malformed(e.to_string()))?;
    match value {
        Value::Array(items) if items.is_empty() => Err(CommandError::EmptyPayload),
        Value::Array(items) => Ok(items.into_iter().map(parse_command).collect()),
        other => Ok(vec![parse_command(other)]),
    }
}

fn parse_command(value: Value) -> Result<WireCommand, CommandError> {
    let Value::Object(mut object) = value else {
        return Err(CommandError::Malformed("command must be a JSON object".into()));
    };

    let variable = match object.remove("variable") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(CommandError::Malformed("variable must be a string".into())),
        None => return Err(CommandError::MissingField("variable")),
    };
    let value = match object.remove("value") {
        Some(value) => parse_value(&variable, &value)?,
        None => return Err(CommandError::MissingField("value")),
    };
    Ok(WireCommand { variable, value })
}

fn parse_value(name: &str, value: &Value) -> Result<CommandValue, CommandError> {
    let number = |v: &Value| {
        v.as_f64().ok_or_else(|| {
            CommandError::Malformed(format!("value of {name} must be numeric"))
        })
    };

    match value {
        Value::Number(_) => Ok(CommandValue::Scalar(number(value)?)),
        Value::Bool(flag) => Ok(CommandValue::Scalar(if *flag { 1.0 } else { 0.0 })),
        Value::Array(items) => match items.as_slice() {
            [x, y] => Ok(CommandValue::Vector2(DVec2::new(number(x)?, number(y)?))),
            [x, y, z] => Ok(CommandValue::Vector3(DVec3::new(
                number(x)?,
                number(y)?,
                number(z)?,
            ))),
            _ => Err(CommandError::Malformed(format!(
                "value of {name} must hold 2 or 3 numbers, got {}",
                items.len()
            ))),
        },
        _ => Err(CommandError::Malformed(format!(
            "value of {name} must be a number or an array of numbers"
        ))),
    }
}
