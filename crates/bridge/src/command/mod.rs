mod processor;
mod queue;
mod request;

use thiserror::Error;

use crate::registry::SlotKind;

pub use processor::{CommandProcessor, PayloadOutcome};
pub use queue::CommandQueue;
pub use request::{CommandRequest, CommandValue, WireCommand, parse_payload};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("empty payload")]
    EmptyPayload,
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("unknown variable {0}")]
    UnknownVariable(String),
    #[error("{0} is read-only")]
    ReadOnly(&'static str),
    #[error("value for {0} is not finite")]
    NonFinite(&'static str),
    #[error("{name} takes {expected} value(s), got {got}")]
    WrongArity {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{name} holds {kind} and cannot be commanded")]
    UnsupportedKind { name: &'static str, kind: SlotKind },
    #[error("{value} is not a valid code for {name}")]
    OutOfRange { name: &'static str, value: f64 },
}
