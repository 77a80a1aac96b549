use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use log::{debug, warn};

use crate::host::OutgoingCommand;
use crate::net::Transport;
use crate::registry::{Registry, SlotKind};
use crate::stats::BridgeStats;
use crate::store::code_from_f64;

use super::{CommandError, CommandQueue, CommandRequest, CommandValue, parse_payload};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

/// Validates inbound writes against the registry and queues them for the
/// simulation tick. Shared by every transport.
pub struct CommandProcessor {
    registry: Arc<Registry>,
    queue: CommandQueue,
    stats: Arc<BridgeStats>,
}

impl CommandProcessor {
    pub fn new(registry: Arc<Registry>, capacity: usize, stats: Arc<BridgeStats>) -> Self {
        Self {
            registry,
            queue: CommandQueue::new(capacity),
            stats,
        }
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Checks a command without queueing it. In-range values are returned
    /// unchanged, bounded slots are clamped.
    pub fn validate(
        &self,
        name: &str,
        value: CommandValue,
        source: Transport,
    ) -> Result<CommandRequest, CommandError> {
        let slot = self
            .registry
            .by_name(name)
            .ok_or_else(|| CommandError::UnknownVariable(name.to_owned()))?;
        if slot.is_read_only() {
            return Err(CommandError::ReadOnly(slot.name));
        }
        if !value.is_finite() {
            return Err(CommandError::NonFinite(slot.name));
        }

        let value = match (slot.kind, value) {
            (SlotKind::Scalar, CommandValue::Scalar(v)) => match slot.bounds {
                Some(bounds) if !bounds.contains(v) => {
                    let clamped = bounds.clamp(v);
                    debug!("clamped {} from {} to {}", slot.name, v, clamped);
                    self.stats.commands_clamped.fetch_add(1, Ordering::Relaxed);
                    CommandValue::Scalar(clamped)
                }
                _ => value,
            },
            (SlotKind::Code, CommandValue::Scalar(v)) => {
                if code_from_f64(v).is_none() {
                    return Err(CommandError::OutOfRange {
                        name: slot.name,
                        value: v,
                    });
                }
                value
            }
            (SlotKind::Vector2, CommandValue::Vector2(_))
            | (SlotKind::Vector3, CommandValue::Vector3(_)) => value,
            (SlotKind::Text { .. }, _) => {
                return Err(CommandError::UnsupportedKind {
                    name: slot.name,
                    kind: slot.kind,
                });
            }
            (kind, value) => {
                return Err(CommandError::WrongArity {
                    name: slot.name,
                    expected: kind.axes(),
                    got: value.arity(),
                });
            }
        };

        Ok(CommandRequest {
            name: slot.name,
            id: slot.id,
            value,
            arrived: Instant::now(),
            source,
        })
    }

    /// Validates and queues one command. Rejections are logged and counted.
    pub fn submit(
        &self,
        name: &str,
        value: CommandValue,
        source: Transport,
    ) -> Result<(), CommandError> {
        match self.validate(name, value, source) {
            Ok(request) => {
                self.queue.push(request);
                self.stats.commands_accepted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.reject(source, &e);
                Err(e)
            }
        }
    }

    /// Handles a raw payload from a transport. Never fails: every problem is
    /// logged and counted, and the connection stays open.
    pub fn submit_payload(&self, payload: &[u8], source: Transport) -> PayloadOutcome {
        let mut outcome = PayloadOutcome::default();
        let commands = match parse_payload(payload) {
            Ok(commands) => commands,
            Err(e) => {
                self.reject(source, &e);
                outcome.rejected += 1;
                return outcome;
            }
        };

        for command in commands {
            let result = match command {
                Ok(command) => self.submit(&command.variable, command.value, source),
                Err(e) => {
                    self.reject(source, &e);
                    Err(e)
                }
            };
            match result {
                Ok(()) => outcome.accepted += 1,
                Err(_) => outcome.rejected += 1,
            }
        }
        outcome
    }

    /// Takes every queued command in arrival order. Called once per tick.
    pub fn drain(&self) -> Vec<OutgoingCommand> {
        self.queue
            .drain()
            .into_iter()
            .map(|request| OutgoingCommand {
                id: request.id,
                name: request.name,
                value: request.value,
            })
            .collect()
    }

    fn reject(&self, source: Transport, error: &CommandError) {
        self.stats.commands_rejected.fetch_add(1, Ordering::Relaxed);
        warn!("rejected command from {}: {}", source, error);
    }
}
