use std::io;

use thiserror::Error;

use crate::command::CommandError;
use crate::config::ConfigError;
use crate::net::Transport;
use crate::net::websocket::{FrameError, HandshakeError};
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    /// A transport could not acquire its socket or mapping. Only that
    /// transport is disabled.
    #[error("{transport} unavailable: {source}")]
    Resource {
        transport: Transport,
        #[source]
        source: io::Error,
    },
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] FrameError),
    #[error("handshake: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("invalid command: {0}")]
    Validation(#[from] CommandError),
    #[error("transient I/O: {0}")]
    TransientIo(io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// The transport this error disables, if it is a resource failure.
    pub fn transport(&self) -> Option<Transport> {
        match self {
            BridgeError::Resource { transport, .. } => Some(*transport),
            _ => None,
        }
    }
}
