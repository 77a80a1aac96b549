pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod net;
pub mod registry;
pub mod scheduler;
pub mod serializer;
pub mod shm;
pub mod stats;
pub mod store;

pub use bridge::{Bridge, TransportStatus};
pub use command::{CommandError, CommandProcessor, CommandValue, PayloadOutcome};
pub use config::{BridgeConfig, ConfigError};
pub use error::BridgeError;
pub use events::{BridgeEvent, DisconnectReason};
pub use host::{OutgoingCommand, SimMessage, SimValue};
pub use net::Transport;
pub use registry::{Registry, RegistryError, STORE_FORMAT_VERSION, Slot, SlotId, SlotKind, message_id};
pub use scheduler::BroadcastScheduler;
pub use serializer::{ParsedSnapshot, ParsedValue, SnapshotSerializer, parse_snapshot};
pub use shm::{OffsetsDescriptor, SharedMemoryPublisher, SharedMemoryReader};
pub use stats::{StatsSnapshot, TransportStats};
pub use store::{CanonicalStore, StoreHeader, StoreView};
