//! Shared-memory transport: a file-backed mapping holding the raw store
//! region behind a small header, plus the offsets descriptor that tells
//! readers where each value lives.

pub mod layout;
mod offsets;
mod publisher;
mod reader;

use std::env;
use std::path::PathBuf;

pub use layout::{HEADER_SIZE, ShmHeader};
pub use offsets::{HeaderField, OFFSETS_FILE_NAME, OffsetsDescriptor, VariableOffset};
pub use publisher::{Publish, SharedMemoryPublisher, lock_path};
pub use reader::{SharedMemoryReader, ShmSnapshot};

/// `/dev/shm` where it exists, otherwise the temp dir.
pub fn default_dir() -> PathBuf {
    let dev_shm = PathBuf::from("/dev/shm");
    if dev_shm.is_dir() {
        dev_shm
    } else {
        env::temp_dir()
    }
}
