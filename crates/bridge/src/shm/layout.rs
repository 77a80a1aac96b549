//! Fixed binary layout of the shared mapping.
//!
//! ```text
//! Header (16 bytes, little endian):
//!   [0:4]    format version (u32)
//!   [4:8]    update counter (u32)
//!   [8:12]   data valid flag (u32, 0 or 1; 0 while a copy is in progress)
//!   [12:16]  reserved (zero)
//! Region (registry region size bytes):
//!   slot values at the offsets listed in the offsets file, shifted by 16
//! ```

use crate::registry::Registry;

pub const HEADER_SIZE: usize = 16;
pub const VERSION_OFFSET: usize = 0;
pub const COUNTER_OFFSET: usize = 4;
pub const VALID_OFFSET: usize = 8;
pub const RESERVED_OFFSET: usize = 12;

/// Header fields as `(name, offset)`, in layout order. Each is a u32.
pub const HEADER_FIELDS: [(&str, usize); 4] = [
    ("format_version", VERSION_OFFSET),
    ("update_counter", COUNTER_OFFSET),
    ("data_valid", VALID_OFFSET),
    ("reserved", RESERVED_OFFSET),
];

pub fn total_size(registry: &Registry) -> usize {
    HEADER_SIZE + registry.region_size()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmHeader {
    pub format_version: u32,
    pub update_counter: u32,
    pub data_valid: bool,
}

impl ShmHeader {
    pub fn encode(&self, out: &mut [u8]) {
        write_u32(out, VERSION_OFFSET, self.format_version);
        write_u32(out, COUNTER_OFFSET, self.update_counter);
        write_u32(out, VALID_OFFSET, self.data_valid as u32);
        write_u32(out, RESERVED_OFFSET, 0);
    }

    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            format_version: read_u32(bytes, VERSION_OFFSET),
            update_counter: read_u32(bytes, COUNTER_OFFSET),
            data_valid: read_u32(bytes, VALID_OFFSET) != 0,
        }
    }
}

pub(crate) fn write_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}
