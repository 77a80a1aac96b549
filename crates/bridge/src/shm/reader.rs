use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use glam::{DVec2, DVec3};
use memmap2::Mmap;

use crate::registry::Slot;
use crate::store::{SlotValue, decode, read_f64};

use super::layout::{HEADER_SIZE, ShmHeader};
use super::publisher::{LockGuard, lock_path};

/// Read side of a published mapping, for local tools and tests.
pub struct SharedMemoryReader {
    path: PathBuf,
    mmap: Mmap,
    lock: File,
}

impl SharedMemoryReader {
    pub fn open(dir: &Path, name: &str) -> io::Result<Self> {
        let path = dir.join(name);
        let file = File::open(&path)?;
        let lock = OpenOptions::new().read(true).open(lock_path(&path))?;
        let mmap = unsafe { Mmap::map(&file)? };
        if mmap.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is smaller than the header", path.display()),
            ));
        }
        Ok(Self { path, mmap, lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Copies header and region out under the cross-process lock.
    pub fn read(&self) -> io::Result<ShmSnapshot> {
        let _guard = LockGuard::acquire(&self.lock)?;
        Ok(ShmSnapshot {
            header: ShmHeader::decode(&self.mmap[..HEADER_SIZE]),
            region: self.mmap[HEADER_SIZE..].to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShmSnapshot {
    pub header: ShmHeader,
    pub region: Vec<u8>,
}

impl ShmSnapshot {
    pub fn value(&self, slot: &Slot) -> SlotValue<'_> {
        decode(slot, &self.region)
    }

    pub fn scalar(&self, slot: &Slot) -> f64 {
        read_f64(&self.region, slot.offset)
    }

    pub fn vector3(&self, slot: &Slot) -> DVec3 {
        match self.value(slot) {
            SlotValue::Vector3(v) => v,
            _ => DVec3::ZERO,
        }
    }

    pub fn vector2(&self, slot: &Slot) -> DVec2 {
        match self.value(slot) {
            SlotValue::Vector2(v) => v,
            _ => DVec2::ZERO,
        }
    }

    pub fn text(&self, slot: &Slot) -> &str {
        match self.value(slot) {
            SlotValue::Text(text) => text,
            _ => "",
        }
    }
}
