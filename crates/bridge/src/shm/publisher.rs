use std::fs::{self, File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use memmap2::MmapMut;

use crate::registry::{Registry, STORE_FORMAT_VERSION};
use crate::store::StoreHeader;

use super::layout::{HEADER_SIZE, ShmHeader, VALID_OFFSET, total_size, write_u32};

/// Path of the lock file guarding a mapping.
pub fn lock_path(mapping: &Path) -> PathBuf {
    let mut name = mapping.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Holds an exclusive file lock until dropped.
pub(crate) struct LockGuard<'a>(&'a File);

impl<'a> LockGuard<'a> {
    pub(crate) fn acquire(file: &'a File) -> io::Result<Self> {
        file.lock()?;
        Ok(Self(file))
    }

    /// `None` when another process holds the lock.
    pub(crate) fn try_acquire(file: &'a File) -> io::Result<Option<Self>> {
        match file.try_lock() {
            Ok(()) => Ok(Some(Self(file))),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(e),
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            warn!("shared memory unlock failed: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Copied,
    /// The counter matches the last copy.
    Unchanged,
    /// A reader held the lock; nothing was written.
    Contended,
}

/// Copies store snapshots into a named, file-backed mapping for local
/// readers.
pub struct SharedMemoryPublisher {
    path: PathBuf,
    lock_path: PathBuf,
    mmap: Option<MmapMut>,
    lock: File,
    last_counter: Option<u32>,
    publishes: u64,
}

impl SharedMemoryPublisher {
    pub fn create(dir: &Path, name: &str, registry: &Registry) -> io::Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid mapping name {:?}", name),
            ));
        }
        fs::create_dir_all(dir)?;

        let path = dir.join(name);
        let lock_path = lock_path(&path);
        let size = total_size(registry);

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(size as u64)?;

        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        {
            let _guard = LockGuard::acquire(&lock)?;
            mmap.fill(0);
            ShmHeader {
                format_version: STORE_FORMAT_VERSION,
                update_counter: 0,
                data_valid: false,
            }
            .encode(&mut mmap[..HEADER_SIZE]);
            mmap.flush()?;
        }

        info!("shared memory mapping {} created ({} bytes)", path.display(), size);

        Ok(Self {
            path,
            lock_path,
            mmap: Some(mmap),
            lock,
            last_counter: None,
            publishes: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn publishes(&self) -> u64 {
        self.publishes
    }

    /// Whether the mapping already holds the tick with this counter.
    pub fn is_current(&self, update_counter: u32) -> bool {
        self.last_counter == Some(update_counter)
    }

    /// Copies a header and region taken from the store into the mapping.
    /// Never waits on the lock: a reader holding it makes this a
    /// [`Publish::Contended`] no-op and the next call retries.
    pub fn publish(&mut self, header: &StoreHeader, region: &[u8]) -> io::Result<Publish> {
        if self.is_current(header.update_counter) {
            return Ok(Publish::Unchanged);
        }

        let mmap = self
            .mmap
            .as_mut()
            .ok_or_else(|| io::Error::other("shared memory not mapped"))?;
        if mmap.len() != HEADER_SIZE + region.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "mapping is {} bytes, store needs {}",
                    mmap.len(),
                    HEADER_SIZE + region.len()
                ),
            ));
        }

        let Some(_guard) = LockGuard::try_acquire(&self.lock)? else {
            return Ok(Publish::Contended);
        };
        write_u32(mmap, VALID_OFFSET, 0);
        mmap[HEADER_SIZE..].copy_from_slice(region);
        ShmHeader {
            format_version: header.format_version,
            update_counter: header.update_counter,
            data_valid: header.data_valid,
        }
        .encode(&mut mmap[..HEADER_SIZE]);
        mmap.flush_async()?;

        self.last_counter = Some(header.update_counter);
        self.publishes += 1;
        Ok(Publish::Copied)
    }

    /// Unmaps and unlinks the mapping and its lock file.
    pub fn close(&mut self) {
        if self.mmap.take().is_none() {
            return;
        }
        for path in [&self.path, &self.lock_path] {
            if let Err(e) = fs::remove_file(path) {
                debug!("removing {} failed: {}", path.display(), e);
            }
        }
        info!("shared memory mapping {} closed", self.path.display());
    }
}

impl Drop for SharedMemoryPublisher {
    fn drop(&mut self) {
        self.close();
    }
}
