use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;
use log::debug;

use super::CommandRequest;

/// Bounded command queue shared by every transport and drained by the
/// simulation tick. When full, the oldest request is discarded so the most
/// recent intent survives.
pub struct CommandQueue {
    queue: ArrayQueue<CommandRequest>,
    dropped: AtomicU64,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns the request that was evicted to make room, if any.
    pub fn push(&self, request: CommandRequest) -> Option<CommandRequest> {
        let evicted = self.queue.force_push(request);
        if let Some(old) = &evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("command queue full, dropped oldest {} from {}", old.name, old.source);
        }
        evicted
    }

    pub fn drain(&self) -> Vec<CommandRequest> {
        let mut drained = Vec::with_capacity(self.queue.len());
        while let Some(request) = self.queue.pop() {
            drained.push(request);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
