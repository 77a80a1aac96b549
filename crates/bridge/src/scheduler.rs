use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::bridge::{StatusBoard, TransportStatus};
use crate::events::{BridgeEvent, EventSink};
use crate::net::{ConnectionTable, Transport, tcp, websocket};
use crate::serializer::SnapshotSerializer;
use crate::shm::{Publish, SharedMemoryPublisher};
use crate::stats::BridgeStats;
use crate::store::{CanonicalStore, StoreHeader};

/// Longest single sleep, so a stop request is seen promptly.
const MAX_SLEEP: Duration = Duration::from_millis(50);
const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Everything one broadcast firing reads from or writes to.
pub(crate) struct Broadcaster {
    pub store: Arc<CanonicalStore>,
    pub serializer: SnapshotSerializer,
    pub shm: Option<SharedMemoryPublisher>,
    pub tcp: Option<Arc<ConnectionTable>>,
    pub websocket: Option<Arc<ConnectionTable>>,
    pub stats: Arc<BridgeStats>,
    pub events: EventSink,
    pub status: Arc<StatusBoard>,
    /// Region copy handed to shared memory after the store guard is gone.
    pub scratch: Vec<u8>,
}

impl Broadcaster {
    /// Serializes the store and copies its region under one read guard,
    /// then publishes shared memory and hands the document to every
    /// connected client. Nothing after the copy can hold up a writer.
    pub fn fire(&mut self) {
        let mut pending: Option<StoreHeader> = None;
        let json = {
            let view = self.store.read();
            let header = view.header();
            if let Some(publisher) = &self.shm {
                if publisher.is_current(header.update_counter) {
                    self.stats.shm_skipped.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.scratch.clear();
                    self.scratch.extend_from_slice(view.region());
                    pending = Some(header);
                }
            }
            self.serializer.render(&view)
        };

        if let Some(header) = pending {
            self.publish_shm(&header);
        }

        if let Some(table) = self.tcp.as_ref().filter(|t| t.len() > 0) {
            table.broadcast(&tcp::frame_snapshot(&json));
        }
        if let Some(table) = self.websocket.as_ref().filter(|t| t.len() > 0) {
            table.broadcast(&websocket::frame_snapshot(&json));
        }
        self.stats.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    fn publish_shm(&mut self, header: &StoreHeader) {
        let Some(publisher) = self.shm.as_mut() else {
            return;
        };
        match publisher.publish(header, &self.scratch) {
            Ok(Publish::Copied) => {
                self.stats.shm_publishes.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Publish::Unchanged) => {
                self.stats.shm_skipped.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Publish::Contended) => {
                debug!("shared memory lock busy, skipping tick {}", header.update_counter);
                self.stats.shm_contended.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.disable_shm(e.to_string()),
        }
    }

    fn disable_shm(&mut self, reason: String) {
        error!("shared memory publish failed, disabling: {}", reason);
        if let Some(mut publisher) = self.shm.take() {
            publisher.close();
        }
        self.status
            .set(Transport::SharedMemory, TransportStatus::Disabled(reason.clone()));
        self.events.emit(BridgeEvent::TransportDisabled {
            transport: Transport::SharedMemory,
            reason,
        });
    }

    /// Hands the publisher back so it can be unmapped after the network
    /// transports are down.
    pub fn into_publisher(self) -> Option<SharedMemoryPublisher> {
        self.shm
    }
}

/// Fires the broadcaster on a fixed, drift-free cadence on its own thread.
pub struct BroadcastScheduler {
    interval: Duration,
    thread: Option<JoinHandle<Option<SharedMemoryPublisher>>>,
}

impl BroadcastScheduler {
    pub(crate) fn spawn(
        broadcaster: Broadcaster,
        interval: Duration,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let thread = thread::Builder::new()
            .name("broadcast".into())
            .spawn(move || run(broadcaster, interval, &stop))?;
        info!("broadcasting every {:?}", interval);
        Ok(Self {
            interval,
            thread: Some(thread),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the thread to notice the stop flag. Returns the publisher
    /// it owned, or `None` if it was disabled or the thread did not finish
    /// before `deadline`.
    pub(crate) fn join(&mut self, deadline: Instant) -> Option<SharedMemoryPublisher> {
        let thread = self.thread.take()?;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("broadcast thread did not stop in time, detaching");
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
        match thread.join() {
            Ok(publisher) => publisher,
            Err(_) => {
                error!("broadcast thread panicked");
                None
            }
        }
    }
}

fn run(
    mut broadcaster: Broadcaster,
    interval: Duration,
    stop: &AtomicBool,
) -> Option<SharedMemoryPublisher> {
    let mut next = Instant::now() + interval;
    let mut window_start = Instant::now();
    let mut fired_in_window = 0u32;

    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next {
            thread::sleep((next - now).min(MAX_SLEEP));
            continue;
        }

        broadcaster.fire();
        fired_in_window += 1;

        next += interval;
        let now = Instant::now();
        if now > next + interval {
            debug!("broadcast fell behind by {:?}, resetting cadence", now - next);
            next = now + interval;
        }

        let elapsed = now - window_start;
        if elapsed >= RATE_WINDOW {
            broadcaster
                .stats
                .set_broadcast_hz(fired_in_window as f64 / elapsed.as_secs_f64());
            window_start = now;
            fired_in_window = 0;
        }
    }

    debug!("broadcast thread stopped");
    broadcaster.into_publisher()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::registry::Registry;

    fn broadcaster() -> (Broadcaster, Arc<CanonicalStore>) {
        let registry = Arc::new(Registry::new().unwrap());
        let store = Arc::new(CanonicalStore::new(Arc::clone(&registry)));
        let (events, _rx) = event_channel();
        let broadcaster = Broadcaster {
            store: Arc::clone(&store),
            serializer: SnapshotSerializer::new(&registry),
            shm: None,
            tcp: None,
            websocket: None,
            stats: Arc::new(BridgeStats::new()),
            events,
            status: Arc::new(StatusBoard::default()),
            scratch: Vec::new(),
        };
        (broadcaster, store)
    }

    #[test]
    fn fire_counts_broadcasts_and_shm_skips() {
        let dir = tempfile::tempdir().unwrap();
        let (mut broadcaster, store) = broadcaster();
        broadcaster.shm =
            Some(SharedMemoryPublisher::create(dir.path(), "Sched", store.registry()).unwrap());

        broadcaster.fire();
        broadcaster.fire();
        store.write_tick(|_| {});
        broadcaster.fire();

        let stats = broadcaster.stats.snapshot();
        assert_eq!(stats.broadcasts, 3);
        assert_eq!(stats.shm_publishes, 2);
        assert_eq!(stats.shm_skipped, 1);
    }

    #[test]
    fn held_shm_lock_never_blocks_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let (mut broadcaster, store) = broadcaster();
        let publisher = SharedMemoryPublisher::create(dir.path(), "Busy", store.registry()).unwrap();
        let reader_lock = std::fs::File::open(crate::shm::lock_path(publisher.path())).unwrap();
        broadcaster.shm = Some(publisher);

        reader_lock.lock().unwrap();
        store.write_tick(|_| {});
        broadcaster.fire();
        // The store guard is released even though the copy was skipped.
        store.write_tick(|_| {});
        assert_eq!(broadcaster.stats.snapshot().shm_contended, 1);
        assert_eq!(broadcaster.stats.snapshot().shm_publishes, 0);

        reader_lock.unlock().unwrap();
        broadcaster.fire();
        let stats = broadcaster.stats.snapshot();
        assert_eq!(stats.shm_publishes, 1);
        assert!(broadcaster.shm.as_ref().unwrap().is_current(2));
    }

    #[test]
    fn runs_until_stopped() {
        let (broadcaster, _store) = broadcaster();
        let stats = Arc::clone(&broadcaster.stats);
        let stop = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            BroadcastScheduler::spawn(broadcaster, Duration::from_millis(5), Arc::clone(&stop))
                .unwrap();

        thread::sleep(Duration::from_millis(200));
        stop.store(true, Ordering::SeqCst);
        assert!(scheduler.join(Instant::now() + Duration::from_secs(2)).is_none());
        assert!(scheduler.thread.is_none());

        let fired = stats.broadcasts.load(Ordering::Relaxed);
        assert!(fired >= 5, "only {fired} broadcasts");
    }
}
