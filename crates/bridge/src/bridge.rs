use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam::channel::Receiver;
use log::{error, info, trace, warn};
use parking_lot::Mutex;

use crate::command::CommandProcessor;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::events::{BridgeEvent, EventSink, event_channel};
use crate::host::{OutgoingCommand, SimMessage};
use crate::net::tcp::{TcpCommandServer, TcpDataServer};
use crate::net::websocket::WebSocketServer;
use crate::net::{NetContext, Transport};
use crate::registry::Registry;
use crate::scheduler::{BroadcastScheduler, Broadcaster};
use crate::serializer::SnapshotSerializer;
use crate::shm::{OffsetsDescriptor, SharedMemoryPublisher};
use crate::stats::{BridgeStats, StatsSnapshot};
use crate::store::{CanonicalStore, Ingest, IngestSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    Enabled,
    /// Turned off by configuration.
    Off,
    /// Failed to acquire its resource, or failed later. The other transports
    /// keep running.
    Disabled(String),
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStatus::Enabled => f.write_str("enabled"),
            TransportStatus::Off => f.write_str("off"),
            TransportStatus::Disabled(reason) => write!(f, "disabled ({reason})"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatusBoard {
    inner: Mutex<HashMap<Transport, TransportStatus>>,
}

impl StatusBoard {
    pub fn set(&self, transport: Transport, status: TransportStatus) {
        self.inner.lock().insert(transport, status);
    }

    pub fn get(&self, transport: Transport) -> TransportStatus {
        self.inner
            .lock()
            .get(&transport)
            .cloned()
            .unwrap_or(TransportStatus::Off)
    }
}

/// The running bridge: owns every component, the transport threads and the
/// broadcast timer. The host calls [`Bridge::on_simulation_tick`] from its
/// simulation thread; everything else runs in the background.
pub struct Bridge {
    config: Arc<BridgeConfig>,
    registry: Arc<Registry>,
    store: Arc<CanonicalStore>,
    ingest: Mutex<Ingest>,
    commands: Arc<CommandProcessor>,
    stats: Arc<BridgeStats>,
    status: Arc<StatusBoard>,
    stop: Arc<AtomicBool>,
    event_rx: Receiver<BridgeEvent>,
    tcp_data: Option<TcpDataServer>,
    tcp_command: Option<TcpCommandServer>,
    websocket: Option<WebSocketServer>,
    scheduler: Option<BroadcastScheduler>,
    shm_path: Option<PathBuf>,
    offsets_path: Option<PathBuf>,
    stopped: bool,
}

impl Bridge {
    /// Builds the registry and store and starts every enabled transport. A
    /// transport that cannot get its socket or mapping is disabled and the
    /// rest start normally; only registry, config and thread spawn failures
    /// are fatal.
    pub fn start(config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let config = Arc::new(config);

        let registry = Arc::new(Registry::new()?);
        info!(
            "registry: {} slots, {} byte region, fingerprint {:016x}",
            registry.len(),
            registry.region_size(),
            registry.fingerprint()
        );

        let store = Arc::new(CanonicalStore::new(Arc::clone(&registry)));
        let stats = Arc::new(BridgeStats::new());
        let stop = Arc::new(AtomicBool::new(false));
        let status = Arc::new(StatusBoard::default());
        let (events, event_rx) = event_channel();
        let commands = Arc::new(CommandProcessor::new(
            Arc::clone(&registry),
            config.command_queue_capacity,
            Arc::clone(&stats),
        ));

        let ctx = NetContext {
            config: Arc::clone(&config),
            stop: Arc::clone(&stop),
            stats: Arc::clone(&stats),
            events: events.clone(),
            commands: Arc::clone(&commands),
        };
        let addr = |port| SocketAddr::new(config.bind_addr, port);

        let tcp_data = enable(
            &status,
            &events,
            Transport::TcpData,
            TcpDataServer::start(addr(config.tcp_data_port), ctx.clone()),
        );
        let tcp_command = enable(
            &status,
            &events,
            Transport::TcpCommand,
            TcpCommandServer::start(addr(config.tcp_command_port), ctx.clone()),
        );
        let websocket = if config.ws_enabled {
            enable(
                &status,
                &events,
                Transport::WebSocket,
                WebSocketServer::start(addr(config.ws_port), ctx),
            )
        } else {
            info!("websocket off");
            status.set(Transport::WebSocket, TransportStatus::Off);
            None
        };

        let (shm, offsets_path) = if config.shm_enabled {
            match open_shm(&config, &registry) {
                Ok((publisher, offsets)) => {
                    status.set(Transport::SharedMemory, TransportStatus::Enabled);
                    (Some(publisher), Some(offsets))
                }
                Err(e) => {
                    disable(&status, &events, Transport::SharedMemory, &e);
                    (None, None)
                }
            }
        } else {
            info!("shared memory off");
            status.set(Transport::SharedMemory, TransportStatus::Off);
            (None, None)
        };
        let shm_path = shm.as_ref().map(|p| p.path().to_path_buf());

        let broadcaster = Broadcaster {
            store: Arc::clone(&store),
            serializer: SnapshotSerializer::new(&registry),
            shm,
            tcp: tcp_data.as_ref().map(TcpDataServer::table),
            websocket: websocket.as_ref().map(WebSocketServer::table),
            stats: Arc::clone(&stats),
            events,
            status: Arc::clone(&status),
            scratch: Vec::with_capacity(registry.region_size()),
        };

        let mut bridge = Self {
            config: Arc::clone(&config),
            registry,
            store,
            ingest: Mutex::new(Ingest::new()),
            commands,
            stats,
            status,
            stop: Arc::clone(&stop),
            event_rx,
            tcp_data,
            tcp_command,
            websocket,
            scheduler: None,
            shm_path,
            offsets_path,
            stopped: false,
        };
        bridge.scheduler = Some(BroadcastScheduler::spawn(
            broadcaster,
            config.broadcast_interval,
            stop,
        )?);
        Ok(bridge)
    }

    /// Applies one tick of simulation values to the store, then hands back
    /// every command queued since the previous tick. Never blocks on the
    /// network.
    pub fn on_simulation_tick(&self, messages: &[SimMessage]) -> Vec<OutgoingCommand> {
        let summary: IngestSummary = {
            let mut ingest = self.ingest.lock();
            self.store.write_tick(|writer| ingest.apply(writer, messages))
        };
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        trace!(
            "tick: {} applied, {} unknown, {} mismatched",
            summary.applied, summary.unknown, summary.mismatched
        );
        self.commands.drain()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<CanonicalStore> {
        &self.store
    }

    pub fn commands(&self) -> &Arc<CommandProcessor> {
        &self.commands
    }

    pub fn stats(&self) -> StatsSnapshot {
        let mut snapshot = self.stats.snapshot();
        snapshot.commands_dropped = self.commands.queue().dropped();
        snapshot
    }

    pub fn status(&self, transport: Transport) -> TransportStatus {
        self.status.get(transport)
    }

    pub fn events(&self) -> &Receiver<BridgeEvent> {
        &self.event_rx
    }

    pub fn drain_events(&self) -> Vec<BridgeEvent> {
        self.event_rx.try_iter().collect()
    }

    pub fn tcp_data_addr(&self) -> Option<SocketAddr> {
        self.tcp_data.as_ref().map(TcpDataServer::local_addr)
    }

    pub fn tcp_command_addr(&self) -> Option<SocketAddr> {
        self.tcp_command.as_ref().map(TcpCommandServer::local_addr)
    }

    pub fn websocket_addr(&self) -> Option<SocketAddr> {
        self.websocket.as_ref().map(WebSocketServer::local_addr)
    }

    pub fn client_count(&self, transport: Transport) -> usize {
        match transport {
            Transport::TcpData => self.tcp_data.as_ref().map_or(0, TcpDataServer::client_count),
            Transport::TcpCommand => self
                .tcp_command
                .as_ref()
                .map_or(0, TcpCommandServer::client_count),
            Transport::WebSocket => self
                .websocket
                .as_ref()
                .map_or(0, WebSocketServer::client_count),
            Transport::SharedMemory => 0,
        }
    }

    pub fn shm_path(&self) -> Option<&Path> {
        self.shm_path.as_deref()
    }

    pub fn offsets_path(&self) -> Option<&Path> {
        self.offsets_path.as_deref()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Stops the timer, sends close frames, shuts every connection down and
    /// unmaps shared memory last. Threads that miss the shutdown timeout are
    /// detached.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!("bridge shutting down");
        self.stop.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + self.config.shutdown_timeout;

        let publisher = self.scheduler.take().and_then(|mut s| s.join(deadline));
        if let Some(server) = self.websocket.as_mut() {
            server.shutdown(deadline);
        }
        if let Some(server) = self.tcp_data.as_mut() {
            server.shutdown(deadline);
        }
        if let Some(server) = self.tcp_command.as_mut() {
            server.shutdown(deadline);
        }
        if let Some(mut publisher) = publisher {
            publisher.close();
        }
        info!("bridge stopped");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_shm(
    config: &BridgeConfig,
    registry: &Registry,
) -> Result<(SharedMemoryPublisher, PathBuf), BridgeError> {
    let resource = |source| BridgeError::Resource {
        transport: Transport::SharedMemory,
        source,
    };
    let publisher =
        SharedMemoryPublisher::create(&config.shm_dir, &config.shm_name, registry).map_err(resource)?;
    let offsets_path = config.offsets_path();
    OffsetsDescriptor::from_registry(registry, &config.shm_name)
        .write_to(&offsets_path)
        .map_err(resource)?;
    info!("offsets written to {}", offsets_path.display());
    Ok((publisher, offsets_path))
}

fn enable<T>(
    status: &StatusBoard,
    events: &EventSink,
    transport: Transport,
    started: Result<T, BridgeError>,
) -> Option<T> {
    match started {
        Ok(server) => {
            status.set(transport, TransportStatus::Enabled);
            Some(server)
        }
        Err(e) => {
            disable(status, events, transport, &e);
            None
        }
    }
}

fn disable(status: &StatusBoard, events: &EventSink, transport: Transport, error: &BridgeError) {
    match error {
        BridgeError::Resource { .. } => error!("{}, continuing without it", error),
        other => warn!("{} disabled: {}", transport, other),
    }
    let reason = error.to_string();
    status.set(transport, TransportStatus::Disabled(reason.clone()));
    events.emit(BridgeEvent::TransportDisabled { transport, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimValue;

    #[test]
    fn ticks_advance_counter_and_drain_commands() {
        let mut bridge = Bridge::start(BridgeConfig::local()).unwrap();
        assert_eq!(bridge.status(Transport::SharedMemory), TransportStatus::Off);
        assert_eq!(bridge.status(Transport::TcpData), TransportStatus::Enabled);

        bridge
            .commands()
            .submit("Controls.Throttle", 0.4.into(), Transport::TcpCommand)
            .unwrap();
        let out = bridge.on_simulation_tick(&[SimMessage::named(
            "Aircraft.Altitude",
            SimValue::Double(1200.0),
        )]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Controls.Throttle");
        assert!(bridge.on_simulation_tick(&[]).is_empty());

        let header = bridge.store().header();
        assert_eq!(header.update_counter, 2);
        assert!(header.data_valid);
        assert_eq!(bridge.stats().ticks, 2);

        bridge.shutdown();
        assert!(!bridge.is_running());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = BridgeConfig {
            command_queue_capacity: 0,
            ..BridgeConfig::local()
        };
        assert!(matches!(Bridge::start(config), Err(BridgeError::Config(_))));
    }
}
