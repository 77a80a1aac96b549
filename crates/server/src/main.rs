mod events;
mod logging;
mod simulation;
mod tui;

use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use aerobridge::{Bridge, BridgeConfig, Transport};

use events::EventLog;
use logging::LogSettings;
use simulation::SyntheticFlight;
use tui::{Dashboard, TransportRow};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "aerobridge-server")]
#[command(about = "Telemetry bridge with a synthetic flight feed")]
struct Args {
    /// Overrides AEROFLY_BRIDGE_BIND_ADDR.
    #[arg(short, long)]
    bind: Option<IpAddr>,

    #[arg(long)]
    tcp_port: Option<u16>,

    #[arg(long)]
    cmd_port: Option<u16>,

    #[arg(long)]
    ws_port: Option<u16>,

    #[arg(long)]
    no_websocket: bool,

    #[arg(long)]
    no_shm: bool,

    #[arg(long)]
    shm_dir: Option<PathBuf>,

    #[arg(long)]
    shm_name: Option<String>,

    #[arg(long, help = "Broadcast interval in ms (min 5)")]
    broadcast_ms: Option<u64>,

    #[arg(short, long, default_value_t = 60, help = "Synthetic simulation rate in Hz")]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 32)]
    max_clients: usize,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Stop after this many seconds")]
    run_for: Option<u64>,

    #[arg(long, help = "trace, debug, info, warn or error")]
    log_level: Option<String>,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(port) = self.tcp_port {
            config.tcp_data_port = port;
        }
        if let Some(port) = self.cmd_port {
            config.tcp_command_port = port;
        }
        if let Some(port) = self.ws_port {
            config.ws_port = port;
        }
        if self.no_websocket {
            config.ws_enabled = false;
        }
        if self.no_shm {
            config.shm_enabled = false;
        }
        if let Some(dir) = &self.shm_dir {
            config.shm_dir = dir.clone();
        }
        if let Some(name) = &self.shm_name {
            config.shm_name = name.clone();
        }
        if let Some(ms) = self.broadcast_ms {
            config.broadcast_interval = Duration::from_millis(ms);
        }
        config.max_clients = self.max_clients;
    }
}

/// The synthetic simulation driving the bridge at a fixed rate.
struct Host {
    bridge: Bridge,
    flight: SyntheticFlight,
    tick: Duration,
    next: Instant,
}

impl Host {
    fn new(bridge: Bridge, tick_rate: u32) -> Self {
        let tick = Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1)));
        Self {
            bridge,
            flight: SyntheticFlight::new(),
            tick,
            next: Instant::now(),
        }
    }

    /// Runs every simulation tick that is due.
    fn advance(&mut self) {
        let dt = self.tick.as_secs_f64();
        while Instant::now() >= self.next {
            let messages = self.flight.step(dt);
            let commands = self.bridge.on_simulation_tick(&messages);
            if !commands.is_empty() {
                log::debug!("applying {} command(s)", commands.len());
                self.flight.apply(&commands);
            }
            self.next += self.tick;
        }
    }

    fn until_next(&self) -> Duration {
        self.next.saturating_duration_since(Instant::now())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_settings = LogSettings::from_env();
    if let Some(level) = &args.log_level {
        log_settings.level = level.clone();
    }
    if let Some(file) = &args.log_file {
        log_settings.file = Some(file.clone());
    }
    if !args.headless {
        log_settings.console = false;
    }
    logging::init(&log_settings)?;

    let mut config = BridgeConfig::from_env();
    args.apply(&mut config);
    let bridge = Bridge::start(config).context("starting bridge")?;
    let mut host = Host::new(bridge, args.tick_rate);
    let deadline = args.run_for.map(|secs| Instant::now() + Duration::from_secs(secs));

    if args.headless {
        run_headless(&mut host, deadline);
    } else {
        run_with_tui(&mut host, deadline)?;
    }

    host.bridge.shutdown();
    Ok(())
}

fn run_headless(host: &mut Host, deadline: Option<Instant>) {
    log::info!("bridge running headless at {:?} per tick", host.tick);
    while deadline.is_none_or(|d| Instant::now() < d) {
        host.advance();
        // The bridge already logs every event; drain so nothing piles up.
        host.bridge.drain_events();
        thread::sleep(host.until_next());
    }
}

fn run_with_tui(host: &mut Host, deadline: Option<Instant>) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let started = Instant::now();
    let mut log = EventLog::new(200);
    for transport in TRANSPORTS {
        log.info(format!("{} {}", transport, host.bridge.status(transport)));
    }

    let mut last_draw = Instant::now() - REDRAW_INTERVAL;
    let result = loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break Ok(());
        }
        host.advance();
        for event in host.bridge.drain_events() {
            log.record(&event);
        }

        if last_draw.elapsed() >= REDRAW_INTERVAL {
            let dashboard = dashboard(host, &log, started);
            if let Err(e) = terminal.draw(|frame| tui::render(frame, &dashboard)) {
                break Err(e);
            }
            last_draw = Instant::now();
        }

        match event::poll(host.until_next()) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key))
                    if key.kind == KeyEventKind::Press
                        && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) =>
                {
                    break Ok(());
                }
                Ok(_) => {}
                Err(e) => break Err(e),
            },
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
    result
}

const TRANSPORTS: [Transport; 4] = [
    Transport::SharedMemory,
    Transport::TcpData,
    Transport::TcpCommand,
    Transport::WebSocket,
];

fn dashboard<'a>(host: &Host, log: &'a EventLog, started: Instant) -> Dashboard<'a> {
    let bridge = &host.bridge;
    let header = bridge.store().header();
    let transports = TRANSPORTS
        .into_iter()
        .map(|transport| {
            let address = match transport {
                Transport::TcpData => bridge.tcp_data_addr().map(|a| a.to_string()),
                Transport::TcpCommand => bridge.tcp_command_addr().map(|a| a.to_string()),
                Transport::WebSocket => bridge.websocket_addr().map(|a| a.to_string()),
                Transport::SharedMemory => bridge.shm_path().map(|p| p.display().to_string()),
            };
            TransportRow {
                transport,
                status: bridge.status(transport),
                address,
                clients: bridge.client_count(transport),
            }
        })
        .collect();

    Dashboard {
        uptime: started.elapsed(),
        stats: bridge.stats(),
        transports,
        max_clients: bridge.config().max_clients,
        counter: header.update_counter,
        data_valid: header.data_valid,
        broadcast_interval: bridge.config().broadcast_interval,
        airspeed_knots: host.flight.indicated_knots(),
        applied_commands: host.flight.applied_commands(),
        log,
    }
}
