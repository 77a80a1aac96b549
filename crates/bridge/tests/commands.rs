mod common;

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{Level, LevelFilter, Log, Metadata, Record};

use aerobridge::{CommandError, CommandValue, Transport};

use common::{start, tick_until};

/// Counts warnings that mention the bogus variable.
struct Capture {
    bogus_warnings: AtomicUsize,
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn && record.args().to_string().contains("Bogus.Variable") {
            self.bogus_warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    bogus_warnings: AtomicUsize::new(0),
};

#[test]
fn every_unknown_variable_is_logged_and_the_connection_survives() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Debug);

    let bridge = start(|config| config.command_queue_capacity = 2048);
    let mut stream = TcpStream::connect(bridge.tcp_command_addr().unwrap()).unwrap();
    let region_before = bridge.store().read().region().to_vec();
    let counter_before = bridge.store().header().update_counter;

    let mut payload = Vec::new();
    for _ in 0..1000 {
        payload.extend_from_slice(b"{\"variable\":\"Bogus.Variable\",\"value\":1}\n");
    }
    payload.extend_from_slice(b"{\"variable\":\"Controls.Throttle\",\"value\":0.3}\n");
    stream.write_all(&payload).unwrap();

    let mut ticks = 0u32;
    let throttle = tick_until(&bridge, |commands| {
        ticks += 1;
        commands.into_iter().find(|c| c.name == "Controls.Throttle")
    });
    assert!(throttle.is_some());

    // Rejected commands never reach the store; only the driven ticks show.
    assert_eq!(
        bridge.store().header().update_counter,
        counter_before.wrapping_add(ticks)
    );
    assert!(bridge.store().read().region() == region_before.as_slice());
    assert_eq!(CAPTURE.bogus_warnings.load(Ordering::SeqCst), 1000);
    assert_eq!(bridge.stats().commands_rejected, 1000);
    assert_eq!(bridge.client_count(Transport::TcpCommand), 1);
}

#[test]
fn overflow_drops_the_oldest_commands() {
    let bridge = start(|config| config.command_queue_capacity = 4);
    let processor = bridge.commands();
    for i in 1..=9 {
        processor
            .submit("Controls.Throttle", (i as f64 / 10.0).into(), Transport::WebSocket)
            .unwrap();
    }

    let drained = bridge.on_simulation_tick(&[]);
    let values: Vec<CommandValue> = drained.into_iter().map(|c| c.value).collect();
    assert_eq!(
        values,
        [0.6, 0.7, 0.8, 0.9].map(CommandValue::Scalar).to_vec()
    );
    assert_eq!(bridge.stats().commands_dropped, 5);
    assert!(bridge.on_simulation_tick(&[]).is_empty());
}

#[test]
fn concurrent_producers_lose_nothing_below_capacity() {
    let bridge = start(|config| config.command_queue_capacity = 4096);
    let processor = Arc::clone(bridge.commands());

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let processor = Arc::clone(&processor);
            thread::spawn(move || {
                for _ in 0..500 {
                    processor
                        .submit("Controls.Flaps", 0.5.into(), Transport::TcpCommand)
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(bridge.on_simulation_tick(&[]).len(), 2000);
    assert_eq!(bridge.stats().commands_dropped, 0);
}

#[test]
fn validation_errors_by_kind() {
    let bridge = start(|_| {});
    let processor = bridge.commands();

    assert_eq!(
        processor.submit("Aircraft.Altitude", 1.0.into(), Transport::TcpCommand),
        Err(CommandError::ReadOnly("Aircraft.Altitude"))
    );
    assert_eq!(
        processor.submit("Controls.Throttle", f64::NAN.into(), Transport::TcpCommand),
        Err(CommandError::NonFinite("Controls.Throttle"))
    );
    assert!(matches!(
        processor.submit(
            "View.FreePosition",
            CommandValue::Vector2([1.0, 2.0].into()),
            Transport::TcpCommand
        ),
        Err(CommandError::WrongArity { expected: 3, got: 2, .. })
    ));
    assert!(processor
        .submit("Controls.Magnetos1", 3.0.into(), Transport::TcpCommand)
        .is_ok());
    assert!(matches!(
        processor.submit("Controls.Magnetos1", 1.5.into(), Transport::TcpCommand),
        Err(CommandError::OutOfRange { .. })
    ));
    assert!(processor
        .submit("Navigation.NAV1FrequencySwap", 1.0.into(), Transport::WebSocket)
        .is_ok());
}
