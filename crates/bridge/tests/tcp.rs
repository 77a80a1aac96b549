mod common;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use aerobridge::{
    BridgeEvent, CommandValue, DisconnectReason, ParsedValue, SimMessage, Transport, parse_snapshot,
};

use common::{TIMEOUT, line_reader, read_line, start, tick_until, wait_until};

#[test]
fn data_port_streams_one_document_per_line() {
    let bridge = start(|_| {});
    let mut reader = line_reader(bridge.tcp_data_addr().unwrap());
    assert!(wait_until(TIMEOUT, || bridge.client_count(Transport::TcpData) == 1));

    bridge.on_simulation_tick(&[SimMessage::named("Aircraft.Altitude", 100.0)]);
    bridge.on_simulation_tick(&[SimMessage::named("Aircraft.Altitude", 200.0)]);

    let mut last_counter = 0;
    loop {
        let line = read_line(&mut reader);
        assert!(line.ends_with('\n'));
        let snapshot = parse_snapshot(bridge.registry(), line.trim_end()).unwrap();
        assert!(snapshot.update_counter >= last_counter);
        last_counter = snapshot.update_counter;
        if snapshot.update_counter == 2 {
            assert_eq!(
                snapshot.variables["Aircraft.Altitude"],
                ParsedValue::Number(200.0)
            );
            break;
        }
    }
}

#[test]
fn stalled_data_client_is_dropped_while_others_keep_streaming() {
    let bridge = start(|config| {
        config.broadcast_interval = Duration::from_millis(5);
        config.client_backlog = 1;
        config.write_timeout = Duration::from_millis(200);
    });
    let addr = bridge.tcp_data_addr().unwrap();
    let stalled = TcpStream::connect(addr).unwrap();
    let mut healthy = line_reader(addr);
    assert!(wait_until(TIMEOUT, || bridge.client_count(Transport::TcpData) == 2));

    // The stalled client never reads; once the socket buffers fill its
    // backlog overflows while the healthy one keeps draining.
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut backlog_event = false;
    while Instant::now() < deadline {
        assert!(!read_line(&mut healthy).is_empty());
        backlog_event |= bridge.drain_events().iter().any(|e| {
            matches!(
                e,
                BridgeEvent::ClientDisconnected {
                    transport: Transport::TcpData,
                    reason: DisconnectReason::Backlog,
                    ..
                }
            )
        });
        if backlog_event && bridge.client_count(Transport::TcpData) == 1 {
            break;
        }
    }
    assert!(backlog_event, "stalled client was never dropped");
    assert_eq!(bridge.client_count(Transport::TcpData), 1);
    assert!(bridge.stats().tcp_data.backlog_disconnects >= 1);

    bridge.on_simulation_tick(&[SimMessage::named("Aircraft.Altitude", 4242.0)]);
    let mut fresh = false;
    for _ in 0..1000 {
        let line = read_line(&mut healthy);
        let snapshot = parse_snapshot(bridge.registry(), line.trim_end()).unwrap();
        if snapshot.variables["Aircraft.Altitude"] == ParsedValue::Number(4242.0) {
            fresh = true;
            break;
        }
    }
    assert!(fresh, "healthy client stopped receiving snapshots");
    drop(stalled);
}

#[test]
fn command_port_accepts_lines_and_survives_bad_ones() {
    let bridge = start(|_| {});
    let mut stream = TcpStream::connect(bridge.tcp_command_addr().unwrap()).unwrap();
    stream
        .write_all(
            b"{\"variable\":\"Bogus.Variable\",\"value\":1}\n\
              not json\n\
              \n\
              {\"variable\":\"Aircraft.Altitude\",\"value\":1}\n\
              {\"variable\":\"Controls.Flaps\",\"value\":0.5}\r\n",
        )
        .unwrap();

    let flaps = tick_until(&bridge, |commands| {
        commands
            .into_iter()
            .find(|c| c.name == "Controls.Flaps")
            .map(|c| c.value)
    });
    assert_eq!(flaps, Some(CommandValue::Scalar(0.5)));
    assert_eq!(bridge.stats().commands_rejected, 3);
    assert_eq!(bridge.client_count(Transport::TcpCommand), 1);
}

#[test]
fn overlong_command_line_closes_connection() {
    let bridge = start(|config| config.max_command_bytes = 128);
    let mut stream = TcpStream::connect(bridge.tcp_command_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();
    stream.write_all(&[b'x'; 512]).unwrap();

    let mut buf = [0u8; 16];
    let read = stream.read(&mut buf);
    assert!(matches!(read, Ok(0) | Err(_)));

    assert!(wait_until(TIMEOUT, || bridge.drain_events().iter().any(|e| matches!(
        e,
        BridgeEvent::ClientDisconnected {
            transport: Transport::TcpCommand,
            reason: DisconnectReason::ProtocolViolation,
            ..
        }
    ))));
}

#[test]
fn idle_command_connection_is_closed() {
    let bridge = start(|config| config.idle_timeout = Duration::from_millis(200));
    let mut stream = TcpStream::connect(bridge.tcp_command_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();

    let mut buf = [0u8; 16];
    assert!(matches!(stream.read(&mut buf), Ok(0) | Err(_)));
    assert!(wait_until(TIMEOUT, || bridge.client_count(Transport::TcpCommand) == 0));
}

#[test]
fn connections_beyond_the_limit_are_refused() {
    let bridge = start(|config| config.max_clients = 1);
    let addr = bridge.tcp_data_addr().unwrap();
    let mut first = line_reader(addr);
    assert!(wait_until(TIMEOUT, || bridge.client_count(Transport::TcpData) == 1));

    let mut second = TcpStream::connect(addr).unwrap();
    second.set_read_timeout(Some(TIMEOUT)).unwrap();
    let mut buf = [0u8; 16];
    assert!(matches!(second.read(&mut buf), Ok(0) | Err(_)));

    assert!(!read_line(&mut first).is_empty());
    assert!(wait_until(TIMEOUT, || bridge.stats().tcp_data.refused == 1));
    assert_eq!(bridge.client_count(Transport::TcpData), 1);
}

#[test]
fn busy_port_disables_only_that_transport() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    let bridge = start(|config| config.tcp_command_port = port);
    assert!(matches!(
        bridge.status(Transport::TcpCommand),
        aerobridge::TransportStatus::Disabled(_)
    ));
    assert!(bridge.tcp_command_addr().is_none());

    let mut reader = line_reader(bridge.tcp_data_addr().unwrap());
    assert!(!read_line(&mut reader).is_empty());
    assert!(bridge.drain_events().iter().any(|e| matches!(
        e,
        BridgeEvent::TransportDisabled {
            transport: Transport::TcpCommand,
            ..
        }
    )));
}
