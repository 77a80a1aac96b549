use std::time::Duration;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use aerobridge::{StatsSnapshot, Transport, TransportStats, TransportStatus};

use crate::events::{EventLog, Severity};

/// Everything the dashboard shows for one frame.
pub struct Dashboard<'a> {
    pub uptime: Duration,
    pub stats: StatsSnapshot,
    pub transports: Vec<TransportRow>,
    pub max_clients: usize,
    pub counter: u32,
    pub data_valid: bool,
    pub broadcast_interval: Duration,
    pub airspeed_knots: f64,
    pub applied_commands: u64,
    pub log: &'a EventLog,
}

pub struct TransportRow {
    pub transport: Transport,
    pub status: TransportStatus,
    pub address: Option<String>,
    pub clients: usize,
}

pub fn render(frame: &mut Frame, dashboard: &Dashboard<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], dashboard);
    render_clients(frame, chunks[1], dashboard);
    render_transports(frame, chunks[2], dashboard);
    render_commands(frame, chunks[3], dashboard);
    render_log(frame, chunks[4], dashboard.log);
    render_help(frame, chunks[5]);
}

fn render_header(frame: &mut Frame, area: Rect, dashboard: &Dashboard<'_>) {
    let title = format!(
        " Aerofly Bridge - Uptime: {} ",
        format_duration(dashboard.uptime.as_secs())
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let valid = if dashboard.data_valid { "valid" } else { "waiting" };
    let text = format!(
        "Ticks: {}  |  Counter: {} ({})  |  Broadcast: {:.1} Hz / {} ms  |  IAS: {:.0} kt",
        dashboard.stats.ticks,
        dashboard.counter,
        valid,
        dashboard.stats.broadcast_hz,
        dashboard.broadcast_interval.as_millis(),
        dashboard.airspeed_knots,
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_clients(frame: &mut Frame, area: Rect, dashboard: &Dashboard<'_>) {
    let block = Block::default()
        .title(" Clients ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let clients: usize = dashboard.transports.iter().map(|row| row.clients).sum();
    let capacity = (dashboard.max_clients * 3).max(1);
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio((clients as f64 / capacity as f64).min(1.0))
        .label(format!("{}/{} clients", clients, capacity));
    frame.render_widget(gauge, area);
}

fn render_transports(frame: &mut Frame, area: Rect, dashboard: &Dashboard<'_>) {
    let block = Block::default()
        .title(" Transports ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let lines: Vec<Line> = dashboard
        .transports
        .iter()
        .map(|row| {
            let status_color = match row.status {
                TransportStatus::Enabled => Color::Green,
                TransportStatus::Off => Color::DarkGray,
                TransportStatus::Disabled(_) => Color::Red,
            };
            let mut spans = vec![
                Span::styled(
                    format!("{:<14}", row.transport.as_str()),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    format!("{:<10}", status_label(&row.status)),
                    Style::default().fg(status_color),
                ),
                Span::styled(
                    format!("{:<22}", row.address.as_deref().unwrap_or("-")),
                    Style::default().fg(Color::White),
                ),
            ];
            if let Some(counters) = transport_stats(&dashboard.stats, row.transport) {
                spans.push(Span::styled(
                    format!(
                        "{} clients  {} out / {} in  {} refused  {} slow",
                        row.clients,
                        format_bytes(counters.bytes_sent),
                        format_bytes(counters.bytes_received),
                        counters.refused,
                        counters.backlog_disconnects,
                    ),
                    Style::default().fg(Color::White),
                ));
            } else {
                spans.push(Span::styled(
                    format!(
                        "{} copies  {} unchanged  {} busy",
                        dashboard.stats.shm_publishes,
                        dashboard.stats.shm_skipped,
                        dashboard.stats.shm_contended,
                    ),
                    Style::default().fg(Color::White),
                ));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_commands(frame: &mut Frame, area: Rect, dashboard: &Dashboard<'_>) {
    let block = Block::default()
        .title(" Commands ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let stats = &dashboard.stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Accepted: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} ({} clamped, {} applied)",
                    stats.commands_accepted, stats.commands_clamped, dashboard.applied_commands
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Rejected: ", Style::default().fg(Color::Gray)),
            Span::styled(
                stats.commands_rejected.to_string(),
                Style::default().fg(if stats.commands_rejected > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Dropped: ", Style::default().fg(Color::Gray)),
            Span::styled(
                stats.commands_dropped.to_string(),
                Style::default().fg(if stats.commands_dropped > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, log: &EventLog) {
    let block = Block::default()
        .title(" Events ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let visible = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = log
        .entries()
        .rev()
        .take(visible)
        .map(|entry| {
            let color = match entry.severity {
                Severity::Info => Color::White,
                Severity::Warn => Color::Yellow,
                Severity::Error => Color::Red,
            };
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", format_duration(entry.at.as_secs())),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();
    lines.reverse();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Press 'q' or ESC to quit")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn status_label(status: &TransportStatus) -> &'static str {
    match status {
        TransportStatus::Enabled => "up",
        TransportStatus::Off => "off",
        TransportStatus::Disabled(_) => "failed",
    }
}

fn transport_stats(stats: &StatsSnapshot, transport: Transport) -> Option<TransportStats> {
    match transport {
        Transport::TcpData => Some(stats.tcp_data),
        Transport::TcpCommand => Some(stats.tcp_command),
        Transport::WebSocket => Some(stats.websocket),
        Transport::SharedMemory => None,
    }
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
