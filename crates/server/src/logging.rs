use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use env_logger::{Env, Target};

use aerobridge::config::{ENV_LOG_CONSOLE, ENV_LOG_FILE, ENV_LOG_LEVEL, env_flag};

/// Where log records go. Read from `AEROFLY_BRIDGE_LOG_*`, then adjusted by
/// the command line.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub console: bool,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        let level = std::env::var(ENV_LOG_LEVEL)
            .ok()
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| matches!(v.as_str(), "trace" | "debug" | "info" | "warn" | "error" | "off"))
            .unwrap_or_else(|| "info".to_owned());
        let file = std::env::var(ENV_LOG_FILE)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty() && v != "0")
            .map(PathBuf::from);
        Self {
            level,
            console: env_flag(ENV_LOG_CONSOLE, true),
            file,
        }
    }
}

/// Writes every record to each enabled sink.
struct Tee {
    console: bool,
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.console {
            io::stderr().write_all(buf)?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        io::stderr().flush()
    }
}

/// Installs the global logger. `RUST_LOG` wins over the configured level.
pub fn init(settings: &LogSettings) -> Result<()> {
    let file = match &settings.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?,
        ),
        None => None,
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.level.as_str()))
        .target(Target::Pipe(Box::new(Tee {
            console: settings.console,
            file,
        })))
        .try_init()
        .context("installing logger")?;
    Ok(())
}
