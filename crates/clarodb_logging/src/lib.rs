//! Shared logging utilities for ClaroDB binaries.
//!
//! Log lines go to a size-capped file under `~/.clarodb/logs`; stderr gets a
//! second copy, throttled to warnings while the TUI owns the terminal.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "clarodb=info,clarodb_db=info";
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for ClaroDB binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// While the TUI owns the terminal, stderr stays quiet (warn only).
    pub tui_mode: bool,
}

/// Initialize tracing with a capped file writer and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = CappedLogWriter::open(log_dir, config.app_name)
        .context("Failed to open log file")?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.tui_mode && !config.verbose {
        EnvFilter::new("warn")
    } else {
        file_filter.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(())
}

/// Get the ClaroDB home directory: ~/.clarodb (or `$CLARODB_HOME`).
pub fn clarodb_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("CLARODB_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".clarodb")
}

/// Get the logs directory: ~/.clarodb/logs
pub fn logs_dir() -> PathBuf {
    clarodb_home().join("logs")
}

/// Get the workspace databases directory: ~/.clarodb/workspaces
pub fn workspaces_dir() -> PathBuf {
    clarodb_home().join("workspaces")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Append-only log file capped at [`MAX_LOG_FILE_SIZE`]. When the cap is
/// reached the current file is renamed to `<name>.log.old` (replacing any
/// previous one) and a fresh file is started, so at most two files exist.
struct CappedLogFile {
    path: PathBuf,
    old_path: PathBuf,
    max_size: u64,
    file: File,
    written: u64,
}

impl CappedLogFile {
    fn open(dir: PathBuf, base_name: &str, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let name = sanitize_name(base_name);
        let path = dir.join(format!("{name}.log"));
        let old_path = dir.join(format!("{name}.log.old"));
        let (file, written) = Self::append_to(&path)?;
        let mut capped = Self {
            path,
            old_path,
            max_size,
            file,
            written,
        };
        if capped.written >= capped.max_size {
            capped.roll()?;
        }
        Ok(capped)
    }

    fn append_to(path: &PathBuf) -> io::Result<(File, u64)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    fn roll(&mut self) -> io::Result<()> {
        let _ = self.file.flush();
        fs::rename(&self.path, &self.old_path)?;
        let (file, written) = Self::append_to(&self.path)?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

impl Write for CappedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() as u64 > self.max_size {
            self.roll()?;
        }
        let bytes = self.file.write(buf)?;
        self.written += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Clonable `MakeWriter` over the capped file. tracing layers want a writer
/// per event, so every write goes through one shared mutex.
#[derive(Clone)]
struct CappedLogWriter {
    inner: Arc<Mutex<CappedLogFile>>,
}

impl CappedLogWriter {
    fn open(dir: PathBuf, base_name: &str) -> Result<Self> {
        let file = CappedLogFile::open(dir, base_name, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {base_name}"))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CappedLogWriter {
    type Writer = CappedLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for CappedLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.lock() {
            Ok(mut file) => file.write(buf),
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "log writer lock poisoned")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "log writer lock poisoned")),
        }
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capped_file_rolls_at_size_limit() {
        let tmp = TempDir::new().unwrap();
        let mut log = CappedLogFile::open(tmp.path().to_path_buf(), "test", 16).unwrap();

        log.write_all(b"0123456789abcdef").unwrap();
        log.write_all(b"next").unwrap();
        log.flush().unwrap();

        assert!(tmp.path().join("test.log").exists());
        assert!(tmp.path().join("test.log.old").exists());
        let current = fs::read_to_string(tmp.path().join("test.log")).unwrap();
        assert_eq!(current, "next");
    }

    #[test]
    fn test_roll_replaces_previous_old_file() {
        let tmp = TempDir::new().unwrap();
        let mut log = CappedLogFile::open(tmp.path().to_path_buf(), "test", 8).unwrap();

        log.write_all(b"aaaaaaaa").unwrap();
        log.write_all(b"bbbbbbbb").unwrap();
        log.write_all(b"cc").unwrap();
        log.flush().unwrap();

        let old = fs::read_to_string(tmp.path().join("test.log.old")).unwrap();
        assert_eq!(old, "bbbbbbbb");
        let current = fs::read_to_string(tmp.path().join("test.log")).unwrap();
        assert_eq!(current, "cc");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("clarodb tui"), "clarodb_tui");
        assert_eq!(sanitize_name("ok-name_1"), "ok-name_1");
    }
}
