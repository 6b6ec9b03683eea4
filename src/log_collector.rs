//! Decoupled logging pipeline.
//!
//! `LogCollector` implements `log::Log`. Callers format the record and hand
//! the line to a background writer thread over a crossbeam channel; the writer
//! prints to stderr and, when configured, appends to a log file.
//!
//! ```text
//! log::info!() ... --> [LogCollector] --(channel)--> [writer thread] --> stderr
//!                                                                   \--> log file
//! ```
//!
//! Nothing on the audio callback path logs; see `harness::events`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{LevelFilter, Log, Metadata, Record};

/// Internal log line or flush marker
enum LogMessage {
    Line(String),
    /// Flush marker with a channel to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    level: LevelFilter,
    _writer: Arc<thread::JoinHandle<()>>,
}

impl LogCollector {
    /// Start the writer thread. `log_file` is opened in append mode.
    pub fn new(level: LevelFilter, log_file: Option<&Path>) -> std::io::Result<Self> {
        let mut file = match log_file {
            Some(path) => Some(open_log_file(path)?),
            None => None,
        };

        let (tx, rx) = unbounded::<LogMessage>();
        let writer = thread::Builder::new()
            .name("jittermark-log".to_string())
            .spawn(move || {
                for message in rx.iter() {
                    match message {
                        LogMessage::Line(line) => {
                            eprintln!("{}", line);
                            if let Some(f) = file.as_mut() {
                                if let Err(e) = writeln!(f, "{}", line) {
                                    eprintln!("[Log] Failed to write log file: {}", e);
                                }
                            }
                        }
                        LogMessage::Flush(done) => {
                            if let Some(f) = file.as_mut() {
                                let _ = f.flush();
                            }
                            let _ = done.send(());
                        }
                    }
                }
            })?;

        Ok(LogCollector {
            tx,
            level,
            _writer: Arc::new(writer),
        })
    }

    /// Create a collector and register it as the global logger
    pub fn install(level: LevelFilter, log_file: Option<&Path>) -> std::io::Result<Self> {
        let collector = Self::new(level, log_file)?;
        if let Err(e) = log::set_boxed_logger(Box::new(collector.clone()))
            .map(|()| log::set_max_level(level))
        {
            eprintln!("[Log] WARNING: Failed to set LogCollector as global logger: {}", e);
        }
        Ok(collector)
    }

    /// Queue a preformatted line
    pub fn log_str(&self, line: impl Into<String>) {
        let _ = self.tx.send(LogMessage::Line(line.into()));
    }

    /// Wait until every line queued before this call has been written
    pub fn wait_for_empty(&self) {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        if self.tx.send(LogMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_str(format_line(record));
        }
    }

    fn flush(&self) {
        self.wait_for_empty();
    }
}

fn format_line(record: &Record) -> String {
    format!(
        "{} [{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.args()
    )
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
