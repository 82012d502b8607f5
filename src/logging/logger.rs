use super::screen::OnScreenMessages;
use super::SCREEN_TARGET;
use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Constants ───────────────────────────────────────────────────────────────

/// Buffered lines before an automatic flush.
const FLUSH_THRESHOLD: usize = 50;

/// Log file size (20 MB) above which the oldest lines are dropped.
const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Share of lines dropped by a rotation.
const ROTATION_DROP_FRACTION: f64 = 0.25;

const LOG_FILE_NAME: &str = "sessions.log";
const LEVEL_ENV: &str = "MPSESSIONS_LOG";

// ── Logger ──────────────────────────────────────────────────────────────────

/// `log` backend: buffered file output plus the on-screen message overlay.
pub struct SessionLogger {
    buffer: Mutex<Vec<String>>,
    log_path: PathBuf,
    level: LevelFilter,
    screen: Arc<OnScreenMessages>,
}

impl SessionLogger {
    pub fn new(log_path: PathBuf, level: LevelFilter, screen: Arc<OnScreenMessages>) -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(FLUSH_THRESHOLD)),
            log_path,
            level,
            screen,
        }
    }

    /// `[YYYY-MM-DD HH:MM:SS.mmm] [LEVEL] [module] message`
    fn format_line(now: DateTime<Local>, record: &Record) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            now.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    }

    /// Buffer a line; hand back the whole batch when it is due for disk.
    fn buffer_line(&self, line: String, urgent: bool) -> Option<Vec<String>> {
        let mut buffer = self.buffer.lock();
        buffer.push(line);
        if urgent || buffer.len() >= FLUSH_THRESHOLD {
            Some(std::mem::take(&mut *buffer))
        } else {
            None
        }
    }

    /// Append `lines` to the log file. Must be called without holding the
    /// buffer lock.
    fn write_lines(log_path: &Path, lines: &[String]) {
        if lines.is_empty() {
            return;
        }

        rotate_if_larger(log_path, MAX_FILE_SIZE);

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
            for line in lines {
                let _ = writeln!(file, "{line}");
            }
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if record.target() == SCREEN_TARGET {
            self.screen.push(record.level(), record.args().to_string());
        }

        let line = Self::format_line(Local::now(), record);
        let urgent = record.level() == Level::Error;

        if let Some(batch) = self.buffer_line(line, urgent) {
            Self::write_lines(&self.log_path, &batch);
        }
    }

    fn flush(&self) {
        let batch = std::mem::take(&mut *self.buffer.lock());
        Self::write_lines(&self.log_path, &batch);
    }
}

/// Drop the oldest quarter of `log_path` once it exceeds `max_size` bytes.
fn rotate_if_larger(log_path: &Path, max_size: u64) {
    let Ok(metadata) = fs::metadata(log_path) else {
        return;
    };
    if metadata.len() <= max_size {
        return;
    }

    let Ok(file) = File::open(log_path) else {
        return;
    };
    let lines: Vec<String> = BufReader::new(file).lines().map_while(Result::ok).collect();
    let drop_count = (lines.len() as f64 * ROTATION_DROP_FRACTION) as usize;

    if let Ok(mut file) = File::create(log_path) {
        for line in &lines[drop_count..] {
            let _ = writeln!(file, "{line}");
        }
    }
}

// ── Public init ─────────────────────────────────────────────────────────────

/// Install `SessionLogger` as the global `log` logger.
///
/// - Creates `log_dir` if needed; output goes to `<log_dir>/sessions.log`.
/// - Level comes from `MPSESSIONS_LOG` (default `info`).
///
/// Returns the on-screen message buffer for the UI to display.
pub fn init_logger(log_dir: PathBuf) -> Result<Arc<OnScreenMessages>, Box<dyn std::error::Error>> {
    fs::create_dir_all(&log_dir)?;

    let level = std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    let screen = Arc::new(OnScreenMessages::new());
    let logger = SessionLogger::new(log_dir.join(LOG_FILE_NAME), level, screen.clone());
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);

    Ok(screen)
}

// ── Tests ───────────────────────────────────────────────────────────────────
