use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

/// Topics that Debug/Trace records are restricted to. An empty filter lets
/// every topic through.
#[derive(Debug, Default)]
struct TopicFilter(HashSet<String>);

impl TopicFilter {
    fn parse(raw: &str) -> Self {
        TopicFilter(
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    fn allows(&self, target: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|topic| target.starts_with(topic.as_str()))
    }
}

// Console logger for the brain: coloured level, wall-clock time, topic target
#[derive(Debug)]
struct BrainLogger {
    level: LevelFilter,
    topics: TopicFilter,
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1B[31m",
        Level::Warn => "\x1B[33m",
        Level::Info => "\x1B[32m",
        Level::Debug => "\x1B[36m",
        Level::Trace => "\x1B[35m",
    }
}

impl log::Log for BrainLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match metadata.level() {
            level if level > self.level => false,
            Level::Debug | Level::Trace => self.topics.allows(metadata.target()),
            _ => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut line = format!(
            "{} {}{:5}\x1B[0m {}: {}",
            Local::now().format("%H:%M:%S%.3f"),
            level_color(record.level()),
            record.level(),
            record.target(),
            record.args()
        );
        // Debug records name their source module when it differs from the topic
        if record.level() >= Level::Debug {
            if let Some(module) = record.module_path().filter(|m| *m != record.target()) {
                line.push_str(&format!(" [{}]", module));
            }
        }

        let _ = writeln!(io::stdout().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

static LOGGER: OnceLock<BrainLogger> = OnceLock::new();

/// Install the console logger. `debug_filter` is a comma separated topic list
/// (input, drive, auton, game, phase, runtime, scheduler, storage).
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| BrainLogger {
        level,
        topics: debug_filter.as_deref().map(TopicFilter::parse).unwrap_or_default(),
    });
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Parse a `--log-level` value, defaulting to Info
pub fn parse_level(raw: &str) -> LevelFilter {
    raw.trim().parse().unwrap_or(LevelFilter::Info)
}

// Topic macros. The first argument is the current tick number.
#[macro_export]
macro_rules! debug_input {
    ($tick:expr, $($arg:tt)*) => {
        log::debug!(target: "input", "[T{:05}] {}", $tick, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_drive {
    ($tick:expr, $($arg:tt)*) => {
        log::debug!(target: "drive", "[T{:05}] {}", $tick, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_auton {
    ($tick:expr, $($arg:tt)*) => {
        log::debug!(target: "auton", "[T{:05}] {}", $tick, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_game {
    ($tick:expr, $($arg:tt)*) => {
        log::debug!(target: "game", "[T{:05}] {}", $tick, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_phase {
    ($tick:expr, $($arg:tt)*) => {
        log::debug!(target: "phase", "[T{:05}] {}", $tick, format_args!($($arg)*))
    };
}
