use kdam::term::Colorizer;
use log::{Level, LevelFilter, Metadata, Record};
use std::sync::OnceLock;

/// Writes every record to stderr, stdout is kept for command output.
pub struct Logger {
    level: LevelFilter,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

impl Logger {
    /// `-v` shows debug records of this crate, `-vv` traces every crate
    /// including the http stack. `quiet` keeps errors only.
    pub fn init(verbose: u8, quiet: bool) {
        let level = match (quiet, verbose) {
            (true, _) => LevelFilter::Error,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };
        let logger = LOGGER.get_or_init(|| Logger { level });

        if log::set_logger(logger).is_ok() {
            log::set_max_level(level);
        }
    }

    fn detailed(&self) -> bool {
        self.level >= LevelFilter::Debug
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }

        // dependency chatter only at trace
        self.level == LevelFilter::Trace
            || metadata.level() <= Level::Info
            || metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if !self.detailed() {
            match record.level() {
                Level::Info => eprintln!("{}", record.args()),
                level => eprintln!("{} {}", label(level), record.args()),
            }
            return;
        }

        let location = match (record.file(), record.line()) {
            (Some(file), Some(line)) => format!("{}:{}", file, line),
            _ => record.target().to_owned(),
        };

        eprintln!(
            "{} {} {}",
            label(record.level()),
            format!("[{}]", location).colorize("cyan"),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn label(level: Level) -> String {
    match level {
        Level::Error => "error:".colorize("bold red"),
        Level::Warn => "warning:".colorize("bold yellow"),
        Level::Info => "info:".colorize("bold green"),
        Level::Debug => "debug:".colorize("bold blue"),
        Level::Trace => "trace:".colorize("bold magenta"),
    }
}
