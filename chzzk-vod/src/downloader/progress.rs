use crate::utils;
use kdam::term::Colorizer;
use std::{
    io::{self, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// Minimum wall time between two renders triggered by scanners.
pub const RENDER_THROTTLE: Duration = Duration::from_millis(100);
/// Interval of the sampling timer.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
/// How long a rate reported by a tool wins over the sampled estimate.
const REPORTED_RATE_TTL: Duration = Duration::from_secs(1);

struct Snapshot {
    transferred: u64,
    total: Option<u64>,
    percent: Option<u8>,
    rate: Option<String>,
    eta: Option<String>,
    reported_at: Option<Instant>,
    media_time: Option<u64>,
    media_total: Option<u64>,
    last_render: Instant,
    width: usize,
}

impl Snapshot {
    fn line(&self) -> String {
        let mut parts = vec![];

        match self.total {
            Some(total) if total > 0 => parts.push(format!(
                "{} / {} ({:.1}%)",
                utils::format_bytes(self.transferred),
                utils::format_bytes(total),
                (self.transferred as f64 / total as f64 * 100.0).min(100.0)
            )),
            _ => parts.push(match self.percent {
                Some(percent) => format!("{} ({}%)", utils::format_bytes(self.transferred), percent),
                None => utils::format_bytes(self.transferred),
            }),
        }

        if let Some(rate) = &self.rate {
            parts.push(rate.to_owned());
        }

        if let Some(eta) = &self.eta {
            parts.push(format!("ETA {}", eta));
        }

        if let Some(media_time) = self.media_time {
            parts.push(match self.media_total {
                Some(total) => format!(
                    "{} / {}",
                    utils::seconds_to_hms(media_time.min(total)),
                    utils::seconds_to_hms(total)
                ),
                None => utils::seconds_to_hms(media_time),
            });
        }

        parts.join(" | ")
    }

    fn tool_reported_recently(&self) -> bool {
        self.reported_at
            .is_some_and(|x| x.elapsed() < REPORTED_RATE_TTL)
    }

    /// Overwrite the current terminal line with the status line.
    fn draw(&mut self, out: &mut impl Write) {
        let line = self.line();
        let len = line.chars().count();
        let padding = " ".repeat(self.width.saturating_sub(len));
        write!(out, "\r{}{}", line, padding).ok();
        out.flush().ok();
        self.width = len;
        self.last_render = Instant::now();
    }

    fn clear(&mut self, out: &mut impl Write) {
        if self.width > 0 {
            write!(out, "\r{}\r", " ".repeat(self.width)).ok();
            self.width = 0;
        }
    }
}

/// Shared progress of one pipeline run.
///
/// Scanners and the sampling timer update it from different tasks, every
/// access goes through the same mutex and rendering reads under that lock too.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<Mutex<Snapshot>>,
}

impl Progress {
    pub fn new(total: Option<u64>, media_total: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Snapshot {
                transferred: 0,
                total,
                percent: None,
                rate: None,
                eta: None,
                reported_at: None,
                media_time: None,
                media_total,
                last_render: Instant::now(),
                width: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_transferred(&self, bytes: u64) {
        self.state().transferred = bytes;
    }

    pub fn set_media_time(&self, secs: u64) {
        self.state().media_time = Some(secs);
    }

    /// Sets the media duration unless it is already known, returns whether it was set.
    pub fn set_media_total_once(&self, secs: u64) -> bool {
        let mut state = self.state();

        if state.media_total.is_some() {
            return false;
        }

        state.media_total = Some(secs);
        true
    }

    /// Completion reported by the tool, shown only while the total size is unknown.
    pub fn set_percent(&self, percent: u8) {
        self.state().percent = Some(percent.min(100));
    }

    /// Rate or eta parsed out of a tool's own output.
    pub fn report(&self, rate: Option<String>, eta: Option<String>) {
        let mut state = self.state();

        if rate.is_none() && eta.is_none() {
            return;
        }

        if let Some(rate) = rate {
            state.rate = Some(rate);
        }

        if let Some(eta) = eta {
            state.eta = Some(eta);
        }

        state.reported_at = Some(Instant::now());
    }

    /// Rate and eta estimated by the sampling timer, ignored while tool reported values are fresh.
    pub fn estimate(&self, rate: String, eta: Option<String>) {
        let mut state = self.state();

        if state.tool_reported_recently() {
            return;
        }

        state.rate = Some(rate);

        if eta.is_some() {
            state.eta = eta;
        }
    }

    pub fn render(&self) {
        let mut state = self.state();
        let mut out = io::stderr().lock();
        state.draw(&mut out);
    }

    /// Render unless the last render happened less than [`RENDER_THROTTLE`] ago.
    pub fn render_throttled(&self) {
        let mut state = self.state();

        if state.last_render.elapsed() >= RENDER_THROTTLE {
            let mut out = io::stderr().lock();
            state.draw(&mut out);
        }
    }

    /// Print a tool message above the status line.
    pub fn notice(&self, tool: &str, message: &str) {
        let mut state = self.state();
        let mut out = io::stderr().lock();
        state.clear(&mut out);
        writeln!(
            out,
            "{} {}",
            format!("[{}]", tool.to_uppercase()).colorize("bold yellow"),
            message.trim()
        )
        .ok();
        state.draw(&mut out);
    }

    /// Final render followed by a line break.
    pub fn finish(&self) {
        let mut state = self.state();
        let mut out = io::stderr().lock();
        state.draw(&mut out);
        writeln!(out).ok();
        state.width = 0;
    }

    pub fn line(&self) -> String {
        self.state().line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_with_total() {
        let progress = Progress::new(Some(200 * 1024 * 1024), None);
        progress.set_transferred(50 * 1024 * 1024);
        progress.report(Some("5.0MiB/s".to_owned()), Some("30s".to_owned()));

        assert_eq!(
            progress.line(),
            "50.0 MiB / 200.0 MiB (25.0%) | 5.0MiB/s | ETA 30s"
        );
    }

    #[test]
    fn line_without_total() {
        let progress = Progress::new(None, None);
        progress.set_transferred(2048);
        progress.set_media_time(65);
        assert_eq!(progress.line(), "2.0 KiB | 00:01:05");

        assert!(progress.set_media_total_once(3600));
        assert!(!progress.set_media_total_once(10));
        assert_eq!(progress.line(), "2.0 KiB | 00:01:05 / 01:00:00");
    }

    #[test]
    fn reported_rate_wins_over_estimate() {
        let progress = Progress::new(None, None);
        progress.estimate("1.0 MiB/s".to_owned(), None);
        assert_eq!(progress.line(), "0 B | 1.0 MiB/s");

        progress.report(Some("9.9MiB/s".to_owned()), None);
        progress.estimate("1.0 MiB/s".to_owned(), Some("00:00:10".to_owned()));
        assert_eq!(progress.line(), "0 B | 9.9MiB/s");
    }

    #[test]
    fn percent_only_without_total() {
        let progress = Progress::new(None, None);
        progress.set_transferred(1024);
        progress.set_percent(42);
        assert_eq!(progress.line(), "1.0 KiB (42%)");

        let progress = Progress::new(Some(4096), None);
        progress.set_transferred(1024);
        progress.set_percent(42);
        assert_eq!(progress.line(), "1.0 KiB / 4.0 KiB (25.0%)");
    }

    #[test]
    fn reported_rate_expires() {
        let progress = Progress::new(None, None);
        progress.report(Some("9.9MiB/s".to_owned()), None);
        progress.state().reported_at = Some(Instant::now() - REPORTED_RATE_TTL);
        progress.estimate("1.0 MiB/s".to_owned(), None);
        assert_eq!(progress.line(), "0 B | 1.0 MiB/s");
    }

    #[test]
    fn throttled_render_waits_for_interval() {
        let progress = Progress::new(None, None);
        progress.render();
        let first = progress.state().last_render;

        progress.render_throttled();
        assert_eq!(progress.state().last_render, first);

        std::thread::sleep(RENDER_THROTTLE + Duration::from_millis(20));
        progress.render_throttled();
        assert!(progress.state().last_render > first);
    }

    #[test]
    fn draw_pads_shorter_lines() {
        let progress = Progress::new(None, None);
        let mut out = vec![];

        progress.set_transferred(5 * 1024 * 1024);
        progress.state().draw(&mut out);
        progress.set_transferred(1);
        progress.state().draw(&mut out);

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "\r5.0 MiB\r1 B    ");
    }
}
