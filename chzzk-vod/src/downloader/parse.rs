//! Line parsers for the text output of external tools.
//!
//! Every tool gets its own parser so that a change in one tool's output format
//! only touches the matching function and its captured sample lines below.

use regex::Regex;
use std::sync::LazyLock;

static FFMPEG_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2})(?:\.\d+)?").unwrap());
static FFMPEG_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)time=\s*(\d+):(\d{2}):(\d{2})(?:\.\d+)?").unwrap());
static FFMPEG_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)size=\s*(\d+)\s*(kB|KiB)").unwrap());
static FFMPEG_BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bitrate=\s*([0-9.]+\s*kbits/s)").unwrap());

static ARIA2C_PERCENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d{1,3})%\)").unwrap());
static ARIA2C_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DL:\s*(\d+(?:\.\d+)?[KMGT]?i?B)").unwrap());
static ARIA2C_ETA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ETA:\s*((?:\d+h)?(?:\d+m)?(?:\d+s)?)").unwrap());

/// Everything ffmpeg can tell about its progress in one line.
#[derive(Debug, Default, PartialEq)]
pub struct FfmpegLine {
    /// Input duration announcement, in seconds.
    pub duration: Option<u64>,
    /// Output timestamp reached, in seconds.
    pub out_time: Option<u64>,
    /// Output bytes written.
    pub size: Option<u64>,
    pub bitrate: Option<String>,
    /// `progress=end` was reported.
    pub end: bool,
    /// Warning or error message meant for the user.
    pub notice: bool,
}

impl FfmpegLine {
    pub fn has_progress(&self) -> bool {
        self.duration.is_some()
            || self.out_time.is_some()
            || self.size.is_some()
            || self.bitrate.is_some()
    }
}

fn hms(h: &str, m: &str, s: &str) -> Option<u64> {
    Some(h.parse::<u64>().ok()? * 3600 + m.parse::<u64>().ok()? * 60 + s.parse::<u64>().ok()?)
}

/// Parse one line of ffmpeg output, either a `-progress` key=value pair or a
/// human readable log/stats line.
pub fn ffmpeg(line: &str) -> FfmpegLine {
    let line = line.trim();
    let mut parsed = FfmpegLine::default();

    if let Some((key, value)) = line.split_once('=')
        && !key.is_empty()
        && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !value.contains(' ')
    {
        match key {
            // out_time_ms is microseconds as well
            "out_time_us" | "out_time_ms" => {
                parsed.out_time = value.parse::<u64>().ok().map(|x| x / 1_000_000);
            }
            "out_time" => {
                let mut parts = value.split('.').next().unwrap_or_default().split(':');
                if let (Some(h), Some(m), Some(s)) = (parts.next(), parts.next(), parts.next()) {
                    parsed.out_time = hms(h, m, s);
                }
            }
            "total_size" => parsed.size = value.parse::<u64>().ok(),
            "bitrate" if value != "N/A" => parsed.bitrate = Some(value.to_owned()),
            "progress" => parsed.end = value == "end",
            _ => (),
        }

        return parsed;
    }

    if let Some(caps) = FFMPEG_DURATION.captures(line) {
        parsed.duration = hms(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = FFMPEG_TIME.captures(line) {
        parsed.out_time = hms(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = FFMPEG_SIZE.captures(line) {
        parsed.size = caps[1].parse::<u64>().ok().map(|x| x * 1024);
    }

    if let Some(caps) = FFMPEG_BITRATE.captures(line) {
        parsed.bitrate = Some(caps[1].replace(' ', ""));
    }

    if !line.contains("frame=") && !line.contains("size=") {
        parsed.notice = is_notice(line);
    }

    parsed
}

/// Progress fields of an aria2c readout, eg.
/// `[#2089b0 400.0KiB/33.2MiB(1%) CN:1 DL:115.7KiB ETA:4m51s]`.
#[derive(Debug, Default, PartialEq)]
pub struct Aria2cLine {
    pub percent: Option<u8>,
    pub rate: Option<String>,
    pub eta: Option<String>,
}

impl Aria2cLine {
    pub fn has_progress(&self) -> bool {
        self.percent.is_some() || self.rate.is_some() || self.eta.is_some()
    }
}

pub fn aria2c(line: &str) -> Aria2cLine {
    if !line.contains('%') && !line.contains("DL:") {
        return Aria2cLine::default();
    }

    Aria2cLine {
        percent: ARIA2C_PERCENT
            .captures(line)
            .and_then(|x| x[1].parse::<u8>().ok())
            .filter(|x| *x <= 100),
        rate: ARIA2C_RATE
            .captures(line)
            .map(|x| format!("{}/s", &x[1])),
        eta: ARIA2C_ETA
            .captures(line)
            .map(|x| x[1].to_owned())
            .filter(|x| !x.is_empty()),
    }
}

/// Streamlink only matters for its warnings and errors, the media goes to stdout.
pub fn streamlink(line: &str) -> bool {
    is_notice(line)
}

/// Whether a log line carries an error or a warning.
pub fn is_notice(line: &str) -> bool {
    let line = line.to_ascii_lowercase();
    line.contains("error") || line.contains("warning") || line.contains("exception")
}
