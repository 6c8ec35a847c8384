use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|(){}\[\]]"#).unwrap());

pub fn format_bytes(bytes: u64) -> String {
    let mut val = bytes as f64;

    if val < 1024.0 {
        return format!("{} B", bytes);
    }

    for unit in ["KiB", "MiB", "GiB", "TiB"] {
        val /= 1024.0;

        if val < 1024.0 {
            return format!("{:.1} {}", val, unit);
        }
    }

    format!("{:.1} PiB", val / 1024.0)
}

/// Parse `HH:MM:SS` into seconds.
pub fn hms_to_seconds(hms: &str) -> Option<u64> {
    let mut parts = hms.trim().split(':');
    let h = parts.next()?.parse::<u64>().ok()?;
    let m = parts.next()?.parse::<u64>().ok()?;
    let s = parts.next()?.parse::<u64>().ok()?;

    if parts.next().is_some() || m >= 60 || s >= 60 {
        return None;
    }

    Some(h * 3600 + m * 60 + s)
}

pub fn seconds_to_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Replace characters which are not allowed in file names, keeping the extension intact.
pub fn sanitize_filename(filename: &str) -> String {
    let (base, ext) = match filename.rsplit_once('.') {
        Some((base, ext)) if !ext.is_empty() => (base, Some(ext)),
        _ => (filename, None),
    };

    let base = base
        .replace(['\u{3000}', '\u{a0}'], " ")
        .replace(['\r', '\n', '\t'], "");
    let base = FORBIDDEN_CHARS.replace_all(&base, "_");
    let base = base.trim();
    let base = if base.is_empty() { "_" } else { base };

    match ext {
        Some(ext) => format!("{}.{}", base, FORBIDDEN_CHARS.replace_all(ext, "_")),
        None => base.to_owned(),
    }
}

/// Split a live open date like `2024-01-02 12:34:56` into a compact recording
/// time (`240102_123456`) and the date part (`2024-01-02`).
pub fn format_live_date(raw: &str) -> Option<(String, String)> {
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }

    let datetime = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&format!("{} 00:00:00", raw), "%Y-%m-%d %H:%M:%S"))
        .ok()?;

    Some((
        datetime.format("%y%m%d_%H%M%S").to_string(),
        datetime.format("%Y-%m-%d").to_string(),
    ))
}

/// Normalise a user supplied output file name to a sanitized `.mp4` file name.
pub fn output_filename(name: &str) -> String {
    let name = name.trim();
    let lower = name.to_ascii_lowercase();

    let name = if lower.ends_with("__mp4") {
        format!("{}.mp4", &name[..name.len() - 5])
    } else if !lower.ends_with(".mp4") {
        format!("{}.mp4", name)
    } else {
        name.to_owned()
    };

    sanitize_filename(&name)
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_owned()
    }
}
