use crate::utils;
use serde::Serialize;
use std::fmt::Display;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ProtocolMode {
    /// HLS rewind playback, fetched with streamlink.
    #[default]
    Segmented,
    /// DASH manifest with directly fetchable renditions.
    Manifest,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ContentDescriptor {
    pub video_no: String,
    pub video_id: Option<String>,
    pub title: String,
    pub channel_name: String,
    pub live_open_date: Option<String>,
    pub vod_status: Option<String>,
    pub playback_key: Option<String>,
    pub protocol_mode: ProtocolMode,
    #[serde(skip)]
    pub(crate) rewind_playback: Option<String>,
}

impl ContentDescriptor {
    /// Default output file name, `[2024-01-02] channel title.mp4`.
    pub fn default_filename(&self) -> String {
        let date = self
            .live_open_date
            .as_deref()
            .and_then(utils::format_live_date)
            .map(|(_, date)| date)
            .unwrap_or_default();

        utils::sanitize_filename(&format!(
            "[{}] {} {}.mp4",
            date,
            self.channel_name.trim(),
            self.title.trim()
        ))
    }

    /// Uploaded (non-live) vods are always downloaded at full speed.
    pub fn forces_full_speed(&self) -> bool {
        matches!(self.vod_status.as_deref(), Some("UPLOAD") | Some("NONE"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Rendition {
    pub id: String,
    pub label: String,
    pub bitrate_bps: Option<u64>,
    pub width_px: Option<u64>,
    pub height_px: Option<u64>,
    pub frame_rate: Option<String>,
    pub source_locator: Option<String>,
}

impl Rendition {
    /// Direct media url, `None` when absent or empty.
    pub fn locator(&self) -> Option<&str> {
        self.source_locator.as_deref().filter(|x| !x.is_empty())
    }

    pub fn display(&self) -> String {
        let mut extra = vec![];

        if let (Some(w), Some(h)) = (self.width_px, self.height_px) {
            extra.push(format!("{}x{}", w, h));
        }

        if let Some(frame_rate) = &self.frame_rate {
            extra.push(format!("{} fps", frame_rate));
        }

        if let Some(bitrate) = self.bitrate_bps {
            extra.push(format!("{}/s", utils::format_bytes(bitrate / 8)));
        }

        if extra.is_empty() {
            self.label.clone()
        } else {
            format!("{} ({})", self.label, extra.join(", "))
        }
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.trim();

        if self.id == query || self.label.eq_ignore_ascii_case(query) {
            return true;
        }

        match (leading_digits(query), leading_digits(&self.label)) {
            (Some(x), Some(y)) if x == y => true,
            (Some(x), _) => self.height_px.is_some_and(|h| h.to_string() == x),
            _ => false,
        }
    }
}

impl Display for Rendition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// First run of ascii digits in `text`.
pub(crate) fn leading_digits(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Rendition with the greatest height. When several share the maximum height
/// (or none carries a height) the first one listed upstream wins.
pub fn best_rendition(renditions: &[Rendition]) -> Option<&Rendition> {
    let mut best: Option<&Rendition> = None;

    for rendition in renditions {
        match best {
            Some(x) if rendition.height_px.unwrap_or(0) <= x.height_px.unwrap_or(0) => (),
            _ => best = Some(rendition),
        }
    }

    best
}

/// Find a rendition by id, label or resolution digits (`1080`, `1080p`, `1080p60`).
pub fn find_rendition<'a>(renditions: &'a [Rendition], query: &str) -> Option<&'a Rendition> {
    renditions
        .iter()
        .find(|x| x.id == query.trim())
        .or_else(|| renditions.iter().find(|x| x.matches(query)))
}
