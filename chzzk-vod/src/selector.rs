use crate::{
    error::{Error, Result},
    playlist::{ContentDescriptor, ProtocolMode, Rendition},
    utils,
};
use log::warn;
use regex::Regex;
use std::{fmt::Display, path::PathBuf, str::FromStr, sync::LazyLock};

static TIME_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}:\d{2}:\d{2})~(\d{2}:\d{2}:\d{2})$").unwrap());

/// A `HH:MM:SS~HH:MM:SS` section of a vod.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u64,
    pub end: u64,
}

impl TimeRange {
    /// Length of the section in seconds.
    pub fn duration(&self) -> Result<u64> {
        if self.end <= self.start {
            return Err(Error::invalid_input(format!(
                "section end {} is not after its start {}",
                utils::seconds_to_hms(self.end),
                utils::seconds_to_hms(self.start)
            )));
        }

        Ok(self.end - self.start)
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::invalid_input(format!(
                "{:?} is not a section, expected HH:MM:SS~HH:MM:SS (eg. 00:10:30~01:20:45)",
                s
            ))
        };

        let caps = TIME_RANGE.captures(s.trim()).ok_or_else(invalid)?;

        Ok(Self {
            start: utils::hms_to_seconds(&caps[1]).ok_or_else(invalid)?,
            end: utils::hms_to_seconds(&caps[2]).ok_or_else(invalid)?,
        })
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}~{}",
            utils::seconds_to_hms(self.start),
            utils::seconds_to_hms(self.end)
        )
    }
}

/// aria2c connection tiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SpeedTier {
    /// 16 connections
    #[default]
    #[value(name = "100")]
    Full,
    /// 12 connections
    #[value(name = "75")]
    ThreeQuarters,
    /// 8 connections
    #[value(name = "50")]
    Half,
    /// 4 connections
    #[value(name = "25")]
    Quarter,
    /// single connection, friendly to the server
    #[value(name = "none")]
    Unsplit,
}

impl SpeedTier {
    pub fn connections(&self) -> u8 {
        match self {
            Self::Full => 16,
            Self::ThreeQuarters => 12,
            Self::Half => 8,
            Self::Quarter => 4,
            Self::Unsplit => 1,
        }
    }
}

impl Display for SpeedTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "100% (16 connections)"),
            Self::ThreeQuarters => write!(f, "75% (12 connections)"),
            Self::Half => write!(f, "50% (8 connections)"),
            Self::Quarter => write!(f, "25% (4 connections)"),
            Self::Unsplit => write!(f, "no split (1 connection)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub source_url: String,
    pub rendition_id: String,
    pub directory: PathBuf,
    pub filename: String,
    pub time_range: Option<TimeRange>,
    pub speed: SpeedTier,
    pub resume: bool,
}

impl DownloadRequest {
    pub fn output(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineKind {
    /// streamlink piped into ffmpeg
    SegmentedFull,
    /// aria2c multi connection download
    ManifestFull,
    /// ffmpeg time bounded extraction
    ManifestRange,
}

/// Decide which external tool pipeline downloads `request`.
pub fn select_pipeline(
    descriptor: &ContentDescriptor,
    renditions: &[Rendition],
    request: &DownloadRequest,
) -> Result<PipelineKind> {
    let rendition = renditions
        .iter()
        .find(|x| x.id == request.rendition_id)
        .ok_or_else(|| {
            Error::invalid_input(format!("unknown rendition {}", request.rendition_id))
        })?;

    if descriptor.protocol_mode == ProtocolMode::Segmented {
        if request.time_range.is_some() {
            warn!("rewind vods cannot be downloaded in sections, downloading the whole vod");
        }

        return Ok(PipelineKind::SegmentedFull);
    }

    if rendition.locator().is_none() {
        return Err(Error::invalid_input(format!(
            "rendition {} has no media url",
            rendition.label
        )));
    }

    Ok(match request.time_range {
        Some(_) => PipelineKind::ManifestRange,
        None => PipelineKind::ManifestFull,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(time_range: Option<TimeRange>) -> DownloadRequest {
        DownloadRequest {
            source_url: "https://chzzk.naver.com/video/1".to_owned(),
            rendition_id: "r".to_owned(),
            directory: PathBuf::from("."),
            filename: "out.mp4".to_owned(),
            time_range,
            speed: SpeedTier::Full,
            resume: false,
        }
    }

    fn descriptor(mode: ProtocolMode) -> ContentDescriptor {
        ContentDescriptor {
            protocol_mode: mode,
            ..Default::default()
        }
    }

    fn rendition(locator: Option<&str>) -> Vec<Rendition> {
        vec![Rendition {
            id: "r".to_owned(),
            label: "1080p".to_owned(),
            source_locator: locator.map(|x| x.to_owned()),
            ..Default::default()
        }]
    }

    #[test]
    fn segmented_ignores_range() {
        let range = "00:10:00~00:20:00".parse::<TimeRange>().unwrap();

        for time_range in [None, Some(range)] {
            assert_eq!(
                select_pipeline(
                    &descriptor(ProtocolMode::Segmented),
                    &rendition(None),
                    &request(time_range)
                )
                .unwrap(),
                PipelineKind::SegmentedFull
            );
        }
    }

    #[test]
    fn manifest_range_only_with_range() {
        let renditions = rendition(Some("https://cdn.example/1080.mp4"));
        let manifest = descriptor(ProtocolMode::Manifest);

        assert_eq!(
            select_pipeline(&manifest, &renditions, &request(None)).unwrap(),
            PipelineKind::ManifestFull
        );

        let range = "00:10:00~00:20:00".parse::<TimeRange>().unwrap();
        assert_eq!(
            select_pipeline(&manifest, &renditions, &request(Some(range))).unwrap(),
            PipelineKind::ManifestRange
        );
    }

    #[test]
    fn manifest_requires_locator() {
        let manifest = descriptor(ProtocolMode::Manifest);

        for locator in [None, Some("")] {
            assert!(matches!(
                select_pipeline(&manifest, &rendition(locator), &request(None)),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn unknown_rendition() {
        let mut request = request(None);
        request.rendition_id = "missing".to_owned();

        assert!(matches!(
            select_pipeline(&descriptor(ProtocolMode::Manifest), &rendition(Some("u")), &request),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn time_range_parsing() {
        let range = "00:10:30~01:20:45".parse::<TimeRange>().unwrap();
        assert_eq!(range.start, 630);
        assert_eq!(range.end, 4845);
        assert_eq!(range.duration().unwrap(), 4215);
        assert_eq!(range.to_string(), "00:10:30~01:20:45");

        assert!("0:10:30~01:20:45".parse::<TimeRange>().is_err());
        assert!("00:10:30-01:20:45".parse::<TimeRange>().is_err());
        assert!("00:61:00~01:00:00".parse::<TimeRange>().is_err());

        let backwards = "00:10:00~00:09:00".parse::<TimeRange>().unwrap();
        assert!(matches!(backwards.duration(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn speed_tiers() {
        assert_eq!(SpeedTier::Full.connections(), 16);
        assert_eq!(SpeedTier::ThreeQuarters.connections(), 12);
        assert_eq!(SpeedTier::Half.connections(), 8);
        assert_eq!(SpeedTier::Quarter.connections(), 4);
        assert_eq!(SpeedTier::Unsplit.connections(), 1);
    }
}
