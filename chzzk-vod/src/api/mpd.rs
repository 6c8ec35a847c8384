use crate::{
    error::{Error, Result},
    playlist::{Rendition, leading_digits},
};
use serde::Deserialize;

pub fn parse(xml: &str) -> Result<MPD> {
    Ok(quick_xml::de::from_str::<MPD>(xml)?)
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Default, Deserialize)]
pub struct MPD {
    #[serde(rename = "Period", default)]
    pub period: Vec<Period>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Period {
    #[serde(rename = "AdaptationSet", default)]
    pub adaptation_set: Vec<AdaptationSet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdaptationSet {
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,
    #[serde(rename = "Representation", default)]
    pub representation: Vec<Representation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Representation {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@bandwidth")]
    pub bandwidth: Option<String>,
    #[serde(rename = "@width")]
    pub width: Option<String>,
    #[serde(rename = "@height")]
    pub height: Option<String>,
    #[serde(rename = "@frameRate")]
    pub frame_rate: Option<String>,
    #[serde(rename = "Label", default)]
    pub label: Vec<Label>,
    #[serde(rename = "BaseURL", default)]
    pub baseurl: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Label {
    #[serde(rename = "@kind")]
    pub kind: Option<String>,
    #[serde(rename = "$text", default)]
    pub value: String,
}

impl AdaptationSet {
    fn is_video(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|x| x.contains("video/mp4"))
    }
}

/// Numeric attribute value, anything that is not a plain integer counts as absent.
fn integer(value: &Option<String>) -> Option<u64> {
    value.as_deref()?.trim().parse().ok()
}

impl Representation {
    fn label(&self, kind: &str) -> Option<&str> {
        self.label
            .iter()
            .find(|x| x.kind.as_deref() == Some(kind))
            .map(|x| x.value.trim())
    }

    fn rendition(&self) -> Rendition {
        let id = self.id.clone().unwrap_or_default();

        Rendition {
            label: self
                .label("qualityId")
                .filter(|x| !x.is_empty())
                .map(|x| x.to_owned())
                .unwrap_or_else(|| id.clone()),
            id,
            bitrate_bps: integer(&self.bandwidth),
            width_px: integer(&self.width),
            height_px: integer(&self.height),
            frame_rate: self.frame_rate.clone(),
            source_locator: self.baseurl.first().map(|x| x.trim().to_owned()),
        }
    }

    fn resolution(&self) -> Option<String> {
        self.label("resolution")
            .filter(|x| !x.is_empty())
            .map(|x| x.to_owned())
            .or_else(|| integer(&self.height).map(|x| x.to_string()))
    }
}

impl MPD {
    fn video_sets(&self) -> impl Iterator<Item = &AdaptationSet> {
        self.period
            .iter()
            .flat_map(|x| x.adaptation_set.iter())
            .filter(|x| x.is_video())
    }

    /// One rendition per representation of the first video/mp4 adaptation set.
    pub fn renditions(&self) -> Result<Vec<Rendition>> {
        let set = self
            .video_sets()
            .next()
            .ok_or_else(|| Error::upstream("no video adaptation set"))?;

        Ok(set
            .representation
            .iter()
            .map(|x| x.rendition())
            .collect())
    }

    /// Base url of the representation whose resolution equals the first run of
    /// digits found in `quality`.
    pub fn locator_for_quality(&self, quality: &str) -> Result<String> {
        let desired = leading_digits(quality).ok_or_else(|| {
            Error::invalid_input(format!("no resolution digits found in quality {:?}", quality))
        })?;

        self.video_sets()
            .flat_map(|x| x.representation.iter())
            .find(|x| x.resolution().as_deref() == Some(desired) && !x.baseurl.is_empty())
            .map(|x| x.baseurl[0].trim().to_owned())
            .ok_or_else(|| {
                Error::NotFound(format!("no representation with resolution {}", desired))
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT1H2M3S">
  <Period>
    <AdaptationSet mimeType="audio/mp4" lang="ko">
      <Representation id="audio" bandwidth="192000">
        <BaseURL>https://cdn.example/audio.m4a</BaseURL>
      </Representation>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4" segmentAlignment="true">
      <Representation id="rep-480" bandwidth="1200000" width="854" height="480" frameRate="30">
        <Label kind="qualityId">480p</Label>
        <Label kind="resolution">480</Label>
        <BaseURL>https://cdn.example/480.mp4</BaseURL>
      </Representation>
      <Representation id="rep-720" bandwidth="2500000" width="1280" height="720" frameRate="60">
        <Label kind="qualityId">720p60</Label>
        <BaseURL>https://cdn.example/720.mp4</BaseURL>
        <BaseURL>https://backup.example/720.mp4</BaseURL>
      </Representation>
      <Representation id="rep-1080" bandwidth="8000000" width="1920" height="1080" frameRate="60">
        <Label kind="resolution">1080</Label>
        <BaseURL>https://cdn.example/1080.mp4</BaseURL>
      </Representation>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="ignored" height="2160">
        <BaseURL>https://cdn.example/2160.mp4</BaseURL>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[test]
    fn renditions_from_first_video_set() {
        let renditions = parse(SAMPLE).unwrap().renditions().unwrap();

        assert_eq!(renditions.len(), 3);
        assert_eq!(renditions[0].id, "rep-480");
        assert_eq!(renditions[0].label, "480p");
        assert_eq!(renditions[0].height_px, Some(480));
        assert_eq!(renditions[0].bitrate_bps, Some(1_200_000));
        assert_eq!(renditions[1].label, "720p60");
        assert_eq!(
            renditions[1].locator(),
            Some("https://cdn.example/720.mp4")
        );
        // no qualityId label, falls back to the representation id
        assert_eq!(renditions[2].label, "rep-1080");
    }

    #[test]
    fn missing_base_url_is_unusable() {
        let xml = r#"<MPD><Period><AdaptationSet mimeType="video/mp4">
            <Representation id="x" height="720"/>
        </AdaptationSet></Period></MPD>"#;
        let renditions = parse(xml).unwrap().renditions().unwrap();

        assert_eq!(renditions.len(), 1);
        assert_eq!(renditions[0].locator(), None);
    }

    #[test]
    fn malformed_numbers_are_dropped() {
        let xml = r#"<MPD><Period>
            <AdaptationSet mimeType="audio/mp4">
                <Representation id="a" bandwidth="N/A"/>
            </AdaptationSet>
            <AdaptationSet mimeType="video/mp4">
                <Representation id="r1" bandwidth="" width="wide" height="1080">
                    <BaseURL>https://cdn.example/1080.mp4</BaseURL>
                </Representation>
            </AdaptationSet>
        </Period></MPD>"#;
        let mpd = parse(xml).unwrap();
        let renditions = mpd.renditions().unwrap();

        assert_eq!(renditions[0].bitrate_bps, None);
        assert_eq!(renditions[0].width_px, None);
        assert_eq!(renditions[0].height_px, Some(1080));
        assert_eq!(
            mpd.locator_for_quality("1080p").unwrap(),
            "https://cdn.example/1080.mp4"
        );
    }

    #[test]
    fn no_video_set() {
        let xml = r#"<MPD><Period><AdaptationSet mimeType="audio/mp4">
            <Representation id="a"/>
        </AdaptationSet></Period></MPD>"#;

        assert!(matches!(
            parse(xml).unwrap().renditions(),
            Err(Error::Upstream(_))
        ));
    }

    #[test]
    fn locator_by_quality() {
        let mpd = parse(SAMPLE).unwrap();

        assert_eq!(
            mpd.locator_for_quality("1080p").unwrap(),
            "https://cdn.example/1080.mp4"
        );
        // height fallback when no resolution label exists
        assert_eq!(
            mpd.locator_for_quality("720p60").unwrap(),
            "https://cdn.example/720.mp4"
        );
        assert_eq!(
            mpd.locator_for_quality("2160").unwrap(),
            "https://cdn.example/2160.mp4"
        );
        assert!(matches!(
            mpd.locator_for_quality("best"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            mpd.locator_for_quality("360p"),
            Err(Error::NotFound(_))
        ));
    }
}
