use super::{Client, VOD_INFO_API, VOD_PLAYBACK_API, mpd, video_no};
use crate::{
    error::{Error, Result},
    playlist::{ContentDescriptor, ProtocolMode, Rendition},
};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

const MANIFEST_ACCEPT: &str = "application/dash+xml, application/xml, */*";

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    content: Option<VodInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VodInfo {
    #[serde(default)]
    video_title: String,
    video_id: Option<String>,
    in_key: Option<String>,
    live_open_date: Option<String>,
    vod_status: Option<String>,
    #[serde(default)]
    channel: Channel,
    live_rewind_playback_json: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Channel {
    #[serde(default)]
    channel_name: String,
}

/// The json document nested (as a string) inside the info response of rewind vods.
#[derive(Debug, Default, Deserialize)]
pub struct RewindPlayback {
    #[serde(default)]
    pub media: Vec<RewindMedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewindMedia {
    pub path: Option<String>,
    #[serde(default)]
    pub encoding_track: Vec<EncodingTrack>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingTrack {
    #[serde(default)]
    pub encoding_track_id: String,
    pub video_bit_rate: Option<Value>,
    pub video_width: Option<Value>,
    pub video_height: Option<Value>,
    pub video_frame_rate: Option<Value>,
}

/// Upstream is inconsistent about numbers, accept `1080`, `1080.0` and `"1080"`.
fn number(value: &Option<Value>) -> Option<u64> {
    match value.as_ref()? {
        Value::Number(x) => x.as_u64().or_else(|| x.as_f64().map(|y| y as u64)),
        Value::String(x) => x
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| x.trim().parse::<f64>().ok().map(|y| y as u64)),
        _ => None,
    }
}

fn text(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::Number(x) => Some(x.to_string()),
        Value::String(x) if !x.is_empty() => Some(x.to_owned()),
        _ => None,
    }
}

impl RewindPlayback {
    fn parse(descriptor: &ContentDescriptor) -> Result<Self> {
        let raw = descriptor
            .rewind_playback
            .as_deref()
            .filter(|x| !x.trim().is_empty())
            .ok_or_else(|| Error::upstream("missing rewind metadata"))?;
        Ok(serde_json::from_str(raw)?)
    }

    fn first_media(&self) -> Result<&RewindMedia> {
        self.media
            .first()
            .ok_or_else(|| Error::upstream("rewind metadata has no media entry"))
    }

    pub fn renditions(&self) -> Result<Vec<Rendition>> {
        Ok(self
            .first_media()?
            .encoding_track
            .iter()
            .map(|x| Rendition {
                id: x.encoding_track_id.clone(),
                label: x.encoding_track_id.clone(),
                bitrate_bps: number(&x.video_bit_rate),
                width_px: number(&x.video_width),
                height_px: number(&x.video_height),
                frame_rate: text(&x.video_frame_rate),
                source_locator: None,
            })
            .collect())
    }

    pub fn path(&self) -> Result<String> {
        self.first_media()?
            .path
            .clone()
            .filter(|x| !x.is_empty())
            .ok_or_else(|| Error::upstream("rewind metadata has no playback path"))
    }
}

/// Parse the info endpoint response into a content descriptor.
pub fn parse_info(video_no: &str, body: &str) -> Result<ContentDescriptor> {
    let envelope = serde_json::from_str::<Envelope>(body)?;

    if envelope.code != 200 {
        return Err(Error::upstream(format!(
            "vod info api responded with code {}: {}",
            envelope.code,
            envelope.message.as_deref().unwrap_or("no message")
        )));
    }

    let info = envelope
        .content
        .ok_or_else(|| Error::upstream("vod info api returned no content"))?;
    let playback_key = info.in_key.filter(|x| !x.is_empty());

    Ok(ContentDescriptor {
        video_no: video_no.to_owned(),
        video_id: info.video_id.filter(|x| !x.is_empty()),
        title: info.video_title.trim().to_owned(),
        channel_name: info.channel.channel_name.trim().to_owned(),
        live_open_date: info.live_open_date,
        vod_status: info.vod_status,
        protocol_mode: if playback_key.is_some() {
            ProtocolMode::Manifest
        } else {
            ProtocolMode::Segmented
        },
        playback_key,
        rewind_playback: info.live_rewind_playback_json,
    })
}

async fn fetch_descriptor(client: &Client, source_url: &str) -> Result<ContentDescriptor> {
    let video_no = video_no(source_url)?;
    let url = format!("{}{}", VOD_INFO_API, video_no);
    debug!("fetching vod info from {}", url);
    let body = client.get_text(&url, None).await?;
    parse_info(&video_no, &body)
}

async fn fetch_manifest(client: &Client, descriptor: &ContentDescriptor) -> Result<mpd::MPD> {
    let (Some(video_id), Some(key)) = (&descriptor.video_id, &descriptor.playback_key) else {
        return Err(Error::upstream("vod info has no video id or playback key"));
    };

    let url = format!("{}{}?key={}", VOD_PLAYBACK_API, video_id, key);
    debug!("fetching manifest from {}", url);
    let xml = client.get_text(&url, Some(MANIFEST_ACCEPT)).await?;
    mpd::parse(&xml)
}

/// Resolve content metadata and the list of available renditions.
pub async fn resolve(
    client: &Client,
    source_url: &str,
) -> Result<(ContentDescriptor, Vec<Rendition>)> {
    let descriptor = fetch_descriptor(client, source_url).await?;

    let renditions = match descriptor.protocol_mode {
        ProtocolMode::Segmented => RewindPlayback::parse(&descriptor)?.renditions()?,
        ProtocolMode::Manifest => fetch_manifest(client, &descriptor).await?.renditions()?,
    };

    debug!(
        "resolved {} renditions ({:?} mode)",
        renditions.len(),
        descriptor.protocol_mode
    );
    Ok((descriptor, renditions))
}

impl ContentDescriptor {
    /// Playlist path of a rewind (segmented) vod, read from already fetched metadata.
    pub fn segmented_playback_locator(&self) -> Result<String> {
        RewindPlayback::parse(self)?.path()
    }
}

pub async fn resolve_segmented_playback_locator(client: &Client, source_url: &str) -> Result<String> {
    fetch_descriptor(client, source_url)
        .await?
        .segmented_playback_locator()
}

/// Direct media url of the manifest representation matching `quality_label`.
pub async fn resolve_manifest_locator(
    client: &Client,
    source_url: &str,
    quality_label: &str,
) -> Result<String> {
    let descriptor = fetch_descriptor(client, source_url).await?;

    if descriptor.protocol_mode != ProtocolMode::Manifest {
        return Err(Error::invalid_input(
            "vod has no playback key, it is only available as a rewind playlist",
        ));
    }

    fetch_manifest(client, &descriptor)
        .await?
        .locator_for_quality(quality_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_body(in_key: &str, rewind: Option<&str>) -> String {
        let mut content = serde_json::json!({
            "videoNo": 42,
            "videoId": "ABCDEF",
            "videoTitle": "  title ",
            "inKey": in_key,
            "liveOpenDate": "2024-01-02 12:34:56",
            "vodStatus": "ABR_HLS",
            "channel": { "channelId": "c", "channelName": "channel" }
        });

        if let Some(rewind) = rewind {
            content["liveRewindPlaybackJson"] = Value::String(rewind.to_owned());
        }

        serde_json::json!({ "code": 200, "message": null, "content": content }).to_string()
    }

    const REWIND: &str = r#"{"meta":{"videoId":"x"},"media":[{"mediaId":"HLS","protocol":"HLS","path":"https://rewind.example/playlist.m3u8","encodingTrack":[
        {"encodingTrackId":"1080p","videoBitRate":8192000,"videoWidth":1920,"videoHeight":1080,"videoFrameRate":"60.0"},
        {"encodingTrackId":"720p","videoBitRate":"5192000","videoWidth":"1280","videoHeight":"720","videoFrameRate":60},
        {"encodingTrackId":"alow.stereo"}
    ]}]}"#;

    #[test]
    fn segmented_renditions() {
        let descriptor = parse_info("42", &info_body("", Some(REWIND))).unwrap();
        assert_eq!(descriptor.protocol_mode, ProtocolMode::Segmented);
        assert_eq!(descriptor.title, "title");
        assert_eq!(descriptor.channel_name, "channel");
        assert_eq!(descriptor.playback_key, None);

        let renditions = RewindPlayback::parse(&descriptor).unwrap().renditions().unwrap();
        assert_eq!(renditions.len(), 3);

        for rendition in &renditions {
            assert_eq!(rendition.id, rendition.label);
            assert_eq!(rendition.source_locator, None);
        }

        assert_eq!(renditions[0].height_px, Some(1080));
        assert_eq!(renditions[0].frame_rate.as_deref(), Some("60.0"));
        assert_eq!(renditions[1].bitrate_bps, Some(5_192_000));
        assert_eq!(renditions[1].height_px, Some(720));
        assert_eq!(renditions[2].height_px, None);

        assert_eq!(
            descriptor.segmented_playback_locator().unwrap(),
            "https://rewind.example/playlist.m3u8"
        );
    }

    #[test]
    fn missing_rewind_metadata() {
        let descriptor = parse_info("42", &info_body("", None)).unwrap();
        let err = RewindPlayback::parse(&descriptor).unwrap_err();
        assert!(matches!(err, Error::Upstream(ref x) if x == "missing rewind metadata"));
    }

    #[test]
    fn manifest_mode_from_playback_key() {
        let descriptor = parse_info("42", &info_body("KEY", None)).unwrap();
        assert_eq!(descriptor.protocol_mode, ProtocolMode::Manifest);
        assert_eq!(descriptor.playback_key.as_deref(), Some("KEY"));
        assert_eq!(descriptor.video_id.as_deref(), Some("ABCDEF"));
    }

    #[test]
    fn envelope_failure() {
        let body = r#"{"code":403,"message":"성인 인증이 필요합니다.","content":null}"#;
        let err = parse_info("42", body).unwrap_err();

        assert!(matches!(err, Error::Upstream(ref x) if x.contains("성인 인증")));
        assert!(err.is_authorization());
    }
}
