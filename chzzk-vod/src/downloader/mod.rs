mod aria2c;
mod duplicate;
mod ffmpeg;
mod hls;
mod parse;
mod process;
mod progress;

pub use aria2c::Manifest;
pub use duplicate::{Conflict, ConflictChooser, OnExists, resolve_conflict};
pub use ffmpeg::Section;
pub use hls::Segmented;
pub use process::LineReader;
pub use progress::Progress;

use crate::{
    api::Client,
    deps::{Tool, Tools},
    error::{Error, Result},
    playlist::{ContentDescriptor, Rendition},
    selector::{self, DownloadRequest, PipelineKind, SpeedTier},
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Saved(PathBuf),
    /// The output already existed and was kept.
    Skipped(PathBuf),
}

/// Download `request` with the pipeline its content state calls for.
///
/// Fails before anything is spawned or deleted when the request is invalid.
/// Partial output of a failed run is left in place.
pub async fn download(
    client: &Client,
    tools: &Tools,
    descriptor: &ContentDescriptor,
    renditions: &[Rendition],
    request: &DownloadRequest,
    chooser: &dyn ConflictChooser,
) -> Result<Outcome> {
    let kind = selector::select_pipeline(descriptor, renditions, request)?;

    let range = match (kind, request.time_range) {
        (PipelineKind::ManifestRange, Some(range)) => {
            range.duration()?;
            Some(range)
        }
        _ => None,
    };
    let playlist = match kind {
        PipelineKind::SegmentedFull => Some(descriptor.segmented_playback_locator()?),
        _ => None,
    };

    let (first, second) = match kind {
        PipelineKind::SegmentedFull => (Tool::Streamlink, Some(Tool::Ffmpeg)),
        PipelineKind::ManifestFull => (Tool::Aria2c, None),
        PipelineKind::ManifestRange => (Tool::Ffmpeg, None),
    };
    tools.require(first)?;

    if let Some(second) = second {
        tools.require(second)?;
    }

    std::fs::create_dir_all(&request.directory).map_err(|e| Error::fs(&request.directory, e))?;
    let output = request.output();

    let resume = match resolve_conflict(&output, chooser)? {
        Conflict::Skip => {
            info!("Skipped {}, the file already exists", output.to_string_lossy());
            return Ok(Outcome::Skipped(output));
        }
        Conflict::Proceed { resume } => resume || request.resume,
    };

    if resume && kind != PipelineKind::ManifestFull {
        warn!("only aria2c downloads can be resumed, {} is downloaded again", output.to_string_lossy());
    }

    match kind {
        PipelineKind::SegmentedFull => {
            let Some(playlist) = playlist else {
                return Err(Error::upstream("rewind vod has no playlist path"));
            };

            Segmented {
                streamlink: tools.require(Tool::Streamlink)?,
                ffmpeg: tools.require(Tool::Ffmpeg)?,
                playlist: &playlist,
                rendition_id: &request.rendition_id,
                output: output.clone(),
            }
            .run()
            .await?;
        }
        PipelineKind::ManifestFull => {
            let url = locator(renditions, request)?;
            let speed = if descriptor.forces_full_speed() && request.speed != SpeedTier::Full {
                info!(
                    "Vod status is {}, using {}",
                    descriptor.vod_status.as_deref().unwrap_or("NONE"),
                    SpeedTier::Full
                );
                SpeedTier::Full
            } else {
                request.speed
            };

            let total = match client.probe_size(url).await {
                Ok(x) => x,
                Err(e) => {
                    warn!("could not probe the file size ({})", e);
                    None
                }
            };

            Manifest {
                aria2c: tools.require(Tool::Aria2c)?,
                url,
                headers: &client.headers,
                output: output.clone(),
                speed,
                resume,
            }
            .run(total)
            .await?;
        }
        PipelineKind::ManifestRange => {
            let Some(range) = range else {
                return Err(Error::invalid_input("no section was given"));
            };

            Section {
                ffmpeg: tools.require(Tool::Ffmpeg)?,
                url: locator(renditions, request)?,
                range,
                output: output.clone(),
            }
            .run()
            .await?;
        }
    }

    Ok(Outcome::Saved(output))
}

fn locator<'a>(renditions: &'a [Rendition], request: &DownloadRequest) -> Result<&'a str> {
    renditions
        .iter()
        .find(|x| x.id == request.rendition_id)
        .and_then(|x| x.locator())
        .ok_or_else(|| {
            Error::invalid_input(format!("rendition {} has no media url", request.rendition_id))
        })
}
