use crate::{
    api,
    config::Config,
    error::Error,
    playlist::{self, ContentDescriptor, Rendition},
};
use anyhow::Result;
use clap::Args;
use kdam::term::Colorizer;
use serde::Serialize;

/// Show metadata and renditions of a vod.
#[derive(Debug, Clone, Args)]
pub struct Info {
    /// https://chzzk.naver.com/video/<number>
    #[arg(required = true)]
    pub input: String,

    /// Print the metadata in json format.
    #[arg(long)]
    pub json: bool,

    /// Print only the media url of a rendition (eg. 1080p).
    /// Rewind vods print their playlist url, whatever the quality.
    #[arg(long, value_name = "QUALITY")]
    pub locator: Option<String>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    #[serde(flatten)]
    descriptor: &'a ContentDescriptor,
    renditions: &'a [Rendition],
}

impl Info {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let client = super::client(config, &Default::default())?;

        if let Some(quality) = &self.locator {
            let locator = match api::resolve_manifest_locator(&client, &self.input, quality).await {
                // rewind vods have no manifest to pick from
                Err(Error::InvalidInput(_))
                    if api::video_no(&self.input).is_ok()
                        && playlist::leading_digits(quality).is_some() =>
                {
                    api::resolve_segmented_playback_locator(&client, &self.input).await
                }
                x => x,
            }
            .map_err(super::authorization_hint)?;

            println!("{}", locator);
            return Ok(());
        }

        let (descriptor, renditions) = api::resolve(&client, &self.input)
            .await
            .map_err(super::authorization_hint)?;

        if self.json {
            serde_json::to_writer_pretty(
                std::io::stdout(),
                &Metadata {
                    descriptor: &descriptor,
                    renditions: &renditions,
                },
            )?;
            println!();
            return Ok(());
        }

        println!("{} {}", "Title:".colorize("bold cyan"), descriptor.title);
        println!("{} {}", "Channel:".colorize("bold cyan"), descriptor.channel_name);
        println!(
            "{} {}",
            "Live:".colorize("bold cyan"),
            descriptor.live_open_date.as_deref().unwrap_or("unknown")
        );
        println!(
            "{} {}",
            "Status:".colorize("bold cyan"),
            descriptor.vod_status.as_deref().unwrap_or("unknown")
        );
        println!("{} {:?}", "Mode:".colorize("bold cyan"), descriptor.protocol_mode);
        println!("{} {}", "File:".colorize("bold cyan"), descriptor.default_filename());
        println!("{}", "Renditions:".colorize("bold cyan"));

        let best = playlist::best_rendition(&renditions).map(|x| x.id.as_str());

        for (i, rendition) in renditions.iter().enumerate() {
            println!(
                "{:2}) {}{}",
                i + 1,
                rendition,
                if Some(rendition.id.as_str()) == best {
                    " (best)".colorize("green")
                } else {
                    String::new()
                }
            );
        }

        Ok(())
    }
}
