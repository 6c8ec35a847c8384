use crate::{
    api,
    config::Config,
    cookie::cookie_parser,
    deps::Tools,
    downloader::{self, ConflictChooser, OnExists, Outcome},
    playlist::{self, ContentDescriptor, ProtocolMode, Rendition},
    prompt::Prompts,
    selector::{DownloadRequest, SpeedTier, TimeRange},
    utils,
};
use anyhow::{Result, anyhow, bail};
use clap::Args;
use kdam::term::Colorizer;
use log::info;
use std::{collections::BTreeMap, path::PathBuf};

type CookieMap = BTreeMap<String, String>;

/// Download a vod.
#[derive(Debug, Clone, Args)]
pub struct Save {
    /// https://chzzk.naver.com/video/<number>
    /// Asked interactively when missing.
    pub input: Option<String>,

    /// Directory where the vod is saved.
    /// By default download folder from settings.json is used.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Output file name, `.mp4` is appended when missing.
    /// By default `[date] channel title.mp4` is used.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Raw style input prompts for old and unsupported terminals.
    #[arg(long)]
    pub raw_prompts: bool,

    /// Rendition to download by id, label or height (eg. 1080p, 720).
    /// By default the rendition with greatest height is selected.
    #[arg(short, long, help_heading = "Automation Options")]
    pub quality: Option<String>,

    /// Download only a section of the vod (eg. 00:10:30~01:20:45).
    /// Rewind vods are always downloaded whole.
    #[arg(long, help_heading = "Automation Options", value_parser = section_parser)]
    pub section: Option<TimeRange>,

    /// Skip user input prompts and proceed with defaults.
    #[arg(long, help_heading = "Automation Options")]
    pub skip_prompts: bool,

    /// What to do when the output file already exists.
    /// Asked interactively when not given.
    #[arg(long, help_heading = "Automation Options")]
    pub on_exists: Option<OnExists>,

    /// Extra cookies for this run only.
    /// Cookies value can be same as document.cookie or in json format.
    #[arg(long, help_heading = "Client Options", default_value = "{}", hide_default_value = true, value_parser = cookie_parser)]
    pub cookies: CookieMap,

    /// aria2c download speed as a share of 16 connections.
    #[arg(long, help_heading = "Download Options")]
    pub speed: Option<SpeedTier>,

    /// Continue a partial download instead of starting over, aria2c downloads only.
    #[arg(long, help_heading = "Download Options")]
    pub resume: bool,
}

impl Save {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let prompts = Prompts {
            skip: self.skip_prompts,
            raw: self.raw_prompts,
        };
        let settings = config.load_user_settings()?;
        let client = super::client(config, &self.cookies)?;

        let source_url = match &self.input {
            Some(x) => x.trim().to_owned(),
            None if prompts.skip => bail!("vod url is required when prompts are skipped."),
            None => prompts.input("Vod url", &settings.last_vod_url)?,
        };

        if source_url.is_empty() {
            bail!("vod url is required.");
        }

        let (descriptor, renditions) = api::resolve(&client, &source_url)
            .await
            .map_err(super::authorization_hint)?;
        describe(&descriptor);

        let rendition = self.rendition(&prompts, &renditions, &settings.last_quality_name)?;
        println!("   {} {}", "Selected".colorize("bold green"), rendition);

        let filename = match &self.output {
            Some(x) => utils::output_filename(x),
            None => utils::output_filename(
                &prompts.input("File name", &descriptor.default_filename())?,
            ),
        };
        let directory = self
            .directory
            .clone()
            .unwrap_or_else(|| config.download_folder(&settings));

        let manifest = descriptor.protocol_mode == ProtocolMode::Manifest;
        let time_range = match self.section {
            Some(x) => Some(x),
            None if manifest && !prompts.skip && prompts.confirm("Download only a section?", false)? => {
                Some(
                    prompts
                        .input("Section (HH:MM:SS~HH:MM:SS)", "00:00:00~00:10:00")?
                        .parse::<TimeRange>()?,
                )
            }
            None => None,
        };

        let speed = match self.speed {
            Some(x) => x,
            None if manifest && time_range.is_none() && !descriptor.forces_full_speed() => {
                let tiers = [
                    SpeedTier::Full,
                    SpeedTier::ThreeQuarters,
                    SpeedTier::Half,
                    SpeedTier::Quarter,
                    SpeedTier::Unsplit,
                ];
                tiers[prompts.select("Download speed", &tiers, 0)?]
            }
            None => SpeedTier::Full,
        };

        let request = DownloadRequest {
            source_url: source_url.clone(),
            rendition_id: rendition.id.clone(),
            directory,
            filename,
            time_range,
            speed,
            resume: self.resume,
        };

        let chooser: &dyn ConflictChooser = match &self.on_exists {
            Some(x) => x,
            None => &prompts,
        };
        let tools = Tools::locate(&config.deps_dir());

        let outcome = downloader::download(
            &client,
            &tools,
            &descriptor,
            &renditions,
            &request,
            chooser,
        )
        .await?;

        if let Outcome::Saved(_) = outcome {
            let title = format!("[{}] {}", descriptor.channel_name, descriptor.title);
            let quality = rendition.label.clone();
            config.update_user_settings(|x| {
                x.add_recent_vod(&source_url, &title);
                x.last_quality_name = quality;
            })?;
        }

        Ok(())
    }

    fn rendition<'a>(
        &self,
        prompts: &Prompts,
        renditions: &'a [Rendition],
        last_quality: &str,
    ) -> Result<&'a Rendition> {
        if renditions.is_empty() {
            bail!("vod has no renditions to download.");
        }

        if let Some(quality) = &self.quality {
            return playlist::find_rendition(renditions, quality).ok_or_else(|| {
                anyhow!(
                    "no rendition matches {}, available: {}",
                    quality,
                    renditions
                        .iter()
                        .map(|x| x.label.colorize("green"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            });
        }

        let best = playlist::best_rendition(renditions).map(|x| x.id.as_str());
        let preferred = Some(last_quality)
            .filter(|x| !x.is_empty())
            .and_then(|x| renditions.iter().find(|y| y.label == x))
            .map(|x| x.id.as_str())
            .or(best);
        let default = renditions
            .iter()
            .position(|x| Some(x.id.as_str()) == preferred)
            .unwrap_or(0);

        Ok(&renditions[prompts.select("Select quality", renditions, default)?])
    }
}

fn describe(descriptor: &ContentDescriptor) {
    println!("   {} {}", "Title".colorize("bold cyan"), descriptor.title);
    println!("   {} {}", "Channel".colorize("bold cyan"), descriptor.channel_name);

    if let Some(date) = &descriptor.live_open_date {
        println!("   {} {}", "Live".colorize("bold cyan"), date);
    }

    info!(
        "Vod is served as {}",
        match descriptor.protocol_mode {
            ProtocolMode::Segmented => "a rewind playlist",
            ProtocolMode::Manifest => "a dash manifest",
        }
    );
}

fn section_parser(s: &str) -> Result<TimeRange, String> {
    s.parse::<TimeRange>().map_err(|e| e.to_string())
}
