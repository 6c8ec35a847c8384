use crate::config::Config;
use anyhow::Result;
use clap::Args;
use kdam::term::Colorizer;

/// List recently downloaded vods.
#[derive(Debug, Clone, Args)]
pub struct Recent {
    /// Forget the list.
    #[arg(long)]
    pub clear: bool,
}

impl Recent {
    pub fn execute(self, config: &Config) -> Result<()> {
        if self.clear {
            config.update_user_settings(|x| {
                x.recent_vods.clear();
                x.last_vod_url.clear();
            })?;
            println!("   {} recent vods", "Cleared".colorize("bold green"));
            return Ok(());
        }

        let settings = config.load_user_settings()?;

        if settings.recent_vods.is_empty() {
            println!("No vods were downloaded yet.");
            return Ok(());
        }

        for (i, vod) in settings.recent_vods.iter().enumerate() {
            println!("{:2}) {}\n    {}", i + 1, vod.title, vod.url.colorize("cyan"));
        }

        Ok(())
    }
}
