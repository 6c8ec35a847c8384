mod cookies;
mod deps;
mod info;
mod recent;
mod save;

pub use cookies::Cookies;
pub use deps::Deps;
pub use info::Info;
pub use recent::Recent;
pub use save::Save;

use crate::{
    api::{Client, RequestHeaders},
    config::Config,
};
use clap::{ArgAction, ColorChoice, Parser, Subcommand};
use std::{collections::BTreeMap, path::PathBuf};

/// Download CHZZK video-on-demand streams using streamlink, aria2c and ffmpeg.
#[derive(Debug, Clone, Parser)]
#[command(version, author = "clitic <clitic21@gmail.com>", about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding settings.json and the dependent folder with bundled tools.
    /// By default directory of the executable is used.
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Only print errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print debug logs, repeat for trace logs.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Cookies(Cookies),
    Deps(Deps),
    Info(Info),
    Recent(Recent),
    Save(Save),
}

impl Args {
    pub async fn execute(self) -> anyhow::Result<()> {
        let config = Config::new(self.base_dir);

        match self.command {
            Commands::Cookies(args) => args.execute(&config)?,
            Commands::Deps(args) => args.execute(&config)?,
            Commands::Info(args) => args.execute(&config).await?,
            Commands::Recent(args) => args.execute(&config)?,
            Commands::Save(args) => args.execute(&config).await?,
        }

        Ok(())
    }
}

/// Api client carrying the stored cookies, overridden by `extra` ones.
fn client(config: &Config, extra: &BTreeMap<String, String>) -> crate::error::Result<Client> {
    let mut cookies = config.load_cookies();
    cookies.extend(extra.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
    Client::new(RequestHeaders::new(&cookies))
}

fn authorization_hint(e: crate::error::Error) -> anyhow::Error {
    if e.is_authorization() {
        anyhow::anyhow!(
            "{}\nthis vod needs a logged in naver account, store its cookies with `chzzk-vod cookies set`",
            e
        )
    } else {
        e.into()
    }
}
