use crate::{
    config::Config,
    deps::{Tool, Tools},
};
use anyhow::Result;
use clap::Args;
use kdam::term::Colorizer;
use log::warn;

/// Show where the external tools are expected and which ones are missing.
#[derive(Debug, Clone, Args)]
pub struct Deps {}

impl Deps {
    pub fn execute(self, config: &Config) -> Result<()> {
        let tools = Tools::locate(&config.deps_dir());
        let missing = tools.missing();

        for tool in Tool::ALL {
            println!(
                "{:>12} {} {}",
                tool.name(),
                if missing.contains(&tool) {
                    "missing".colorize("bold red")
                } else {
                    "found".colorize("bold green")
                },
                tools.path(tool).to_string_lossy()
            );
        }

        if !missing.is_empty() {
            warn!("place the missing tools at the paths above, PATH is not searched");
        }

        Ok(())
    }
}
