use crate::{config::Config, cookie::cookie_parser};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use kdam::term::Colorizer;
use std::collections::BTreeMap;

/// Store or clear naver login cookies used for age restricted vods.
#[derive(Debug, Clone, Args)]
pub struct Cookies {
    #[command(subcommand)]
    pub action: CookiesAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CookiesAction {
    /// Store the NID_AUT and NID_SES cookies of a logged in naver session.
    Set {
        #[arg(long)]
        nid_aut: String,
        #[arg(long)]
        nid_ses: String,
    },
    /// Store cookies exported from a browser.
    /// Value can be same as document.cookie, json text or a json file path.
    Import {
        #[arg(value_parser = cookie_parser)]
        cookies: BTreeMap<String, String>,
    },
    /// Delete every stored cookie.
    Clear,
    /// List stored cookie names.
    Show,
}

impl Cookies {
    pub fn execute(self, config: &Config) -> Result<()> {
        match self.action {
            CookiesAction::Set { nid_aut, nid_ses } => {
                if nid_aut.trim().is_empty() || nid_ses.trim().is_empty() {
                    bail!("both NID_AUT and NID_SES values are required.");
                }

                config.set_adult_cookies(&nid_aut, &nid_ses)?;
                println!(
                    "   {} {}",
                    "Saved".colorize("bold green"),
                    config.cookie_file().to_string_lossy()
                );
            }
            CookiesAction::Import { cookies } => {
                let mut stored = config.load_cookies();
                let adult = cookies.contains_key("NID_AUT") && cookies.contains_key("NID_SES");
                stored.extend(cookies);
                config.save_cookies(&stored)?;

                if adult {
                    config.update_user_settings(|x| x.is_adult_content = true)?;
                }

                println!(
                    "   {} {} cookies to {}",
                    "Saved".colorize("bold green"),
                    stored.len(),
                    config.cookie_file().to_string_lossy()
                );
            }
            CookiesAction::Clear => {
                config.clear_cookies()?;
                println!("   {} stored cookies", "Cleared".colorize("bold green"));
            }
            CookiesAction::Show => {
                let cookies = config.load_cookies();

                if cookies.is_empty() {
                    println!("No cookies are stored.");
                }

                for (name, value) in cookies {
                    println!("{} = {}", name.colorize("cyan"), mask(&value));
                }
            }
        }

        Ok(())
    }
}

/// Keep the first four characters of a secret.
fn mask(value: &str) -> String {
    let shown = value.chars().take(4).collect::<String>();

    if value.chars().count() > 4 {
        format!("{}...", shown)
    } else {
        shown
    }
}
