use super::{
    parse,
    process::{self, command},
    progress::Progress,
};
use crate::{
    api::RequestHeaders,
    error::{Error, Result},
    selector::SpeedTier,
    utils,
};
use log::{info, warn};
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::sync::watch;

/// Multi connection download of a manifest representation.
pub struct Manifest<'a> {
    pub aria2c: &'a Path,
    pub url: &'a str,
    pub headers: &'a RequestHeaders,
    pub output: PathBuf,
    pub speed: SpeedTier,
    pub resume: bool,
}

impl Manifest<'_> {
    pub(super) fn args(&self) -> Result<Vec<String>> {
        let connections = self.speed.connections().to_string();
        let directory = match self.output.parent() {
            Some(x) if !x.as_os_str().is_empty() => x.to_string_lossy().into_owned(),
            _ => ".".to_owned(),
        };
        let filename = self
            .output
            .file_name()
            .ok_or_else(|| Error::invalid_input("output path has no file name"))?
            .to_string_lossy()
            .into_owned();

        let mut args = vec![
            "-x".to_owned(),
            connections.clone(),
            "-s".to_owned(),
            connections,
            "--min-split-size=1M".to_owned(),
            "--file-allocation=none".to_owned(),
            "--console-log-level=warn".to_owned(),
            "--summary-interval=1".to_owned(),
            "-d".to_owned(),
            directory,
            "-o".to_owned(),
            filename,
        ];

        if let Some(cookie) = &self.headers.cookie {
            args.extend(["--header".to_owned(), format!("Cookie: {}", cookie)]);
        }

        args.extend([
            "--header".to_owned(),
            format!("User-Agent: {}", self.headers.user_agent),
            "--header".to_owned(),
            format!("Referer: {}", self.headers.referer),
        ]);

        if self.resume {
            args.push("--continue=true".to_owned());
        }

        args.push(self.url.to_owned());
        Ok(args)
    }

    /// `total` is the probed content length, `None` turns the percentage off.
    pub async fn run(self, total: Option<u64>) -> Result<()> {
        info!("Downloading vod using aria2c with {}", self.speed);

        match total {
            Some(total) => info!("File size is {}", utils::format_bytes(total)),
            None => warn!("File size is unknown, progress is shown without percentage"),
        }

        let mut child = process::spawn(
            "aria2c",
            &mut command(self.aria2c, &self.args()?, Stdio::null(), Stdio::piped()),
        )?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(Error::tool("aria2c", "output streams were not captured"));
        };

        let progress = Progress::new(total, None);
        progress.render();

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = vec![];

        let state = progress.clone();
        tasks.push(process::scan("aria2c", stdout, move |line| {
            readout(&state, line);
        }));

        let state = progress.clone();
        tasks.push(process::scan("aria2c", stderr, move |line| {
            if !readout(&state, line) && parse::is_notice(line) {
                state.notice("aria2c", line);
            }
        }));

        tasks.push(process::sample_output(
            self.output.clone(),
            progress.clone(),
            stop_rx,
            total,
            true,
        ));

        let status = process::wait("aria2c", &mut child).await;

        stop_tx.send(true).ok();
        process::join_all(tasks).await;
        progress.finish();

        status?;
        info!("Saved {}", self.output.to_string_lossy());
        Ok(())
    }
}

/// Feed an aria2c summary readout into the progress, returns whether `line` was one.
fn readout(progress: &Progress, line: &str) -> bool {
    let parsed = parse::aria2c(line);

    if !parsed.has_progress() {
        return false;
    }

    if let Some(percent) = parsed.percent {
        progress.set_percent(percent);
    }

    progress.report(parsed.rate, parsed.eta);
    progress.render_throttled();
    true
}
