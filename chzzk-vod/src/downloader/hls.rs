use super::{
    parse,
    process::{self, command},
    progress::Progress,
};
use crate::error::{Error, Result};
use log::{debug, info};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{io::AsyncWriteExt, sync::watch};

/// Rewind vod download, `streamlink <playlist> <rendition> --stdout | ffmpeg -i pipe:0 ...`.
pub struct Segmented<'a> {
    pub streamlink: &'a Path,
    pub ffmpeg: &'a Path,
    pub playlist: &'a str,
    pub rendition_id: &'a str,
    pub output: PathBuf,
}

impl Segmented<'_> {
    fn streamlink_args(&self) -> Vec<String> {
        vec![
            self.playlist.to_owned(),
            self.rendition_id.to_owned(),
            "--stdout".to_owned(),
        ]
    }

    fn ffmpeg_args(&self) -> Vec<String> {
        [
            "-i", "pipe:0", "-c", "copy", "-y", "-stats", "-progress", "pipe:2", "-loglevel",
            "info",
        ]
        .iter()
        .map(|x| x.to_string())
        .chain([self.output.to_string_lossy().into_owned()])
        .collect()
    }

    pub async fn run(self) -> Result<()> {
        info!("Downloading rewind vod using streamlink and ffmpeg");

        let mut fetcher = process::spawn(
            "streamlink",
            &mut command(
                self.streamlink,
                &self.streamlink_args(),
                Stdio::null(),
                Stdio::piped(),
            ),
        )?;

        let mut muxer = match process::spawn(
            "ffmpeg",
            &mut command(self.ffmpeg, &self.ffmpeg_args(), Stdio::piped(), Stdio::null()),
        ) {
            Ok(x) => x,
            Err(e) => {
                debug!("killing streamlink, ffmpeg could not be started");
                fetcher.start_kill().ok();
                fetcher.wait().await.ok();
                return Err(e);
            }
        };

        let (Some(mut fetched), Some(fetcher_stderr)) = (fetcher.stdout.take(), fetcher.stderr.take())
        else {
            return Err(Error::tool("streamlink", "output streams were not captured"));
        };
        let (Some(mut muxer_stdin), Some(muxer_stderr)) = (muxer.stdin.take(), muxer.stderr.take())
        else {
            return Err(Error::tool("ffmpeg", "input or error stream was not captured"));
        };

        let progress = Progress::new(None, None);
        progress.render();

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = vec![];

        tasks.push(tokio::spawn(async move {
            match tokio::io::copy(&mut fetched, &mut muxer_stdin).await {
                Ok(bytes) => debug!("piped {} bytes from streamlink into ffmpeg", bytes),
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("ffmpeg closed its input early")
                }
                Err(e) => debug!("piping streamlink into ffmpeg failed: {}", e),
            }

            muxer_stdin.shutdown().await.ok();
        }));

        let state = progress.clone();
        tasks.push(process::scan("ffmpeg", muxer_stderr, move |line| {
            let parsed = parse::ffmpeg(line);

            if let Some(duration) = parsed.duration {
                state.set_media_total_once(duration);
            }

            if let Some(out_time) = parsed.out_time {
                state.set_media_time(out_time);
            }

            if let Some(size) = parsed.size {
                state.set_transferred(size);
            }

            if parsed.notice {
                state.notice("ffmpeg", line);
            } else if parsed.has_progress() {
                state.report(parsed.bitrate, None);
                state.render_throttled();
            }
        }));

        let state = progress.clone();
        tasks.push(process::scan("streamlink", fetcher_stderr, move |line| {
            if parse::streamlink(line) {
                state.notice("streamlink", line);
            }
        }));

        tasks.push(process::sample_output(
            self.output.clone(),
            progress.clone(),
            stop_rx,
            None,
            false,
        ));

        let muxed = process::wait("ffmpeg", &mut muxer).await;
        let fetched = process::wait("streamlink", &mut fetcher).await;

        stop_tx.send(true).ok();
        process::join_all(tasks).await;
        progress.finish();

        fetched?;
        muxed?;
        info!("Saved {}", self.output.to_string_lossy());
        Ok(())
    }
}
