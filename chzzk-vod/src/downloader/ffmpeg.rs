use super::{
    parse,
    process::{self, command},
    progress::Progress,
};
use crate::{
    error::{Error, Result},
    selector::TimeRange,
    utils,
};
use log::info;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

/// Time bounded extraction of a manifest representation.
pub struct Section<'a> {
    pub ffmpeg: &'a Path,
    pub url: &'a str,
    pub range: TimeRange,
    pub output: PathBuf,
}

impl Section<'_> {
    pub(super) fn args(&self) -> Result<Vec<String>> {
        let duration = self.range.duration()?;

        Ok(vec![
            "-hide_banner".to_owned(),
            "-ss".to_owned(),
            utils::seconds_to_hms(self.range.start),
            "-i".to_owned(),
            self.url.to_owned(),
            "-t".to_owned(),
            duration.to_string(),
            "-c".to_owned(),
            "copy".to_owned(),
            "-y".to_owned(),
            self.output.to_string_lossy().into_owned(),
            "-progress".to_owned(),
            "pipe:1".to_owned(),
            "-nostats".to_owned(),
        ])
    }

    pub async fn run(self) -> Result<()> {
        // validated before anything is spawned
        let args = self.args()?;
        let duration = self.range.duration()?;
        info!("Downloading section {} using ffmpeg", self.range);

        let mut child = process::spawn(
            "ffmpeg",
            &mut command(self.ffmpeg, &args, Stdio::null(), Stdio::piped()),
        )?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(Error::tool("ffmpeg", "output streams were not captured"));
        };

        let progress = Progress::new(None, Some(duration));
        progress.set_media_time(0);
        progress.render();

        let state = progress.clone();
        let stdout = process::scan("ffmpeg", stdout, move |line| {
            let parsed = parse::ffmpeg(line);

            if let Some(out_time) = parsed.out_time {
                state.set_media_time(out_time);
            }

            if let Some(size) = parsed.size {
                state.set_transferred(size);
            }

            if parsed.end {
                state.set_media_time(duration);
            }

            if parsed.has_progress() || parsed.end {
                state.render_throttled();
            }
        });

        let state = progress.clone();
        let stderr = process::scan("ffmpeg", stderr, move |line| {
            if !line.contains("frame=") && !line.contains("size=") {
                state.notice("ffmpeg", line);
            }
        });

        let status = process::wait("ffmpeg", &mut child).await;
        process::join_all(vec![stdout, stderr]).await;
        progress.finish();

        status?;
        info!("Saved {}", self.output.to_string_lossy());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_arguments() {
        let section = Section {
            ffmpeg: Path::new("ffmpeg"),
            url: "https://cdn.example/1080.mp4",
            range: "00:10:30~01:20:45".parse().unwrap(),
            output: PathBuf::from("out.mp4"),
        };

        assert_eq!(
            section.args().unwrap().join(" "),
            "-hide_banner -ss 00:10:30 -i https://cdn.example/1080.mp4 -t 4215 -c copy -y out.mp4 -progress pipe:1 -nostats"
        );
    }

    #[test]
    fn backwards_section() {
        let section = Section {
            ffmpeg: Path::new("ffmpeg"),
            url: "u",
            range: "00:10:00~00:10:00".parse().unwrap(),
            output: PathBuf::from("out.mp4"),
        };

        assert!(matches!(section.args(), Err(Error::InvalidInput(_))));
    }
}
