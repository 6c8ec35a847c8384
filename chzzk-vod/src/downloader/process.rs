use super::progress::{Progress, SAMPLE_INTERVAL};
use crate::{
    error::{Error, Result},
    utils,
};
use kdam::term::Colorizer;
use log::{debug, info};
use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Instant,
};
use tokio::{
    fs,
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

/// Splits a byte stream into lines on both `\n` and `\r`.
///
/// ffmpeg and aria2c redraw their status with bare carriage returns, a plain
/// `lines()` reader would only see those updates once the tool exits.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: vec![] }
    }

    /// Next non-empty line, `None` at end of stream.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }

                return Ok(Some(self.take_line()));
            }

            match available.iter().position(|x| *x == b'\n' || *x == b'\r') {
                Some(i) => {
                    self.buf.extend_from_slice(&available[..i]);
                    self.inner.consume(i + 1);

                    if !self.buf.is_empty() {
                        return Ok(Some(self.take_line()));
                    }
                }
                None => {
                    let len = available.len();
                    self.buf.extend_from_slice(available);
                    self.inner.consume(len);
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

/// Build a command for an external tool with every stdio stream configured.
pub fn command(program: &Path, args: &[String], stdin: Stdio, stdout: Stdio) -> Command {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::piped());
    command
}

pub fn spawn(tool: &str, command: &mut Command) -> Result<Child> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let args = command
        .as_std()
        .get_args()
        .map(|x| {
            let x = x.to_string_lossy();
            if x.contains(' ') {
                format!("\"{}\"", x)
            } else {
                x.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    info!("Executing {} {}", tool.colorize("bold cyan"), args);
    debug!("{} resolved to {}", tool, program);

    command
        .spawn()
        .map_err(|e| Error::tool(tool, format!("could not be started ({})", e)))
}

/// Wait for `child` and map a failing exit status to an error.
pub async fn wait(tool: &str, child: &mut Child) -> Result<()> {
    let status = child.wait().await.map_err(|e| Error::tool(tool, e))?;

    if !status.success() {
        return Err(Error::tool(
            tool,
            match status.code() {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by a signal".to_owned(),
            },
        ));
    }

    Ok(())
}

/// Read `stream` line by line on its own task.
pub fn scan<R, F>(tool: &'static str, stream: R, mut on_line: F) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = LineReader::new(BufReader::new(stream));

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => on_line(line.trim()),
                Ok(None) => break,
                Err(e) => {
                    debug!("reading {} output failed: {}", tool, e);
                    break;
                }
            }
        }
    })
}

/// Periodically stat the output file and render the progress line until `stop` flips.
///
/// With `estimate` the byte delta between two samples becomes the transfer
/// rate, and remaining bytes over that rate the eta.
pub fn sample_output(
    path: PathBuf,
    progress: Progress,
    mut stop: watch::Receiver<bool>,
    total: Option<u64>,
    estimate: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(SAMPLE_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last: Option<(Instant, u64)> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => (),
                _ = stop.changed() => break,
            }

            if let Ok(metadata) = fs::metadata(&path).await {
                let size = metadata.len();
                progress.set_transferred(size);

                if estimate {
                    if let Some((at, previous)) = last {
                        let elapsed = at.elapsed().as_secs_f64();

                        if elapsed > 0.0 {
                            let rate = (size.saturating_sub(previous) as f64 / elapsed) as u64;
                            let eta = total
                                .filter(|_| rate > 0)
                                .map(|x| utils::seconds_to_hms(x.saturating_sub(size) / rate));
                            progress.estimate(format!("{}/s", utils::format_bytes(rate)), eta);
                        }
                    }

                    last = Some((Instant::now(), size));
                }
            }

            progress.render();
        }
    })
}

/// Await every task, a panicked task is only logged.
pub async fn join_all(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        if let Err(e) = task.await {
            debug!("background task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let mut reader = LineReader::new(BufReader::with_capacity(4, input));
        let mut lines = vec![];

        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }

        lines
    }

    #[tokio::test]
    async fn splits_on_carriage_returns() {
        assert_eq!(
            collect(b"frame=1 size=1kB\rframe=2 size=2kB\r\nDuration: 00:00:10.00\nlast").await,
            vec![
                "frame=1 size=1kB",
                "frame=2 size=2kB",
                "Duration: 00:00:10.00",
                "last"
            ]
        );
    }

    #[tokio::test]
    async fn skips_empty_segments() {
        assert_eq!(collect(b"\r\n\r\n").await, Vec::<String>::new());
        assert_eq!(collect(b"\n\na\r\r").await, vec!["a"]);
    }

    #[tokio::test]
    async fn sampler_estimates_rate_from_growth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vod.mp4");
        std::fs::write(&path, vec![0; 1024]).unwrap();

        let total = Some(64 * 1024 * 1024);
        let progress = Progress::new(total, None);
        let (stop_tx, stop_rx) = watch::channel(false);
        let sampler = sample_output(path.clone(), progress.clone(), stop_rx, total, true);

        // first tick fires at once, the next one sees the grown file
        time::sleep(SAMPLE_INTERVAL / 2).await;
        std::fs::write(&path, vec![0; 512 * 1024]).unwrap();
        time::sleep(SAMPLE_INTERVAL + SAMPLE_INTERVAL / 5).await;

        stop_tx.send(true).unwrap();
        sampler.await.unwrap();

        let line = progress.line();
        assert!(line.starts_with("512.0 KiB / 64.0 MiB"), "{}", line);
        assert!(line.contains("/s"), "{}", line);
        assert!(line.contains("ETA "), "{}", line);
    }

    #[tokio::test]
    async fn sampler_without_estimate_only_counts_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vod.mp4");
        std::fs::write(&path, vec![0; 2048]).unwrap();

        let progress = Progress::new(None, None);
        let (stop_tx, stop_rx) = watch::channel(false);
        let sampler = sample_output(path, progress.clone(), stop_rx, None, false);

        time::sleep(SAMPLE_INTERVAL + SAMPLE_INTERVAL / 5).await;
        stop_tx.send(true).unwrap();
        sampler.await.unwrap();

        assert_eq!(progress.line(), "2.0 KiB");
    }

    #[tokio::test]
    async fn lines_longer_than_buffer() {
        assert_eq!(
            collect(b"[#1 1.0MiB/2.0MiB(50%) CN:16 DL:1MiB]\n").await,
            vec!["[#1 1.0MiB/2.0MiB(50%) CN:16 DL:1MiB]"]
        );
    }
}
