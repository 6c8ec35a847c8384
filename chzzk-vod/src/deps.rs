use crate::error::{Error, Result};
use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Aria2c,
    Ffmpeg,
    Streamlink,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Aria2c, Tool::Ffmpeg, Tool::Streamlink];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aria2c => "aria2c",
            Self::Ffmpeg => "ffmpeg",
            Self::Streamlink => "streamlink",
        }
    }

    /// Location inside the dependency directory.
    fn relative_path(&self) -> PathBuf {
        let exe = if cfg!(target_os = "windows") {
            format!("{}.exe", self.name())
        } else {
            self.name().to_owned()
        };

        match self {
            Self::Aria2c => Path::new("aria2c").join(exe),
            Self::Ffmpeg => Path::new("ffmpeg").join("bin").join(exe),
            Self::Streamlink => Path::new("streamlink").join("bin").join(exe),
        }
    }
}

impl Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Paths of the external tools bundled under the dependency directory. `PATH` is never searched.
#[derive(Clone, Debug)]
pub struct Tools {
    pub aria2c: PathBuf,
    pub ffmpeg: PathBuf,
    pub streamlink: PathBuf,
}

impl Tools {
    pub fn locate(deps_dir: &Path) -> Self {
        Self {
            aria2c: deps_dir.join(Tool::Aria2c.relative_path()),
            ffmpeg: deps_dir.join(Tool::Ffmpeg.relative_path()),
            streamlink: deps_dir.join(Tool::Streamlink.relative_path()),
        }
    }

    pub fn path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Aria2c => &self.aria2c,
            Tool::Ffmpeg => &self.ffmpeg,
            Tool::Streamlink => &self.streamlink,
        }
    }

    /// Path of `tool`, or an error naming where it was expected.
    pub fn require(&self, tool: Tool) -> Result<&Path> {
        let path = self.path(tool);

        if !path.is_file() {
            return Err(Error::fs(
                path,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} is not installed", tool),
                ),
            ));
        }

        Ok(path)
    }

    pub fn missing(&self) -> Vec<Tool> {
        Tool::ALL
            .into_iter()
            .filter(|x| !self.path(*x).is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_and_require() {
        let dir = tempfile::tempdir().unwrap();
        let tools = Tools::locate(dir.path());

        assert!(tools.ffmpeg.starts_with(dir.path().join("ffmpeg").join("bin")));
        assert!(tools.streamlink.starts_with(dir.path().join("streamlink").join("bin")));
        assert_eq!(tools.missing(), Tool::ALL);
        assert!(matches!(
            tools.require(Tool::Ffmpeg),
            Err(Error::FileSystem { ref path, .. }) if path == &tools.ffmpeg
        ));

        std::fs::create_dir_all(tools.aria2c.parent().unwrap()).unwrap();
        std::fs::write(&tools.aria2c, b"").unwrap();
        assert_eq!(tools.require(Tool::Aria2c).unwrap(), tools.aria2c);
        assert_eq!(tools.missing(), [Tool::Ffmpeg, Tool::Streamlink]);
    }
}
