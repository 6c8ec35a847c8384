use crate::error::{Error, Result};
use log::info;
use std::{fmt::Display, path::Path};

/// What happens to an already existing output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OnExists {
    /// delete it and download again
    Overwrite,
    /// continue a partial download
    Resume,
    /// keep it and do nothing
    Skip,
}

impl Display for OnExists {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overwrite => write!(f, "Overwrite (download again)"),
            Self::Resume => write!(f, "Resume (continue partial download)"),
            Self::Skip => write!(f, "Skip (keep existing file)"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conflict {
    Proceed { resume: bool },
    Skip,
}

/// Decides what to do with an existing output file.
pub trait ConflictChooser {
    fn choose(&self, path: &Path) -> Result<OnExists>;
}

impl ConflictChooser for OnExists {
    fn choose(&self, _: &Path) -> Result<OnExists> {
        Ok(*self)
    }
}

pub fn resolve_conflict(path: &Path, chooser: &dyn ConflictChooser) -> Result<Conflict> {
    if !path.exists() {
        return Ok(Conflict::Proceed { resume: false });
    }

    Ok(match chooser.choose(path)? {
        OnExists::Overwrite => {
            info!("Deleting {}", path.to_string_lossy());
            std::fs::remove_file(path).map_err(|e| Error::fs(path, e))?;
            Conflict::Proceed { resume: false }
        }
        OnExists::Resume => Conflict::Proceed { resume: true },
        OnExists::Skip => Conflict::Skip,
    })
}
