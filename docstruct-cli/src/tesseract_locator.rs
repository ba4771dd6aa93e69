//! Tesseract Locator - find the local recognition binary
//!
//! Resolution order: explicit `--tesseract-cmd`, then `TESSERACT_CMD`, then
//! every directory on `PATH`, then well-known install locations. Nothing is
//! ever downloaded; a missing binary is reported with install hints.

use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const BINARY_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "tesseract";

/// Where the binary was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Flag,
    Environment,
    SearchPath,
    WellKnown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBinary {
    pub path: PathBuf,
    pub source: Source,
}

pub struct TesseractLocator {
    env_command: Option<String>,
    search_path: Option<OsString>,
    well_known: Vec<PathBuf>,
}

impl TesseractLocator {
    /// Locator reading the current process environment
    pub fn from_env() -> Self {
        Self {
            env_command: std::env::var("TESSERACT_CMD").ok(),
            search_path: std::env::var_os("PATH"),
            well_known: Self::well_known_locations(),
        }
    }

    pub fn with_parts(
        env_command: Option<String>,
        search_path: Option<OsString>,
        well_known: Vec<PathBuf>,
    ) -> Self {
        Self {
            env_command,
            search_path,
            well_known,
        }
    }

    fn well_known_locations() -> Vec<PathBuf> {
        if cfg!(windows) {
            vec![
                PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"),
                PathBuf::from(r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe"),
            ]
        } else {
            vec![
                PathBuf::from("/usr/bin/tesseract"),
                PathBuf::from("/usr/local/bin/tesseract"),
                PathBuf::from("/opt/homebrew/bin/tesseract"),
                PathBuf::from("/opt/local/bin/tesseract"),
            ]
        }
    }

    fn search_path_dirs(&self) -> Vec<PathBuf> {
        self.search_path
            .as_ref()
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// Resolve the binary. An explicit or environment-provided command is
    /// trusted as given; only the search steps check the filesystem.
    pub fn locate(&self, explicit: Option<&str>) -> Result<LocatedBinary> {
        if let Some(cmd) = explicit.filter(|c| !c.trim().is_empty()) {
            return Ok(LocatedBinary {
                path: PathBuf::from(cmd),
                source: Source::Flag,
            });
        }

        if let Some(cmd) = self.env_command.as_deref().filter(|c| !c.trim().is_empty()) {
            return Ok(LocatedBinary {
                path: PathBuf::from(cmd),
                source: Source::Environment,
            });
        }

        if let Some(path) = self
            .search_path_dirs()
            .into_iter()
            .map(|dir| dir.join(BINARY_NAME))
            .find(|candidate| is_file(candidate))
        {
            return Ok(LocatedBinary {
                path,
                source: Source::SearchPath,
            });
        }

        if let Some(path) = self.well_known.iter().find(|c| is_file(c)) {
            return Ok(LocatedBinary {
                path: path.clone(),
                source: Source::WellKnown,
            });
        }

        Err(anyhow!(
            "Could not find the tesseract binary.\n\
             Searched in:\n\
             - --tesseract-cmd\n\
             - TESSERACT_CMD environment variable\n\
             - PATH\n\
             - {}\n\
             Install it (e.g. `apt install tesseract-ocr`, `brew install tesseract`) \
             or replay recorded tokens with --tokens",
            self.well_known
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }
}

fn is_file(path: &Path) -> bool {
    path.is_file()
}
