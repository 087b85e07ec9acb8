//! Project discovery.
//!
//! Scans an extracted project directory for screen descriptors: every `.scm`
//! file is a screen, paired with the `.bky` file of the same stem in the same
//! directory when one exists.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ConversionError;
use crate::finalize::ConversionOutput;
use crate::mapping::MappingTable;
use crate::{convert_screen, ConvertOptions, ScreenSource};

const ENTRY_SCREEN: &str = "Screen1";

// ═══════════════════════════════════════════════════════════════════════════════
// SCREEN DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenFiles {
    pub name: String,
    pub layout: PathBuf,
    pub blocks: Option<PathBuf>,
}

/// All screens under `dir`, sorted by path.
pub fn discover_screens(dir: &Path) -> Result<Vec<ScreenFiles>, ConversionError> {
    if !dir.is_dir() {
        return Err(ConversionError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut screens = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "scm") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let blocks = path.with_extension("bky");
        screens.push(ScreenFiles {
            name: name.to_string(),
            layout: path.to_path_buf(),
            blocks: blocks.is_file().then_some(blocks),
        });
    }

    tracing::debug!(dir = %dir.display(), screens = screens.len(), "discovered screens");
    Ok(screens)
}

/// The screen the app starts on: `Screen1` when present, else the first.
pub fn entry_screen(screens: &[ScreenFiles]) -> Option<&ScreenFiles> {
    screens
        .iter()
        .find(|s| s.name == ENTRY_SCREEN)
        .or_else(|| screens.first())
}

pub fn load_screen(files: &ScreenFiles) -> Result<ScreenSource, ConversionError> {
    let read = |path: &Path| {
        fs::read_to_string(path).map_err(|source| ConversionError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    Ok(ScreenSource {
        name: files.name.clone(),
        layout: read(&files.layout)?,
        blocks: match &files.blocks {
            Some(path) => read(path)?,
            None => String::new(),
        },
    })
}

/// Convert the entry screen of the project extracted at `dir`.
pub fn convert_project_dir(
    dir: &Path,
    table: &MappingTable,
    options: &ConvertOptions,
) -> Result<ConversionOutput, ConversionError> {
    let screens = discover_screens(dir)?;
    let entry = entry_screen(&screens).ok_or_else(|| ConversionError::NoScreens {
        path: dir.to_path_buf(),
    })?;
    tracing::info!(screen = %entry.name, total = screens.len(), "converting entry screen");
    convert_screen(&load_screen(entry)?, table, options)
}
