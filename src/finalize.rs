//! Output assembly.
//!
//! Packs the generated markup and source into path-addressed [`Artifact`]s,
//! each carrying a SHA-256 digest of its content, and merges the diagnostics
//! of every phase in pipeline order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConversionError;
use crate::renamer::layout_name;
use crate::validate::Diagnostic;

const LAYOUT_DIR: &str = "app/src/main/res/layout";
const SOURCE_DIR: &str = "app/src/main/java";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Project-relative path, always `/`-separated.
    pub path: String,
    pub content: String,
    /// Lowercase hex SHA-256 of `content`.
    pub digest: String,
}

impl Artifact {
    pub fn new(path: String, content: String) -> Self {
        let digest = compute_digest(&content);
        Self {
            path,
            content,
            digest,
        }
    }

    pub fn is_intact(&self) -> bool {
        compute_digest(&self.content) == self.digest
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutput {
    pub screen: String,
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConversionOutput {
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

pub fn compute_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn layout_path(screen: &str) -> String {
    format!("{}/{}.xml", LAYOUT_DIR, layout_name(screen))
}

pub fn source_path(package: &str, class: &str) -> String {
    if package.is_empty() {
        return format!("{}/{}.java", SOURCE_DIR, class);
    }
    format!("{}/{}/{}.java", SOURCE_DIR, package.replace('.', "/"), class)
}

/// Build the output for one screen: layout first, then source.
pub fn finalize_output(
    screen: &str,
    package: &str,
    class: &str,
    markup: String,
    source: String,
    diagnostics: Vec<Diagnostic>,
) -> ConversionOutput {
    ConversionOutput {
        screen: screen.to_string(),
        artifacts: vec![
            Artifact::new(layout_path(screen), markup),
            Artifact::new(source_path(package, class), source),
        ],
        diagnostics,
    }
}

/// Write every artifact below `root`, creating directories as needed.
pub fn write_artifacts(root: &Path, output: &ConversionOutput) -> Result<Vec<PathBuf>, ConversionError> {
    let mut written = Vec::with_capacity(output.artifacts.len());
    for artifact in &output.artifacts {
        let target = artifact
            .path
            .split('/')
            .fold(root.to_path_buf(), |acc, part| acc.join(part));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConversionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, &artifact.content).map_err(|source| ConversionError::Io {
            path: target.clone(),
            source,
        })?;
        tracing::debug!(path = %target.display(), bytes = artifact.content.len(), "wrote artifact");
        written.push(target);
    }
    Ok(written)
}
