//! Reading and writing workspace snapshots
//!
//! The core never owns a file: callers hand in a path to read or a writer
//! to print to.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::store::Workspace;

/// Snapshot encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Yaml,
    Json,
}

impl SnapshotFormat {
    /// Infers the format from a file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SnapshotFormat::Json,
            _ => SnapshotFormat::Yaml,
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotFormat::Yaml => write!(f, "yaml"),
            SnapshotFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(SnapshotFormat::Yaml),
            "json" => Ok(SnapshotFormat::Json),
            other => anyhow::bail!("Unknown snapshot format '{}'. Use yaml or json.", other),
        }
    }
}

/// Parses a snapshot, validating ids and the document tree
pub fn parse_snapshot(content: &str, format: SnapshotFormat) -> Result<Workspace> {
    let workspace = match format {
        SnapshotFormat::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML snapshot")?,
        SnapshotFormat::Json => serde_json::from_str(content).context("Failed to parse JSON snapshot")?,
    };
    Ok(workspace)
}

/// Reads a snapshot file; the format follows the extension
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Workspace> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
    parse_snapshot(&content, SnapshotFormat::from_path(path))
        .with_context(|| format!("Invalid snapshot: {:?}", path))
}

/// Writes a snapshot to `out`
pub fn write_snapshot<W: Write>(
    workspace: &Workspace,
    format: SnapshotFormat,
    mut out: W,
) -> Result<()> {
    match format {
        SnapshotFormat::Yaml => serde_yaml::to_writer(&mut out, workspace)?,
        SnapshotFormat::Json => {
            serde_json::to_writer_pretty(&mut out, workspace)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
