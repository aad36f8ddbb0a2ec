//! Tree command - Enumerate a tree without copying it
//!
//! Walks `<path>` on one backend with the same filters a sync would use and
//! prints either an indented listing or, with `--json`, the structure
//! manifest a sync would write.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use treesync_core::config::{BackendKind, Config};
use treesync_core::{manifest, Folder, Record};

use super::normalize_path;
use crate::backends;
use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Args)]
pub struct TreeCommand {
    /// Backend to read from (local, sftp, gdrive, dropbox)
    pub backend: String,

    /// Root of the tree
    pub path: String,

    /// List everything, ignoring the exclusion filters
    #[arg(long)]
    pub no_validation: bool,
}

impl TreeCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let kind: BackendKind = self.backend.parse()?;
        let path = normalize_path(&self.path);

        let adapter = backends::connect(
            kind,
            config,
            backends::validator(config, !self.no_validation)?,
        )
        .await
        .with_context(|| format!("Failed to connect to {kind}"))?;

        let mut root = Folder::open(path.as_str(), adapter, Some(path.clone()))
            .await
            .with_context(|| format!("Cannot open {kind}:{path}"))?;
        root.load_content()
            .await
            .with_context(|| format!("Failed to enumerate {kind}:{path}"))?;

        let stats = root.stats();
        info!(
            files = stats.files,
            folders = stats.folders,
            bytes = stats.bytes,
            "Tree enumerated"
        );

        if format.is_json() {
            let json = serde_json::to_value(manifest::structure_of(&root))
                .context("Failed to serialize structure")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("{kind}:{path}"));
            for line in render_lines(&root, 0) {
                formatter.info(&line);
            }
            formatter.info("");
            formatter.info(&format!(
                "{} folder{}, {} file{}, {} bytes",
                stats.folders,
                plural(stats.folders),
                stats.files,
                plural(stats.files),
                stats.bytes
            ));
        }

        Ok(())
    }
}

/// One line per record, children indented under their folder
fn render_lines(folder: &Folder, depth: usize) -> Vec<String> {
    let indent = "  ".repeat(depth);
    let mut lines = Vec::new();
    for record in folder.children().values() {
        match record {
            Record::File(file) => {
                lines.push(format!("{indent}{} ({} bytes)", file.name(), file.size()));
            }
            Record::Folder(sub) => {
                lines.push(format!("{indent}{}/", sub.name()));
                lines.extend(render_lines(sub, depth + 1));
            }
        }
    }
    lines
}
