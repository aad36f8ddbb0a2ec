//! Sync command - Replicate a tree between two backends
//!
//! Provides the `treesync sync` CLI command which:
//! 1. Resolves both backend names before anything connects
//! 2. Builds the filter chain (unless `--no-validation`)
//! 3. Connects both adapters and runs the SyncEngine
//! 4. Prints the run summary

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use treesync_core::config::{BackendKind, Config, ManifestMode};
use treesync_sync::engine::{format_elapsed, SyncResult};
use treesync_sync::SyncEngine;

use super::normalize_path;
use crate::backends;
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Backend holding the tree to copy (local, sftp, gdrive, dropbox)
    pub input_backend: String,

    /// Root of the tree to copy
    pub input_path: String,

    /// Backend receiving the copy
    pub output_backend: String,

    /// Folder the tree is copied into
    pub output_path: String,

    /// Copy everything, ignoring the exclusion filters
    #[arg(long)]
    pub no_validation: bool,

    /// Where to write structure.json (off, root, per-folder)
    #[arg(long, value_name = "MODE")]
    pub manifest: Option<ManifestMode>,
}

impl SyncCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let input: BackendKind = self.input_backend.parse()?;
        let output: BackendKind = self.output_backend.parse()?;
        let input_path = normalize_path(&self.input_path);
        let output_path = normalize_path(&self.output_path);
        let manifest = self.manifest.unwrap_or(config.manifest.mode);

        info!(
            input = %input,
            output = %output,
            validation = !self.no_validation,
            manifest = %manifest,
            "Starting backup of {input_path} to {output_path}"
        );

        let source = backends::connect(
            input,
            config,
            backends::validator(config, !self.no_validation)?,
        )
        .await
        .with_context(|| format!("Failed to connect to {input}"))?;
        let destination = backends::connect(
            output,
            config,
            backends::validator(config, !self.no_validation)?,
        )
        .await
        .with_context(|| format!("Failed to connect to {output}"))?;

        formatter.info(&format!(
            "Copying {input}:{input_path} to {output}:{output_path}"
        ));

        let engine = SyncEngine::new(source, destination).with_manifest(manifest);
        let outcome = engine
            .run(&input_path, &output_path)
            .await
            .context("Synchronization failed")?;

        if format.is_json() {
            formatter.print_json(&summary_json(&outcome.result));
        } else {
            print_summary(formatter.as_ref(), &outcome.result);
        }

        Ok(())
    }
}

fn summary_json(result: &SyncResult) -> serde_json::Value {
    serde_json::json!({
        "folders_written": result.folders_written,
        "files_written": result.files_written,
        "bytes_written": result.bytes_written,
        "excluded": result.excluded,
        "errors": result.errors,
        "duration_ms": result.duration_ms,
    })
}

fn print_summary(formatter: &dyn OutputFormatter, result: &SyncResult) {
    let elapsed = std::time::Duration::from_millis(result.duration_ms);
    formatter.success(&format!("Done in {}", format_elapsed(elapsed)));

    formatter.info(&format!(
        "Folders:  {} folder{}",
        result.folders_written,
        plural(result.folders_written)
    ));
    formatter.info(&format!(
        "Files:    {} file{} ({} bytes)",
        result.files_written,
        plural(result.files_written),
        result.bytes_written
    ));
    if result.excluded > 0 {
        formatter.info(&format!("Excluded: {}", result.excluded));
    }

    if !result.errors.is_empty() {
        let count = result.errors.len() as u64;
        formatter.warn(&format!("{} item{} skipped:", count, plural(count)));
        for err in &result.errors {
            formatter.info(&format!("  - {}", err));
        }
    }
}
