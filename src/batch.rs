//! Batch classification of fetched article records.
//!
//! Every `*.json` file in the input directory is loaded, its body classified,
//! and the record routed to the with-form or without-form directory under the
//! same file name. With-form records are rewritten with the cleaned body and
//! `read_time`; without-form records are passed through unchanged.
//!
//! A file that can't be read, parsed or written is logged, counted as failed,
//! and left where it was. Under [`TransferPolicy::Move`], a with-form record
//! whose source can't be deleted after the write still counts as with-form. Files are visited in directory listing order, which
//! is not stable; only the final partition is.

use crate::classify::{Classification, Classifier, has_article_section};
use crate::error::{PipelineError, Result};
use crate::models::BatchReport;
use crate::outputs::json::{read_record, write_record};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

/// What happens to the input file once its output is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferPolicy {
    /// Delete the source after a successful write.
    #[default]
    Move,
    /// Leave the source in place.
    Copy,
}

/// Classification options for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub classifier: Classifier,
    pub policy: TransferPolicy,
    /// Demote records lacking the "In This Article:" section to without-form.
    pub require_section: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    WithForm,
    WithoutForm,
}

/// Classify every record in `input_dir` and route it to `with_dir` or
/// `without_dir`.
///
/// # Arguments
///
/// * `input_dir` - Directory holding the fetched `*.json` records
/// * `with_dir` / `without_dir` - Destinations, created if missing
/// * `options` - Marker policy, transfer policy and section filter
///
/// # Returns
///
/// Per-route counts covering every JSON file found.
///
/// # Errors
///
/// Only when the output directories can't be created or the input directory
/// can't be listed; per-file problems are counted in the report.
#[instrument(level = "info", skip(options), fields(policy = ?options.policy))]
pub async fn run_batch(
    input_dir: &Path,
    with_dir: &Path,
    without_dir: &Path,
    options: &BatchOptions,
) -> Result<BatchReport> {
    for dir in [with_dir, without_dir] {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PipelineError::io(dir, e))?;
    }

    let files = list_json_files(input_dir).await?;
    let mut report = BatchReport::default();

    if files.is_empty() {
        info!(input_dir = %input_dir.display(), "No JSON files found in input directory");
        return Ok(report);
    }

    for path in files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match process_file(&path, with_dir, without_dir, options).await {
            Ok(Route::WithForm) => {
                debug!(%file, "Routed to with-form");
                report.with_form += 1;
            }
            Ok(Route::WithoutForm) => {
                debug!(%file, "Routed to without-form");
                report.without_form += 1;
            }
            Err(e) => {
                error!(%file, error = %e, "Failed to process file");
                report.failed += 1;
            }
        }
    }

    info!(
        with_form = report.with_form,
        without_form = report.without_form,
        failed = report.failed,
        total = report.total(),
        "Batch complete"
    );
    Ok(report)
}

async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(dir, e))?
    {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_json && is_file {
            files.push(path);
        }
    }
    Ok(files)
}

async fn process_file(
    path: &Path,
    with_dir: &Path,
    without_dir: &Path,
    options: &BatchOptions,
) -> Result<Route> {
    let mut record = read_record(path).await?;
    let Some(name) = path.file_name() else {
        let e = std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name");
        return Err(PipelineError::io(path, e));
    };

    let mut outcome = options.classifier.classify(&record.body);
    if options.require_section && outcome.is_with_form() && !has_article_section(&record.body) {
        debug!(file = %path.display(), "Read time found but no article section");
        outcome = Classification::WithoutForm;
    }

    match outcome {
        Classification::WithForm {
            read_time,
            cleaned_body,
        } => {
            record.body = cleaned_body;
            record.read_time = Some(read_time);
            write_record(&with_dir.join(name), &record).await?;
            if options.policy == TransferPolicy::Move {
                discard_source(path).await;
            }
            Ok(Route::WithForm)
        }
        Classification::WithoutForm => {
            let target = without_dir.join(name);
            match options.policy {
                TransferPolicy::Move => move_file(path, &target).await?,
                TransferPolicy::Copy => {
                    fs::copy(path, &target)
                        .await
                        .map_err(|e| PipelineError::io(&target, e))?;
                }
            }
            Ok(Route::WithoutForm)
        }
    }
}

async fn remove_source(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .await
        .map_err(|e| PipelineError::io(path, e))
}

/// Remove a source whose output already landed. A failure is only logged:
/// the record counts as routed, and the leftover is reprocessed (to the same
/// output name) on the next run.
async fn discard_source(path: &Path) -> bool {
    match remove_source(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Record routed but source could not be removed");
            false
        }
    }
}

/// Rename, falling back to copy-and-delete when source and target sit on
/// different filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    warn!(from = %from.display(), to = %to.display(), "Rename failed; copying instead");
    fs::copy(from, to)
        .await
        .map_err(|e| PipelineError::io(to, e))?;
    remove_source(from).await
}
