use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{BatchOutput, assign_outputs, normalize_bytes_unchecked, write_output};
use crate::core::params::ConvertParams;
use crate::core::processing::batch::{ProgressObserver, partition_results, run_pool};
use crate::error::{Error, Result};
use crate::io::archive::pack_directory;
use crate::io::inputs::{IMAGE_EXTENSIONS, collect_inputs};
use crate::io::workspace::RunWorkspace;

/// Normalizes every image found in `inputs` (files, directories, zip archives)
/// and packs the results into one zip, preserving relative paths.
///
/// Undecodable images and unreadable archives are reported and skipped. A run
/// that finds no images at all fails with `InvalidConfiguration`.
pub fn convert_files(
    inputs: &[PathBuf],
    params: &ConvertParams,
    observer: &dyn ProgressObserver,
    work_base: Option<&Path>,
) -> Result<BatchOutput> {
    params.validate()?;
    let workspace = RunWorkspace::create(work_base)?;
    let (sources, mut report) = collect_inputs(inputs, &workspace, IMAGE_EXTENSIONS)?;
    if sources.is_empty() {
        return Err(Error::InvalidConfiguration("no images found".to_string()));
    }

    let jobs = assign_outputs(sources, params.format.extension());
    observer.on_start(jobs.len());
    let out_root = workspace.output_dir();
    let results = run_pool(jobs, params.workers, observer, |job| {
        let bytes = fs::read(&job.source.path)?;
        let encoded = normalize_bytes_unchecked(&bytes, params)?;
        write_output(out_root, &job.output, &encoded)
    })?;

    let (_, batch) = partition_results(results);
    report.merge(batch);

    let archive = pack_directory(out_root)?;
    observer.on_finish(&report);
    info!(
        "Converted {} images to {} ({} failed)",
        report.processed, params.target, report.errors
    );
    Ok(BatchOutput {
        archive_name: format!("converted_{}.zip", params.target.label()),
        archive,
        report,
    })
}
