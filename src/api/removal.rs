use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{BatchOutput, assign_outputs, write_output};
use crate::core::params::RemovalParams;
use crate::core::processing::batch::{ProgressObserver, partition_results, run_pool};
use crate::error::{Error, Result};
use crate::io::archive::pack_directory;
use crate::io::inputs::{IMAGE_EXTENSIONS, collect_inputs};
use crate::io::workspace::RunWorkspace;
use crate::removal::{BackgroundRemover, ensure_available};

pub const REMOVAL_ARCHIVE_NAME: &str = "background_removed.zip";

/// Runs `remover` over every image in `inputs`; each result is stored as
/// `rel/stem.png`.
///
/// The remover's availability is checked once, before inputs are even staged.
pub fn remove_backgrounds(
    remover: &dyn BackgroundRemover,
    inputs: &[PathBuf],
    params: &RemovalParams,
    observer: &dyn ProgressObserver,
    work_base: Option<&Path>,
) -> Result<BatchOutput> {
    params.validate()?;
    ensure_available(remover)?;

    let workspace = RunWorkspace::create(work_base)?;
    let (sources, mut report) = collect_inputs(inputs, &workspace, IMAGE_EXTENSIONS)?;
    if sources.is_empty() {
        return Err(Error::InvalidConfiguration("no images found".to_string()));
    }

    let jobs = assign_outputs(sources, "png");
    observer.on_start(jobs.len());
    let out_root = workspace.output_dir();
    let results = run_pool(jobs, params.workers, observer, |job| {
        let bytes = fs::read(&job.source.path)?;
        let cut_out = remover.remove(&bytes, params.model)?;
        write_output(out_root, &job.output, &cut_out)
    })?;

    let (_, batch) = partition_results(results);
    report.merge(batch);

    let archive = pack_directory(out_root)?;
    observer.on_finish(&report);
    info!(
        "Removed backgrounds from {} images with {} ({} failed)",
        report.processed, params.model, report.errors
    );
    Ok(BatchOutput {
        archive_name: REMOVAL_ARCHIVE_NAME.to_string(),
        archive,
        report,
    })
}
