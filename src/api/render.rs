use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use super::BatchOutput;
use crate::core::params::RenderParams;
use crate::core::processing::batch::{BatchItem, ProgressObserver, partition_results, run_pool};
use crate::error::{Error, Result};
use crate::io::archive::pack_directory;
use crate::io::inputs::{SourceItem, VIDEO_EXTENSIONS, collect_inputs};
use crate::io::workspace::RunWorkspace;
use crate::video::{OverlayRenderer, ensure_available, rendered_name};

struct RenderJob {
    source: SourceItem,
    output: PathBuf,
}

impl BatchItem for RenderJob {
    fn name(&self) -> String {
        self.source.rel_path.clone()
    }
}

/// Replaces the last `tail_seconds` of every `.mp4` in `inputs` with `overlay`.
///
/// Clips are rendered one at a time, named `<stem>__rendered__<date>.mp4` next
/// to their relative location. Per-clip failures are reported, not fatal.
pub fn render_overlays(
    renderer: &dyn OverlayRenderer,
    inputs: &[PathBuf],
    overlay: &Path,
    params: &RenderParams,
    date: NaiveDate,
    observer: &dyn ProgressObserver,
    work_base: Option<&Path>,
) -> Result<BatchOutput> {
    params.validate()?;
    if !overlay.is_file() {
        return Err(Error::InvalidConfiguration(format!(
            "overlay clip not found: {}",
            overlay.display()
        )));
    }
    ensure_available(renderer)?;

    let workspace = RunWorkspace::create(work_base)?;
    let (sources, mut report) = collect_inputs(inputs, &workspace, VIDEO_EXTENSIONS)?;
    if sources.is_empty() {
        return Err(Error::InvalidConfiguration("no videos found".to_string()));
    }

    let out_root = workspace.output_dir();
    let jobs: Vec<RenderJob> = sources
        .into_iter()
        .map(|source| {
            let rel = Path::new(&source.rel_path);
            let stem = rel
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output = rel.with_file_name(rendered_name(&stem, date));
            RenderJob { source, output }
        })
        .collect();

    observer.on_start(jobs.len());
    let results = run_pool(jobs, 1, observer, |job| {
        let dest = out_root.join(&job.output);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        renderer.render(&job.source.path, overlay, params.tail_seconds, &dest)
    })?;

    let (_, batch) = partition_results(results);
    report.merge(batch);

    let archive = pack_directory(out_root)?;
    observer.on_finish(&report);
    info!(
        "Rendered {} clips with a {}s tail ({} failed)",
        report.processed, params.tail_seconds, report.errors
    );
    Ok(BatchOutput {
        archive_name: format!("renders_{}.zip", date.format("%Y-%m-%d")),
        archive,
        report,
    })
}
