//! High-level library API: one entrypoint per tool plus the byte-level
//! normalizer. Each batch entrypoint validates its parameters, stages inputs in
//! a private [`RunWorkspace`](crate::io::RunWorkspace), runs the per-item work
//! on a bounded pool and returns the packed archive with a [`BatchReport`].
//! Prefer these over the low-level processing modules when integrating canvasfit.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::params::ConvertParams;
use crate::core::processing::batch::{BatchItem, BatchReport};
use crate::core::processing::normalize::normalize;
use crate::error::Result;
use crate::io::decode::decode_image;
use crate::io::inputs::SourceItem;
use crate::io::writers::encode_image;

mod catalog;
mod convert;
mod removal;
mod render;

pub use catalog::{ExportOutput, export_collection, frame_catalog_image};
pub use convert::convert_files;
pub use removal::remove_backgrounds;
pub use render::render_overlays;

/// Packed result of a batch tool.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Suggested file name for `archive`
    pub archive_name: String,
    /// Zip of the run's output tree
    pub archive: Vec<u8>,
    pub report: BatchReport,
}

impl BatchOutput {
    /// Writes the archive to `path`, or to `archive_name` inside `path` when
    /// `path` is an existing directory. Returns the written location.
    pub fn write_archive(&self, path: &Path) -> Result<PathBuf> {
        let dest = if path.is_dir() {
            path.join(&self.archive_name)
        } else {
            path.to_path_buf()
        };
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &self.archive)?;
        Ok(dest)
    }
}

/// Decode, normalize and re-encode one image according to `params`.
pub fn normalize_bytes(bytes: &[u8], params: &ConvertParams) -> Result<Vec<u8>> {
    params.validate()?;
    normalize_bytes_unchecked(bytes, params)
}

pub(crate) fn normalize_bytes_unchecked(bytes: &[u8], params: &ConvertParams) -> Result<Vec<u8>> {
    let image = decode_image(bytes)?;
    let composed = normalize(&image, params.target, params.background)?;
    encode_image(&composed, params.format, params.quality)
}

/// A staged source and the output-tree path its result is written to.
#[derive(Debug, Clone)]
pub(crate) struct OutputJob {
    pub source: SourceItem,
    pub output: PathBuf,
}

impl BatchItem for OutputJob {
    fn name(&self) -> String {
        self.source.rel_path.clone()
    }
}

/// Pairs each source with `rel/stem.<extension>`. When two sources map to the
/// same path (`a.jpg` and `a.png` -> `a.png`), later ones get a `_<n>` suffix.
pub(crate) fn assign_outputs(sources: Vec<SourceItem>, extension: &str) -> Vec<OutputJob> {
    let mut taken = HashSet::new();
    sources
        .into_iter()
        .map(|source| {
            let wanted = source.output_rel_path(extension);
            let mut output = wanted.clone();
            let mut n = 2;
            while !taken.insert(output.clone()) {
                let stem = wanted
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                output = wanted.with_file_name(format!("{stem}_{n}.{extension}"));
                n += 1;
            }
            OutputJob { source, output }
        })
        .collect()
}

/// Writes `bytes` under `root`, creating intermediate directories.
pub(crate) fn write_output(root: &Path, rel: &Path, bytes: &[u8]) -> Result<()> {
    let dest = root.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, bytes)?;
    Ok(())
}
