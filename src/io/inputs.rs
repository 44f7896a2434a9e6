use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::core::processing::batch::{BatchItem, BatchReport};
use crate::error::{Error, Result};
use crate::io::archive::extract_archive;
use crate::io::workspace::RunWorkspace;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// A staged source file and its path relative to the workspace input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// `/`-separated, used for output naming
    pub rel_path: String,
    pub path: PathBuf,
}

impl SourceItem {
    /// Output-relative path with the extension swapped, e.g. `a/b.jpg` -> `a/b.png`.
    pub fn output_rel_path(&self, extension: &str) -> PathBuf {
        Path::new(&self.rel_path).with_extension(extension)
    }
}

impl BatchItem for SourceItem {
    fn name(&self) -> String {
        self.rel_path.clone()
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn is_zip(path: &Path) -> bool {
    has_extension(path, &["zip"])
}

/// Stages files, directories and zip archives into `workspace.input_dir()` and
/// returns every staged file whose extension is in `extensions`, sorted by path.
///
/// A missing input path is a configuration error. An archive that cannot be
/// extracted is recorded in the report and skipped. A file landing on an
/// already staged path gets a `_2`, `_3`, ... suffix instead of replacing it.
pub fn collect_inputs(
    paths: &[PathBuf],
    workspace: &RunWorkspace,
    extensions: &[&str],
) -> Result<(Vec<SourceItem>, BatchReport)> {
    if paths.is_empty() {
        return Err(Error::InvalidConfiguration(
            "no input files given".to_string(),
        ));
    }
    let root = workspace.input_dir();
    let mut report = BatchReport::default();

    for path in paths {
        if !path.exists() {
            return Err(Error::InvalidConfiguration(format!(
                "input does not exist: {}",
                path.display()
            )));
        }

        if path.is_dir() {
            let name = path.file_name().map(PathBuf::from).unwrap_or_default();
            copy_tree(path, &root.join(name))?;
        } else if is_zip(path) {
            let bytes = fs::read(path)?;
            let staging = tempfile::tempdir_in(workspace.root())?;
            match extract_archive(&bytes, staging.path()) {
                Ok(_) => copy_tree(staging.path(), root)?,
                Err(e) => report.record_failure(path.display().to_string(), &e),
            }
        } else if let Some(name) = path.file_name() {
            fs::copy(path, free_path(root.join(name)))?;
        }
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !has_extension(entry.path(), extensions) {
            report.skipped += 1;
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Processing(e.to_string()))?;
        items.push(SourceItem {
            rel_path: rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
            path: entry.path().to_path_buf(),
        });
    }

    if items.is_empty() {
        warn!("No matching files among {} inputs", paths.len());
    } else {
        info!("Collected {} source files", items.len());
    }
    Ok((items, report))
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Processing(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), free_path(target))?;
        }
    }
    Ok(())
}

/// `path` itself if nothing is there yet, otherwise the first free
/// `<stem>_<n>.<ext>` sibling starting at `_2`.
fn free_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let mut n = 2;
    loop {
        let name = match &ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            warn!("{:?} already staged, using {:?}", path, candidate);
            return candidate;
        }
        n += 1;
    }
}
