use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::Result;

/// Scratch storage owned by one run: an `input/` tree for collected sources and
/// an `output/` tree for results. Everything is deleted when the value drops,
/// so two runs never see each other's files.
#[derive(Debug)]
pub struct RunWorkspace {
    root: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl RunWorkspace {
    /// Creates a workspace in the system temp directory.
    pub fn new() -> Result<Self> {
        Self::create(None)
    }

    /// Creates a workspace under `base` (or the system temp directory).
    pub fn create(base: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("canvasfit-run-");
        let root = match base {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)?
            }
            None => builder.tempdir()?,
        };
        let input = root.path().join("input");
        let output = root.path().join("output");
        fs::create_dir_all(&input)?;
        fs::create_dir_all(&output)?;
        debug!("Created run workspace at {:?}", root.path());
        Ok(Self {
            root,
            input,
            output,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspaces_are_isolated_and_released() {
        let base = tempfile::tempdir().unwrap();
        let a = RunWorkspace::create(Some(base.path())).unwrap();
        let b = RunWorkspace::create(Some(base.path())).unwrap();
        assert_ne!(a.root(), b.root());
        assert!(a.input_dir().is_dir());
        assert!(a.output_dir().is_dir());

        fs::write(a.output_dir().join("x.png"), b"x").unwrap();
        assert!(!b.output_dir().join("x.png").exists());

        let root = a.root().to_path_buf();
        drop(a);
        assert!(!root.exists());
        assert!(b.root().exists());
    }
}
