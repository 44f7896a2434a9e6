//! Background removal behind a capability-checked trait. The segmentation model
//! itself is an external program; `RembgCli` drives the `rembg` executable.
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::RemovalModel;

pub trait BackgroundRemover: Send + Sync {
    /// Short name used in logs and `Unavailable` errors.
    fn name(&self) -> &str;

    /// Whether `remove` can run at all. Checked once before a batch starts.
    fn available(&self) -> bool;

    /// Returns PNG bytes of the foreground with a transparent background.
    fn remove(&self, image: &[u8], model: RemovalModel) -> Result<Vec<u8>>;
}

/// Fails with `Unavailable` unless the remover can run.
pub fn ensure_available(remover: &dyn BackgroundRemover) -> Result<()> {
    if remover.available() {
        Ok(())
    } else {
        Err(Error::Unavailable(format!(
            "background remover '{}' is not installed or not runnable",
            remover.name()
        )))
    }
}

/// Shells out to `rembg i -m <model> <input> <output>`.
#[derive(Debug, Clone)]
pub struct RembgCli {
    program: PathBuf,
}

impl Default for RembgCli {
    fn default() -> Self {
        Self::new("rembg")
    }
}

impl RembgCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl BackgroundRemover for RembgCli {
    fn name(&self) -> &str {
        "rembg"
    }

    fn available(&self) -> bool {
        let ok = Command::new(&self.program)
            .arg("--help")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !ok {
            warn!("{:?} is not runnable", self.program);
        }
        ok
    }

    fn remove(&self, image: &[u8], model: RemovalModel) -> Result<Vec<u8>> {
        let input = tempfile::Builder::new().prefix("canvasfit-in-").tempfile()?;
        fs::write(input.path(), image)?;
        let output = tempfile::Builder::new()
            .prefix("canvasfit-out-")
            .suffix(".png")
            .tempfile()?;

        debug!("Running {:?} with model {}", self.program, model);
        let result = Command::new(&self.program)
            .arg("i")
            .arg("-m")
            .arg(model.as_str())
            .arg(input.path())
            .arg(output.path())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::External(format!("rembg exec error: {e}")))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::External(format!(
                "rembg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let bytes = fs::read(output.path())?;
        if bytes.is_empty() {
            return Err(Error::External("rembg produced no output".to_string()));
        }
        info!("Removed background ({} -> {} bytes)", image.len(), bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_unavailable() {
        let remover = RembgCli::new("/nonexistent/canvasfit-rembg");
        assert!(!remover.available());
        assert!(matches!(
            ensure_available(&remover),
            Err(Error::Unavailable(_))
        ));
    }

    #[test]
    fn missing_program_fails_removal_with_external_error() {
        let remover = RembgCli::new("/nonexistent/canvasfit-rembg");
        assert!(matches!(
            remover.remove(b"x", RemovalModel::U2net),
            Err(Error::External(_))
        ));
    }
}
