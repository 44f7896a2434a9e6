use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Background, CatalogFraming, ExportMode, OutputFormat, RemovalModel, TargetSize};

/// Longest tail a render job may replace, in seconds.
pub const MAX_TAIL_SECONDS: u32 = 30;

/// Normalization parameters suitable for config files and presets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertParams {
    pub target: TargetSize,
    pub background: Background,
    pub format: OutputFormat,
    /// JPEG quality (1-100); ignored by lossless formats
    pub quality: u8,
    pub workers: usize,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            target: TargetSize::SQUARE,
            background: Background::Transparent,
            format: OutputFormat::Png,
            quality: 90,
            workers: 8,
        }
    }
}

impl ConvertParams {
    /// Checks everything that would make the whole run fail, before any work starts.
    pub fn validate(&self) -> Result<()> {
        self.target.validate()?;
        validate_workers(self.workers)?;
        validate_quality(self.quality)?;
        if self.background.is_transparent() && !self.format.supports_alpha() {
            return Err(Error::InvalidConfiguration(format!(
                "{} output cannot keep transparency; choose a solid background or png/webp",
                self.format
            )));
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: ConvertParams = serde_json::from_str(&text)?;
        Ok(params)
    }
}

/// Catalog export parameters. The access token is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    pub shop: String,
    pub api_version: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Numeric id, handle, or collection URL
    pub collection: String,
    pub mode: ExportMode,
    pub framing: CatalogFraming,
    /// Parallel downloads (16 workers) when true, sequential otherwise
    pub turbo: bool,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            shop: String::new(),
            api_version: "2023-10".to_string(),
            access_token: String::new(),
            collection: String::new(),
            mode: ExportMode::Links,
            framing: CatalogFraming::Original,
            turbo: true,
        }
    }
}

impl ExportParams {
    pub fn workers(&self) -> usize {
        if self.turbo { 16 } else { 1 }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("shop", &self.shop),
            ("api_version", &self.api_version),
            ("access_token", &self.access_token),
            ("collection", &self.collection),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "missing required field: {name}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalParams {
    pub model: RemovalModel,
    pub workers: usize,
}

impl Default for RemovalParams {
    fn default() -> Self {
        Self {
            model: RemovalModel::U2netHumanSeg,
            workers: 4,
        }
    }
}

impl RemovalParams {
    pub fn validate(&self) -> Result<()> {
        validate_workers(self.workers)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Seconds trimmed from the end of every base clip and replaced by the overlay
    pub tail_seconds: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self { tail_seconds: 5 }
    }
}

impl RenderParams {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TAIL_SECONDS).contains(&self.tail_seconds) {
            return Err(Error::InvalidConfiguration(format!(
                "tail seconds must be between 1 and {MAX_TAIL_SECONDS}, got {}",
                self.tail_seconds
            )));
        }
        Ok(())
    }
}

fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(Error::InvalidConfiguration(
            "worker count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_quality(quality: u8) -> Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(Error::InvalidConfiguration(format!(
            "quality must be between 1 and 100, got {quality}"
        )));
    }
    Ok(())
}
