//! Shared types and enums used across canvasfit.
//! Includes `TargetSize` and its presets, the `Background` policy, `OutputFormat`,
//! `RemovalModel`, `CatalogFraming` and `ExportMode`.
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canvas dimensions in pixels. Both sides must be at least 1.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const SQUARE: TargetSize = TargetSize {
        width: 1080,
        height: 1080,
    };
    pub const STORY: TargetSize = TargetSize {
        width: 1080,
        height: 1920,
    };

    pub fn new(width: u32, height: u32) -> Result<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "target size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Label used in default archive names, e.g. `1080x1920`.
    pub fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        TargetSize::SQUARE
    }
}

impl std::fmt::Display for TargetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for TargetSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "square" => return Ok(TargetSize::SQUARE),
            "story" | "9:16" => return Ok(TargetSize::STORY),
            _ => {}
        }

        let invalid = || {
            Error::InvalidConfiguration(format!(
                "invalid target size '{trimmed}', expected WIDTHxHEIGHT, 'square' or 'story'"
            ))
        };
        let (w, h) = trimmed
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        TargetSize::new(width, height)
    }
}

/// How padding around the fitted content is filled.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Background {
    /// Opaque fill; the output has no alpha channel.
    Solid([u8; 3]),
    /// Padding stays fully transparent; the output keeps an alpha channel.
    #[default]
    Transparent,
}

impl Background {
    pub fn is_transparent(&self) -> bool {
        matches!(self, Background::Transparent)
    }
}

impl FromStr for Background {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Background::Transparent);
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidConfiguration(format!(
                "invalid background color '{trimmed}', expected #rrggbb or 'transparent'"
            )));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| {
                Error::InvalidConfiguration(format!("invalid background color '{trimmed}'"))
            })
        };
        Ok(Background::Solid([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Background {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Background> for String {
    fn from(value: Background) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Background::Solid([r, g, b]) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            Background::Transparent => write!(f, "transparent"),
        }
    }
}

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    #[value(alias = "jpeg")]
    #[serde(alias = "jpeg")]
    Jpg,
    Webp, // Lossless only
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn supports_alpha(&self) -> bool {
        !matches!(self, OutputFormat::Jpg)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Segmentation models understood by the background-removal collaborator.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, ValueEnum, Serialize, Deserialize,
)]
pub enum RemovalModel {
    /// Tuned for portraits
    #[default]
    #[value(name = "u2net_human_seg")]
    #[serde(rename = "u2net_human_seg")]
    U2netHumanSeg,
    #[value(name = "u2net")]
    #[serde(rename = "u2net")]
    U2net,
    #[value(name = "isnet-general-use")]
    #[serde(rename = "isnet-general-use")]
    IsnetGeneralUse,
}

impl RemovalModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalModel::U2netHumanSeg => "u2net_human_seg",
            RemovalModel::U2net => "u2net",
            RemovalModel::IsnetGeneralUse => "isnet-general-use",
        }
    }
}

impl std::fmt::Display for RemovalModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How downloaded catalog images are stored.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFraming {
    /// Bytes are stored exactly as served
    #[default]
    Original,
    Square,
    Story,
}

impl CatalogFraming {
    pub fn target(&self) -> Option<TargetSize> {
        match self {
            CatalogFraming::Original => None,
            CatalogFraming::Square => Some(TargetSize::SQUARE),
            CatalogFraming::Story => Some(TargetSize::STORY),
        }
    }
}

impl std::fmt::Display for CatalogFraming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogFraming::Original => write!(f, "original"),
            CatalogFraming::Square => write!(f, "square"),
            CatalogFraming::Story => write!(f, "story"),
        }
    }
}

#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Manifest of image links only
    #[default]
    Links,
    /// Manifest plus a zip of every image, one folder per product
    Download,
}

impl std::fmt::Display for ExportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportMode::Links => write!(f, "links"),
            ExportMode::Download => write!(f, "download"),
        }
    }
}
