use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::processing::batch::{BatchReport, ItemFailure};
use crate::error::{Error, Result};
use crate::types::{CatalogFraming, ExportMode};

/// One image of a product as it appeared in the catalog, and what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub source_url: String,
    /// Archive-relative path, download mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Public URL returned by the image host, when uploads are enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: u64,
    pub title: String,
    pub images: Vec<ImageRecord>,
}

/// Sidecar written next to every catalog export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionManifest {
    pub shop: String,
    pub collection_id: u64,
    pub mode: ExportMode,
    pub framing: CatalogFraming,
    pub generated_at: DateTime<Utc>,
    pub products: Vec<ProductRecord>,
    pub report: BatchReport,
    /// Stored images the host rejected; these still count as processed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upload_failures: Vec<ItemFailure>,
}

/// Which URL fills the image columns of a links sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkColumn {
    Source,
    Hosted,
}

impl CollectionManifest {
    pub fn file_name(&self) -> String {
        format!("collection_{}.json", self.collection_id)
    }

    pub fn image_count(&self) -> usize {
        self.products.iter().map(|p| p.images.len()).sum()
    }

    pub fn links_file_name(&self, column: LinkColumn) -> String {
        match column {
            LinkColumn::Source => format!("collection_{}.csv", self.collection_id),
            LinkColumn::Hosted => format!("collection_{}_hosted.csv", self.collection_id),
        }
    }

    pub fn has_hosted_links(&self) -> bool {
        self.products
            .iter()
            .flat_map(|p| &p.images)
            .any(|img| img.hosted_url.is_some())
    }

    /// One row per product: `Title, Image 1 .. Image N`, N being the largest
    /// image count in the collection. Missing cells are left empty. The sheet
    /// starts with a UTF-8 BOM so spreadsheet tools pick up accented titles.
    pub fn links_csv(&self, column: LinkColumn) -> Result<Vec<u8>> {
        let columns = self.products.iter().map(|p| p.images.len()).max().unwrap_or(0);
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());

        let mut header = vec!["Title".to_string()];
        header.extend((1..=columns).map(|i| format!("Image {i}")));
        writer.write_record(&header).map_err(csv_error)?;

        for product in &self.products {
            let mut row = Vec::with_capacity(columns + 1);
            row.push(product.title.as_str());
            for i in 0..columns {
                let cell = product.images.get(i).and_then(|img| match column {
                    LinkColumn::Source => Some(img.source_url.as_str()),
                    LinkColumn::Hosted => img.hosted_url.as_deref(),
                });
                row.push(cell.unwrap_or(""));
            }
            writer.write_record(&row).map_err(csv_error)?;
        }

        writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn csv_error(e: csv::Error) -> Error {
    Error::Encode(format!("CSV: {e}"))
}

/// Writes a links sheet at `path`.
pub fn write_links_csv(manifest: &CollectionManifest, column: LinkColumn, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, manifest.links_csv(column)?)?;
    info!("Links sheet written: {:?}", path);
    Ok(())
}

pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Pretty-printed JSON sidecar at `path`.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json_bytes(value)?)?;
    info!("JSON sidecar written: {:?}", path);
    Ok(())
}
