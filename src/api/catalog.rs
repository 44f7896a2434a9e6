use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use super::write_output;
use crate::core::params::ExportParams;
use crate::core::processing::batch::{
    BatchItem, ItemFailure, ProgressObserver, partition_results, run_pool,
};
use crate::core::processing::normalize::normalize_with_margin;
use crate::core::processing::resize::sample_center_color;
use crate::error::{Error, Result};
use crate::io::archive::pack_directory;
use crate::io::decode::decode_image;
use crate::io::workspace::RunWorkspace;
use crate::io::writers::jpeg::encode_rgb_jpeg;
use crate::io::writers::manifest::{CollectionManifest, ImageRecord, ProductRecord};
use crate::remote::catalog::{CatalogClient, CollectionRef, Product, sanitize_title};
use crate::remote::fetch::ImageFetcher;
use crate::remote::upload::ImageHost;
use crate::types::{Background, ExportMode, TargetSize};

/// Share of the canvas a framed catalog image may occupy.
pub const CATALOG_MARGIN: f64 = 0.9;
pub const CATALOG_JPEG_QUALITY: u8 = 90;

/// Manifest of a catalog export, plus the image archive in download mode.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub manifest: CollectionManifest,
    pub archive: Option<Vec<u8>>,
}

impl ExportOutput {
    pub fn manifest_name(&self) -> String {
        self.manifest.file_name()
    }

    pub fn archive_name(&self) -> String {
        format!("collection_{}.zip", self.manifest.collection_id)
    }
}

/// Frames a product photo for social formats: contained within 90% of `target`
/// on a background sampled from the photo's center, encoded as JPEG.
pub fn frame_catalog_image(bytes: &[u8], target: TargetSize) -> Result<Vec<u8>> {
    let image = decode_image(bytes)?;
    let fill = sample_center_color(&image)?;
    let (framed, _) = normalize_with_margin(&image, target, Background::Solid(fill), CATALOG_MARGIN)?;
    encode_rgb_jpeg(&framed.to_rgb8(), CATALOG_JPEG_QUALITY)
}

struct ImageTask {
    product: usize,
    image: usize,
    url: String,
    path: String,
}

impl BatchItem for ImageTask {
    fn name(&self) -> String {
        self.path.clone()
    }
}

struct Stored {
    hosted_url: Option<String>,
    upload_error: Option<Error>,
}

/// Product folder names, unique per product. Empty or dot-only titles fall
/// back to `product_<id>`; taken names get `_<id>` (then `_<id>_<n>`) appended.
fn product_folders(products: &[Product]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    products
        .iter()
        .map(|p| {
            let mut base = sanitize_title(p.title.trim());
            if base.trim().is_empty() || base.chars().all(|c| c == '.') {
                base = format!("product_{}", p.id);
            }
            let mut folder = base.clone();
            if used.contains(&folder) {
                folder = format!("{base}_{}", p.id);
            }
            let mut n = 2;
            while used.contains(&folder) {
                folder = format!("{base}_{}_{n}", p.id);
                n += 1;
            }
            used.insert(folder.clone());
            folder
        })
        .collect()
}

/// Lists a collection's products and, in download mode, stores every image as
/// `<title>/<n>.jpg` (optionally framed and uploaded to `host`).
///
/// Resolution and listing failures abort the export. Per-image fetch and decode
/// failures are recorded in the manifest's report. An image that was stored but
/// not uploaded still counts as processed and is listed in `upload_failures`.
pub fn export_collection(
    catalog: &dyn CatalogClient,
    fetcher: &dyn ImageFetcher,
    host: Option<&dyn ImageHost>,
    params: &ExportParams,
    observer: &dyn ProgressObserver,
    work_base: Option<&Path>,
) -> Result<ExportOutput> {
    params.validate()?;
    let reference: CollectionRef = params.collection.parse()?;
    let collection_id = catalog.resolve_collection(&reference)?;
    let products = catalog.list_products(collection_id)?;
    info!(
        "Collection {} has {} products ({} mode)",
        collection_id,
        products.len(),
        params.mode
    );

    let mut records: Vec<ProductRecord> = products
        .iter()
        .map(|p| ProductRecord {
            product_id: p.id,
            title: p.title.clone(),
            images: p
                .images
                .iter()
                .map(|img| ImageRecord {
                    source_url: img.src.clone(),
                    path: None,
                    hosted_url: None,
                })
                .collect(),
        })
        .collect();

    let mut manifest = CollectionManifest {
        shop: params.shop.clone(),
        collection_id,
        mode: params.mode,
        framing: params.framing,
        generated_at: Utc::now(),
        products: Vec::new(),
        report: Default::default(),
        upload_failures: Vec::new(),
    };

    if params.mode == ExportMode::Links {
        manifest.report.processed = records.iter().map(|r| r.images.len()).sum();
        manifest.products = records;
        return Ok(ExportOutput {
            manifest,
            archive: None,
        });
    }

    let folders = product_folders(&products);
    let tasks: Vec<ImageTask> = products
        .iter()
        .enumerate()
        .flat_map(|(pi, p)| {
            let folder = &folders[pi];
            p.images.iter().enumerate().map(move |(ii, img)| ImageTask {
                product: pi,
                image: ii,
                url: img.src.clone(),
                path: format!("{folder}/{}.jpg", ii + 1),
            })
        })
        .collect();

    let workspace = RunWorkspace::create(work_base)?;
    let out_root = workspace.output_dir();
    let target = params.framing.target();

    observer.on_start(tasks.len());
    let results = run_pool(tasks, params.workers(), observer, |task| {
        let fetched = fetcher.fetch(&task.url)?;
        let stored = match target {
            Some(target) => frame_catalog_image(&fetched, target)?,
            None => fetched,
        };
        write_output(out_root, Path::new(&task.path), &stored)?;

        let mut outcome = Stored {
            hosted_url: None,
            upload_error: None,
        };
        if let Some(host) = host {
            let file_name = task.path.rsplit('/').next().unwrap_or("image.jpg");
            match host.upload(&stored, file_name) {
                Ok(url) => outcome.hosted_url = Some(url),
                Err(e) => outcome.upload_error = Some(e),
            }
        }
        Ok(outcome)
    })?;

    let (stored, report) = partition_results(results);
    for (task, outcome) in stored {
        let record = &mut records[task.product].images[task.image];
        record.path = Some(task.path.clone());
        record.hosted_url = outcome.hosted_url;
        if let Some(e) = outcome.upload_error {
            warn!("Upload of {} failed: {}", task.path, e);
            manifest.upload_failures.push(ItemFailure {
                name: task.path.clone(),
                message: e.to_string(),
            });
        }
    }

    let archive = pack_directory(out_root)?;
    observer.on_finish(&report);
    info!(
        "Stored {} images from collection {} ({} failed, {} not uploaded)",
        report.processed,
        collection_id,
        report.errors,
        manifest.upload_failures.len()
    );

    manifest.products = records;
    manifest.report = report;
    Ok(ExportOutput {
        manifest,
        archive: Some(archive),
    })
}
