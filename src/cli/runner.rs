use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;
use tracing_subscriber::EnvFilter;

use canvasfit::api::{
    BatchOutput, convert_files, export_collection, remove_backgrounds, render_overlays,
};
use canvasfit::core::params::{ConvertParams, ExportParams, RemovalParams, RenderParams};
use canvasfit::core::processing::batch::{LogObserver, ProgressObserver};
use canvasfit::io::writers::manifest::{LinkColumn, write_json, write_links_csv};
use canvasfit::remote::{HttpFetcher, ImageHost, ImgbbHost, ShopifyCatalog};
use canvasfit::{FfmpegCli, RembgCli};

use super::args::{CatalogArgs, CliArgs, Command, ConvertArgs, RemoveBgArgs, RenderArgs};
use super::errors::AppError;
use super::progress::BarObserver;

/// Flags override values loaded from `--config`.
fn convert_params(args: &ConvertArgs) -> Result<ConvertParams, AppError> {
    let mut params = match &args.config {
        Some(path) => ConvertParams::from_json_file(path)?,
        None => ConvertParams::default(),
    };
    if let Some(size) = args.size {
        params.target = size;
    }
    if let Some(background) = args.background {
        params.background = background;
    }
    if let Some(format) = args.format {
        params.format = format;
    }
    if let Some(quality) = args.quality {
        params.quality = quality;
    }
    if let Some(workers) = args.workers {
        params.workers = workers;
    }
    Ok(params)
}

fn save_archive(output: &BatchOutput, requested: Option<&Path>) -> Result<PathBuf, AppError> {
    let target = requested.unwrap_or_else(|| Path::new("."));
    let written = output.write_archive(target)?;
    Ok(written)
}

fn summarize(label: &str, output: &BatchOutput, written: &Path) {
    let report = &output.report;
    println!(
        "{label}: {} processed, {} skipped, {} failed -> {}",
        report.processed,
        report.skipped,
        report.errors,
        written.display()
    );
    for failure in &report.failures {
        println!("  failed {}: {}", failure.name, failure.message);
    }
}

fn run_convert(
    args: &ConvertArgs,
    observer: &dyn ProgressObserver,
    work_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = convert_params(args)?;
    info!(
        "Converting to {} ({}, background {})",
        params.target, params.format, params.background
    );
    let output = convert_files(&args.inputs, &params, observer, work_dir)?;
    let written = save_archive(&output, args.output.as_deref())?;
    summarize("convert", &output, &written);
    Ok(())
}

fn run_catalog(
    args: &CatalogArgs,
    observer: &dyn ProgressObserver,
    work_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = ExportParams {
        shop: args.shop.clone(),
        api_version: args.api_version.clone(),
        access_token: args.token.clone(),
        collection: args.collection.clone(),
        mode: args.mode,
        framing: args.framing,
        turbo: !args.no_turbo,
    };
    let catalog = ShopifyCatalog::from_params(&params)?;
    let fetcher = HttpFetcher::new()?;
    let host = match args.imgbb_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => Some(ImgbbHost::new(key)?),
        None => None,
    };

    let output = export_collection(
        &catalog,
        &fetcher,
        host.as_ref().map(|h| h as &dyn ImageHost),
        &params,
        observer,
        work_dir,
    )?;

    if args.output_dir.exists() && !args.output_dir.is_dir() {
        return Err(AppError::InvalidOutput {
            path: args.output_dir.clone(),
        }
        .into());
    }
    fs::create_dir_all(&args.output_dir)?;
    let manifest_path = args.output_dir.join(output.manifest_name());
    write_json(&output.manifest, &manifest_path)?;
    let mut columns = vec![LinkColumn::Source];
    if output.manifest.has_hosted_links() {
        columns.push(LinkColumn::Hosted);
    }
    for column in columns {
        let sheet = args.output_dir.join(output.manifest.links_file_name(column));
        write_links_csv(&output.manifest, column, &sheet)?;
        println!("catalog: links sheet -> {}", sheet.display());
    }
    println!(
        "catalog: {} products, {} images -> {}",
        output.manifest.products.len(),
        output.manifest.image_count(),
        manifest_path.display()
    );
    if let Some(archive) = &output.archive {
        let archive_path = args.output_dir.join(output.archive_name());
        fs::write(&archive_path, archive)?;
        let report = &output.manifest.report;
        println!(
            "catalog: {} stored, {} failed, {} not uploaded -> {}",
            report.processed,
            report.errors,
            output.manifest.upload_failures.len(),
            archive_path.display()
        );
    }
    Ok(())
}

fn run_remove_bg(
    args: &RemoveBgArgs,
    observer: &dyn ProgressObserver,
    work_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = RemovalParams {
        model: args.model,
        workers: args.workers,
    };
    let remover = RembgCli::new(&args.rembg);
    let output = remove_backgrounds(&remover, &args.inputs, &params, observer, work_dir)?;
    let written = save_archive(&output, args.output.as_deref())?;
    summarize("remove-bg", &output, &written);
    Ok(())
}

fn run_render(
    args: &RenderArgs,
    observer: &dyn ProgressObserver,
    work_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = RenderParams {
        tail_seconds: args.tail_seconds,
    };
    let renderer = FfmpegCli::new(&args.ffmpeg, &args.ffprobe);
    let today = Local::now().date_naive();
    let output = render_overlays(
        &renderer,
        &args.inputs,
        &args.overlay,
        &params,
        today,
        observer,
        work_dir,
    )?;
    let written = save_archive(&output, args.output.as_deref())?;
    summarize("render", &output, &written);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let bar;
    let observer: &dyn ProgressObserver = if args.progress {
        bar = BarObserver::new();
        &bar
    } else {
        &LogObserver
    };
    let work_dir = args.work_dir.as_deref();

    match &args.command {
        Command::Convert(a) => run_convert(a, observer, work_dir),
        Command::Catalog(a) => run_catalog(a, observer, work_dir),
        Command::RemoveBg(a) => run_remove_bg(a, observer, work_dir),
        Command::Render(a) => run_render(a, observer, work_dir),
    }
}
