use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use canvasfit::types::{Background, CatalogFraming, ExportMode, OutputFormat, RemovalModel, TargetSize};

#[derive(Parser)]
#[command(name = "canvasfit", version, about = "canvasfit CLI")]
pub struct CliArgs {
    /// Enable logging (filter with RUST_LOG, default debug)
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    /// Show a progress bar instead of per-item log lines
    #[arg(long, global = true, default_value_t = false)]
    pub progress: bool,

    /// Parent directory for per-run scratch space (defaults to the system temp dir)
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fit images onto a fixed canvas and pack them into a zip
    Convert(ConvertArgs),
    /// Export a store collection's image links, optionally downloading the images
    Catalog(CatalogArgs),
    /// Remove image backgrounds with an external segmentation model
    RemoveBg(RemoveBgArgs),
    /// Replace the last seconds of each video with an overlay clip
    Render(RenderArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Image files, directories, or zip archives
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output zip path, or a directory to place the default-named zip in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file with convert parameters; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Canvas size: WIDTHxHEIGHT, "square" (1080x1080) or "story" (1080x1920)
    #[arg(short, long)]
    pub size: Option<TargetSize>,

    /// Background: "#rrggbb" or "transparent"
    #[arg(short, long)]
    pub background: Option<Background>,

    /// Output format
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// JPEG quality (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Worker threads
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args)]
pub struct CatalogArgs {
    /// Store name (e.g. "my-store") or full host
    #[arg(long, env = "SHOPIFY_SHOP")]
    pub shop: String,

    /// Admin API version
    #[arg(long, default_value = "2023-10")]
    pub api_version: String,

    /// Admin API access token
    #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Collection id, handle, or collection URL
    #[arg(short, long)]
    pub collection: String,

    #[arg(long, value_enum, default_value_t = ExportMode::Links)]
    pub mode: ExportMode,

    /// Framing applied to downloaded images
    #[arg(long, value_enum, default_value_t = CatalogFraming::Original)]
    pub framing: CatalogFraming,

    /// ImgBB key; when set, downloaded images are also uploaded
    #[arg(long, env = "IMGBB_API_KEY", hide_env_values = true)]
    pub imgbb_key: Option<String>,

    /// Download one image at a time instead of 16 in parallel
    #[arg(long, default_value_t = false)]
    pub no_turbo: bool,

    /// Directory for the manifest (and zip in download mode)
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Args)]
pub struct RemoveBgArgs {
    /// Image files, directories, or zip archives
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output zip path, or a directory to place the default-named zip in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = RemovalModel::U2netHumanSeg)]
    pub model: RemovalModel,

    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// rembg executable
    #[arg(long, default_value = "rembg")]
    pub rembg: PathBuf,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Base .mp4 files, directories, or zip archives
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Clip appended in place of each base clip's tail
    #[arg(long)]
    pub overlay: PathBuf,

    /// Seconds to replace at the end of each base clip (1-30)
    #[arg(short, long, default_value_t = 5)]
    pub tail_seconds: u32,

    /// Output zip path, or a directory to place the default-named zip in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    #[arg(long, default_value = "ffprobe")]
    pub ffprobe: PathBuf,
}
