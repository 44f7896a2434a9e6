#![doc = r##"
canvasfit: batch image normalization and the small tools around it.

The core of this crate is a single, parameterized normalizer: it scales a source
image to fit a fixed canvas without distorting it, centers it, and fills the
remaining space with a solid color or transparency. Around it sit batch tools
that share one worker pool, one archive codec and one per-run scratch space:

- `convert`: normalize every image in a set of files, folders and zips;
- `catalog`: export a store collection's image links, optionally downloading
  (and framing) every image;
- `remove-bg`: strip backgrounds through an external segmentation model;
- `render`: replace the last seconds of videos with an overlay clip.

External services and programs are reached through traits (`CatalogClient`,
`ImageFetcher`, `ImageHost`, `BackgroundRemover`, `OverlayRenderer`), each with
one concrete implementation, so batch logic can be driven by fakes in tests.

Requirements
------------
- Rust 2024 edition toolchain.
- `rembg` on `PATH` for background removal, `ffmpeg`/`ffprobe` for rendering.

Quick start: normalize one image in memory
------------------------------------------
```rust,no_run
use canvasfit::{normalize_bytes, Background, ConvertParams, OutputFormat, TargetSize};

fn main() -> canvasfit::Result<()> {
    let params = ConvertParams {
        target: TargetSize::STORY,
        background: "#f2f2f2".parse::<Background>()?,
        format: OutputFormat::Jpg,
        quality: 90,
        workers: 1,
    };
    let source = std::fs::read("/data/product.png")?;
    let framed = normalize_bytes(&source, &params)?;
    std::fs::write("/out/product.jpg", framed)?;
    Ok(())
}
```

Batch convert to a zip
----------------------
```rust,no_run
use std::path::{Path, PathBuf};
use canvasfit::{convert_files, ConvertParams, LogObserver};

fn main() -> canvasfit::Result<()> {
    let inputs = vec![PathBuf::from("/data/photos"), PathBuf::from("/data/more.zip")];
    let output = convert_files(&inputs, &ConvertParams::default(), &LogObserver, None)?;
    output.write_archive(Path::new("/out"))?;
    println!("{} ok, {} failed", output.report.processed, output.report.errors);
    Ok(())
}
```

Working with decoded images
---------------------------
```rust
use image::{DynamicImage, RgbImage};
use canvasfit::{normalize, Background, TargetSize};

fn fit(img: &DynamicImage) -> canvasfit::Result<DynamicImage> {
    normalize(img, TargetSize::SQUARE, Background::Solid([242, 242, 242]))
}

let wide = DynamicImage::ImageRgb8(RgbImage::new(400, 200));
let out = fit(&wide).unwrap();
assert_eq!((out.width(), out.height()), (1080, 1080));
```

Errors
------
Every fallible call returns [`Result`]. Batch entrypoints fail only on
configuration problems found before work starts; per-item failures are
collected in the returned [`BatchReport`].
"##]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod remote;
pub mod removal;
pub mod types;
pub mod video;

// Re-exports for a stable, ergonomic public API
pub use crate::core::params::{ConvertParams, ExportParams, RemovalParams, RenderParams};
pub use crate::core::processing::batch::{
    BatchReport, ItemFailure, LogObserver, NoopObserver, ProgressObserver, run_pool,
};
pub use crate::core::processing::normalize::{Placement, normalize, normalize_with_margin};
pub use crate::core::processing::resize::sample_center_color;
pub use error::{Error, Result};
pub use types::{
    Background, CatalogFraming, ExportMode, OutputFormat, RemovalModel, TargetSize,
};

pub use io::{RunWorkspace, decode_image};
pub use removal::{BackgroundRemover, RembgCli};
pub use video::{FfmpegCli, OverlayRenderer};

pub use api::{
    BatchOutput, ExportOutput, convert_files, export_collection, frame_catalog_image,
    normalize_bytes, remove_backgrounds, render_overlays,
};
