//! End-to-end runs of the batch tools against in-test collaborators.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use canvasfit::io::{ArchiveEntry, pack_entries, read_archive};
use canvasfit::remote::{CatalogClient, CollectionRef, ImageFetcher, ImageHost, Product, ProductImage};
use canvasfit::{
    Background, BackgroundRemover, CatalogFraming, ConvertParams, Error, ExportMode,
    ExportParams, NoopObserver, OutputFormat, OverlayRenderer, RemovalModel, RemovalParams,
    RenderParams, TargetSize, convert_files, decode_image, export_collection, remove_backgrounds,
    render_overlays,
};
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

fn png(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn names(archive: &[u8]) -> Vec<String> {
    let mut names: Vec<_> = read_archive(archive)
        .unwrap()
        .into_iter()
        .map(|e| e.path)
        .collect();
    names.sort();
    names
}

/// photos/a.png, photos/nested/b.png, photos/broken.jpg, extra.zip{zipped/c.png}
fn sample_inputs(dir: &Path) -> Vec<PathBuf> {
    let photos = dir.join("photos");
    fs::create_dir_all(photos.join("nested")).unwrap();
    fs::write(photos.join("a.png"), png(40, 20, [255, 0, 0])).unwrap();
    fs::write(photos.join("nested/b.png"), png(10, 30, [0, 255, 0])).unwrap();
    fs::write(photos.join("broken.jpg"), b"not a jpeg").unwrap();
    fs::write(photos.join("readme.txt"), b"ignored").unwrap();
    let zip = pack_entries(&[ArchiveEntry {
        path: "zipped/c.png".into(),
        bytes: png(16, 16, [0, 0, 255]),
    }])
    .unwrap();
    fs::write(dir.join("extra.zip"), zip).unwrap();
    vec![photos, dir.join("extra.zip")]
}

#[test]
fn convert_packs_every_decodable_image() {
    let dir = TempDir::new().unwrap();
    let inputs = sample_inputs(dir.path());
    let params = ConvertParams {
        target: TargetSize::new(64, 48).unwrap(),
        background: Background::Solid([242, 242, 242]),
        format: OutputFormat::Jpg,
        workers: 3,
        ..ConvertParams::default()
    };

    let out = convert_files(&inputs, &params, &NoopObserver, Some(dir.path())).unwrap();
    assert_eq!(out.archive_name, "converted_64x48.zip");
    assert_eq!(out.report.processed, 3);
    assert_eq!(out.report.errors, 1);
    assert_eq!(out.report.skipped, 1);
    assert_eq!(out.report.failures[0].name, "photos/broken.jpg");

    assert_eq!(
        names(&out.archive),
        ["photos/a.jpg", "photos/nested/b.jpg", "zipped/c.jpg"]
    );
    for entry in read_archive(&out.archive).unwrap() {
        let img = decode_image(&entry.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48), "{}", entry.path);
    }

    let written = out.write_archive(dir.path()).unwrap();
    assert_eq!(written, dir.path().join("converted_64x48.zip"));
    assert!(written.is_file());
}

#[test]
fn convert_keeps_same_named_files_from_different_folders() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("a/x.png"), png(20, 10, [255, 0, 0])).unwrap();
    fs::write(dir.path().join("b/x.png"), png(10, 20, [0, 0, 255])).unwrap();

    let out = convert_files(
        &[dir.path().join("a/x.png"), dir.path().join("b/x.png")],
        &ConvertParams::default(),
        &NoopObserver,
        Some(dir.path()),
    )
    .unwrap();
    assert_eq!((out.report.processed, out.report.errors), (2, 0));
    assert_eq!(names(&out.archive), ["x.png", "x_2.png"]);
}

#[test]
fn convert_cleans_up_its_workspace() {
    let dir = TempDir::new().unwrap();
    let inputs = sample_inputs(dir.path());
    let scratch = dir.path().join("scratch");
    convert_files(&inputs, &ConvertParams::default(), &NoopObserver, Some(&scratch)).unwrap();
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
}

#[test]
fn convert_without_images_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    let res = convert_files(
        &[dir.path().join("notes.txt")],
        &ConvertParams::default(),
        &NoopObserver,
        Some(dir.path()),
    );
    assert!(matches!(res, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn unsafe_archive_is_reported_and_skipped() {
    let dir = TempDir::new().unwrap();
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("../escape.png", zip::write::SimpleFileOptions::default())
        .unwrap();
    std::io::Write::write_all(&mut zip, &png(4, 4, [1, 2, 3])).unwrap();
    fs::write(dir.path().join("evil.zip"), zip.finish().unwrap().into_inner()).unwrap();
    fs::write(dir.path().join("ok.png"), png(4, 4, [1, 2, 3])).unwrap();

    let out = convert_files(
        &[dir.path().join("evil.zip"), dir.path().join("ok.png")],
        &ConvertParams::default(),
        &NoopObserver,
        Some(dir.path()),
    )
    .unwrap();
    assert_eq!(names(&out.archive), ["ok.png"]);
    assert_eq!(out.report.errors, 1);
    assert!(!dir.path().join("escape.png").exists());
}

struct EchoRemover {
    available: bool,
    calls: AtomicUsize,
    models: Mutex<Vec<RemovalModel>>,
}

impl EchoRemover {
    fn new(available: bool) -> Self {
        Self {
            available,
            calls: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
        }
    }
}

impl BackgroundRemover for EchoRemover {
    fn name(&self) -> &str {
        "echo"
    }

    fn available(&self) -> bool {
        self.available
    }

    fn remove(&self, image: &[u8], model: RemovalModel) -> canvasfit::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model);
        let img = decode_image(image)?;
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

#[test]
fn remove_bg_writes_png_per_image() {
    let dir = TempDir::new().unwrap();
    let inputs = sample_inputs(dir.path());
    let remover = EchoRemover::new(true);
    let params = RemovalParams {
        model: RemovalModel::IsnetGeneralUse,
        workers: 2,
    };

    let out = remove_backgrounds(&remover, &inputs, &params, &NoopObserver, Some(dir.path())).unwrap();
    assert_eq!(out.archive_name, "background_removed.zip");
    assert_eq!(
        names(&out.archive),
        ["photos/a.png", "photos/nested/b.png", "zipped/c.png"]
    );
    assert_eq!(out.report.errors, 1);
    assert_eq!(remover.calls.load(Ordering::SeqCst), 4);
    assert!(
        remover
            .models
            .lock()
            .unwrap()
            .iter()
            .all(|m| *m == RemovalModel::IsnetGeneralUse)
    );
}

#[test]
fn unavailable_remover_fails_before_any_work() {
    let dir = TempDir::new().unwrap();
    let inputs = sample_inputs(dir.path());
    let remover = EchoRemover::new(false);
    let res = remove_backgrounds(
        &remover,
        &inputs,
        &RemovalParams::default(),
        &NoopObserver,
        Some(dir.path()),
    );
    assert!(matches!(res, Err(Error::Unavailable(_))));
    assert_eq!(remover.calls.load(Ordering::SeqCst), 0);
}

struct FakeCatalog;

impl CatalogClient for FakeCatalog {
    fn resolve_collection(&self, reference: &CollectionRef) -> canvasfit::Result<u64> {
        match reference {
            CollectionRef::Id(id) => Ok(*id),
            CollectionRef::Handle(h) if h == "dunk" => Ok(77),
            CollectionRef::Handle(h) => Err(Error::InvalidConfiguration(format!("unknown {h}"))),
        }
    }

    fn list_products(&self, collection_id: u64) -> canvasfit::Result<Vec<Product>> {
        assert_eq!(collection_id, 77);
        let image = |src: &str| ProductImage { src: src.to_string() };
        Ok(vec![
            Product {
                id: 1,
                title: "Dunk Low: Panda".into(),
                images: vec![image("https://cdn/wide.png"), image("https://cdn/tall.png")],
            },
            Product {
                id: 2,
                title: "Socks".into(),
                images: vec![image("https://cdn/missing.png")],
            },
        ])
    }
}

struct FakeFetcher {
    calls: AtomicUsize,
}

impl ImageFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> canvasfit::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match url {
            "https://cdn/wide.png" => Ok(png(300, 100, [10, 20, 30])),
            "https://cdn/tall.png" => Ok(png(100, 300, [200, 100, 50])),
            other => Err(Error::remote(other, "HTTP 404: not found")),
        }
    }
}

struct FakeHost;

impl ImageHost for FakeHost {
    fn upload(&self, bytes: &[u8], file_name: &str) -> canvasfit::Result<String> {
        assert!(!bytes.is_empty());
        Ok(format!("https://host/{file_name}"))
    }
}

fn export_params(mode: ExportMode, framing: CatalogFraming) -> ExportParams {
    ExportParams {
        shop: "demo".into(),
        access_token: "token".into(),
        collection: "https://demo.myshopify.com/collections/dunk".into(),
        mode,
        framing,
        ..ExportParams::default()
    }
}

#[test]
fn catalog_download_frames_and_uploads() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
    };
    let params = export_params(ExportMode::Download, CatalogFraming::Square);

    let out = export_collection(
        &FakeCatalog,
        &fetcher,
        Some(&FakeHost),
        &params,
        &NoopObserver,
        Some(dir.path()),
    )
    .unwrap();

    assert_eq!(out.manifest_name(), "collection_77.json");
    assert_eq!(out.archive_name(), "collection_77.zip");
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

    let report = &out.manifest.report;
    assert_eq!((report.processed, report.errors), (2, 1));
    assert_eq!(report.failures[0].name, "Socks/1.jpg");

    let panda = &out.manifest.products[0];
    assert_eq!(panda.images[0].path.as_deref(), Some("Dunk Low_ Panda/1.jpg"));
    assert_eq!(panda.images[1].hosted_url.as_deref(), Some("https://host/2.jpg"));
    assert_eq!(out.manifest.products[1].images[0].path, None);

    let archive = out.archive.unwrap();
    assert_eq!(names(&archive), ["Dunk Low_ Panda/1.jpg", "Dunk Low_ Panda/2.jpg"]);
    for entry in read_archive(&archive).unwrap() {
        let img = decode_image(&entry.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (1080, 1080));
    }
}

struct DotTitleCatalog;

impl CatalogClient for DotTitleCatalog {
    fn resolve_collection(&self, _reference: &CollectionRef) -> canvasfit::Result<u64> {
        Ok(77)
    }

    fn list_products(&self, _collection_id: u64) -> canvasfit::Result<Vec<Product>> {
        Ok(vec![Product {
            id: 4,
            title: "..".into(),
            images: vec![ProductImage {
                src: "https://cdn/wide.png".into(),
            }],
        }])
    }
}

#[test]
fn catalog_dot_title_stays_inside_the_archive() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
    };
    let params = export_params(ExportMode::Download, CatalogFraming::Original);
    let out = export_collection(
        &DotTitleCatalog,
        &fetcher,
        None,
        &params,
        &NoopObserver,
        Some(dir.path()),
    )
    .unwrap();

    assert_eq!(out.manifest.report.processed, 1);
    assert_eq!(
        out.manifest.products[0].images[0].path.as_deref(),
        Some("product_4/1.jpg")
    );
    assert_eq!(names(&out.archive.unwrap()), ["product_4/1.jpg"]);
    assert!(!dir.path().join("1.jpg").exists());
}

struct RejectingHost;

impl ImageHost for RejectingHost {
    fn upload(&self, _bytes: &[u8], _file_name: &str) -> canvasfit::Result<String> {
        Err(Error::remote("https://host/upload", "HTTP 400: bad key"))
    }
}

#[test]
fn catalog_upload_failures_are_counted_apart() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
    };
    let params = export_params(ExportMode::Download, CatalogFraming::Original);
    let out = export_collection(
        &FakeCatalog,
        &fetcher,
        Some(&RejectingHost),
        &params,
        &NoopObserver,
        Some(dir.path()),
    )
    .unwrap();

    let report = &out.manifest.report;
    assert_eq!((report.processed, report.errors), (2, 1));
    assert_eq!(report.processed + report.errors, out.manifest.image_count());
    let rejected: Vec<_> = out
        .manifest
        .upload_failures
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(rejected, ["Dunk Low_ Panda/1.jpg", "Dunk Low_ Panda/2.jpg"]);
    assert!(!out.manifest.has_hosted_links());
    assert_eq!(names(&out.archive.unwrap()).len(), 2);
}

#[test]
fn catalog_links_mode_fetches_nothing() {
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
    };
    let params = export_params(ExportMode::Links, CatalogFraming::Original);
    let out = export_collection(&FakeCatalog, &fetcher, None, &params, &NoopObserver, None).unwrap();

    assert!(out.archive.is_none());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(out.manifest.image_count(), 3);
    assert_eq!(out.manifest.products[0].images[1].source_url, "https://cdn/tall.png");
}

#[test]
fn catalog_original_framing_stores_bytes_untouched() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
    };
    let mut params = export_params(ExportMode::Download, CatalogFraming::Original);
    params.turbo = false;
    let out =
        export_collection(&FakeCatalog, &fetcher, None, &params, &NoopObserver, Some(dir.path()))
            .unwrap();
    let entries = read_archive(&out.archive.unwrap()).unwrap();
    let wide = entries
        .iter()
        .find(|e| e.path == "Dunk Low_ Panda/1.jpg")
        .unwrap();
    assert_eq!(wide.bytes, png(300, 100, [10, 20, 30]));
}

#[test]
fn catalog_requires_credentials() {
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
    };
    let mut params = export_params(ExportMode::Links, CatalogFraming::Original);
    params.access_token.clear();
    assert!(matches!(
        export_collection(&FakeCatalog, &fetcher, None, &params, &NoopObserver, None),
        Err(Error::InvalidConfiguration(_))
    ));
}

struct CopyRenderer {
    tails: Mutex<Vec<u32>>,
}

impl OverlayRenderer for CopyRenderer {
    fn name(&self) -> &str {
        "copy"
    }

    fn available(&self) -> bool {
        true
    }

    fn render(
        &self,
        base: &Path,
        _overlay: &Path,
        tail_seconds: u32,
        output: &Path,
    ) -> canvasfit::Result<()> {
        self.tails.lock().unwrap().push(tail_seconds);
        let bytes = fs::read(base)?;
        if bytes.is_empty() {
            return Err(Error::Processing("empty clip".into()));
        }
        fs::write(output, bytes)?;
        Ok(())
    }
}

#[test]
fn render_names_outputs_by_date() {
    let dir = TempDir::new().unwrap();
    let clips = dir.path().join("clips");
    fs::create_dir_all(&clips).unwrap();
    fs::write(clips.join("promo.mp4"), b"base-1").unwrap();
    fs::write(clips.join("empty.mp4"), b"").unwrap();
    fs::write(clips.join("cover.png"), b"not a clip").unwrap();
    let overlay = dir.path().join("outro.mp4");
    fs::write(&overlay, b"overlay").unwrap();

    let renderer = CopyRenderer {
        tails: Mutex::new(Vec::new()),
    };
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let out = render_overlays(
        &renderer,
        &[clips],
        &overlay,
        &RenderParams { tail_seconds: 7 },
        date,
        &NoopObserver,
        Some(dir.path()),
    )
    .unwrap();

    assert_eq!(out.archive_name, "renders_2024-05-01.zip");
    assert_eq!(names(&out.archive), ["clips/promo__rendered__2024-05-01.mp4"]);
    assert_eq!((out.report.processed, out.report.errors, out.report.skipped), (1, 1, 1));
    assert_eq!(*renderer.tails.lock().unwrap(), [7, 7]);
}

#[test]
fn render_rejects_out_of_range_tail() {
    let dir = TempDir::new().unwrap();
    let overlay = dir.path().join("outro.mp4");
    fs::write(&overlay, b"overlay").unwrap();
    let renderer = CopyRenderer {
        tails: Mutex::new(Vec::new()),
    };
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    for tail in [0, 31] {
        let res = render_overlays(
            &renderer,
            &[overlay.clone()],
            &overlay,
            &RenderParams { tail_seconds: tail },
            date,
            &NoopObserver,
            None,
        );
        assert!(matches!(res, Err(Error::InvalidConfiguration(_))), "tail {tail}");
    }
    assert!(renderer.tails.lock().unwrap().is_empty());
}
