//! I/O layer: decoding source bytes, the zip archive codec, per-run workspaces,
//! input discovery, and `writers` for PNG/WebP/JPEG outputs and JSON manifests.
pub mod archive;
pub mod decode;
pub mod inputs;
pub mod workspace;
pub mod writers;

pub use archive::{ArchiveEntry, extract_archive, pack_directory, pack_entries, read_archive};
pub use decode::decode_image;
pub use inputs::{SourceItem, collect_inputs};
pub use workspace::RunWorkspace;
