use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// One file inside an archive, addressed by a `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Packs named blobs into one deflated zip.
pub fn pack_entries(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        let name = safe_relative_path(&entry.path)?;
        zip.start_file(to_archive_name(&name), options)?;
        zip.write_all(&entry.bytes)?;
    }

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    info!("Packed {} entries into {} bytes", entries.len(), bytes.len());
    Ok(bytes)
}

/// Packs every regular file under `root`, with paths relative to `root`.
/// Entries are ordered by path so the archive is reproducible.
pub fn pack_directory(root: &Path) -> Result<Vec<u8>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Archive(e.to_string()))?;
        entries.push(ArchiveEntry {
            path: to_archive_name(rel),
            bytes: fs::read(entry.path())?,
        });
    }
    debug!("Collected {} files under {:?} for packing", entries.len(), root);
    pack_entries(&entries)
}

/// Reads every file entry of a zip into memory.
///
/// Fails with `Archive` if the blob is not a zip, or if any entry would resolve
/// outside the archive root (absolute paths, `..`).
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let names = checked_entry_names(&mut archive)?;

    let mut entries = Vec::with_capacity(names.len());
    for (index, rel) in names {
        let Some(rel) = rel else { continue };
        let mut file = archive.by_index(index)?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        entries.push(ArchiveEntry {
            path: to_archive_name(&rel),
            bytes: buf,
        });
    }
    Ok(entries)
}

/// Extracts a zip under `dest`, returning the written file paths.
///
/// Entry names are all checked before anything is written, so an unsafe
/// archive leaves `dest` untouched.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let names = checked_entry_names(&mut archive)?;

    let mut written = Vec::new();
    for (index, rel) in names {
        let Some(rel) = rel else { continue };
        let out_path = dest.join(&rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = archive.by_index(index)?;
        let mut out = fs::File::create(&out_path)?;
        std::io::copy(&mut file, &mut out)?;
        written.push(out_path);
    }
    info!("Extracted {} files into {:?}", written.len(), dest);
    Ok(written)
}

/// Returns `(index, Some(relative path))` for files and `(index, None)` for
/// directories.
fn checked_entry_names<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<(usize, Option<PathBuf>)>> {
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        let raw_name = file.name().to_string();
        let rel = file
            .enclosed_name()
            .ok_or_else(|| Error::Archive(format!("unsafe entry path: {raw_name}")))?;
        if file.is_dir() {
            names.push((index, None));
        } else {
            names.push((index, Some(safe_relative_path(&rel.to_string_lossy())?)));
        }
    }
    Ok(names)
}

/// Accepts only plain relative paths with no parent, root or prefix components.
fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let normalized = name.replace('\\', "/");
    let path = Path::new(&normalized);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Archive(format!("unsafe entry path: {name}")));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(Error::Archive(format!("empty entry path: {name:?}")));
    }
    Ok(clean)
}

fn to_archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_zip(names: &[&str]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for name in names {
            zip.start_file(*name, options).unwrap();
            zip.write_all(b"payload").unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn packs_and_reads_nested_entries() {
        let entries = vec![
            ArchiveEntry {
                path: "a/b/one.png".into(),
                bytes: vec![1, 2, 3],
            },
            ArchiveEntry {
                path: "two.jpg".into(),
                bytes: vec![],
            },
        ];
        let blob = pack_entries(&entries).unwrap();
        assert_eq!(read_archive(&blob).unwrap(), entries);
    }

    #[test]
    fn rejects_parent_traversal_without_writing() {
        let blob = raw_zip(&["ok.png", "../escape.png"]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        assert!(matches!(
            extract_archive(&blob, &dest),
            Err(Error::Archive(_))
        ));
        assert!(!dest.join("ok.png").exists());
        assert!(!dir.path().join("escape.png").exists());
    }

    #[test]
    fn rejects_absolute_entries() {
        let blob = raw_zip(&["/etc/passwd"]);
        assert!(matches!(read_archive(&blob), Err(Error::Archive(_))));
    }

    #[test]
    fn not_a_zip_is_an_archive_error() {
        assert!(matches!(
            read_archive(b"PK but not really"),
            Err(Error::Archive(_))
        ));
    }

    #[test]
    fn extracts_into_destination() {
        let blob = raw_zip(&["nested/dir/pic.webp", "top.png"]);
        let dir = tempfile::tempdir().unwrap();
        let mut written = extract_archive(&blob, dir.path()).unwrap();
        written.sort();
        assert_eq!(
            written,
            vec![
                dir.path().join("nested/dir/pic.webp"),
                dir.path().join("top.png")
            ]
        );
        assert_eq!(fs::read(dir.path().join("top.png")).unwrap(), b"payload");
    }

    #[test]
    fn packs_directory_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/x.png"), b"x").unwrap();
        fs::write(dir.path().join("y.png"), b"y").unwrap();

        let entries = read_archive(&pack_directory(dir.path()).unwrap()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, ["sub/x.png", "y.png"]);
    }
}
