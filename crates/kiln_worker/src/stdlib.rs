//! One-time preparation of the standard-library image.
//!
//! The archive is fetched, unpacked into an emptied staging area, and every
//! class file in staging is rewritten by [`transform_class`]. Only classes
//! that carry the usability marker are kept. Each is written twice: renamed
//! into the library image the backend links against, and under its original
//! name into the boot image the source compiler resolves platform classes
//! from. Both images are emptied first, so every load starts from scratch.

use crate::error::{io_at, PrepareError};
use crate::fetch::Fetcher;
use crate::layout::{reset_dir, Layout};
use kiln_classfile::{transform_class, RenameRule, TransformedClass};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Counts describing one preparation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareReport {
    /// Files unpacked into the staging area.
    pub staged: usize,
    /// Class files successfully transformed.
    pub transformed: usize,
    /// Transformed classes written to the library image.
    pub visible: usize,
    /// Class files skipped because they failed to parse.
    pub skipped: usize,
}

/// Fetches the archive at `url` and rebuilds the library image from it.
///
/// A fetch or archive failure returns before anything is written to the
/// library image.
pub async fn prepare(
    layout: &Layout,
    fetcher: &dyn Fetcher,
    url: &str,
) -> Result<PrepareReport, PrepareError> {
    log::info!("initializing stdlib from {url}");
    let start = Instant::now();

    let bytes = fetcher.fetch(url).await?;
    let staged = unpack_archive(&bytes, &layout.paths.stdlib_staging)?;
    let mut report = build_library_image(
        &layout.paths.stdlib_staging,
        &layout.paths.library_image,
        &layout.paths.boot_image,
        &layout.rename_rule,
        &layout.marker,
    )?;
    report.staged = staged;

    log::info!(
        "initialized in {} ms: {} staged, {} transformed, {} visible, {} skipped",
        start.elapsed().as_millis(),
        report.staged,
        report.transformed,
        report.visible,
        report.skipped
    );
    Ok(report)
}

/// Unpacks a zip archive into `staging`, preserving relative paths.
///
/// Whatever an earlier archive left in `staging` is removed once the new
/// archive has been opened. Directory entries are skipped. Returns the
/// number of files written.
pub fn unpack_archive(bytes: &[u8], staging: &Path) -> Result<usize, PrepareError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PrepareError::Archive(e.to_string()))?;
    reset_dir(staging).map_err(io_at(staging, |path, source| PrepareError::Io {
        path,
        source,
    }))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| PrepareError::Archive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let Some(rel) = entry.enclosed_name() else {
            return Err(PrepareError::MalformedEntry(entry.name().to_string()));
        };
        let out_path = staging.join(rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(io_at(parent, |path, source| PrepareError::Io { path, source }))?;
        }
        let mut out = fs::File::create(&out_path)
            .map_err(io_at(&out_path, |path, source| PrepareError::Io { path, source }))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| PrepareError::Archive(format!("{}: {e}", entry.name())))?;
        written += 1;
    }
    log::debug!("unpacked {written} files into {}", staging.display());
    Ok(written)
}

/// Transforms every class file under `staging` and writes the visible
/// ones renamed below `image` and under their original names below
/// `boot_image`. Both directories are emptied first.
///
/// Files are visited in sorted path order. A class that fails to parse is
/// logged and skipped.
pub fn build_library_image(
    staging: &Path,
    image: &Path,
    boot_image: &Path,
    rule: &RenameRule,
    marker: &str,
) -> Result<PrepareReport, PrepareError> {
    let mut files = Vec::new();
    collect_class_files(staging, &mut files)?;
    files.sort();

    for dir in [image, boot_image] {
        reset_dir(dir).map_err(io_at(dir, |path, source| PrepareError::Io { path, source }))?;
    }
    let unrenamed = RenameRule::identity();

    let mut report = PrepareReport::default();
    for file in &files {
        let bytes =
            fs::read(file).map_err(io_at(file, |path, source| PrepareError::Io { path, source }))?;
        let transformed = match transform_class(&bytes, rule, marker) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("skipping {}: {e}", file.display());
                report.skipped += 1;
                continue;
            }
        };
        report.transformed += 1;
        if !transformed.visible {
            continue;
        }
        let original = match transform_class(&bytes, &unrenamed, marker) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("skipping {}: {e}", file.display());
                report.skipped += 1;
                continue;
            }
        };
        write_image_class(image, &transformed)?;
        write_image_class(boot_image, &original)?;
        report.visible += 1;
    }
    Ok(report)
}

fn write_image_class(root: &Path, class: &TransformedClass) -> Result<(), PrepareError> {
    let dest = root.join(class.relative_path());
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(io_at(parent, |path, source| PrepareError::Io { path, source }))?;
    }
    fs::write(&dest, &class.bytes).map_err(io_at(&dest, |path, source| PrepareError::Io {
        path,
        source,
    }))
}

/// Recursively collects `.class` files below `dir`.
fn collect_class_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), PrepareError> {
    let entries =
        fs::read_dir(dir).map_err(io_at(dir, |path, source| PrepareError::Io { path, source }))?;
    for entry in entries {
        let entry = entry.map_err(io_at(dir, |path, source| PrepareError::Io { path, source }))?;
        let path = entry.path();
        if path.is_dir() {
            collect_class_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "class") {
            out.push(path);
        }
    }
    Ok(())
}
