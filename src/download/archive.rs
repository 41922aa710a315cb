//! CBZ packaging of a finished chapter directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::error::DownloadError;

/// Writes every regular file of `chapter_dir` into `archive_path`, sorted by
/// name and deflate-compressed.
///
/// The archive is assembled under a temporary name and renamed into place,
/// so a reader never sees a half-written `.cbz`. Blocking; call it from
/// `spawn_blocking` in async code.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] for filesystem failures and
/// [`DownloadError::Archive`] for zip encoding failures.
#[instrument(level = "debug", fields(chapter_dir = %chapter_dir.display(), archive = %archive_path.display()))]
pub(crate) fn write_cbz(chapter_dir: &Path, archive_path: &Path) -> Result<(), DownloadError> {
    let files = sorted_chapter_files(chapter_dir)?;
    let tmp_path = temp_archive_path(archive_path);

    let result = write_entries(&files, &tmp_path);
    if let Err(error) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    std::fs::rename(&tmp_path, archive_path)
        .map_err(|e| DownloadError::io(archive_path.to_path_buf(), e))?;
    debug!(entries = files.len(), "Archive written");
    Ok(())
}

fn sorted_chapter_files(chapter_dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    let entries = std::fs::read_dir(chapter_dir)
        .map_err(|e| DownloadError::io(chapter_dir.to_path_buf(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DownloadError::io(chapter_dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.is_file() && !is_partial(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_entries(files: &[PathBuf], tmp_path: &Path) -> Result<(), DownloadError> {
    let file = File::create(tmp_path).map_err(|e| DownloadError::io(tmp_path.to_path_buf(), e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let bytes = std::fs::read(path).map_err(|e| DownloadError::io(path.clone(), e))?;
        zip.start_file(name, options)
            .map_err(|e| DownloadError::archive(tmp_path, e.to_string()))?;
        zip.write_all(&bytes)
            .map_err(|e| DownloadError::io(tmp_path.to_path_buf(), e))?;
    }

    let mut writer = zip
        .finish()
        .map_err(|e| DownloadError::archive(tmp_path, e.to_string()))?;
    writer
        .flush()
        .map_err(|e| DownloadError::io(tmp_path.to_path_buf(), e))?;
    Ok(())
}

fn is_partial(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "part")
}

fn temp_archive_path(archive_path: &Path) -> PathBuf {
    let mut name = archive_path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    archive_path.with_file_name(name)
}
