//! Load import batches from disk
//!
//! Turns a directory, a `.jex`/`.tar` archive, a `.zip` archive or a single
//! file into [`InputFile`]s. Directory and archive entries keep their path
//! relative to the directory or archive root.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{ImportError, Result};
use crate::file::InputFile;

/// Read everything below `path` into memory
pub fn load_path(path: &Path) -> Result<Vec<InputFile>> {
    if path.is_dir() {
        return read_directory(path);
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    let files = match extension.as_deref() {
        Some("jex") | Some("tar") => read_tar_archive(path)?,
        Some("zip") => read_zip_archive(path)?,
        _ => {
            let bytes = fs::read(path).map_err(|e| ImportError::io(path, e))?;
            let name = path.file_name().map(Path::new).unwrap_or(path);
            vec![InputFile::new(name, bytes)]
        }
    };

    log::debug!("Loaded {} files from {}", files.len(), path.display());
    Ok(files)
}

/// Load several paths into one batch, preserving argument order
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();
    for path in paths {
        files.extend(load_path(path.as_ref())?);
    }
    Ok(files)
}

fn read_directory(dir: &Path) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ImportError::io(&path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|e| ImportError::io(entry.path(), e))?;
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        files.push(InputFile::new(relative, bytes));
    }

    log::debug!("Loaded {} files from {}", files.len(), dir.display());
    Ok(files)
}

/// Read a JEX (tar) archive
fn read_tar_archive(path: &Path) -> Result<Vec<InputFile>> {
    let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
    let mut archive = tar::Archive::new(file);
    let mut files = Vec::new();

    for entry_result in archive.entries().map_err(|e| ImportError::io(path, e))? {
        let mut entry = entry_result.map_err(|e| ImportError::io(path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry.path().map_err(|e| ImportError::io(path, e))?.to_path_buf();
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ImportError::io(path, e))?;
        files.push(InputFile::new(entry_path, bytes));
    }

    Ok(files)
}

fn read_zip_archive(path: &Path) -> Result<Vec<InputFile>> {
    let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
    let zip_error =
        |e: zip::result::ZipError| ImportError::parse(path.display().to_string(), e.to_string());
    let mut archive = zip::ZipArchive::new(file).map_err(zip_error)?;
    let mut files = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        if entry.is_dir() {
            continue;
        }
        let Some(entry_path) = entry.enclosed_name() else {
            log::warn!(
                "Skipping unsafe archive entry {} in {}",
                entry.name(),
                path.display()
            );
            continue;
        };

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| ImportError::io(path, e))?;
        files.push(InputFile::new(entry_path, bytes));
    }

    Ok(files)
}
