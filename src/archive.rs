use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use zip::ZipArchive;

use crate::domain::ArchiveEntry;
use crate::error::CcviError;

pub trait ArchiveReader: Send + Sync {
    /// File entries in index order. Directory entries are skipped.
    fn list_entries(&self, path: &Utf8Path) -> Result<Vec<ArchiveEntry>, CcviError>;
    fn extract(
        &self,
        path: &Utf8Path,
        entry: &ArchiveEntry,
        dest_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, CcviError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ZipArchiveReader {
    fn open(path: &Utf8Path) -> Result<ZipArchive<fs::File>, CcviError> {
        let file = fs::File::open(path.as_std_path())
            .map_err(|err| CcviError::Filesystem(format!("open zip {path}: {err}")))?;
        ZipArchive::new(file).map_err(|err| corrupt(path, err.to_string()))
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn list_entries(&self, path: &Utf8Path) -> Result<Vec<ArchiveEntry>, CcviError> {
        let mut archive = Self::open(path)?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|err| corrupt(path, err.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            entries.push(ArchiveEntry::new(entry.name(), entry.size()));
        }
        Ok(entries)
    }

    fn extract(
        &self,
        path: &Utf8Path,
        entry: &ArchiveEntry,
        dest_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, CcviError> {
        let mut archive = Self::open(path)?;
        let mut file = archive
            .by_name(&entry.filename)
            .map_err(|err| corrupt(path, format!("{}: {err}", entry.filename)))?;
        let relative = file
            .enclosed_name()
            .ok_or_else(|| corrupt(path, format!("{}: path traversal detected", entry.filename)))?;
        let relative = Utf8PathBuf::from_path_buf(relative)
            .map_err(|_| corrupt(path, format!("{}: non-utf8 entry name", entry.filename)))?;
        let target = dest_dir.join(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(target.as_std_path())
            .map_err(|err| CcviError::Filesystem(format!("create {target}: {err}")))?;
        io::copy(&mut file, &mut outfile)
            .map_err(|err| corrupt(path, format!("{}: {err}", entry.filename)))?;
        tracing::debug!(archive = %path, entry = %entry.filename, %target, "extracted entry");
        Ok(target)
    }
}

fn corrupt(path: &Utf8Path, message: String) -> CcviError {
    CcviError::ArchiveCorrupt {
        path: path.to_string(),
        message,
    }
}
