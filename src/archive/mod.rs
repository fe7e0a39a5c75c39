//! Sequential reader for zip/jar archives.
//!
//! [`ArchiveReader::next_entry`] hands out one [`ArchiveEntry`] at a time.
//! The entry borrows the reader mutably, so the next entry cannot be
//! requested until the caller is done with the current one. Entries come in
//! central-directory order and each is visited once. Directory entries are
//! skipped.
//!
//! For every file entry the caller may [`read`](ArchiveEntry::read) the
//! decompressed bytes, [`write`](ArchiveEntry::write) them (or replacement
//! bytes) to disk, do both, or do neither to skip the entry.
//!
//! # Example
//!
//! ```rust,ignore
//! use keycloak_theme_builder::archive::ArchiveReader;
//!
//! let mut reader = ArchiveReader::open(Path::new("theme.jar"))?;
//! while let Some(mut entry) = reader.next_entry()? {
//!     if entry.relative_path().starts_with("theme") {
//!         let target = dest.join(entry.relative_path());
//!         entry.write(&target, None)?;
//!     }
//! }
//! ```

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::BuildError;
use crate::filesystem::write_file_creating_parents;
use crate::transform::{RuleChain, TransformStats};

/// Cursor over the file entries of one archive.
pub struct ArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    next_index: usize,
    label: String,
}

impl ArchiveReader<BufReader<File>> {
    /// Open an archive on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening archive '{}'", path.display()))?;
        Self::new(BufReader::new(file), path.display().to_string())
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Wrap any seekable reader; `label` is used in error messages.
    pub fn new(reader: R, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let archive = ZipArchive::new(reader)
            .with_context(|| format!("reading archive index of '{}'", label))?;
        Ok(Self {
            archive,
            next_index: 0,
            label,
        })
    }

    /// Number of raw entries (files and directories) in the archive.
    pub fn raw_len(&self) -> usize {
        self.archive.len()
    }

    /// Advance to the next file entry, or `None` once the archive is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_, R>>> {
        while self.next_index < self.archive.len() {
            let index = self.next_index;
            self.next_index += 1;

            let (name, is_dir, enclosed) = {
                let file = self.archive.by_index(index).with_context(|| {
                    format!("reading entry #{} of archive '{}'", index, self.label)
                })?;
                (file.name().to_owned(), file.is_dir(), file.enclosed_name())
            };

            if is_dir {
                continue;
            }

            let relative_path = enclosed.ok_or(BuildError::UnsafeArchiveEntry { name })?;

            return Ok(Some(ArchiveEntry {
                archive: &mut self.archive,
                index,
                relative_path,
            }));
        }
        Ok(None)
    }
}

/// One file entry of an archive, valid until the next entry is requested.
pub struct ArchiveEntry<'a, R: Read + Seek> {
    archive: &'a mut ZipArchive<R>,
    index: usize,
    relative_path: PathBuf,
}

impl<R: Read + Seek> ArchiveEntry<'_, R> {
    /// Path inside the archive, using the platform separator.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Fully buffered, decompressed content.
    pub fn read(&mut self) -> Result<Vec<u8>> {
        let mut file = self.archive.by_index(self.index)?;
        let mut buf = Vec::with_capacity(initial_capacity(file.size()));
        file.read_to_end(&mut buf)
            .with_context(|| format!("decompressing '{}'", self.relative_path.display()))?;
        Ok(buf)
    }

    /// Write the entry to `target`, creating parent directories.
    ///
    /// With `modified` set, those bytes are written instead of the entry's
    /// own content.
    pub fn write(&mut self, target: &Path, modified: Option<&[u8]>) -> Result<()> {
        if let Some(bytes) = modified {
            return write_file_creating_parents(target, bytes);
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory '{}'", parent.display()))?;
        }
        let mut file = self.archive.by_index(self.index)?;
        let mut out =
            File::create(target).with_context(|| format!("creating '{}'", target.display()))?;
        io::copy(&mut file, &mut out).with_context(|| {
            format!(
                "extracting '{}' to '{}'",
                self.relative_path.display(),
                target.display()
            )
        })?;
        Ok(())
    }
}

/// Largest buffer reserved up front from an entry's declared size.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// The declared size comes from the archive header and is not trusted;
/// `read_to_end` grows the buffer past this as needed.
fn initial_capacity(declared_size: u64) -> usize {
    usize::try_from(declared_size.min(MAX_PREALLOCATION)).unwrap_or(0)
}

/// Visit every file entry of `archive_path` with `on_entry`.
///
/// Returns the number of entries visited. The first error from `on_entry`
/// stops the traversal and is returned; files already written by earlier
/// entries stay on disk.
pub fn extract_archive<F>(archive_path: &Path, mut on_entry: F) -> Result<usize>
where
    F: FnMut(&mut ArchiveEntry<'_, BufReader<File>>) -> Result<()>,
{
    let mut reader = ArchiveReader::open(archive_path)?;
    let mut visited = 0;

    while let Some(mut entry) = reader.next_entry()? {
        visited += 1;
        let relative = entry.relative_path().to_path_buf();
        on_entry(&mut entry).with_context(|| {
            format!(
                "handling '{}' from archive '{}'",
                relative.display(),
                archive_path.display()
            )
        })?;
    }

    debug!(archive = %archive_path.display(), visited, "archive traversed");
    Ok(visited)
}

/// Extract every file entry of `archive_path` under `dest_dir` unchanged.
pub fn extract_all(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let count = extract_archive(archive_path, |entry| {
        let target = dest_dir.join(entry.relative_path());
        entry.write(&target, None)
    })?;
    info!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        files = count,
        "archive extracted"
    );
    Ok(count)
}

/// Extract `archive_path` under `dest_dir`, letting `chain` decide per entry.
///
/// Uses the same Keep/Replace/Drop/NoOpinion fold as
/// [`transform_tree`](crate::transform::transform_tree).
pub fn extract_with_rules(
    archive_path: &Path,
    dest_dir: &Path,
    chain: &RuleChain,
) -> Result<TransformStats> {
    let mut stats = TransformStats::default();

    extract_archive(archive_path, |entry| {
        let relative = entry.relative_path().to_path_buf();
        let content = entry.read()?;
        match chain.apply(&relative, &content)? {
            Some(bytes) => {
                entry.write(&dest_dir.join(&relative), Some(bytes.as_ref()))?;
                stats.written += 1;
            }
            None => stats.excluded += 1,
        }
        Ok(())
    })?;

    info!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        written = stats.written,
        excluded = stats.excluded,
        "archive extracted through rules"
    );
    Ok(stats)
}
