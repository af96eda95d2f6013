//! Archive discovery and ordering

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rotolog_core::{Error, Result};

/// One rotated-out archive on disk.
#[derive(Debug, Clone)]
pub(crate) struct ArchiveEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl Ord for ArchiveEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.modified
            .cmp(&other.modified)
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for ArchiveEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ArchiveEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArchiveEntry {}

/// Archives tracked by one rotator, oldest first, with a running byte total.
#[derive(Debug, Default)]
pub(crate) struct ArchiveSet {
    heap: BinaryHeap<Reverse<ArchiveEntry>>,
    total_bytes: u64,
}

impl ArchiveSet {
    pub(crate) fn push(&mut self, entry: ArchiveEntry) {
        self.total_bytes += entry.size;
        self.heap.push(Reverse(entry));
    }

    /// Removes and returns the entry with the earliest modification time.
    pub(crate) fn pop_oldest(&mut self) -> Option<ArchiveEntry> {
        let Reverse(entry) = self.heap.pop()?;
        self.total_bytes -= entry.size;
        Some(entry)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

/// Builds an [`ArchiveSet`] from every file matching `pattern`, skipping
/// `exclude` (the live current file). Aborts on the first unreadable match
/// rather than returning a partial inventory, since evicting from an
/// incomplete set could delete the wrong files.
pub(crate) fn scan_archives(pattern: &str, exclude: &Path) -> Result<ArchiveSet> {
    let matches = glob::glob(pattern)
        .map_err(|e| Error::scan(format!("bad pattern '{}': {}", pattern, e)))?;

    let mut set = ArchiveSet::default();
    for entry in matches {
        let path = entry.map_err(|e| Error::scan(format!("unreadable match: {}", e)))?;
        if path == exclude {
            continue;
        }
        let meta = fs::metadata(&path)
            .map_err(|e| Error::scan(format!("cannot stat {}: {}", path.display(), e)))?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map_err(|e| Error::scan(format!("no mtime for {}: {}", path.display(), e)))?;
        set.push(ArchiveEntry {
            path,
            size: meta.len(),
            modified,
        });
    }
    Ok(set)
}
