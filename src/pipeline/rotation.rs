//! Persisting orientation fixes back into the source PDF.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Pages whose raster had to be turned upright during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationLedger {
    pages: BTreeSet<u32>,
}

impl RotationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a page. Returns `false` if it was already recorded.
    pub fn record(&mut self, page: u32) -> bool {
        self.pages.insert(page)
    }

    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }

    /// Recorded pages, ascending.
    pub fn pages(&self) -> Vec<u32> {
        self.pages.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromIterator<u32> for RotationLedger {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Effective `/Rotate` of a page, following `/Parent` for the inherited value.
pub(crate) fn page_rotation(doc: &LopdfDocument, page_id: ObjectId) -> i64 {
    let mut id = page_id;
    for _ in 0..32 {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Ok(rotate) = dict.get(b"Rotate") {
            return rotate
                .as_i64()
                .or_else(|_| rotate.as_float().map(|f| f as i64))
                .unwrap_or(0);
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => id = parent,
            Err(_) => break,
        }
    }
    0
}

/// Effective rotation of every page in `path`, in degrees.
pub fn read_rotations<P: AsRef<Path>>(path: P) -> Result<BTreeMap<u32, i64>> {
    let doc = LopdfDocument::load(path.as_ref())?;
    Ok(doc
        .get_pages()
        .into_iter()
        .map(|(n, id)| (n, page_rotation(&doc, id)))
        .collect())
}

/// Add 90 degrees to the `/Rotate` of every page in `ledger` and replace
/// `path` with the result.
///
/// The new document is written to a temporary file next to the original and
/// renamed over it, so the source is either fully old or fully new.
pub fn commit_rotations<P: AsRef<Path>>(path: P, ledger: &RotationLedger) -> Result<()> {
    let path = path.as_ref();
    if ledger.is_empty() {
        return Ok(());
    }

    let mut doc = LopdfDocument::load(path)?;
    let pages = doc.get_pages();
    for page in ledger.pages() {
        let id = *pages
            .get(&page)
            .ok_or(Error::PageOutOfRange(page, pages.len() as u32))?;
        let current = page_rotation(&doc, id);
        let next = (current + 90).rem_euclid(360);
        doc.get_object_mut(id)
            .and_then(Object::as_dict_mut)?
            .set("Rotate", Object::Integer(next));
        log::info!("Page {}: /Rotate {} -> {}", page, current, next);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        doc.save_to(&mut writer)
            .map_err(|e| Error::RotationCommit(e.to_string()))?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), fs::metadata(path)?.permissions())?;
    tmp.persist(path)
        .map_err(|e| Error::RotationCommit(e.error.to_string()))?;

    log::info!(
        "Rewrote {} with {} rotated page(s)",
        path.display(),
        ledger.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_is_ordered_set() {
        let mut ledger = RotationLedger::new();
        assert!(ledger.record(5));
        assert!(ledger.record(2));
        assert!(!ledger.record(5));
        assert_eq!(ledger.pages(), vec![2, 5]);
        assert!(ledger.contains(2));
    }

    #[test]
    fn test_empty_ledger_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        // Nothing to do, so the missing file is never opened.
        assert!(commit_rotations(&path, &RotationLedger::new()).is_ok());
    }
}
