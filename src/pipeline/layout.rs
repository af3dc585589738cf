//! Artifact directory layout for one document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const IMAGES_DIR: &str = "images";
const TABLES_DIR: &str = "tables";
const OCR_FALLBACK_DIR: &str = "ocr_fallback";

/// `{output_root}/{stem}/` with `images/`, `tables/` and `ocr_fallback/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    /// Describe the layout without touching the filesystem.
    pub fn new(output_root: impl AsRef<Path>, stem: &str) -> Self {
        Self {
            dir: output_root.as_ref().join(stem),
        }
    }

    /// Create the layout directories.
    pub fn create(output_root: impl AsRef<Path>, stem: &str) -> Result<Self> {
        let layout = Self::new(output_root, stem);
        for sub in [IMAGES_DIR, TABLES_DIR, OCR_FALLBACK_DIR] {
            fs::create_dir_all(layout.dir.join(sub))?;
        }
        Ok(layout)
    }

    /// Create the layout for `pdf`, scoped to its file stem.
    pub fn for_document(output_root: impl AsRef<Path>, pdf: &Path) -> Result<Self> {
        Self::create(output_root, &document_stem(pdf)?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `tables/page{N}_table{M}.png`
    pub fn table_path(&self, page: u32, index: usize) -> PathBuf {
        self.dir
            .join(TABLES_DIR)
            .join(format!("page{}_table{}.png", page, index))
    }

    /// `ocr_fallback/page_{N}.png`
    pub fn fallback_path(&self, page: u32) -> PathBuf {
        self.dir
            .join(OCR_FALLBACK_DIR)
            .join(format!("page_{}.png", page))
    }

    /// `images/page{N}_img{M}.{ext}`
    pub fn image_path(&self, page: u32, index: usize, ext: &str) -> PathBuf {
        self.dir
            .join(IMAGES_DIR)
            .join(format!("page{}_img{}.{}", page, index, ext))
    }

    /// Default location of the serialized result.
    pub fn result_path(&self) -> PathBuf {
        self.dir.join("result.json")
    }
}

/// Base name of `pdf` without extension.
pub fn document_stem(pdf: &Path) -> Result<String> {
    pdf.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Config(format!("no file name in {}", pdf.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names() {
        let layout = OutputLayout::new("/out", "annual");
        assert_eq!(
            layout.table_path(2, 1),
            PathBuf::from("/out/annual/tables/page2_table1.png")
        );
        assert_eq!(
            layout.fallback_path(7),
            PathBuf::from("/out/annual/ocr_fallback/page_7.png")
        );
        assert_eq!(
            layout.image_path(3, 2, "jpg"),
            PathBuf::from("/out/annual/images/page3_img2.jpg")
        );
    }

    #[test]
    fn test_for_document_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::for_document(dir.path(), Path::new("/data/Q3 report.pdf")).unwrap();
        assert_eq!(layout.dir(), dir.path().join("Q3 report"));
        for sub in ["images", "tables", "ocr_fallback"] {
            assert!(layout.dir().join(sub).is_dir());
        }
    }

    #[test]
    fn test_stem_required() {
        assert!(document_stem(Path::new("/")).is_err());
    }
}
