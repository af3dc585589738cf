//! Page rasterization.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;

use crate::error::{Error, Result};

/// Renders one PDF page to pixels.
pub trait PageRasterizer: Send + Sync {
    fn render(&self, pdf: &Path, page: u32) -> Result<DynamicImage>;
}

/// Renders pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            dpi: 200,
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn render(&self, pdf: &Path, page: u32) -> Result<DynamicImage> {
        let fail = |reason: String| Error::Rasterize { page, reason };

        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("page");
        let page_arg = page.to_string();

        let output = Command::new(&self.binary)
            .args(["-f", &page_arg, "-l", &page_arg])
            .args(["-r", &self.dpi.to_string()])
            .args(["-png", "-singlefile"])
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| fail(format!("failed to run {}: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let rendered = prefix.with_extension("png");
        image::open(&rendered).map_err(|e| fail(e.to_string()))
    }
}
