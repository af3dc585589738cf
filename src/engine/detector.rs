//! Table detection model interface.

use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Raw output of a DETR-style object detector for one image.
///
/// `logits[q]` holds one score per class for query `q`; the last class is
/// "no object". `boxes[q]` is `[cx, cy, w, h]` normalized to `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetections {
    pub logits: Vec<Vec<f32>>,
    pub boxes: Vec<[f32; 4]>,
}

impl RawDetections {
    pub fn len(&self) -> usize {
        self.logits.len().min(self.boxes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A model that finds tables in a page raster.
pub trait TableDetectionModel: Send + Sync {
    fn infer(&self, image: &DynamicImage) -> Result<RawDetections>;
}

/// Runs an external detector process.
///
/// The image is written to a temporary PNG whose path is appended to the
/// command line; the process must print a [`RawDetections`] JSON object on
/// stdout.
#[derive(Debug, Clone)]
pub struct CommandTableDetector {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTableDetector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Build from a full command line, program first.
    pub fn from_command_line(parts: &[String]) -> Result<Self> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| Error::Config("detector command is empty".to_string()))?;
        Ok(Self::new(program).with_args(args.iter().cloned()))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl TableDetectionModel for CommandTableDetector {
    fn infer(&self, image: &DynamicImage) -> Result<RawDetections> {
        let input = tempfile::Builder::new()
            .prefix("pdfsift-detect-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), image::ImageFormat::Png)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input.path())
            .output()
            .map_err(|e| {
                Error::Detection(format!("failed to run {}: {}", self.program.display(), e))
            })?;
        if !output.status.success() {
            return Err(Error::Detection(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Detection(format!("malformed detector output: {}", e)))
    }
}
