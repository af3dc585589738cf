//! Pipeline configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::DEFAULT_CID_THRESHOLD;
use crate::error::{Error, Result};
use crate::extract::{ExtractConfig, TextMode};
use crate::orientation::OrientationConfig;
use crate::parser::PageSelection;
use crate::tables::{GroupingRules, RegionConfig, RegionStrategyKind};

/// Options for a [`DocumentPipeline`](crate::DocumentPipeline).
///
/// Every field has a default, so a JSON config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Artifacts go to `{output_root}/{file_stem}/`
    pub output_root: PathBuf,

    /// Summarization model identifier
    pub model: String,

    /// Ollama server base URL
    pub ollama_host: String,

    /// Per-request summarization timeout, in seconds
    pub summary_timeout_secs: u64,

    /// Garbage glyphs at which native text is replaced by OCR
    pub cid_threshold: usize,

    /// Pages to process
    pub pages: PageSelection,

    /// Render resolution for page rasters
    pub dpi: u32,

    /// Tesseract language spec
    pub ocr_languages: String,

    /// How table regions are found on table pages
    pub strategy: RegionStrategyKind,

    /// External detector command line (model strategy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector_command: Option<Vec<String>>,

    pub region: RegionConfig,
    pub grouping: GroupingRules,
    pub orientation: OrientationConfig,
    pub extract: ExtractConfig,

    /// Table pages covering less than this share of the raster also get
    /// text and image extraction
    pub table_area_ratio: f32,

    /// Render only pages that need a raster
    pub lazy_render: bool,

    /// Scan pages on the rayon pool
    pub parallel: bool,

    /// Write corrected rotations back to the source PDF
    pub commit_rotations: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            model: "gemma3:27b".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            summary_timeout_secs: 300,
            cid_threshold: DEFAULT_CID_THRESHOLD,
            pages: PageSelection::All,
            dpi: 200,
            ocr_languages: "chi_tra+eng".to_string(),
            strategy: RegionStrategyKind::default(),
            detector_command: None,
            region: RegionConfig::default(),
            grouping: GroupingRules::default(),
            orientation: OrientationConfig::default(),
            extract: ExtractConfig::default(),
            table_area_ratio: 0.5,
            lazy_render: true,
            parallel: true,
            commit_rotations: true,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file; missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.region.confidence_floor) {
            return Err(Error::Config(format!(
                "confidence floor {} is outside [0, 1]",
                self.region.confidence_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.table_area_ratio) {
            return Err(Error::Config(format!(
                "table area ratio {} is outside [0, 1]",
                self.table_area_ratio
            )));
        }
        if self.dpi == 0 {
            return Err(Error::Config("dpi must be positive".to_string()));
        }
        if self.strategy == RegionStrategyKind::Model
            && self.detector_command.as_ref().map_or(true, Vec::is_empty)
        {
            return Err(Error::Config(
                "model strategy requires a detector command".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_ollama_host(mut self, host: impl Into<String>) -> Self {
        self.ollama_host = host.into();
        self
    }

    pub fn with_cid_threshold(mut self, threshold: usize) -> Self {
        self.cid_threshold = threshold;
        self
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_ocr_languages(mut self, languages: impl Into<String>) -> Self {
        self.ocr_languages = languages.into();
        self
    }

    pub fn with_strategy(mut self, strategy: RegionStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_detector_command(mut self, command: Vec<String>) -> Self {
        self.detector_command = Some(command);
        self
    }

    pub fn with_region(mut self, region: RegionConfig) -> Self {
        self.region = region;
        self
    }

    pub fn with_grouping(mut self, rules: GroupingRules) -> Self {
        self.grouping = rules;
        self
    }

    pub fn with_orientation(mut self, orientation: OrientationConfig) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_text_mode(mut self, mode: TextMode) -> Self {
        self.extract.text_mode = mode;
        self
    }

    pub fn with_table_area_ratio(mut self, ratio: f32) -> Self {
        self.table_area_ratio = ratio;
        self
    }

    pub fn with_lazy_render(mut self, lazy: bool) -> Self {
        self.lazy_render = lazy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_commit_rotations(mut self, commit: bool) -> Self {
        self.commit_rotations = commit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.cid_threshold, 20);
        assert_eq!(config.region.confidence_floor, 0.6);
        assert_eq!(config.table_area_ratio, 0.5);
        assert_eq!(config.grouping.width_tolerance, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model": "llava:13b", "pages": "2-4", "region": {{"confidence_floor": 0.7}},
                "extract": {{"text_mode": "summary_only"}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.model, "llava:13b");
        assert_eq!(config.pages, PageSelection::Range(2..=4));
        assert_eq!(config.region.confidence_floor, 0.7);
        assert_eq!(config.region.margins, crate::model::BoxMargins::default());
        assert_eq!(config.extract.text_mode, TextMode::SummaryOnly);
        assert_eq!(config.dpi, 200);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = PipelineConfig::new().with_table_area_ratio(1.5);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = PipelineConfig::new().with_strategy(RegionStrategyKind::Model);
        assert!(config.validate().is_err());
        let config = config.with_detector_command(vec!["detect-tables".into()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dpi": "high"}}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(file.path()),
            Err(Error::Config(_))
        ));
    }
}
