//! Owned handles to every external engine a pipeline run needs.

use crate::error::{Error, Result};
use crate::pipeline::PipelineConfig;
use crate::tables::{
    ModelRegionStrategy, RegionStrategyKind, StructuralRegionStrategy, TableRegionStrategy,
};

use super::detector::CommandTableDetector;
use super::ocr::{OcrEngine, TesseractOcr};
use super::raster::{PageRasterizer, PdftoppmRasterizer};
use super::summarize::Summarizer;

/// Engine handles for a [`DocumentPipeline`](crate::DocumentPipeline).
///
/// Handles are loaded when the context is built and released when it is
/// dropped. One context can serve any number of document runs.
pub struct PipelineContext {
    pub(crate) rasterizer: Box<dyn PageRasterizer>,
    pub(crate) ocr: Box<dyn OcrEngine>,
    pub(crate) summarizer: Box<dyn Summarizer>,
    pub(crate) region_strategy: Box<dyn TableRegionStrategy>,
}

impl PipelineContext {
    pub fn builder() -> PipelineContextBuilder {
        PipelineContextBuilder::default()
    }

    /// Build the system engines described by `config`.
    ///
    /// Uses `pdftoppm` and `tesseract` from `PATH`, an Ollama summarizer
    /// when the `ollama` feature is enabled, and the configured table
    /// region strategy.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let region_strategy: Box<dyn TableRegionStrategy> = match config.strategy {
            RegionStrategyKind::Structural => Box::new(StructuralRegionStrategy::new()),
            RegionStrategyKind::Model => {
                let command = config.detector_command.as_deref().ok_or_else(|| {
                    Error::Config("model strategy requires a detector command".to_string())
                })?;
                let model = CommandTableDetector::from_command_line(command)?;
                Box::new(ModelRegionStrategy::new(
                    Box::new(model),
                    config.region.confidence_floor,
                ))
            }
        };

        Self::builder()
            .rasterizer(PdftoppmRasterizer::new().with_dpi(config.dpi))
            .ocr(TesseractOcr::new(config.ocr_languages.clone()))
            .summarizer_boxed(default_summarizer(config)?)
            .region_strategy_boxed(region_strategy)
            .build()
    }

    pub fn rasterizer(&self) -> &dyn PageRasterizer {
        self.rasterizer.as_ref()
    }

    pub fn ocr(&self) -> &dyn OcrEngine {
        self.ocr.as_ref()
    }

    pub fn summarizer(&self) -> &dyn Summarizer {
        self.summarizer.as_ref()
    }

    pub fn region_strategy(&self) -> &dyn TableRegionStrategy {
        self.region_strategy.as_ref()
    }
}

impl Drop for PipelineContext {
    fn drop(&mut self) {
        log::debug!("Releasing pipeline engines");
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("region_strategy", &self.region_strategy.name())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "ollama")]
fn default_summarizer(config: &PipelineConfig) -> Result<Box<dyn Summarizer>> {
    use super::summarize::OllamaSummarizer;

    let summarizer = OllamaSummarizer::with_timeout(
        config.ollama_host.clone(),
        config.model.clone(),
        std::time::Duration::from_secs(config.summary_timeout_secs),
    )?;
    Ok(Box::new(summarizer))
}

#[cfg(not(feature = "ollama"))]
fn default_summarizer(_config: &PipelineConfig) -> Result<Box<dyn Summarizer>> {
    log::warn!("Built without the `ollama` feature; summaries will be error markers");
    Ok(Box::new(super::summarize::DisabledSummarizer))
}

/// Builder for [`PipelineContext`]. All four engines are required.
#[derive(Default)]
pub struct PipelineContextBuilder {
    rasterizer: Option<Box<dyn PageRasterizer>>,
    ocr: Option<Box<dyn OcrEngine>>,
    summarizer: Option<Box<dyn Summarizer>>,
    region_strategy: Option<Box<dyn TableRegionStrategy>>,
}

impl PipelineContextBuilder {
    pub fn rasterizer(mut self, rasterizer: impl PageRasterizer + 'static) -> Self {
        self.rasterizer = Some(Box::new(rasterizer));
        self
    }

    pub fn ocr(mut self, ocr: impl OcrEngine + 'static) -> Self {
        self.ocr = Some(Box::new(ocr));
        self
    }

    pub fn summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Some(Box::new(summarizer));
        self
    }

    pub fn summarizer_boxed(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn region_strategy(mut self, strategy: impl TableRegionStrategy + 'static) -> Self {
        self.region_strategy = Some(Box::new(strategy));
        self
    }

    pub fn region_strategy_boxed(mut self, strategy: Box<dyn TableRegionStrategy>) -> Self {
        self.region_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<PipelineContext> {
        let missing = |what: &str| Error::Config(format!("pipeline context is missing {}", what));
        Ok(PipelineContext {
            rasterizer: self.rasterizer.ok_or_else(|| missing("a rasterizer"))?,
            ocr: self.ocr.ok_or_else(|| missing("an OCR engine"))?,
            summarizer: self.summarizer.ok_or_else(|| missing("a summarizer"))?,
            region_strategy: self
                .region_strategy
                .ok_or_else(|| missing("a table region strategy"))?,
        })
    }
}
