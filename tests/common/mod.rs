//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use pdfsift::engine::{OcrBox, OcrEngine, PageRasterizer, PipelineContext, Summarizer};
use pdfsift::error::{Error, Result};
use pdfsift::model::{BBox, EmbeddedImage, Page, Quad};
use pdfsift::parser::{DocumentSource, TextSpan};
use pdfsift::tables::{Detection, TableRegionStrategy};

/// Raster size every mock page renders at.
pub const RASTER_W: u32 = 200;
pub const RASTER_H: u32 = 300;

/// One synthetic page.
#[derive(Clone, Default)]
pub struct MockPage {
    pub text: String,
    pub spans: Vec<TextSpan>,
    pub images: Vec<EmbeddedImage>,
}

impl MockPage {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// A page whose spans line up into a two-column table.
    pub fn table() -> Self {
        let span = |text: &str, x: f32, y: f32| TextSpan {
            text: text.to_string(),
            x,
            y,
            width: text.len() as f32 * 6.0,
            font_size: 12.0,
        };
        Self {
            text: "Region Sales North 30 South 25".to_string(),
            spans: vec![
                span("Region", 10.0, 500.0),
                span("Sales", 60.0, 500.0),
                span("North", 10.0, 485.0),
                span("30", 60.0, 485.0),
                span("South", 10.0, 470.0),
                span("25", 60.0, 470.0),
            ],
            ..Default::default()
        }
    }

    /// A page whose text layer is all `(cid:N)` references.
    pub fn garbled() -> Self {
        Self::text(&"(cid:12)".repeat(25))
    }

    pub fn with_image(mut self, image: EmbeddedImage) -> Self {
        self.images.push(image);
        self
    }
}

/// In-memory [`DocumentSource`].
pub struct MockSource {
    path: PathBuf,
    pages: BTreeMap<u32, MockPage>,
}

impl MockSource {
    pub fn new(path: impl Into<PathBuf>, pages: Vec<MockPage>) -> Self {
        Self {
            path: path.into(),
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, p)| (i as u32 + 1, p))
                .collect(),
        }
    }

    fn page(&self, page: u32) -> Result<&MockPage> {
        self.pages
            .get(&page)
            .ok_or(Error::PageOutOfRange(page, self.pages.len() as u32))
    }
}

impl DocumentSource for MockSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    fn page_size(&self, page: u32) -> Result<(f32, f32)> {
        self.page(page)?;
        Ok((612.0, 792.0))
    }

    fn native_text(&self, page: u32) -> Result<String> {
        Ok(self.page(page)?.text.clone())
    }

    fn text_spans(&self, page: u32) -> Result<Vec<TextSpan>> {
        Ok(self.page(page)?.spans.clone())
    }

    fn embedded_images(&self, page: u32) -> Result<Vec<EmbeddedImage>> {
        Ok(self.page(page)?.images.clone())
    }
}

/// Renders blank rasters; sideways pages come out landscape.
pub struct BlankRasterizer {
    sideways: Vec<u32>,
}

impl BlankRasterizer {
    pub fn new() -> Self {
        Self {
            sideways: Vec::new(),
        }
    }

    pub fn with_sideways(pages: Vec<u32>) -> Self {
        Self { sideways: pages }
    }
}

impl PageRasterizer for BlankRasterizer {
    fn render(&self, _pdf: &Path, page: u32) -> Result<DynamicImage> {
        if self.sideways.contains(&page) {
            Ok(DynamicImage::new_rgb8(RASTER_H, RASTER_W))
        } else {
            Ok(DynamicImage::new_rgb8(RASTER_W, RASTER_H))
        }
    }
}

/// OCR driven by a closure over the image it is handed.
pub struct ScriptedOcr {
    script: Box<dyn Fn(&DynamicImage) -> Result<Vec<OcrBox>> + Send + Sync>,
}

impl ScriptedOcr {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&DynamicImage) -> Result<Vec<OcrBox>> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
        }
    }

    /// Two confident horizontal lines on every image.
    pub fn lines() -> Self {
        Self::new(|_| Ok(horizontal_lines(&["Revenue 120", "Cost 80"], 0.9)))
    }

    /// Single characters on landscape rasters, ordinary lines otherwise.
    pub fn sideways_on_landscape() -> Self {
        Self::new(|image| {
            if image.width() > image.height() {
                Ok(horizontal_lines(&["R", "e", "v", "1", "2", "0"], 0.9))
            } else {
                Ok(horizontal_lines(&["Revenue 120", "Cost 80"], 0.9))
            }
        })
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrBox>> {
        (self.script)(image)
    }
}

/// Stacked horizontal line boxes with the given texts.
pub fn horizontal_lines(texts: &[&str], confidence: f32) -> Vec<OcrBox> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let y = 10.0 + i as f32 * 20.0;
            OcrBox::new(
                Quad::from_rect(10.0, y, 150.0, y + 14.0),
                text.to_string(),
                confidence,
            )
        })
        .collect()
}

/// Returns the same boxes, in raster pixels, on every table page.
pub struct FixedRegions {
    boxes: Vec<BBox>,
}

impl FixedRegions {
    pub fn new(boxes: Vec<BBox>) -> Self {
        Self { boxes }
    }
}

impl TableRegionStrategy for FixedRegions {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn regions(&self, _page: &Page, _raster: &DynamicImage) -> Result<Vec<Detection>> {
        Ok(self
            .boxes
            .iter()
            .map(|b| Detection::new(*b, 0.95, 0))
            .collect())
    }
}

/// Records prompts and answers with a canned summary.
#[derive(Clone, Default)]
pub struct RecordingSummarizer {
    pub calls: Arc<Mutex<Vec<(Vec<PathBuf>, String)>>>,
}

impl RecordingSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Summarizer for RecordingSummarizer {
    fn summarize(&self, images: &[PathBuf], prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((images.to_vec(), prompt.to_string()));
        Ok("canned summary".to_string())
    }
}

/// Every call fails.
pub struct FailingSummarizer;

impl Summarizer for FailingSummarizer {
    fn summarize(&self, _images: &[PathBuf], _prompt: &str) -> Result<String> {
        Err(Error::Summarize("model unavailable".to_string()))
    }
}

/// Context with a blank rasterizer, line OCR, the given regions and summarizer.
pub fn context(boxes: Vec<BBox>, summarizer: impl Summarizer + 'static) -> PipelineContext {
    PipelineContext::builder()
        .rasterizer(BlankRasterizer::new())
        .ocr(ScriptedOcr::lines())
        .region_strategy(FixedRegions::new(boxes))
        .summarizer(summarizer)
        .build()
        .unwrap()
}

/// 4x4 gray image stored as raw samples.
pub fn gray_image(name: &str) -> EmbeddedImage {
    EmbeddedImage::new(
        name,
        vec![128; 16],
        pdfsift::model::ImageEncoding::Raw {
            color_space: "DeviceGray".to_string(),
            bits_per_component: 8,
        },
    )
    .with_dimensions(4, 4)
}

/// Write a PDF with one single-line text page per entry of `pages`.
///
/// `rotate` is set on the page tree root, so every page inherits it.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str], rotate: Option<i64>) -> PathBuf {
    let pages: Vec<Vec<(&str, i64, i64)>> = pages.iter().map(|t| vec![(*t, 72, 700)]).collect();
    write_span_pdf(dir, name, &pages, rotate)
}

/// Spans laid out as a two-column, three-row table.
pub fn table_spans() -> Vec<(&'static str, i64, i64)> {
    vec![
        ("Region", 72, 700),
        ("Sales", 200, 700),
        ("North", 72, 685),
        ("30", 200, 685),
        ("South", 72, 670),
        ("25", 200, 670),
    ]
}

/// Write a PDF whose pages hold the given `(text, x, y)` spans.
pub fn write_span_pdf(
    dir: &Path,
    name: &str,
    pages: &[Vec<(&str, i64, i64)>],
    rotate: Option<i64>,
) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for spans in pages {
        let mut operations = Vec::new();
        for (text, x, y) in spans {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![(*x).into(), (*y).into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let mut tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    if let Some(angle) = rotate {
        tree.set("Rotate", angle);
    }
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}
