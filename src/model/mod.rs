//! Data model shared by the pipeline stages.
//!
//! Pages and table blocks live only for one pipeline run; the
//! [`ExtractionResult`] is what survives it.

mod geometry;
mod page;
mod resource;
mod result;
mod table;

pub use geometry::{union_area, BBox, BoxMargins, Point, Quad};
pub use page::{Page, PageScan};
pub use resource::{EmbeddedImage, ImageEncoding};
pub use result::{ExtractionResult, ImageEntry, TableEntry, TextEntry, TextSource};
pub use table::{TableBlock, TableGroup, NO_TITLE};
