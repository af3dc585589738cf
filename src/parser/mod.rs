//! PDF access: page facts, text spans and structural table detection.

mod layout;
mod options;
mod pdf_parser;
mod source;
mod table_detector;

pub use layout::{estimate_width, extract_page_spans, is_spaceless_script_char, TextSpan};
pub use options::PageSelection;
pub use pdf_parser::PdfSource;
pub use source::DocumentSource;
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};
