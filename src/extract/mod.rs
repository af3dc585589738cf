//! Page content extraction and the prompts it sends.

mod page;
mod prompts;

pub use page::{ExtractConfig, PageContentExtractor, PageExtraction, TextMode};
pub use prompts::{image_prompt, page_prompt, table_prompt, SYSTEM_PROMPT};
