//! Instruction prompts sent with each summarization call.

/// System prompt for every summarization request.
pub const SYSTEM_PROMPT: &str = "You extract content from page images, figures and table images. \
Describe, as a narrator, the data and text each image contains, such as figures and wording. \
For charts, also explain their trends and key values.";

/// Prompt for a page that fell back to OCR.
pub fn page_prompt(ocr_text: &str) -> String {
    format!(
        "The image is one page of a PDF document. Text recognized on it:\n{}\n\
         State the key points of the content directly, listing its logic and sections. \
         Do not add an introduction or commentary.",
        ocr_text.trim()
    )
}

/// Prompt for an embedded image that carried legible text.
pub fn image_prompt() -> &'static str {
    "Describe the image. If it is a chart, name the chart type, what the X and Y axes mean, \
     the trends and key changes. Otherwise describe its main components and important information."
}

/// Prompt for one logical table.
pub fn table_prompt(title: &str, ocr_text: &str) -> String {
    format!(
        "Table title: {}\nOCR content:\n{}\n\
         Summarize as follows:\n1. Subject of the table\n2. Meaning of each column\n\
         3. Data trends and key points",
        title, ocr_text
    )
}
