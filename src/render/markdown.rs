//! Markdown rendering of extraction results, for human review.

use crate::model::{ExtractionResult, ImageEntry, TableEntry, TextEntry};

use super::RenderOptions;

/// Convert an extraction result to Markdown.
pub fn to_markdown(result: &ExtractionResult, options: &RenderOptions) -> String {
    MarkdownRenderer::new(options.clone()).render(result)
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render pages in order, then tables, then images.
    pub fn render(&self, result: &ExtractionResult) -> String {
        let mut output = String::new();

        if self.options.include_frontmatter {
            output.push_str(&frontmatter(result));
        }

        let selection = &self.options.page_selection;
        let texts: Vec<&TextEntry> = result
            .text
            .iter()
            .filter(|t| selection.includes(t.page))
            .collect();
        let tables: Vec<&TableEntry> = result
            .table
            .iter()
            .filter(|t| t.page.iter().any(|&p| selection.includes(p)))
            .collect();
        let images: Vec<&ImageEntry> = result
            .image
            .iter()
            .filter(|i| selection.includes(i.page))
            .collect();

        for entry in texts {
            output.push_str(&format!("## Page {} ({})\n\n", entry.page, entry.source));
            output.push_str(entry.content.trim());
            output.push_str("\n\n");
        }

        if !tables.is_empty() {
            output.push_str("## Tables\n\n");
            for table in tables {
                output.push_str(&format!(
                    "### {} (pages {})\n\n",
                    escape_heading(&table.title),
                    join_pages(&table.page)
                ));
                if self.options.include_sources {
                    for source in &table.source {
                        output.push_str(&format!("- `{}`\n", source));
                    }
                    output.push('\n');
                }
                output.push_str("```text\n");
                output.push_str(table.content.trim());
                output.push_str("\n```\n\n");
            }
        }

        if !images.is_empty() {
            output.push_str("## Images\n\n");
            for image in images {
                output.push_str(&format!("### Page {} image\n\n", image.page));
                if self.options.include_sources {
                    output.push_str(&format!("![]({})\n\n", image.source));
                }
                output.push_str(image.content.trim());
                output.push_str("\n\n");
            }
        }

        output.trim().to_string()
    }
}

fn frontmatter(result: &ExtractionResult) -> String {
    let mut lines = vec!["---".to_string()];
    if !result.document.is_empty() {
        lines.push(format!("document: \"{}\"", escape_yaml(&result.document)));
    }
    lines.push(format!("pages: {}", result.page_count));
    if !result.rotated_pages.is_empty() {
        lines.push(format!("rotated_pages: [{}]", join_pages(&result.rotated_pages)));
    }
    if let Some(at) = result.processed_at {
        lines.push(format!("processed_at: {}", at.to_rfc3339()));
    }
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(String::new());
    lines.join("\n")
}

fn join_pages(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Titles may span several OCR lines.
fn escape_heading(s: &str) -> String {
    s.lines().map(str::trim).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TextEntry, TextSource};
    use crate::parser::PageSelection;

    fn sample() -> ExtractionResult {
        let mut result = ExtractionResult::new("annual \"2023\"", 4);
        result.rotated_pages = vec![3];
        result.text.push(TextEntry {
            page: 1,
            source: TextSource::Native,
            content: "Letter to shareholders\n".into(),
        });
        result.table.push(TableEntry {
            page: vec![2, 3],
            source: vec!["out/tables/page2_table1.png".into()],
            title: "Table 1\nIncome".into(),
            content: "table title: Table 1".into(),
        });
        result.image.push(ImageEntry {
            page: 4,
            source: "out/images/page4_img1.png".into(),
            content: "A bar chart".into(),
        });
        result
    }

    #[test]
    fn test_sections() {
        let md = to_markdown(&sample(), &RenderOptions::default());
        assert!(md.starts_with("## Page 1 (ori)\n\nLetter to shareholders"));
        assert!(md.contains("### Table 1 Income (pages 2, 3)"));
        assert!(md.contains("- `out/tables/page2_table1.png`"));
        assert!(md.contains("![](out/images/page4_img1.png)"));
    }

    #[test]
    fn test_frontmatter_and_selection() {
        let options = RenderOptions::new()
            .with_frontmatter(true)
            .with_sources(false)
            .with_pages(PageSelection::Pages(vec![3]));
        let md = to_markdown(&sample(), &options);
        assert!(md.starts_with("---\ndocument: \"annual \\\"2023\\\"\""));
        assert!(md.contains("rotated_pages: [3]"));
        assert!(!md.contains("## Page 1"));
        assert!(md.contains("(pages 2, 3)"));
        assert!(!md.contains("## Images"));
        assert!(!md.contains("page2_table1.png"));
    }
}
