//! Rendering options.

use crate::parser::PageSelection;

/// Options for the Markdown rendering of an extraction result.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Include YAML frontmatter with run metadata
    pub include_frontmatter: bool,

    /// List artifact paths under each table and image
    pub include_sources: bool,

    /// Page selection; tables are kept when any member page is selected
    pub page_selection: PageSelection,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Enable or disable artifact paths.
    pub fn with_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, selection: PageSelection) -> Self {
        self.page_selection = selection;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_frontmatter: false,
            include_sources: true,
            page_selection: PageSelection::All,
        }
    }
}
