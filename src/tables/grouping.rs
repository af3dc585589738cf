//! Cross-page table stitching.
//!
//! A table that runs over a page break is detected as one block per page.
//! Blocks are chained greedily: a block continues the open group only when
//! it sits on the next page, has nearly the same width and carries no title
//! of its own. Requiring all three keeps distinct tables apart at the cost
//! of sometimes splitting a real continuation.

use serde::{Deserialize, Serialize};

use crate::model::{TableBlock, TableGroup};

/// Continuation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingRules {
    /// Exact page difference between consecutive members
    pub page_step: u32,
    /// Maximum relative width change, exclusive
    pub width_tolerance: f32,
    /// Only untitled blocks may continue a group
    pub require_untitled_continuation: bool,
}

impl Default for GroupingRules {
    fn default() -> Self {
        Self {
            page_step: 1,
            width_tolerance: 0.1,
            require_untitled_continuation: true,
        }
    }
}

impl GroupingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_width_tolerance(mut self, tolerance: f32) -> Self {
        self.width_tolerance = tolerance;
        self
    }

    pub fn with_page_step(mut self, step: u32) -> Self {
        self.page_step = step;
        self
    }

    pub fn with_require_untitled_continuation(mut self, require: bool) -> Self {
        self.require_untitled_continuation = require;
        self
    }

    /// Whether `curr` continues a group whose last member is `prev`.
    pub fn continues(&self, prev: &TableBlock, curr: &TableBlock) -> bool {
        let contiguous = curr.page == prev.page.saturating_add(self.page_step);
        let similar_width =
            (curr.width - prev.width).abs() / prev.width.max(1.0) < self.width_tolerance;
        let untitled = !self.require_untitled_continuation || !curr.has_title();
        contiguous && similar_width && untitled
    }
}

/// Groups page-sorted table blocks into logical tables.
#[derive(Debug, Clone, Default)]
pub struct TableGroupAggregator {
    rules: GroupingRules,
}

impl TableGroupAggregator {
    pub fn new(rules: GroupingRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GroupingRules {
        &self.rules
    }

    /// Group `blocks`. They are stably sorted by page first, so blocks on
    /// the same page keep their detection order.
    pub fn group(&self, mut blocks: Vec<TableBlock>) -> Vec<TableGroup> {
        blocks.sort_by_key(|b| b.page);

        let mut groups: Vec<TableGroup> = Vec::new();
        for block in blocks {
            let continues = groups
                .last()
                .and_then(TableGroup::last)
                .is_some_and(|prev| self.rules.continues(prev, &block));
            match groups.last_mut() {
                Some(open) if continues => open.blocks.push(block),
                _ => {
                    log::trace!("Page {}: new table group", block.page);
                    groups.push(TableGroup::seed(block));
                }
            }
        }

        log::debug!(
            "Grouped tables into {} group(s): {:?}",
            groups.len(),
            groups.iter().map(TableGroup::pages).collect::<Vec<_>>()
        );
        groups
    }
}

/// Group with the default rules.
pub fn group_tables(blocks: Vec<TableBlock>) -> Vec<TableGroup> {
    TableGroupAggregator::default().group(blocks)
}
