//! Raster table detection and cross-page grouping.

mod detection;
mod grouping;
mod region;
mod strategy;

pub use detection::{post_process, Detection};
pub use grouping::{group_tables, GroupingRules, TableGroupAggregator};
pub use region::{RegionConfig, TableRegionDetector, TitleWindow};
pub use strategy::{
    ModelRegionStrategy, RegionStrategyKind, StructuralRegionStrategy, TableRegionStrategy,
};
