//! Specific background job implementations.

pub mod graph_rebuild;
pub mod source_refresh;

pub use graph_rebuild::GraphRebuildJob;
pub use source_refresh::SourceRefreshJob;
