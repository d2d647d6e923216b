//! Table grid detection and cell segmentation.

pub mod detector;
pub mod masks;
pub mod segmenter;

pub use detector::{GridAnalysis, GridDetector};
pub use masks::LineMasks;
pub use segmenter::CellSegmenter;
