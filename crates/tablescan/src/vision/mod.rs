//! Image primitives the grid pipeline is built from.
//!
//! Everything here works on 8-bit grayscale input and one-bit masks:
//!
//! - [`decode`]: byte buffers to [`RasterImage`](crate::types::RasterImage)
//! - [`mask`]: inverse thresholding and mask algebra
//! - [`morphology`]: opening with rectangular structuring elements
//! - [`hough`]: progressive probabilistic line transform
//! - [`contours`]: border tracing and bounding rectangles

pub mod contours;
pub mod decode;
pub mod hough;
pub mod mask;
pub mod morphology;

pub use contours::{BorderKind, ContourRegion, bounding_rect, find_regions};
pub use decode::ImageDecoder;
pub use hough::{HoughParams, detect_segments};
pub use mask::{BinaryMask, threshold_inverse};
pub use morphology::{StructuringElement, open};
