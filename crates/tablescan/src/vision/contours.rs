//! Contour extraction and bounding rectangles.

use imageproc::contours::{BorderType, find_contours};

use super::mask::BinaryMask;
use crate::types::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Outer boundary of a connected foreground component
    Outer,
    /// Boundary of a background hole inside a component
    Hole,
}

/// A contour reduced to its axis-aligned bounding box, with its place in the
/// contour hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourRegion {
    pub bbox: BoundingBox,
    pub kind: BorderKind,
    pub parent: Option<usize>,
}

/// Traces every border in `mask` (full hierarchy) and returns their boxes in
/// tracing order.
pub fn find_regions(mask: &BinaryMask) -> Vec<ContourRegion> {
    if mask.is_empty() {
        return Vec::new();
    }

    find_contours::<i32>(&mask.to_gray_image())
        .into_iter()
        .filter_map(|contour| {
            let bbox = bounding_rect(contour.points.iter().map(|p| (p.x, p.y)))?;
            let kind = match contour.border_type {
                BorderType::Outer => BorderKind::Outer,
                BorderType::Hole => BorderKind::Hole,
            };
            Some(ContourRegion {
                bbox,
                kind,
                parent: contour.parent,
            })
        })
        .collect()
}

/// Smallest upright rectangle holding all points; sizes count both edges.
pub fn bounding_rect<I>(points: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = (i32, i32)>,
{
    let mut iter = points.into_iter();
    let (x, y) = iter.next()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (x, x, y, y);
    for (x, y) in iter {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    Some(BoundingBox::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}
