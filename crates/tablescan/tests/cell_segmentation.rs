//! Cell segmentation and row clustering on synthesized tables.

use tablescan::core::config::{GridDetectionConfig, SegmentationConfig};
use tablescan::{BoundingBox, CellSegmenter, RasterImage};

mod helpers;
use helpers::{CELL_HEIGHT, CELL_WIDTH, TABLE_LEFT, TABLE_TOP, blank_page, numbered_table, on_page, ruled_table};

fn segment(page: image::GrayImage) -> tablescan::Grid {
    CellSegmenter::default()
        .segment(&RasterImage::from_gray(page))
        .unwrap()
}

#[test]
fn test_two_by_four_table() {
    let grid = segment(numbered_table(2, 4));

    assert_eq!(grid.row_count(), 2);
    assert_eq!(grid.column_count(), 4);
    assert_eq!(grid.cell_count(), 8);

    for (r, row) in grid.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            assert_eq!(cell.row, r as u32 + 1);
            assert_eq!(cell.column, c as u32 + 1);

            let left = TABLE_LEFT + c as u32 * CELL_WIDTH;
            let top = TABLE_TOP + r as u32 * CELL_HEIGHT;
            assert!(cell.bbox.x >= left && cell.bbox.x <= left + 1, "cell {:?}", cell);
            assert!(cell.bbox.y >= top && cell.bbox.y <= top + 1, "cell {:?}", cell);
            assert!(cell.bbox.right() <= left + CELL_WIDTH + 1);
            assert!(cell.bbox.bottom() <= top + CELL_HEIGHT + 1);
        }
    }
}

#[test]
fn test_cells_are_row_major() {
    let grid = segment(numbered_table(3, 3));
    let positions: Vec<(u32, u32)> = grid.cells().map(|c| (c.row, c.column)).collect();
    let expected: Vec<(u32, u32)> = (1..=3).flat_map(|r| (1..=3).map(move |c| (r, c))).collect();
    assert_eq!(positions, expected);

    for row in grid.rows() {
        assert!(row.windows(2).all(|pair| pair[0].bbox.x < pair[1].bbox.x));
    }
}

#[test]
fn test_cell_content_is_ignored() {
    let empty = segment(ruled_table(&[vec![0, 0, 0], vec![0, 0, 0]]));
    let filled = segment(ruled_table(&[vec![9, 9, 9], vec![9, 9, 9]]));
    assert_eq!(empty, filled);
}

#[test]
fn test_blank_page_has_no_cells() {
    assert!(segment(blank_page(400, 300)).is_empty());
}

#[test]
fn test_small_table_outline_is_kept_as_a_cell() {
    // The 2 x 2 table covers about a fifth of the page, so the outer border
    // of the ruling passes the size filter along with the four cells.
    let table = numbered_table(2, 2);
    let grid = segment(on_page(&table, 1000, 800, 300, 200));

    assert_eq!(grid.cell_count(), 5);
    let outline = grid
        .cells()
        .find(|c| c.bbox.width > CELL_WIDTH * 2 - 5)
        .expect("table outline");
    assert_eq!(outline.bbox.x, 300 + TABLE_LEFT);
    assert_eq!(outline.bbox.y, 200 + TABLE_TOP);
    assert_eq!(outline.bbox.width, 2 * CELL_WIDTH + 1);
    assert_eq!(outline.bbox.height, 2 * CELL_HEIGHT + 1);
    assert_eq!(outline.row, 1);
}

#[test]
fn test_page_filling_table_drops_outline() {
    let grid = segment(numbered_table(2, 2));
    assert_eq!(grid.cell_count(), 4);
    assert!(grid.cells().all(|c| c.bbox.width <= CELL_WIDTH + 1));
}

#[test]
fn test_minimum_size_excludes_small_cells() {
    let segmenter = CellSegmenter::new(
        GridDetectionConfig::default(),
        SegmentationConfig {
            min_cell_height: CELL_HEIGHT + 5,
            ..SegmentationConfig::default()
        },
    );
    let grid = segmenter.segment(&RasterImage::from_gray(numbered_table(2, 2))).unwrap();
    assert!(grid.is_empty());
}

#[test]
fn test_cluster_uses_opener_as_reference() {
    let segmenter = CellSegmenter::default();
    let grid = segmenter.cluster(vec![
        BoundingBox::new(300, 5, 90, 40),
        BoundingBox::new(0, 0, 90, 40),
        BoundingBox::new(100, 9, 90, 40),
        BoundingBox::new(200, 11, 90, 40),
        BoundingBox::new(0, 60, 90, 40),
    ]);

    // 0 opens row 1; 5 and 9 join it, 11 is 11 px from the opener
    assert_eq!(grid.row_count(), 3);
    let first: Vec<u32> = grid.rows()[0].iter().map(|c| c.bbox.x).collect();
    assert_eq!(first, vec![0, 100, 300]);
    assert_eq!(grid.rows()[1][0].bbox.x, 200);
    assert_eq!(grid.rows()[2][0].row, 3);
}
