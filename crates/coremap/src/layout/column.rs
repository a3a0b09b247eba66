use super::{Bounds, LayoutParams, COLUMN_GAP_MAX, ROW_GAP_MAX, TILE_WIDTH};
use crate::metadata::TileTextureMetadata;

/// A tile placed in the column layout: left edge, top edge and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnTile {
    pub x: f32,
    pub top: f32,
    pub height: f32,
    /// Zero-based column the tile landed in.
    pub column: usize,
}

impl ColumnTile {
    pub fn bottom(&self) -> f32 {
        self.top - self.height
    }
}

/// Stacks tiles top to bottom starting at the viewport's top-left corner and
/// starts a new column to the right whenever the next tile would cross the
/// viewport's bottom edge. A column always takes at least one tile.
///
/// Returns the placements and the rectangle they occupy.
pub fn place_columns(meta: &TileTextureMetadata, params: &LayoutParams) -> (Vec<ColumnTile>, Bounds) {
    let viewport = params.viewport;
    let h_gap = params.spacing.horizontal * COLUMN_GAP_MAX * TILE_WIDTH;
    let v_gap = params.spacing.vertical * ROW_GAP_MAX * TILE_WIDTH;

    let mut tiles = Vec::with_capacity(meta.num_tiles());
    let mut x = viewport.left;
    let mut y = viewport.top;
    let mut column = 0;
    let mut column_empty = true;

    for i in 0..meta.num_tiles() {
        let height = TILE_WIDTH * meta.aspect(i, params.calibration_t);

        if !column_empty && y - height < viewport.bottom {
            x += TILE_WIDTH + h_gap;
            y = viewport.top;
            column += 1;
        }

        tiles.push(ColumnTile { x, top: y, height, column });
        y -= height + v_gap;
        column_empty = false;
    }

    let bottom = tiles
        .iter()
        .map(ColumnTile::bottom)
        .fold(f32::INFINITY, f32::min);
    let bounds = Bounds::new(viewport.left, viewport.top, x + TILE_WIDTH, bottom);
    (tiles, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::uniform_meta;
    use crate::layout::Spacing;

    fn run(n: usize, spacing: Spacing, viewport: Bounds) -> (Vec<ColumnTile>, Bounds) {
        let meta = uniform_meta(n);
        place_columns(&meta, &LayoutParams { spacing, viewport, calibration_t: 0.0 })
    }

    #[test]
    fn wraps_exactly_when_the_next_tile_would_cross_the_bottom() {
        // Tiles are 4 units tall; 10 units of viewport fit two per column.
        let viewport = Bounds::new(0.0, 5.0, 100.0, -5.0);
        let (tiles, bounds) = run(5, Spacing::ZERO, viewport);

        let columns: Vec<usize> = tiles.iter().map(|t| t.column).collect();
        assert_eq!(columns, vec![0, 0, 1, 1, 2]);
        for pair in tiles.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let crosses = a.bottom() - b.height < viewport.bottom;
            assert_eq!(b.column != a.column, crosses);
        }
        assert_eq!(bounds.right, 2.0 * TILE_WIDTH + TILE_WIDTH);
        assert_eq!(bounds.bottom, -3.0);
    }

    #[test]
    fn tiles_in_a_column_never_overlap() {
        let viewport = Bounds::new(-3.0, 20.0, 30.0, -20.0);
        let (tiles, _) = run(30, Spacing::new(0.5, 0.7), viewport);
        for pair in tiles.windows(2) {
            if pair[0].column == pair[1].column {
                assert!(pair[1].top <= pair[0].bottom());
            }
        }
        for t in &tiles {
            assert!(t.top <= viewport.top);
            assert!(t.bottom() >= viewport.bottom);
        }
    }

    #[test]
    fn oversized_tile_still_occupies_its_own_column() {
        // 4-unit tiles in a 3-unit viewport.
        let (tiles, bounds) = run(2, Spacing::ZERO, Bounds::new(0.0, 1.5, 10.0, -1.5));
        assert_eq!(tiles[0].column, 0);
        assert_eq!(tiles[1].column, 1);
        assert_eq!(bounds.bottom, 1.5 - 4.0);
    }

    #[test]
    fn horizontal_spacing_separates_columns() {
        let viewport = Bounds::new(0.0, 2.0, 100.0, -2.0);
        let (tiles, _) = run(2, Spacing::new(1.0, 0.0), viewport);
        assert_eq!(tiles[1].x - tiles[0].x, TILE_WIDTH * (1.0 + COLUMN_GAP_MAX));
    }
}
