//! Tile Layout Engine.
//!
//! Maps `TileTextureMetadata` plus the current layout parameters to vertex
//! streams for both shapes at once. The GPU keeps a column and a spiral copy of
//! every position stream and blends them per vertex, so everything here is
//! generated in pairs with identical vertex counts.

mod column;
mod mesh;
mod spiral;

pub use column::{place_columns, ColumnTile};
pub use mesh::{
    accent_vertices_per_tile, downscaled_tex_coords, punchcard_tex_coords, tile_vertex_ranges,
    ACCENT_WIDTH, PUNCH_POINTS_PER_ROW, ROWS_PER_TILE, VERTS_PER_ROW,
};
pub use spiral::{SpiralSolve, SpiralTile, MAX_RADIUS, MIN_RADIUS, MIN_ROTATIONS};

use crate::metadata::TileTextureMetadata;
use std::time::Instant;

/// Column width in world units; every tile is scaled to it.
pub const TILE_WIDTH: f32 = 1.0;
/// Horizontal gap between columns at `spacing.horizontal == 1`, in tile widths.
pub const COLUMN_GAP_MAX: f32 = 1.0;
/// Gap between consecutive tiles at `spacing.vertical == 1`, in tile widths.
pub const ROW_GAP_MAX: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Column,
    Spiral,
}

impl Shape {
    /// The shape a raw transition value rests on, if it is settled.
    pub fn settled_at(shape_t: f32) -> Option<Shape> {
        if shape_t <= 0.0 {
            Some(Shape::Column)
        } else if shape_t >= 1.0 {
            Some(Shape::Spiral)
        } else {
            None
        }
    }

    pub fn other(self) -> Shape {
        match self {
            Shape::Column => Shape::Spiral,
            Shape::Spiral => Shape::Column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Downscaled,
    Punchcard,
}

/// `(horizontal, vertical)` spacing, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Spacing {
    pub const ZERO: Spacing = Spacing { horizontal: 0.0, vertical: 0.0 };

    pub fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal: horizontal.clamp(0.0, 1.0),
            vertical: vertical.clamp(0.0, 1.0),
        }
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Self::new(0.2, 0.1)
    }
}

/// Axis-aligned rectangle in world units, y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bounds {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle of the given size centred on the origin.
    pub fn centered(width: f32, height: f32) -> Self {
        Self::new(-width * 0.5, height * 0.5, width * 0.5, -height * 0.5)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// One value per layout shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePair<T> {
    pub column: T,
    pub spiral: T,
}

impl<T> ShapePair<T> {
    pub fn new(column: T, spiral: T) -> Self {
        Self { column, spiral }
    }

    pub fn get(&self, shape: Shape) -> &T {
        match shape {
            Shape::Column => &self.column,
            Shape::Spiral => &self.spiral,
        }
    }

    pub fn get_mut(&mut self, shape: Shape) -> &mut T {
        match shape {
            Shape::Column => &mut self.column,
            Shape::Spiral => &mut self.spiral,
        }
    }
}

/// Inputs that force a full vertex regeneration when they change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub spacing: Spacing,
    /// Visible world rectangle; the column layout wraps at its bottom edge.
    pub viewport: Bounds,
    /// Eased calibration removal, 0 = calibration rows shown, 1 = removed.
    pub calibration_t: f32,
}

/// Position of one tile in either shape; maps tile-local `(u, v)` (u across
/// the tile, v along it from its top edge) to world space.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Placement {
    Column(ColumnTile),
    Spiral(SpiralTile, SpiralSolve),
}

impl Placement {
    pub(crate) fn point(&self, u: f32, v: f32) -> [f32; 2] {
        match self {
            Placement::Column(t) => [t.x + u * TILE_WIDTH, t.top - v * t.height],
            Placement::Spiral(t, solve) => solve.point(t, u, v),
        }
    }

    /// World extent `(across, along)` of the tile.
    pub(crate) fn extent(&self) -> (f32, f32) {
        match self {
            Placement::Column(t) => (TILE_WIDTH, t.height),
            Placement::Spiral(t, solve) => (solve.thickness as f32, t.arc_length() as f32),
        }
    }
}

/// Vertex streams for one parameter set. Punchcard streams are `None` when not
/// requested; the renderer then keeps whatever its buffer already holds.
#[derive(Debug, Clone)]
pub struct TileVertices {
    pub downscaled: ShapePair<Vec<f32>>,
    pub punchcard: ShapePair<Option<Vec<f32>>>,
    pub accents: ShapePair<Vec<f32>>,
    pub bounds: ShapePair<Bounds>,
    pub spiral: SpiralSolve,
}

pub struct LayoutEngine<'a> {
    meta: &'a TileTextureMetadata,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(meta: &'a TileTextureMetadata) -> Self {
        Self { meta }
    }

    /// Which punchcard shapes must be (re)computed.
    ///
    /// Only the target shape is needed normally. While the shape transition is
    /// in flight, or about to start from the other shape, the vertex shader
    /// blends both, so both must hold current geometry.
    pub fn punchcard_shapes_needed(
        view: ViewMode,
        target: Shape,
        shape_t: f32,
    ) -> ShapePair<bool> {
        let mut needed = ShapePair::new(false, false);
        if view != ViewMode::Punchcard {
            return needed;
        }
        *needed.get_mut(target) = true;
        if Shape::settled_at(shape_t) != Some(target) {
            *needed.get_mut(target.other()) = true;
        }
        needed
    }

    pub(crate) fn placements(
        &self,
        params: &LayoutParams,
    ) -> (ShapePair<Vec<Placement>>, ShapePair<Bounds>, SpiralSolve) {
        let (columns, column_bounds) = place_columns(self.meta, params);
        let solve = SpiralSolve::solve(self.meta, params.spacing, params.calibration_t);
        let spirals = solve.place(self.meta, params.calibration_t);

        let placements = ShapePair::new(
            columns.into_iter().map(Placement::Column).collect(),
            spirals.into_iter().map(|t| Placement::Spiral(t, solve)).collect(),
        );
        (placements, ShapePair::new(column_bounds, solve.bounds()), solve)
    }

    /// Generates every position stream for `params`, plus the punchcard
    /// streams flagged in `punchcard`.
    pub fn generate(&self, params: &LayoutParams, punchcard: ShapePair<bool>) -> TileVertices {
        let started = Instant::now();
        let (placements, bounds, spiral) = self.placements(params);

        let punch_for = |shape: Shape| {
            (*punchcard.get(shape))
                .then(|| mesh::punchcard_positions(self.meta, placements.get(shape)))
        };

        let out = TileVertices {
            downscaled: ShapePair::new(
                mesh::downscaled_positions(&placements.column),
                mesh::downscaled_positions(&placements.spiral),
            ),
            punchcard: ShapePair::new(punch_for(Shape::Column), punch_for(Shape::Spiral)),
            accents: ShapePair::new(
                mesh::accent_positions(&placements.column),
                mesh::accent_positions(&placements.spiral),
            ),
            bounds,
            spiral,
        };

        log::debug!(
            "Generated layout for {} tiles in {:.2} ms ({} rotations)",
            self.meta.num_tiles(),
            started.elapsed().as_secs_f64() * 1e3,
            spiral.num_rotation
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TileRect;

    /// `n` identical tiles, each 100x400 px, one atlas column per tile.
    pub(crate) fn uniform_meta(n: usize) -> TileTextureMetadata {
        let w = 1.0 / n as f32;
        TileTextureMetadata {
            tiles: (0..n)
                .map(|i| TileRect { left: i as f32 * w, top: 0.0, width: w, height: 1.0 })
                .collect(),
            width: 100 * n as u32,
            height: 400,
            punch_num_rows: (0..n).map(|i| 4 + i as u32).collect(),
            calibration: Vec::new(),
        }
    }

    fn params(viewport: Bounds) -> LayoutParams {
        LayoutParams { spacing: Spacing::ZERO, viewport, calibration_t: 0.0 }
    }

    #[test]
    fn buffer_sizes_match_tile_and_row_counts() {
        for n in [1usize, 2, 7, 40] {
            let meta = uniform_meta(n);
            let engine = LayoutEngine::new(&meta);
            let out = engine.generate(
                &params(Bounds::centered(50.0, 20.0)),
                ShapePair::new(true, true),
            );

            let down = n * ROWS_PER_TILE * VERTS_PER_ROW * 2;
            assert_eq!(out.downscaled.column.len(), down);
            assert_eq!(out.downscaled.spiral.len(), down);

            let punch: usize = meta.punch_num_rows.iter().map(|&r| r as usize).sum::<usize>()
                * PUNCH_POINTS_PER_ROW
                * 2;
            assert_eq!(out.punchcard.column.as_ref().map(Vec::len), Some(punch));
            assert_eq!(out.punchcard.spiral.as_ref().map(Vec::len), Some(punch));

            let accents = n * accent_vertices_per_tile() * 2;
            assert_eq!(out.accents.column.len(), accents);
            assert_eq!(out.accents.spiral.len(), accents);

            assert_eq!(downscaled_tex_coords(&meta, 0.0).len(), down);
            assert_eq!(punchcard_tex_coords(&meta, 0.0).len(), punch);
        }
    }

    #[test]
    fn three_equal_tiles_fill_a_single_column() {
        let meta = uniform_meta(3);
        let engine = LayoutEngine::new(&meta);
        let viewport = Bounds::new(0.0, 10.0, 40.0, -10.0);
        let out = engine.generate(&params(viewport), ShapePair::default());

        let tile_height = TILE_WIDTH * 4.0;
        let b = out.bounds.column;
        assert!((b.height() - 3.0 * tile_height).abs() < 1e-5);
        assert!((b.width() - TILE_WIDTH).abs() < 1e-6);
        assert_eq!(b.top, viewport.top);
        assert!(out.punchcard.column.is_none() && out.punchcard.spiral.is_none());
    }

    #[test]
    fn punchcard_shapes_follow_transition_state() {
        use ViewMode::*;
        let none = ShapePair::new(false, false);
        assert_eq!(LayoutEngine::punchcard_shapes_needed(Downscaled, Shape::Spiral, 0.5), none);

        // Settled on the target shape: only that one.
        assert_eq!(
            LayoutEngine::punchcard_shapes_needed(Punchcard, Shape::Column, 0.0),
            ShapePair::new(true, false)
        );
        assert_eq!(
            LayoutEngine::punchcard_shapes_needed(Punchcard, Shape::Spiral, 1.0),
            ShapePair::new(false, true)
        );
        // Mid-transition, or about to leave the other shape: both.
        assert_eq!(
            LayoutEngine::punchcard_shapes_needed(Punchcard, Shape::Spiral, 0.4),
            ShapePair::new(true, true)
        );
        assert_eq!(
            LayoutEngine::punchcard_shapes_needed(Punchcard, Shape::Spiral, 0.0),
            ShapePair::new(true, true)
        );
    }

    #[test]
    fn calibration_changes_geometry_not_vertex_counts() {
        let mut meta = uniform_meta(4);
        meta.calibration = vec![[40.0, 40.0]; 4];
        let engine = LayoutEngine::new(&meta);
        let mut p = params(Bounds::new(0.0, 100.0, 40.0, -100.0));
        let shown = engine.generate(&p, ShapePair::default());
        p.calibration_t = 1.0;
        let removed = engine.generate(&p, ShapePair::default());

        assert_eq!(shown.downscaled.column.len(), removed.downscaled.column.len());
        assert!(removed.bounds.column.height() < shown.bounds.column.height());
        // 80 of 400 px removed from each tile.
        let ratio = removed.bounds.column.height() / shown.bounds.column.height();
        assert!((ratio - 0.8).abs() < 1e-4);
    }
}
