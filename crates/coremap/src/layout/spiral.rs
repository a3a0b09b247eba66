use super::{Bounds, Spacing, ROW_GAP_MAX};
use crate::metadata::TileTextureMetadata;
use std::f64::consts::PI;

/// Inner radius of the spiral's centre line, world units.
pub const MIN_RADIUS: f64 = 8.0;
/// Outer radius of the spiral's centre line, world units.
pub const MAX_RADIUS: f64 = 60.0;
/// Fewer turns than this make the radial thickness grotesque for tiny cores.
pub const MIN_ROTATIONS: f64 = 1.0;

/// Closed-form pre-pass for the Archimedean spiral `r(θ) = MIN_RADIUS + bθ`.
///
/// Arc length is measured along the centre line with `ds = r dθ`, so an arc
/// position `s` maps to `θ(s) = (sqrt(MIN² + 2bs) - MIN) / b`. The total arc is
/// `max_angle * (MIN + MAX) / 2`, and the tile sequence (tiles and gaps, in
/// tile-width units) is scaled by `arc_scale` to cover it exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiralSolve {
    pub num_rotation: f64,
    pub max_angle: f64,
    /// Radius growth per radian.
    pub growth: f64,
    /// World arc length per tile-width unit of tile height.
    pub arc_scale: f64,
    /// Radial thickness of a tile.
    pub thickness: f64,
    /// Gap after each tile, in tile-width units.
    pub gap: f64,
}

/// A tile's span along the spiral, as arc positions of its two ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiralTile {
    pub s0: f64,
    pub s1: f64,
}

impl SpiralTile {
    pub fn arc_length(&self) -> f64 {
        self.s1 - self.s0
    }
}

impl SpiralSolve {
    pub fn solve(meta: &TileTextureMetadata, spacing: Spacing, calibration_t: f32) -> Self {
        let n = meta.num_tiles();
        let heights: f64 = (0..n).map(|i| meta.aspect(i, calibration_t) as f64).sum();
        let gap = spacing.vertical as f64 * ROW_GAP_MAX as f64;
        let sequence = heights + gap * n as f64;
        let fill = 1.0 - 0.5 * spacing.horizontal as f64;
        let band = MAX_RADIUS - MIN_RADIUS;

        // Thickness band/turns * fill and arc π·turns·(MIN+MAX) must agree on
        // the tile aspect ratio, which fixes the number of turns.
        let num_rotation = (band * fill * sequence / (PI * (MIN_RADIUS + MAX_RADIUS)))
            .sqrt()
            .max(MIN_ROTATIONS);
        let max_angle = 2.0 * PI * num_rotation;
        let total_arc = max_angle * (MIN_RADIUS + MAX_RADIUS) * 0.5;

        Self {
            num_rotation,
            max_angle,
            growth: band / max_angle,
            arc_scale: if sequence > 0.0 { total_arc / sequence } else { 0.0 },
            thickness: (band / num_rotation).min(MIN_RADIUS) * fill,
            gap,
        }
    }

    /// Walks the tiles end to end, each followed by one gap.
    pub fn place(&self, meta: &TileTextureMetadata, calibration_t: f32) -> Vec<SpiralTile> {
        let mut s = 0.0;
        (0..meta.num_tiles())
            .map(|i| {
                let s0 = s;
                let s1 = s0 + meta.aspect(i, calibration_t) as f64 * self.arc_scale;
                s = s1 + self.gap * self.arc_scale;
                SpiralTile { s0, s1 }
            })
            .collect()
    }

    pub fn angle_at(&self, s: f64) -> f64 {
        ((MIN_RADIUS * MIN_RADIUS + 2.0 * self.growth * s).sqrt() - MIN_RADIUS) / self.growth
    }

    pub fn radius_at(&self, angle: f64) -> f64 {
        MIN_RADIUS + self.growth * angle
    }

    /// World position of tile-local `(u, v)`: `u` runs inner to outer edge,
    /// `v` runs along the spiral from the tile's start.
    pub fn point(&self, tile: &SpiralTile, u: f32, v: f32) -> [f32; 2] {
        let s = tile.s0 + v as f64 * tile.arc_length();
        let angle = self.angle_at(s);
        let r = self.radius_at(angle) + (u as f64 - 0.5) * self.thickness;
        let (sin, cos) = angle.sin_cos();
        [(r * sin) as f32, (r * cos) as f32]
    }

    pub fn bounds(&self) -> Bounds {
        let extent = (MAX_RADIUS + self.thickness * 0.5) as f32;
        Bounds::new(-extent, extent, extent, -extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::uniform_meta;

    #[test]
    fn spans_and_gaps_close_at_max_angle() {
        for (n, spacing) in [
            (1, Spacing::ZERO),
            (12, Spacing::new(0.3, 0.5)),
            (250, Spacing::new(1.0, 1.0)),
            (800, Spacing::new(0.0, 0.2)),
        ] {
            let meta = uniform_meta(n);
            let solve = SpiralSolve::solve(&meta, spacing, 0.0);
            let tiles = solve.place(&meta, 0.0);

            let mut total = 0.0;
            let mut prev_end = 0.0;
            for t in &tiles {
                let a0 = solve.angle_at(t.s0);
                let a1 = solve.angle_at(t.s1);
                total += (a0 - prev_end) + (a1 - a0);
                prev_end = a1;
            }
            // Trailing gap after the last tile.
            let end = solve.angle_at(prev_end_arc(&tiles, &solve));
            total += end - prev_end;

            let expected = solve.num_rotation * 2.0 * PI;
            assert!(
                (total - expected).abs() < 1e-6 * expected,
                "n={n}: {total} vs {expected}"
            );
            assert!((end - solve.max_angle).abs() < 1e-6 * solve.max_angle);
        }
    }

    fn prev_end_arc(tiles: &[SpiralTile], solve: &SpiralSolve) -> f64 {
        let last = tiles.last().unwrap();
        last.s1 + solve.gap * solve.arc_scale
    }

    #[test]
    fn radius_spans_the_configured_range() {
        let meta = uniform_meta(60);
        let solve = SpiralSolve::solve(&meta, Spacing::ZERO, 0.0);
        assert!((solve.radius_at(0.0) - MIN_RADIUS).abs() < 1e-9);
        assert!((solve.radius_at(solve.max_angle) - MAX_RADIUS).abs() < 1e-9);
        assert!(solve.num_rotation >= MIN_ROTATIONS);
    }

    #[test]
    fn angular_width_shrinks_as_radius_grows() {
        let meta = uniform_meta(200);
        let solve = SpiralSolve::solve(&meta, Spacing::ZERO, 0.0);
        let tiles = solve.place(&meta, 0.0);
        let span = |t: &SpiralTile| solve.angle_at(t.s1) - solve.angle_at(t.s0);
        assert!(span(&tiles[0]) > span(&tiles[199]));
        // Equal arcs: span times mid radius stays roughly constant.
        let arc = |t: &SpiralTile| {
            span(t) * solve.radius_at(solve.angle_at((t.s0 + t.s1) * 0.5))
        };
        assert!((arc(&tiles[0]) - arc(&tiles[199])).abs() / arc(&tiles[0]) < 0.01);
    }

    #[test]
    fn turns_do_not_overlap() {
        let meta = uniform_meta(300);
        let solve = SpiralSolve::solve(&meta, Spacing::ZERO, 0.0);
        let turn_gap = solve.growth * 2.0 * PI;
        assert!(solve.thickness <= turn_gap + 1e-9);
        assert!(MIN_RADIUS - solve.thickness * 0.5 > 0.0);
    }

    #[test]
    fn unclamped_solve_keeps_tile_aspect() {
        let meta = uniform_meta(300);
        let solve = SpiralSolve::solve(&meta, Spacing::ZERO, 0.0);
        assert!(solve.num_rotation > MIN_ROTATIONS);
        assert!((solve.arc_scale - solve.thickness).abs() < 1e-9 * solve.arc_scale);
    }
}
