//! Vertex stream builders. All streams are flat `[x, y, x, y, ...]` f32 lists.

use super::Placement;
use crate::metadata::{TileRect, TileTextureMetadata};

/// Rows each downscaled tile is split into, so curved placement bends smoothly.
pub const ROWS_PER_TILE: usize = 12;
/// Two triangles per row.
pub const VERTS_PER_ROW: usize = 6;
/// Samples across each punchcard row.
pub const PUNCH_POINTS_PER_ROW: usize = 3;
/// Accent outline thickness in world units.
pub const ACCENT_WIDTH: f32 = 0.03;

/// Corner order of one row quad: `(u, row offset)`.
const ROW_QUAD: [(f32, usize); VERTS_PER_ROW] = [(0.0, 0), (1.0, 0), (0.0, 1), (1.0, 0), (1.0, 1), (0.0, 1)];

fn for_each_row_vertex(mut f: impl FnMut(f32, f32)) {
    for row in 0..ROWS_PER_TILE {
        for (u, dr) in ROW_QUAD {
            f(u, (row + dr) as f32 / ROWS_PER_TILE as f32);
        }
    }
}

fn for_each_punch_sample(rows: u32, mut f: impl FnMut(f32, f32)) {
    for r in 0..rows {
        let v = (r as f32 + 0.5) / rows as f32;
        for c in 0..PUNCH_POINTS_PER_ROW {
            f((c as f32 + 0.5) / PUNCH_POINTS_PER_ROW as f32, v);
        }
    }
}

#[inline]
fn atlas_uv(rect: &TileRect, u: f32, v: f32) -> [f32; 2] {
    [rect.left + u * rect.width, rect.top + v * rect.height]
}

pub(crate) fn downscaled_positions(placements: &[Placement]) -> Vec<f32> {
    let mut out = Vec::with_capacity(placements.len() * ROWS_PER_TILE * VERTS_PER_ROW * 2);
    for p in placements {
        for_each_row_vertex(|u, v| out.extend_from_slice(&p.point(u, v)));
    }
    out
}

pub(crate) fn punchcard_positions(meta: &TileTextureMetadata, placements: &[Placement]) -> Vec<f32> {
    let total: usize = meta.punch_num_rows.iter().map(|&r| r as usize).sum();
    let mut out = Vec::with_capacity(total * PUNCH_POINTS_PER_ROW * 2);
    for (p, &rows) in placements.iter().zip(&meta.punch_num_rows) {
        for_each_punch_sample(rows, |u, v| out.extend_from_slice(&p.point(u, v)));
    }
    out
}

/// Atlas coordinates for the downscaled mesh. Independent of shape; depends
/// on the calibration crop only.
pub fn downscaled_tex_coords(meta: &TileTextureMetadata, calibration_t: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(meta.num_tiles() * ROWS_PER_TILE * VERTS_PER_ROW * 2);
    for i in 0..meta.num_tiles() {
        let rect = meta.cropped_rect(i, calibration_t);
        for_each_row_vertex(|u, v| out.extend_from_slice(&atlas_uv(&rect, u, v)));
    }
    out
}

pub fn punchcard_tex_coords(meta: &TileTextureMetadata, calibration_t: f32) -> Vec<f32> {
    let mut out = Vec::new();
    for (i, &rows) in meta.punch_num_rows.iter().enumerate() {
        let rect = meta.cropped_rect(i, calibration_t);
        for_each_punch_sample(rows, |u, v| out.extend_from_slice(&atlas_uv(&rect, u, v)));
    }
    out
}

/// Boundary of the unit tile, down the `u = 0` edge then back up `u = 1`.
fn ring(inset_u: f32, inset_v: f32) -> impl Iterator<Item = (f32, f32)> {
    let span = 1.0 - 2.0 * inset_v;
    let along = move |j: usize| inset_v + span * j as f32 / ROWS_PER_TILE as f32;
    let down = (0..=ROWS_PER_TILE).map(move |j| (inset_u, along(j)));
    let up = (0..=ROWS_PER_TILE).rev().map(move |j| (1.0 - inset_u, along(j)));
    down.chain(up)
}

/// Triangle-strip vertices per tile outline, degenerate bridges included.
pub fn accent_vertices_per_tile() -> usize {
    let ring = 2 * (ROWS_PER_TILE + 1);
    2 * (ring + 1) + 2
}

/// Thin outline around every tile as one triangle strip.
///
/// Each outline pairs the tile boundary with an inset copy and closes the
/// loop. The first vertex of each outline is emitted twice and the last one
/// twice, so consecutive outlines are joined only by zero-area triangles.
pub(crate) fn accent_positions(placements: &[Placement]) -> Vec<f32> {
    let per_tile = accent_vertices_per_tile();
    let mut out = Vec::with_capacity(placements.len() * per_tile * 2);

    for p in placements {
        let (across, along) = p.extent();
        let du = (ACCENT_WIDTH / across.max(f32::EPSILON)).min(0.25);
        let dv = (ACCENT_WIDTH / along.max(f32::EPSILON)).min(0.25);

        let outer: Vec<[f32; 2]> = ring(0.0, 0.0).map(|(u, v)| p.point(u, v)).collect();
        let inner: Vec<[f32; 2]> = ring(du, dv).map(|(u, v)| p.point(u, v)).collect();

        out.extend_from_slice(&outer[0]);
        for k in (0..outer.len()).chain(std::iter::once(0)) {
            out.extend_from_slice(&outer[k]);
            out.extend_from_slice(&inner[k]);
        }
        out.extend_from_slice(&inner[0]);
    }
    out
}

/// Vertex range of each tile in a stream with a uniform per-tile vertex count.
pub fn tile_vertex_ranges(num_tiles: usize, total_vertices: usize) -> Vec<std::ops::Range<usize>> {
    if num_tiles == 0 {
        return Vec::new();
    }
    let per_tile = total_vertices / num_tiles;
    (0..num_tiles).map(|i| i * per_tile..(i + 1) * per_tile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::uniform_meta;
    use crate::layout::{Bounds, LayoutEngine, LayoutParams, Spacing};

    fn column_accents(n: usize) -> Vec<[f32; 2]> {
        let meta = uniform_meta(n);
        let engine = LayoutEngine::new(&meta);
        let params = LayoutParams {
            spacing: Spacing::new(0.5, 0.5),
            viewport: Bounds::new(0.0, 50.0, 50.0, -50.0),
            calibration_t: 0.0,
        };
        let (placements, _, _) = engine.placements(&params);
        accent_positions(&placements.column)
            .chunks_exact(2)
            .map(|c| [c[0], c[1]])
            .collect()
    }

    fn area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
        ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() * 0.5
    }

    #[test]
    fn outlines_are_bridged_by_degenerate_triangles_only() {
        let verts = column_accents(3);
        let per_tile = accent_vertices_per_tile();
        assert_eq!(verts.len(), 3 * per_tile);

        for tile in 0..3 {
            let start = tile * per_tile;
            let end = start + per_tile - 1;
            assert_eq!(verts[start], verts[start + 1], "leading duplicate of tile {tile}");
            assert_eq!(verts[end], verts[end - 1], "trailing duplicate of tile {tile}");
        }

        // Every strip triangle that touches two different tiles has zero area.
        for i in 0..verts.len() - 2 {
            let tiles = [i / per_tile, (i + 1) / per_tile, (i + 2) / per_tile];
            if tiles[0] != tiles[2] {
                assert_eq!(area(verts[i], verts[i + 1], verts[i + 2]), 0.0, "bridge at {i}");
            }
        }
    }

    #[test]
    fn outline_stays_inside_its_tile() {
        let verts = column_accents(1);
        for v in &verts {
            assert!(v[0] >= 0.0 && v[0] <= 1.0);
            assert!(v[1] <= 50.0 && v[1] >= 46.0);
        }
        // The inset ring is exactly ACCENT_WIDTH in from the left edge.
        assert!((verts[2][0] - ACCENT_WIDTH).abs() < 1e-6);
    }

    #[test]
    fn downscaled_tex_coords_cover_each_tile_rect() {
        let meta = uniform_meta(2);
        let uv = downscaled_tex_coords(&meta, 0.0);
        let per_tile = ROWS_PER_TILE * VERTS_PER_ROW * 2;
        let second = &uv[per_tile..];
        let us: Vec<f32> = second.iter().step_by(2).copied().collect();
        let vs: Vec<f32> = second.iter().skip(1).step_by(2).copied().collect();
        assert_eq!(us.iter().copied().fold(f32::MAX, f32::min), 0.5);
        assert_eq!(us.iter().copied().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(vs.iter().copied().fold(f32::MAX, f32::min), 0.0);
        assert_eq!(vs.iter().copied().fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn punch_samples_sit_at_cell_centres() {
        let meta = uniform_meta(1);
        let uv = punchcard_tex_coords(&meta, 0.0);
        // 4 rows x 3 columns on a rect spanning the whole atlas.
        assert_eq!(uv.len(), 4 * 3 * 2);
        assert!((uv[0] - 1.0 / 6.0).abs() < 1e-6);
        assert!((uv[1] - 1.0 / 8.0).abs() < 1e-6);
        assert!((uv[uv.len() - 1] - 7.0 / 8.0).abs() < 1e-6);
    }

    #[test]
    fn vertex_ranges_are_contiguous_and_uniform() {
        let ranges = tile_vertex_ranges(4, 4 * 72);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0], 0..72);
        assert_eq!(ranges[3], 216..288);
        assert!(tile_vertex_ranges(0, 10).is_empty());
    }
}
