//! Flat-colour picking codec.
//!
//! Tile `i` is drawn into the offscreen pick target as `(i + 1) * 30`, split
//! over the red (low byte) and green (high byte) channels. Zero is the clear
//! colour and never decodes to a tile.

use std::collections::HashMap;

/// Spread between consecutive tile codes, so neighbours differ visibly when
/// the pick target is dumped for debugging.
pub const CODE_STRIDE: u32 = 30;
/// Largest tile count whose codes fit in two bytes.
pub const MAX_PICKABLE_TILES: usize = (u16::MAX as u32 / CODE_STRIDE) as usize;

/// RGBA colour for tile `index`.
pub fn index_to_color(index: usize) -> [u8; 4] {
    let code = (index as u32 + 1) * CODE_STRIDE;
    [(code & 0xff) as u8, ((code >> 8) & 0xff) as u8, 0, 255]
}

/// Colour -> tile index lookup, built once per core.
#[derive(Debug, Clone)]
pub struct PickTable {
    by_color: HashMap<[u8; 2], usize>,
}

impl PickTable {
    pub fn new(num_tiles: usize) -> Self {
        let by_color = (0..num_tiles)
            .map(|i| {
                let c = index_to_color(i);
                ([c[0], c[1]], i)
            })
            .collect();
        Self { by_color }
    }

    pub fn len(&self) -> usize {
        self.by_color.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_color.is_empty()
    }

    /// Tile under a read-back pixel; `None` for background or unknown colours.
    pub fn decode(&self, rgba: [u8; 4]) -> Option<usize> {
        self.by_color.get(&[rgba[0], rgba[1]]).copied()
    }
}

/// One RGBA colour per vertex, `vertices_per_tile` in a row for each tile.
pub fn vertex_colors(num_tiles: usize, vertices_per_tile: usize) -> Vec<[u8; 4]> {
    (0..num_tiles)
        .flat_map(|i| std::iter::repeat(index_to_color(i)).take(vertices_per_tile))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_index_round_trips_without_collision() {
        let table = PickTable::new(MAX_PICKABLE_TILES);
        assert_eq!(table.len(), MAX_PICKABLE_TILES);
        for i in 0..MAX_PICKABLE_TILES {
            assert_eq!(table.decode(index_to_color(i)), Some(i));
        }
    }

    #[test]
    fn background_and_strays_decode_to_nothing() {
        let table = PickTable::new(10);
        assert_eq!(table.decode([0, 0, 0, 0]), None);
        assert_eq!(table.decode([1, 0, 0, 255]), None);
        assert_eq!(table.decode(index_to_color(10)), None);
    }

    #[test]
    fn codes_spill_into_green_past_255() {
        assert_eq!(index_to_color(0), [30, 0, 0, 255]);
        assert_eq!(index_to_color(8), [14, 1, 0, 255]);
        assert_eq!(MAX_PICKABLE_TILES, 2184);
    }

    #[test]
    fn vertex_colours_are_grouped_per_tile() {
        let colors = vertex_colors(2, 3);
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[2], index_to_color(0));
        assert_eq!(colors[3], index_to_color(1));
    }
}
