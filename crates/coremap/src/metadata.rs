//! Atlas metadata for one core sample, as handed over by the asset pipeline.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MetadataError {
    #[error("tile metadata contains no tiles")]
    Empty,
    #[error("{ids} section ids for {tiles} tiles")]
    IdCountMismatch { ids: usize, tiles: usize },
    #[error("{rows} punchcard row counts for {tiles} tiles")]
    PunchRowsMismatch { rows: usize, tiles: usize },
    #[error("{offsets} calibration offsets for {tiles} tiles")]
    CalibrationMismatch { offsets: usize, tiles: usize },
    #[error("tile {index} has a degenerate rectangle")]
    DegenerateTile { index: usize },
    #[error("atlas dimensions must be non-zero")]
    ZeroAtlas,
}

/// One tile rectangle in normalized atlas UV space.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TileRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Tile rectangles plus atlas size and per-tile punchcard row counts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileTextureMetadata {
    pub tiles: Vec<TileRect>,
    /// Atlas width in pixels.
    pub width: u32,
    /// Atlas height in pixels.
    pub height: u32,
    pub punch_num_rows: Vec<u32>,
    /// Optional `[top_px, bottom_px]` rows of calibration target per tile.
    #[serde(default)]
    pub calibration: Vec<[f32; 2]>,
}

impl TileTextureMetadata {
    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.tiles.is_empty() {
            return Err(MetadataError::Empty);
        }
        if self.width == 0 || self.height == 0 {
            return Err(MetadataError::ZeroAtlas);
        }
        if self.punch_num_rows.len() != self.tiles.len() {
            return Err(MetadataError::PunchRowsMismatch {
                rows: self.punch_num_rows.len(),
                tiles: self.tiles.len(),
            });
        }
        if !self.calibration.is_empty() && self.calibration.len() != self.tiles.len() {
            return Err(MetadataError::CalibrationMismatch {
                offsets: self.calibration.len(),
                tiles: self.tiles.len(),
            });
        }
        for (index, t) in self.tiles.iter().enumerate() {
            if t.width <= 0.0 || t.height <= 0.0 {
                return Err(MetadataError::DegenerateTile { index });
            }
        }
        Ok(())
    }

    /// Calibration rows of tile `i` in atlas pixels, zero when absent.
    pub fn calibration_px(&self, i: usize) -> [f32; 2] {
        self.calibration.get(i).copied().unwrap_or([0.0, 0.0])
    }

    /// Sampled rectangle of tile `i` once `calibration_t` (eased, 0..1) of its
    /// calibration rows are cropped away at the top and bottom.
    pub fn cropped_rect(&self, i: usize, calibration_t: f32) -> TileRect {
        let rect = self.tiles[i];
        let [top_px, bottom_px] = self.calibration_px(i);
        let inv_h = 1.0 / self.height as f32;
        let top = top_px * inv_h * calibration_t;
        let bottom = bottom_px * inv_h * calibration_t;
        // Never crop past the tile itself.
        let crop = (top + bottom).min(rect.height * 0.95);
        let scale = if top + bottom > 0.0 { crop / (top + bottom) } else { 0.0 };
        TileRect {
            left: rect.left,
            top: rect.top + top * scale,
            width: rect.width,
            height: rect.height - crop,
        }
    }

    /// Height over width of tile `i` in atlas pixels, after cropping.
    pub fn aspect(&self, i: usize, calibration_t: f32) -> f32 {
        let rect = self.cropped_rect(i, calibration_t);
        (rect.height * self.height as f32) / (rect.width * self.width as f32)
    }
}

/// Opaque section ids, index-aligned with the tiles (`"12_3"` = section 12, piece 3).
#[derive(Debug, Clone, Deserialize)]
pub struct SectionIdMetadata {
    pub ids: Vec<String>,
}

impl SectionIdMetadata {
    pub fn check_against(&self, tiles: &TileTextureMetadata) -> Result<(), MetadataError> {
        if self.ids.len() != tiles.num_tiles() {
            return Err(MetadataError::IdCountMismatch {
                ids: self.ids.len(),
                tiles: tiles.num_tiles(),
            });
        }
        Ok(())
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|s| s == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TileTextureMetadata {
        TileTextureMetadata {
            tiles: vec![
                TileRect { left: 0.0, top: 0.0, width: 0.5, height: 1.0 },
                TileRect { left: 0.5, top: 0.0, width: 0.5, height: 0.5 },
            ],
            width: 200,
            height: 400,
            punch_num_rows: vec![8, 4],
            calibration: vec![[40.0, 0.0], [0.0, 0.0]],
        }
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "tiles": [{"left": 0.0, "top": 0.0, "width": 1.0, "height": 1.0}],
            "width": 64, "height": 256, "punchNumRows": [10]
        }"#;
        let m: TileTextureMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(m.num_tiles(), 1);
        assert!(m.calibration.is_empty());
        assert!(m.validate().is_ok());
        assert_eq!(m.aspect(0, 1.0), 4.0);
    }

    #[test]
    fn validation_catches_misaligned_lists() {
        let mut m = meta();
        m.punch_num_rows.pop();
        assert_eq!(
            m.validate(),
            Err(MetadataError::PunchRowsMismatch { rows: 1, tiles: 2 })
        );

        let ids = SectionIdMetadata { ids: vec!["1_1".into()] };
        assert_eq!(
            ids.check_against(&meta()),
            Err(MetadataError::IdCountMismatch { ids: 1, tiles: 2 })
        );
    }

    #[test]
    fn calibration_crop_shrinks_rect_and_aspect() {
        let m = meta();
        // 100x400 px tile, 40 px of calibration at the top.
        assert_eq!(m.aspect(0, 0.0), 4.0);
        let cropped = m.cropped_rect(0, 1.0);
        assert!((cropped.top - 0.1).abs() < 1e-6);
        assert!((cropped.height - 0.9).abs() < 1e-6);
        assert!((m.aspect(0, 1.0) - 3.6).abs() < 1e-5);
        // Half way through the transition crops half the rows.
        assert!((m.cropped_rect(0, 0.5).top - 0.05).abs() < 1e-6);
        // Tiles without offsets are untouched.
        assert_eq!(m.cropped_rect(1, 1.0), m.tiles[1]);
    }
}
