//! Per-channel colour resolution for the mineral blend, and a CPU mirror of
//! the blend shader arithmetic.

use serde::Deserialize;
use std::collections::BTreeMap;

/// 8-bit RGB triple.
pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];

/// Nine distinguishable colours, handed out to visible channels in order.
pub const DEFAULT_PALETTE: [Rgb; 9] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
];

/// Either channel name -> colour, or an ordered list assigned to the visible
/// channels in channel order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Palette {
    Labelled(BTreeMap<String, Rgb>),
    Ordered(Vec<Rgb>),
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Ordered(DEFAULT_PALETTE.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Additive,
    /// Per fragment, only the channel(s) with the largest value contribute.
    Maximum,
}

/// Everything the blend pass needs besides the abundance textures.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendParams {
    pub magnitudes: Vec<f32>,
    pub visibility: Vec<bool>,
    pub palette: Palette,
    pub saturation: f32,
    pub threshold: f32,
    pub mode: BlendMode,
    pub monochrome: bool,
}

impl BlendParams {
    pub fn new(num_channels: usize) -> Self {
        Self {
            magnitudes: vec![1.0; num_channels],
            visibility: vec![true; num_channels],
            palette: Palette::default(),
            saturation: 1.0,
            threshold: 0.0,
            mode: BlendMode::Additive,
            monochrome: false,
        }
    }

    /// Per-channel `(colour, magnitude)` as uploaded to the blend shader.
    /// Hidden or uncoloured channels upload magnitude 0.
    pub fn channel_uniforms(&self, names: &[String]) -> Vec<([f32; 3], f32)> {
        let colors = resolve_colors(names, &self.visibility, &self.palette, self.monochrome);
        colors
            .iter()
            .enumerate()
            .map(|(i, color)| match color {
                Some(c) => (rgb_to_unit(*c), self.magnitudes.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0)),
                None => ([0.0; 3], 0.0),
            })
            .collect()
    }

    /// Threshold as uploaded; kept below 1 so `smoothstep(t, 1, x)` stays defined.
    pub fn uniform_threshold(&self) -> f32 {
        self.threshold.clamp(0.0, 0.999)
    }
}

pub fn rgb_to_unit(c: Rgb) -> [f32; 3] {
    [c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0]
}

/// Colour of channel `index`, or `None` for "no colour".
///
/// Hidden channels never get a colour. With `monochrome` set and exactly one
/// channel visible, that channel is white. Otherwise a labelled palette is
/// looked up by name; an ordered palette gives its k-th entry to the k-th
/// visible channel, so hiding a channel shifts the colours of later ones.
pub fn blend_color(
    index: usize,
    names: &[String],
    visibility: &[bool],
    palette: &Palette,
    monochrome: bool,
) -> Option<Rgb> {
    if !visibility.get(index).copied().unwrap_or(false) {
        return None;
    }

    if monochrome && visibility.iter().filter(|v| **v).count() == 1 {
        return Some(WHITE);
    }

    match palette {
        Palette::Labelled(map) => names.get(index).and_then(|n| map.get(n)).copied(),
        Palette::Ordered(list) => {
            let slot = visibility[..index].iter().filter(|v| **v).count();
            list.get(slot).copied()
        }
    }
}

pub fn resolve_colors(names: &[String], visibility: &[bool], palette: &Palette, monochrome: bool) -> Vec<Option<Rgb>> {
    (0..names.len())
        .map(|i| blend_color(i, names, visibility, palette, monochrome))
        .collect()
}

/// GLSL/WGSL `smoothstep`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// What the blend shader computes for one texel, given per-channel
/// abundances in `[0, 1]` and the uniforms from [`BlendParams`].
pub fn composite_texel(
    abundances: &[f32],
    channels: &[([f32; 3], f32)],
    threshold: f32,
    saturation: f32,
    mode: BlendMode,
) -> [f32; 3] {
    let values: Vec<f32> = channels
        .iter()
        .zip(abundances)
        .map(|((_, magnitude), a)| magnitude * smoothstep(threshold, 1.0, *a))
        .collect();
    let max_value = values.iter().copied().fold(f32::MIN, f32::max);

    let mut color = [0.0f32; 3];
    for ((rgb, _), value) in channels.iter().zip(&values) {
        // Exact equality: tied channels all contribute.
        if mode == BlendMode::Maximum && *value != max_value {
            continue;
        }
        for k in 0..3 {
            color[k] += value * rgb[k];
        }
    }
    color.map(|c| c * saturation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const C0: Rgb = [10, 0, 0];
    const C1: Rgb = [0, 20, 0];
    const C2: Rgb = [0, 0, 30];

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("mineral{i}")).collect()
    }

    #[test]
    fn ordered_palette_reassigns_after_hidden_channel() {
        let palette = Palette::Ordered(vec![C0, C1, C2]);
        let names = names(3);

        let hidden_first = resolve_colors(&names, &[false, true, true], &palette, false);
        assert_eq!(hidden_first, vec![None, Some(C0), Some(C1)]);

        let all = resolve_colors(&names, &[true, true, true], &palette, false);
        assert_eq!(all, vec![Some(C0), Some(C1), Some(C2)]);
    }

    #[test]
    fn labelled_palette_looks_up_by_name() {
        let mut map = BTreeMap::new();
        map.insert("quartz".to_string(), C2);
        map.insert("calcite".to_string(), C0);
        let palette = Palette::Labelled(map);
        let names = vec!["calcite".to_string(), "dolomite".to_string(), "quartz".to_string()];

        let colors = resolve_colors(&names, &[true, true, true], &palette, false);
        assert_eq!(colors, vec![Some(C0), None, Some(C2)]);
        // Hiding a channel does not shift labelled colours.
        let colors = resolve_colors(&names, &[false, true, true], &palette, false);
        assert_eq!(colors, vec![None, None, Some(C2)]);
    }

    #[test]
    fn monochrome_isolates_a_single_visible_channel() {
        let names = names(3);
        for palette in [Palette::Ordered(vec![C0, C1, C2]), Palette::Ordered(Vec::new())] {
            let colors = resolve_colors(&names, &[false, false, true], &palette, true);
            assert_eq!(colors, vec![None, None, Some(WHITE)]);
        }
        // Two visible: monochrome changes nothing.
        let palette = Palette::Ordered(vec![C0, C1, C2]);
        assert_eq!(
            resolve_colors(&names, &[true, false, true], &palette, true),
            resolve_colors(&names, &[true, false, true], &palette, false),
        );
    }

    #[test]
    fn short_palette_leaves_later_channels_uncoloured() {
        let palette = Palette::Ordered(vec![C0]);
        let colors = resolve_colors(&names(3), &[true, true, true], &palette, false);
        assert_eq!(colors, vec![Some(C0), None, None]);

        let mut params = BlendParams::new(3);
        params.palette = palette;
        let uniforms = params.channel_uniforms(&names(3));
        assert_eq!(uniforms[1], ([0.0; 3], 0.0));
    }

    #[test]
    fn palette_json_forms() {
        let ordered: Palette = serde_json::from_str("[[1,2,3],[4,5,6]]").unwrap();
        assert_eq!(ordered, Palette::Ordered(vec![[1, 2, 3], [4, 5, 6]]));
        let labelled: Palette = serde_json::from_str(r#"{"quartz":[9,9,9]}"#).unwrap();
        assert!(matches!(labelled, Palette::Labelled(m) if m["quartz"] == [9, 9, 9]));
    }

    #[test]
    fn maximum_mode_keeps_only_the_winner() {
        let red = [1.0, 0.0, 0.0];
        let green = [0.0, 1.0, 0.0];
        let channels = [(red, 1.0), (green, 0.5)];
        let threshold = 0.2;
        let saturation = 0.8;

        let out = composite_texel(&[0.8, 0.8], &channels, threshold, saturation, BlendMode::Maximum);
        let expected = smoothstep(threshold, 1.0, 0.8) * 1.0 * saturation;
        assert!((out[0] - expected).abs() < 1e-6);
        assert_eq!(out[1], 0.0);

        let add = composite_texel(&[0.8, 0.8], &channels, threshold, saturation, BlendMode::Additive);
        assert!((add[1] - expected * 0.5).abs() < 1e-6);
    }

    #[test]
    fn maximum_mode_ties_draw_every_tied_channel() {
        let channels = [([1.0, 0.0, 0.0], 1.0), ([0.0, 1.0, 0.0], 1.0)];
        let out = composite_texel(&[0.5, 0.5], &channels, 0.0, 1.0, BlendMode::Maximum);
        assert!(out[0] > 0.0 && out[0] == out[1]);
    }

    #[test]
    fn threshold_cuts_low_abundance() {
        let channels = [([1.0, 1.0, 1.0], 1.0)];
        let out = composite_texel(&[0.3], &channels, 0.4, 1.0, BlendMode::Additive);
        assert_eq!(out, [0.0; 3]);
        let full = composite_texel(&[1.0], &channels, 0.4, 1.0, BlendMode::Additive);
        assert_eq!(full, [1.0; 3]);
    }
}
