use super::types::{CoreAssets, MineralChannel};
use anyhow::{bail, Context, Result};
use coremap::{Palette, SectionIdMetadata, TileTextureMetadata};
use image::ImageReader;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

pub const TILE_METADATA_FILE: &str = "tile_texture_metadata.json";
pub const SECTION_IDS_FILE: &str = "section_ids.json";
pub const DOWNSCALED_DIR: &str = "downscaled";
pub const PUNCHCARD_DIR: &str = "punchcard";

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed parsing {}", path.display()))
}

/// `(name, path)` of every PNG directly inside `dir`, sorted by name.
pub fn list_channels(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        bail!("channel directory {} does not exist", dir.display());
    }
    let mut channels: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .filter_map(|e| {
            let name = e.path().file_stem()?.to_str()?.to_string();
            Some((name, e.path().to_path_buf()))
        })
        .collect();
    channels.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(channels)
}

fn decode_channel(name: &str, path: &Path) -> Result<MineralChannel> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed opening {}", path.display()))?
        .decode()
        .with_context(|| format!("failed decoding {}", path.display()))?
        .to_luma8();
    let (width, height) = image.dimensions();
    Ok(MineralChannel {
        name: name.to_string(),
        width,
        height,
        pixels: image.into_raw(),
    })
}

/// Decodes every channel in `dir` in parallel, keeping name order.
pub fn load_channels(dir: &Path) -> Result<Vec<MineralChannel>> {
    let started = Instant::now();
    let listed = list_channels(dir)?;
    if listed.is_empty() {
        bail!("no channel images in {}", dir.display());
    }
    let channels = listed
        .par_iter()
        .map(|(name, path)| decode_channel(name, path))
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "Decoded {} channels from {} in {:.1} ms",
        channels.len(),
        dir.display(),
        started.elapsed().as_secs_f64() * 1e3
    );
    Ok(channels)
}

pub fn load_palette(path: &Path) -> Result<Palette> {
    read_json(path)
}

/// Loads and cross-checks a core sample directory.
///
/// A palette that cannot be read falls back to the default one with a
/// warning; every other problem is an error.
pub fn load_core(data_dir: &Path, palette: Option<&Path>) -> Result<CoreAssets> {
    let tiles: TileTextureMetadata = read_json(&data_dir.join(TILE_METADATA_FILE))?;
    tiles.validate().context("invalid tile texture metadata")?;

    let ids: SectionIdMetadata = read_json(&data_dir.join(SECTION_IDS_FILE))?;
    ids.check_against(&tiles).context("section ids do not match tiles")?;

    let downscaled = load_channels(&data_dir.join(DOWNSCALED_DIR))?;
    let punchcard = load_channels(&data_dir.join(PUNCHCARD_DIR))?;

    let names = |chs: &[MineralChannel]| chs.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
    if names(&downscaled) != names(&punchcard) {
        bail!(
            "downscaled channels {:?} differ from punchcard channels {:?}",
            names(&downscaled),
            names(&punchcard)
        );
    }

    let palette = match palette {
        Some(path) => load_palette(path).unwrap_or_else(|e| {
            log::warn!("Using default palette: {e:#}");
            Palette::default()
        }),
        None => Palette::default(),
    };

    log::info!(
        "Loaded core: {} tiles, {} channels, atlas {}x{}",
        tiles.num_tiles(),
        downscaled.len(),
        tiles.width,
        tiles.height
    );

    Ok(CoreAssets {
        tiles,
        ids,
        downscaled,
        punchcard,
        palette,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const META: &str = r#"{
        "tiles": [
            {"left": 0.0, "top": 0.0, "width": 0.5, "height": 1.0},
            {"left": 0.5, "top": 0.0, "width": 0.5, "height": 1.0}
        ],
        "width": 8,
        "height": 16,
        "punchNumRows": [4, 4]
    }"#;

    fn write_png(path: &Path, value: u8, size: (u32, u32)) {
        GrayImage::from_pixel(size.0, size.1, Luma([value])).save(path).unwrap();
    }

    fn write_core(dir: &Path, ids: &str, minerals: &[&str]) {
        std::fs::write(dir.join(TILE_METADATA_FILE), META).unwrap();
        std::fs::write(dir.join(SECTION_IDS_FILE), ids).unwrap();
        for sub in [DOWNSCALED_DIR, PUNCHCARD_DIR] {
            std::fs::create_dir_all(dir.join(sub)).unwrap();
            for (i, m) in minerals.iter().enumerate() {
                write_png(&dir.join(sub).join(format!("{m}.png")), i as u8 * 10, (8, 16));
            }
        }
    }

    #[test]
    fn loads_sorted_channels_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        write_core(dir.path(), r#"{"ids": ["1_1", "1_2"]}"#, &["quartz", "calcite", "mica"]);
        std::fs::write(dir.path().join(DOWNSCALED_DIR).join("notes.txt"), "ignored").unwrap();

        let core = load_core(dir.path(), None).unwrap();
        assert_eq!(core.tiles.num_tiles(), 2);
        assert_eq!(core.ids.index_of("1_2"), Some(1));
        assert_eq!(core.channel_names(), vec!["calcite", "mica", "quartz"]);
        assert_eq!(core.downscaled[0].pixels.len(), 8 * 16);
        // "calcite" was written second.
        assert!(core.downscaled[0].pixels.iter().all(|&p| p == 10));
        assert_eq!(core.palette, Palette::default());
    }

    #[test]
    fn id_count_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_core(dir.path(), r#"{"ids": ["only_one"]}"#, &["quartz"]);
        let err = load_core(dir.path(), None).unwrap_err();
        assert!(format!("{err:#}").contains("section ids"));
    }

    #[test]
    fn channel_sets_must_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_core(dir.path(), r#"{"ids": ["a", "b"]}"#, &["quartz"]);
        write_png(&dir.path().join(DOWNSCALED_DIR).join("mica.png"), 0, (8, 16));
        assert!(load_core(dir.path(), None).is_err());
    }

    #[test]
    fn unreadable_palette_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        write_core(dir.path(), r#"{"ids": ["a", "b"]}"#, &["quartz"]);
        let bad = dir.path().join("palette.json");
        std::fs::write(&bad, "not json").unwrap();
        assert_eq!(load_core(dir.path(), Some(&bad)).unwrap().palette, Palette::default());

        let good = dir.path().join("labelled.json");
        std::fs::write(&good, r#"{"quartz": [1, 2, 3]}"#).unwrap();
        let palette = load_core(dir.path(), Some(&good)).unwrap().palette;
        assert!(matches!(palette, Palette::Labelled(ref m) if m["quartz"] == [1, 2, 3]));
    }
}
