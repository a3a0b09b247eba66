use clap::{Parser, ValueEnum};
use coremap::{Shape, ViewMode};
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeArg {
    Column,
    Spiral,
}

impl From<ShapeArg> for Shape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Column => Shape::Column,
            ShapeArg::Spiral => Shape::Spiral,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewModeArg {
    Downscaled,
    Punchcard,
}

impl From<ViewModeArg> for ViewMode {
    fn from(arg: ViewModeArg) -> Self {
        match arg {
            ViewModeArg::Downscaled => ViewMode::Downscaled,
            ViewModeArg::Punchcard => ViewMode::Punchcard,
        }
    }
}

/// `core_viewer` - interactive viewer for hyperspectral drill-core scans.
///
/// Lays out every scanned section of one core as columns or a spiral and
/// colours them by blending per-mineral abundance maps.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory holding `tile_texture_metadata.json`, `section_ids.json`,
    /// and the `downscaled/` and `punchcard/` channel images.
    #[arg(long, env = "CORE_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Optional palette JSON: either `{"mineral": [r, g, b]}` or a list of
    /// colours assigned to the visible channels in order.
    #[arg(long, env = "CORE_PALETTE")]
    pub palette: Option<PathBuf>,

    /// Initial layout.
    #[arg(long, env = "CORE_SHAPE", value_enum, default_value_t = ShapeArg::Column)]
    pub shape: ShapeArg,

    /// Initial representation.
    #[arg(
        long,
        env = "CORE_VIEW_MODE",
        value_enum,
        default_value_t = ViewModeArg::Downscaled
    )]
    pub view_mode: ViewModeArg,

    /// Punchcard sample size in pixels.
    #[arg(long, env = "CORE_POINT_SIZE", default_value_t = 2.0)]
    pub point_size: f32,

    /// Initial window width in logical pixels.
    #[arg(long, env = "CORE_WIDTH", default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in logical pixels.
    #[arg(long, env = "CORE_HEIGHT", default_value_t = 720)]
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_value_enums() {
        let cfg = Config::try_parse_from([
            "core_viewer",
            "--data-dir",
            "/data/core7",
            "--shape",
            "spiral",
        ])
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/data/core7"));
        assert_eq!(Shape::from(cfg.shape), Shape::Spiral);
        assert_eq!(ViewMode::from(cfg.view_mode), ViewMode::Downscaled);
        assert_eq!(cfg.point_size, 2.0);
        assert_eq!((cfg.width, cfg.height), (1280, 720));
    }

    #[test]
    fn rejects_unknown_view_mode() {
        let res =
            Config::try_parse_from(["core_viewer", "--data-dir", "x", "--view-mode", "wireframe"]);
        assert!(res.is_err());
    }

    #[test]
    fn shape_falls_back_to_the_environment() {
        // Only this test reads CORE_SHAPE without passing --shape.
        std::env::set_var("CORE_SHAPE", "spiral");
        let cfg = Config::try_parse_from(["core_viewer", "--data-dir", "x"]).unwrap();
        std::env::remove_var("CORE_SHAPE");
        assert_eq!(Shape::from(cfg.shape), Shape::Spiral);
    }
}
