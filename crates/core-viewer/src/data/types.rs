use coremap::{Palette, SectionIdMetadata, TileTextureMetadata};

/// One decoded abundance image, one byte per texel.
#[derive(Debug, Clone)]
pub struct MineralChannel {
    /// File stem, e.g. `"quartz"`.
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Everything the core renderer is constructed from.
#[derive(Debug, Clone)]
pub struct CoreAssets {
    pub tiles: TileTextureMetadata,
    pub ids: SectionIdMetadata,
    /// Channels of the downscaled atlas, sorted by name.
    pub downscaled: Vec<MineralChannel>,
    /// Same channels at punchcard density, same order.
    pub punchcard: Vec<MineralChannel>,
    pub palette: Palette,
}

impl CoreAssets {
    pub fn channel_names(&self) -> Vec<String> {
        self.downscaled.iter().map(|c| c.name.clone()).collect()
    }
}
