/// Texture decoding and mip chain generation
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to load texture {path}: {source}")]
pub struct TextureError {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

/// Decode an image file into mip levels ready for upload, base level first.
pub fn load_texture(path: impl AsRef<Path>) -> Result<Vec<RgbaImage>, TextureError> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| TextureError {
        path: path.to_path_buf(),
        source,
    })?;
    let base = to_bottom_up_rgba(&image);
    log::info!(
        "texture loaded: {}, {}x{}",
        path.display(),
        base.width(),
        base.height()
    );
    Ok(mip_chain(base))
}

/// RGBA8 with rows flipped so row 0 is the bottom of the picture, matching
/// OBJ texture coordinates.
pub fn to_bottom_up_rgba(image: &DynamicImage) -> RgbaImage {
    image.flipv().to_rgba8()
}

/// Levels needed to go from `width` x `height` down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Halve the image repeatedly down to 1x1 with a triangle filter.
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height()) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);
    while levels.len() < count {
        let Some(prev) = levels.last() else { break };
        let width = (prev.width() / 2).max(1);
        let height = (prev.height() / 2).max(1);
        let next = imageops::resize(prev, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}
