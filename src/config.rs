//! Atlas configuration.

use crate::error::TextError;

/// Default edge length of an atlas texture.
pub const DEFAULT_TEXTURE_SIZE: u32 = 256;

/// Smallest accepted atlas texture edge length.
const MIN_TEXTURE_SIZE: u32 = 16;

/// Largest accepted atlas texture edge length. Keeps every coordinate
/// comfortably inside the `i32` range GL calls take.
const MAX_TEXTURE_SIZE: u32 = 8192;

/// Pixel layout of the client buffers and GPU textures of an atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// One byte of coverage per pixel.
    #[default]
    Alpha8,
    /// Four bytes per pixel: white, with the coverage in alpha.
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha8 => 1,
            Self::Rgba8 => 4,
        }
    }
}

/// Settings shared by every atlas of a [`FontCache`](crate::FontCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasConfig {
    texture_size: u32,
    format: PixelFormat,
}

impl AtlasConfig {
    /// Creates a configuration with square textures of `texture_size` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidConfig`] unless `texture_size` is a power
    /// of two between 16 and 8192.
    pub fn new(texture_size: u32, format: PixelFormat) -> Result<Self, TextError> {
        if !texture_size.is_power_of_two()
            || !(MIN_TEXTURE_SIZE..=MAX_TEXTURE_SIZE).contains(&texture_size)
        {
            return Err(TextError::InvalidConfig(format!(
                "atlas texture size {texture_size} must be a power of two in \
                 {MIN_TEXTURE_SIZE}..={MAX_TEXTURE_SIZE}"
            )));
        }
        Ok(Self {
            texture_size,
            format,
        })
    }

    /// Edge length of each atlas texture in pixels.
    #[must_use]
    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Pixel format of the atlas textures.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            texture_size: DEFAULT_TEXTURE_SIZE,
            format: PixelFormat::Alpha8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_powers_of_two() {
        let config = AtlasConfig::new(512, PixelFormat::Rgba8).unwrap();
        assert_eq!(config.texture_size(), 512);
        assert_eq!(config.format(), PixelFormat::Rgba8);
    }

    #[test]
    fn rejects_bad_sizes() {
        for size in [0, 8, 100, 255, 16384] {
            assert!(
                matches!(
                    AtlasConfig::new(size, PixelFormat::Alpha8),
                    Err(TextError::InvalidConfig(_))
                ),
                "size {size} should be rejected"
            );
        }
    }

    #[test]
    fn default_matches_instrument_atlas() {
        let config = AtlasConfig::default();
        assert_eq!(config.texture_size(), 256);
        assert_eq!(config.format().bytes_per_pixel(), 1);
    }
}
