//! The error type shared by the cache, the atlas and the renderers.

use std::fmt;

/// Errors produced while resolving fonts, packing glyphs or talking to the
/// GPU.
///
/// Some kinds only affect a single glyph (see [`TextError::is_per_glyph`]):
/// the draw interceptor logs those, skips the glyph and carries on with the
/// rest of the run. Everything else aborts the current text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextError {
    /// None of the requested families could be resolved to a loaded face.
    FontResolution {
        /// The family list as requested.
        families: String,
    },
    /// Font data could not be parsed.
    FontLoad(String),
    /// Metrics for a font could not be extracted.
    Metrics(String),
    /// A glyph (with its margin) is larger than an empty atlas texture.
    AtlasOverflow {
        /// Glyph index within its font.
        glyph: u32,
        /// Bitmap width in pixels.
        width: u32,
        /// Bitmap height in pixels.
        height: u32,
        /// Edge length of the atlas textures.
        texture_size: u32,
    },
    /// The rasterizer could not produce a usable bitmap for a glyph.
    Rasterization {
        /// Glyph index within its font.
        glyph: u32,
        /// What went wrong.
        reason: String,
    },
    /// Texture creation, upload or drawing failed.
    Gpu(String),
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// An atlas texture could not be written out as an image.
    Export(String),
}

impl TextError {
    /// Whether the error only concerns one glyph, so rendering can continue
    /// with the next one.
    #[must_use]
    pub fn is_per_glyph(&self) -> bool {
        matches!(self, Self::AtlasOverflow { .. } | Self::Rasterization { .. })
    }
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FontResolution { families } => {
                write!(f, "no loaded font matches families \"{families}\"")
            }
            Self::FontLoad(msg) => write!(f, "failed to load font: {msg}"),
            Self::Metrics(msg) => write!(f, "failed to read font metrics: {msg}"),
            Self::AtlasOverflow {
                glyph,
                width,
                height,
                texture_size,
            } => write!(
                f,
                "glyph {glyph} ({width}x{height}) does not fit a {texture_size}x{texture_size} atlas texture"
            ),
            Self::Rasterization { glyph, reason } => {
                write!(f, "failed to rasterize glyph {glyph}: {reason}")
            }
            Self::Gpu(msg) => write!(f, "GPU error: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Export(msg) => write!(f, "failed to export atlas texture: {msg}"),
        }
    }
}

impl std::error::Error for TextError {}
