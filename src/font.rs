//! Font descriptions and the contract of the font engine the atlas consumes.

use std::fmt::Debug;
use std::hash::BuildHasher;

use foldhash::fast::FixedState;

use crate::error::TextError;

/// Fixed-point scale of layout coordinates and font sizes: one pixel (or
/// point) is `LAYOUT_SCALE` units.
pub const LAYOUT_SCALE: i32 = 1024;

/// Seed for descriptor hashes. Fixed so hashes are stable across runs.
const DESCRIPTOR_HASH_SEED: u64 = 0x6f76_665f_666f_6e74;

/// A font identity that can key the [`FontCache`](crate::FontCache).
///
/// The hash only selects a bucket; distinct fonts may share it, and the cache
/// falls back to `==` to tell them apart.
pub trait FontKey: Clone + Eq + Debug {
    /// Hash of the font identity. Not required to be collision free.
    fn font_hash(&self) -> u32;
}

/// Slant of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    /// Upright.
    #[default]
    Normal,
    /// Slanted upright design.
    Oblique,
    /// Cursive italic design.
    Italic,
}

/// Weight of a face on the usual 100..=900 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontWeight(u16);

impl FontWeight {
    /// Weight 100.
    pub const THIN: Self = Self(100);
    /// Weight 300.
    pub const LIGHT: Self = Self(300);
    /// Weight 400.
    pub const NORMAL: Self = Self(400);
    /// Weight 500.
    pub const MEDIUM: Self = Self(500);
    /// Weight 700.
    pub const BOLD: Self = Self(700);
    /// Weight 900.
    pub const BLACK: Self = Self(900);

    /// Creates a weight, clamped to 100..=900.
    #[must_use]
    pub fn new(weight: u16) -> Self {
        Self(weight.clamp(100, 900))
    }

    /// The numeric weight.
    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Description of a font: a family list, a size, a style and a weight.
///
/// The family is a comma separated list of candidates, tried in order. Sizes
/// are stored in `1/LAYOUT_SCALE` units, either in points or, when
/// [`size_is_absolute`](Self::size_is_absolute) is set, in device pixels.
///
/// A descriptor produced by [`FontLibrary::resolve`](crate::FontLibrary::resolve)
/// is *concrete*: a single family at an absolute size. Only concrete
/// descriptors key the font cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontDescriptor {
    family: String,
    size: i32,
    size_is_absolute: bool,
    style: FontStyle,
    weight: FontWeight,
}

impl FontDescriptor {
    /// Creates a 12 pt, normal style and weight description for `family`.
    #[must_use]
    pub fn new(family: &str) -> Self {
        Self {
            family: normalize_families(family),
            size: 12 * LAYOUT_SCALE,
            size_is_absolute: false,
            style: FontStyle::Normal,
            weight: FontWeight::NORMAL,
        }
    }

    /// Replaces the family list, keeping size, style and weight.
    #[must_use]
    pub fn with_family(mut self, family: &str) -> Self {
        self.family = normalize_families(family);
        self
    }

    /// Sets the size in points.
    #[must_use]
    pub fn with_size_points(mut self, points: f64) -> Self {
        self.size = to_layout_units(points);
        self.size_is_absolute = false;
        self
    }

    /// Sets the size in device pixels.
    #[must_use]
    pub fn with_pixel_size(mut self, pixels: f64) -> Self {
        self.size = to_layout_units(pixels);
        self.size_is_absolute = true;
        self
    }

    /// Sets the style.
    #[must_use]
    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    /// The family list as given, normalised to `", "` separators.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// The individual family candidates, in order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.family.split(',').map(str::trim).filter(|f| !f.is_empty())
    }

    /// The raw size in `1/LAYOUT_SCALE` points or pixels.
    #[must_use]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Whether [`size`](Self::size) is in pixels rather than points.
    #[must_use]
    pub fn size_is_absolute(&self) -> bool {
        self.size_is_absolute
    }

    /// The style.
    #[must_use]
    pub fn style(&self) -> FontStyle {
        self.style
    }

    /// The weight.
    #[must_use]
    pub fn weight(&self) -> FontWeight {
        self.weight
    }

    /// The size in device pixels at the given resolution.
    #[must_use]
    pub fn pixel_size(&self, dpi: f64) -> f32 {
        let units = f64::from(self.size) / f64::from(LAYOUT_SCALE);
        let pixels = if self.size_is_absolute {
            units
        } else {
            units * dpi / 72.0
        };
        #[allow(clippy::cast_possible_truncation)]
        {
            pixels as f32
        }
    }

    /// Whether this names exactly one family at an absolute size.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.size_is_absolute && self.families().count() == 1
    }

    /// A concrete copy of this description for one `family` at `dpi`.
    #[must_use]
    pub fn concrete(&self, family: &str, dpi: f64) -> Self {
        Self {
            family: family.trim().to_owned(),
            size: to_layout_units(f64::from(self.pixel_size(dpi))),
            size_is_absolute: true,
            style: self.style,
            weight: self.weight,
        }
    }
}

impl FontKey for FontDescriptor {
    fn font_hash(&self) -> u32 {
        let hash = FixedState::with_seed(DESCRIPTOR_HASH_SEED).hash_one(self);
        #[allow(clippy::cast_possible_truncation)]
        {
            (hash ^ (hash >> 32)) as u32
        }
    }
}

fn normalize_families(family: &str) -> String {
    family
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_layout_units(value: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    {
        (value * f64::from(LAYOUT_SCALE))
            .round()
            .clamp(0.0, f64::from(i32::MAX)) as i32
    }
}

/// Vertical and horizontal metrics of a font, in pixels.
///
/// Used as layout hints only; drawing does not depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    /// Distance from the baseline to the top of the tallest glyphs.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the deepest glyphs
    /// (positive downwards).
    pub descent: f32,
    /// Baseline to baseline distance.
    pub line_height: f32,
    /// Average advance of lower case letters.
    pub approximate_char_width: f32,
    /// Widest advance of the digits 0-9.
    pub approximate_digit_width: f32,
}

/// Size and placement of a glyph's coverage bitmap.
///
/// Bearings are offsets from the glyph origin on the baseline to the top-left
/// corner of the bitmap, in layout space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphExtents {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Offset from origin to the left edge.
    pub bearing_x: i32,
    /// Offset from origin to the top edge.
    pub bearing_y: i32,
}

impl GlyphExtents {
    /// Whether the glyph has nothing to draw (e.g. a space).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An 8-bit coverage bitmap, rows top-down, tightly packed, with the bearings
/// needed to position it (see [`GlyphExtents`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Offset from origin to the left edge.
    pub bearing_x: i32,
    /// Offset from origin to the top edge.
    pub bearing_y: i32,
    /// `width * height` coverage values.
    pub coverage: Vec<u8>,
}

/// The font engine the atlas and the draw interceptor rely on.
///
/// [`FontLibrary`](crate::FontLibrary) implements it on top of `ab_glyph`;
/// tests substitute stubs.
pub trait FontEngine {
    /// The concrete font identity the engine hands out.
    type Font: FontKey;

    /// Extracts the metrics of `font`.
    ///
    /// # Errors
    ///
    /// Fails when the font is unknown to the engine.
    fn metrics(&self, font: &Self::Font) -> Result<FontMetrics, TextError>;

    /// Bitmap size and bearings of `glyph` without rasterizing it.
    ///
    /// # Errors
    ///
    /// Fails when the font or glyph is unknown to the engine.
    fn glyph_extents(&self, font: &Self::Font, glyph: u32) -> Result<GlyphExtents, TextError>;

    /// Rasterizes `glyph` into a coverage bitmap matching
    /// [`glyph_extents`](Self::glyph_extents).
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Rasterization`] when no bitmap can be produced.
    fn render_glyph(&self, font: &Self::Font, glyph: u32) -> Result<GlyphBitmap, TextError>;
}
