//! Font registry and rasterizer built on `ab_glyph`.
//!
//! This is the font engine behind [`TextLayout`](crate::TextLayout) and the
//! draw interceptor: it maps family names to loaded faces, turns family lists
//! into concrete descriptors and rasterizes glyph coverage bitmaps.

use ab_glyph::{Font as _, FontArc, GlyphId, OutlinedGlyph, PxScale, ScaleFont as _};
use log::{debug, warn};

use crate::error::TextError;
use crate::font::{
    FontDescriptor, FontEngine, FontMetrics, FontStyle, FontWeight, GlyphBitmap, GlyphExtents,
};
use crate::layout::FontResolver;

/// Resolution used to convert point sizes to pixels unless changed.
pub const DEFAULT_DPI: f64 = 96.0;

const SAMPLE_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const SAMPLE_DIGITS: &str = "0123456789";

struct Face {
    family: String,
    style: FontStyle,
    weight: FontWeight,
    font: FontArc,
}

/// Loaded font faces, looked up by family, style and weight.
pub struct FontLibrary {
    faces: Vec<Face>,
    dpi: f64,
}

impl FontLibrary {
    /// Creates an empty library at [`DEFAULT_DPI`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            faces: Vec::new(),
            dpi: DEFAULT_DPI,
        }
    }

    /// Resolution used for point sizes.
    #[must_use]
    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Changes the resolution used for point sizes.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidConfig`] unless `dpi` is finite and
    /// positive.
    pub fn set_dpi(&mut self, dpi: f64) -> Result<(), TextError> {
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(TextError::InvalidConfig(format!("dpi {dpi} must be positive")));
        }
        self.dpi = dpi;
        Ok(())
    }

    /// Registers a TrueType/OpenType face under `family`.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::FontLoad`] if `data` is not a valid font.
    pub fn add_font(
        &mut self,
        family: &str,
        style: FontStyle,
        weight: FontWeight,
        data: Vec<u8>,
    ) -> Result<(), TextError> {
        let font = FontArc::try_from_vec(data)
            .map_err(|e| TextError::FontLoad(format!("{family}: {e}")))?;
        debug!("registered face {family} {style:?} {}", weight.value());
        self.faces.push(Face {
            family: family.trim().to_owned(),
            style,
            weight,
            font,
        });
        Ok(())
    }

    /// Number of registered faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Distinct family names, in registration order.
    #[must_use]
    pub fn families(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for face in &self.faces {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&face.family)) {
                names.push(&face.family);
            }
        }
        names
    }

    /// Turns the family list of `desc` into concrete descriptors, one per
    /// family that has a registered face, in list order.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::FontResolution`] if no family is available.
    pub fn resolve(&self, desc: &FontDescriptor) -> Result<Vec<FontDescriptor>, TextError> {
        let resolved: Vec<FontDescriptor> = desc
            .families()
            .filter(|family| self.face(family, desc.style(), desc.weight()).is_some())
            .map(|family| desc.concrete(family, self.dpi))
            .collect();
        if resolved.is_empty() {
            warn!("no face available for \"{}\"", desc.family());
            return Err(TextError::FontResolution {
                families: desc.family().to_owned(),
            });
        }
        Ok(resolved)
    }

    /// The first available family of `desc`, as a concrete descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::FontResolution`] if no family is available.
    pub fn primary(&self, desc: &FontDescriptor) -> Result<FontDescriptor, TextError> {
        self.resolve(desc)?
            .into_iter()
            .next()
            .ok_or_else(|| TextError::FontResolution {
                families: desc.family().to_owned(),
            })
    }

    /// Whether the face of `font` has a glyph for `ch`.
    #[must_use]
    pub fn has_glyph(&self, font: &FontDescriptor, ch: char) -> bool {
        self.glyph_for_char(font, ch).is_some()
    }

    /// The glyph of `ch` in `font`, or `None` if the face lacks it.
    #[must_use]
    pub fn glyph_for_char(&self, font: &FontDescriptor, ch: char) -> Option<u32> {
        let (face, _) = self.scaled(font).ok()?;
        let id = face.glyph_id(ch);
        (id.0 != 0).then_some(u32::from(id.0))
    }

    /// Horizontal advance of `glyph` in pixels; zero for unknown fonts.
    #[must_use]
    pub fn advance(&self, font: &FontDescriptor, glyph: u32) -> f32 {
        self.scaled(font)
            .map(|(face, scale)| face.as_scaled(scale).h_advance(glyph_id(glyph)))
            .unwrap_or(0.0)
    }

    /// Kerning adjustment between two glyphs of `font` in pixels.
    #[must_use]
    pub fn kern(&self, font: &FontDescriptor, left: u32, right: u32) -> f32 {
        self.scaled(font)
            .map(|(face, scale)| face.as_scaled(scale).kern(glyph_id(left), glyph_id(right)))
            .unwrap_or(0.0)
    }

    /// The scaled outline of `glyph`, or `None` for glyphs without ink.
    fn outline(
        &self,
        font: &FontDescriptor,
        glyph: u32,
    ) -> Result<Option<OutlinedGlyph>, TextError> {
        let (face, scale) = self.scaled(font).map_err(|e| TextError::Rasterization {
            glyph,
            reason: e.to_string(),
        })?;
        let id = checked_glyph_id(glyph)?;
        Ok(face.outline_glyph(id.with_scale(scale)))
    }

    fn face(&self, family: &str, style: FontStyle, weight: FontWeight) -> Option<&Face> {
        self.faces
            .iter()
            .filter(|face| face.family.eq_ignore_ascii_case(family))
            .min_by_key(|face| {
                (
                    style_distance(face.style, style),
                    face.weight.value().abs_diff(weight.value()),
                )
            })
    }

    /// The face of a concrete descriptor together with the `ab_glyph` scale
    /// matching its em size.
    fn scaled(&self, font: &FontDescriptor) -> Result<(&FontArc, PxScale), TextError> {
        let family = font.families().next().unwrap_or_default();
        let face = self
            .face(family, font.style(), font.weight())
            .ok_or_else(|| TextError::FontResolution {
                families: font.family().to_owned(),
            })?;
        let pixels = font.pixel_size(self.dpi);
        // ab_glyph scales by line height; convert the em size via 96 dpi points.
        let scale = face
            .font
            .pt_to_px_scale(pixels * 0.75)
            .unwrap_or_else(|| PxScale::from(pixels));
        Ok((&face.font, scale))
    }
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary")
            .field("families", &self.families())
            .field("faces", &self.faces.len())
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl FontEngine for FontLibrary {
    type Font = FontDescriptor;

    fn metrics(&self, font: &FontDescriptor) -> Result<FontMetrics, TextError> {
        let (face, scale) = self
            .scaled(font)
            .map_err(|e| TextError::Metrics(e.to_string()))?;
        let scaled = face.as_scaled(scale);
        let advance = |ch: char| scaled.h_advance(face.glyph_id(ch));

        #[allow(clippy::cast_precision_loss)]
        let approximate_char_width =
            SAMPLE_LETTERS.chars().map(advance).sum::<f32>() / SAMPLE_LETTERS.len() as f32;
        let approximate_digit_width = SAMPLE_DIGITS.chars().map(advance).fold(0.0, f32::max);

        Ok(FontMetrics {
            ascent: scaled.ascent(),
            descent: -scaled.descent(),
            line_height: scaled.height() + scaled.line_gap(),
            approximate_char_width,
            approximate_digit_width,
        })
    }

    fn glyph_extents(&self, font: &FontDescriptor, glyph: u32) -> Result<GlyphExtents, TextError> {
        Ok(self
            .outline(font, glyph)?
            .map(|outlined| extents_of(&outlined))
            .unwrap_or_default())
    }

    fn render_glyph(&self, font: &FontDescriptor, glyph: u32) -> Result<GlyphBitmap, TextError> {
        let outlined = self
            .outline(font, glyph)?
            .ok_or_else(|| TextError::Rasterization {
                glyph,
                reason: "glyph has no outline".into(),
            })?;
        let extents = extents_of(&outlined);
        let width = extents.width;
        let mut coverage = vec![0u8; width as usize * extents.height as usize];
        outlined.draw(|x, y, c| {
            if x < width && y < extents.height {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let value = (c * 255.0).round().clamp(0.0, 255.0) as u8;
                coverage[(y * width + x) as usize] = value;
            }
        });
        Ok(GlyphBitmap {
            width,
            height: extents.height,
            bearing_x: extents.bearing_x,
            bearing_y: extents.bearing_y,
            coverage,
        })
    }
}

impl FontResolver for FontLibrary {
    fn resolve(&self, desc: &FontDescriptor) -> Result<Vec<FontDescriptor>, TextError> {
        FontLibrary::resolve(self, desc)
    }

    fn glyph_for_char(&self, font: &FontDescriptor, ch: char) -> Option<u32> {
        FontLibrary::glyph_for_char(self, font, ch)
    }

    fn advance(&self, font: &FontDescriptor, glyph: u32) -> f32 {
        FontLibrary::advance(self, font, glyph)
    }

    fn kern(&self, font: &FontDescriptor, left: u32, right: u32) -> f32 {
        FontLibrary::kern(self, font, left, right)
    }
}

/// Size and bearings of an outlined glyph's pixel bounds.
fn extents_of(outlined: &OutlinedGlyph) -> GlyphExtents {
    let bounds = outlined.px_bounds();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let extents = GlyphExtents {
        width: (bounds.max.x - bounds.min.x).round().max(0.0) as u32,
        height: (bounds.max.y - bounds.min.y).round().max(0.0) as u32,
        bearing_x: bounds.min.x.round() as i32,
        bearing_y: bounds.min.y.round() as i32,
    };
    extents
}

fn style_distance(have: FontStyle, want: FontStyle) -> u8 {
    match (have, want) {
        (a, b) if a == b => 0,
        (FontStyle::Italic, FontStyle::Oblique) | (FontStyle::Oblique, FontStyle::Italic) => 1,
        _ => 2,
    }
}

fn glyph_id(glyph: u32) -> GlyphId {
    GlyphId(u16::try_from(glyph).unwrap_or(0))
}

fn checked_glyph_id(glyph: u32) -> Result<GlyphId, TextError> {
    u16::try_from(glyph)
        .map(GlyphId)
        .map_err(|_| TextError::Rasterization {
            glyph,
            reason: "glyph index out of range".into(),
        })
}
