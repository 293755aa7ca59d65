//! Minimal text layout: line splitting, font fallback and kerning.
//!
//! A [`TextLayout`] holds a string and a font description. Laying it out
//! yields glyphs positioned on their baselines, which are then handed one by
//! one to a [`GlyphSink`]. The sink decides how a glyph reaches the screen;
//! the draw interceptor is the sink that routes glyphs through the atlas.

use log::debug;

use crate::error::TextError;
use crate::font::{FontDescriptor, FontEngine, FontStyle, FontWeight, LAYOUT_SCALE};

/// Family list used by new layouts.
pub const DEFAULT_FAMILY: &str = "Sans";

/// Receives individual glyph draws.
///
/// `x` and `y` are the glyph origin on the baseline, in pixels, y down.
pub trait GlyphSink<F> {
    /// Draws `glyph` of `font` with its origin at (`x`, `y`).
    fn draw_glyph(&mut self, font: &F, glyph: u32, x: f32, y: f32);
}

/// Font lookups layout needs on top of [`FontEngine`].
///
/// [`FontLibrary`](crate::FontLibrary) is the usual implementation.
pub trait FontResolver: FontEngine<Font = FontDescriptor> {
    /// Expands the family list of `desc` into the available concrete fonts,
    /// in preference order.
    ///
    /// # Errors
    ///
    /// [`TextError::FontResolution`] if none of the families is available.
    fn resolve(&self, desc: &FontDescriptor) -> Result<Vec<FontDescriptor>, TextError>;

    /// Glyph index of `ch` in `font`, if the font has it.
    fn glyph_for_char(&self, font: &FontDescriptor, ch: char) -> Option<u32>;

    /// Horizontal advance of `glyph` in pixels.
    fn advance(&self, font: &FontDescriptor, glyph: u32) -> f32;

    /// Kerning adjustment between two glyphs of `font` in pixels.
    fn kern(&self, font: &FontDescriptor, left: u32, right: u32) -> f32;
}

/// Converts a pixel position to 1/1024 pixel units.
///
/// # Errors
///
/// [`TextError::InvalidConfig`] if either coordinate does not fit an `i32`
/// once scaled.
pub(crate) fn origin_to_layout_units(x: i32, y: i32) -> Result<(i32, i32), TextError> {
    match (x.checked_mul(LAYOUT_SCALE), y.checked_mul(LAYOUT_SCALE)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(TextError::InvalidConfig(format!(
            "text origin ({x}, {y}) is out of range"
        ))),
    }
}

/// A glyph placed by [`TextLayout::layout`], relative to the layout's top
/// left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGlyph {
    /// Concrete font the glyph was taken from.
    pub font: FontDescriptor,
    /// Glyph index in that font.
    pub glyph: u32,
    /// Pen position on the baseline.
    pub x: f32,
    /// Baseline position.
    pub y: f32,
}

/// Replays positioned glyphs into `sink`, offset by (`x`, `y`) pixels.
pub fn draw_glyphs<S>(glyphs: &[PositionedGlyph], x: f32, y: f32, sink: &mut S)
where
    S: GlyphSink<FontDescriptor> + ?Sized,
{
    for g in glyphs {
        sink.draw_glyph(&g.font, g.glyph, x + g.x, y + g.y);
    }
}

/// A string and the font it is set in.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    text: String,
    description: FontDescriptor,
}

impl TextLayout {
    /// Creates an empty layout in [`DEFAULT_FAMILY`] at 12 points.
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: String::new(),
            description: FontDescriptor::new(DEFAULT_FAMILY),
        }
    }

    /// Creates an empty layout using `description`.
    #[must_use]
    pub fn with_description(description: FontDescriptor) -> Self {
        Self {
            text: String::new(),
            description,
        }
    }

    /// Replaces the text. `'\n'` starts a new line.
    pub fn set_text(&mut self, text: &str) {
        debug!("layout text set to {:?}", text);
        text.clone_into(&mut self.text);
    }

    /// The current text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the comma separated family list, keeping size and style.
    pub fn set_fonts(&mut self, fonts: &str) {
        self.description = self.description.clone().with_family(fonts);
    }

    /// The family list.
    #[must_use]
    pub fn fonts(&self) -> &str {
        self.description.family()
    }

    /// Sets the size in points.
    pub fn set_font_size(&mut self, points: f64) {
        self.description = self.description.clone().with_size_points(points);
    }

    /// Sets the size in pixels, independent of resolution.
    pub fn set_pixel_size(&mut self, pixels: f64) {
        self.description = self.description.clone().with_pixel_size(pixels);
    }

    /// The size in points, or in pixels if it was set as a pixel size.
    #[must_use]
    pub fn font_size(&self) -> f64 {
        f64::from(self.description.size()) / f64::from(LAYOUT_SCALE)
    }

    /// Sets the slant.
    pub fn set_style(&mut self, style: FontStyle) {
        self.description = self.description.clone().with_style(style);
    }

    /// Sets the weight.
    pub fn set_weight(&mut self, weight: FontWeight) {
        self.description = self.description.clone().with_weight(weight);
    }

    /// The full font description.
    #[must_use]
    pub fn font_description(&self) -> &FontDescriptor {
        &self.description
    }

    /// Positions every glyph of the text.
    ///
    /// Each character takes the first family in the list whose face has it,
    /// falling back to the missing glyph of the first family. Lines are
    /// spaced by the first family's line height; the first baseline sits one
    /// ascent below the top.
    ///
    /// # Errors
    ///
    /// - [`TextError::FontResolution`] if no family in the list is available.
    /// - [`TextError::Metrics`] if the first family has no usable metrics.
    pub fn layout<R>(&self, library: &R) -> Result<Vec<PositionedGlyph>, TextError>
    where
        R: FontResolver + ?Sized,
    {
        let fonts = library.resolve(&self.description)?;
        let metrics = library.metrics(&fonts[0])?;

        let mut glyphs = Vec::with_capacity(self.text.len());
        for (line_no, line) in self.text.split('\n').enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let baseline = metrics.ascent + line_no as f32 * metrics.line_height;
            let mut pen = 0.0;
            let mut previous: Option<(usize, u32)> = None;
            for ch in line.chars().filter(|c| *c != '\r') {
                let (index, glyph) = fonts
                    .iter()
                    .enumerate()
                    .find_map(|(i, f)| library.glyph_for_char(f, ch).map(|g| (i, g)))
                    .unwrap_or((0, 0));
                let font = &fonts[index];
                if let Some((prev_index, prev_glyph)) = previous {
                    if prev_index == index {
                        pen += library.kern(font, prev_glyph, glyph);
                    }
                }
                glyphs.push(PositionedGlyph {
                    font: font.clone(),
                    glyph,
                    x: pen,
                    y: baseline,
                });
                pen += library.advance(font, glyph);
                previous = Some((index, glyph));
            }
        }
        Ok(glyphs)
    }

    /// Width and height of the laid out text in pixels.
    ///
    /// # Errors
    ///
    /// Same as [`TextLayout::layout`].
    pub fn pixel_size<R>(&self, library: &R) -> Result<(f32, f32), TextError>
    where
        R: FontResolver + ?Sized,
    {
        let fonts = library.resolve(&self.description)?;
        let metrics = library.metrics(&fonts[0])?;
        let width = self
            .layout(library)?
            .iter()
            .map(|g| g.x + library.advance(&g.font, g.glyph))
            .fold(0.0, f32::max);
        #[allow(clippy::cast_precision_loss)]
        let lines = self.text.split('\n').count() as f32;
        Ok((width, lines * metrics.line_height))
    }

    /// Lays the text out and draws it with its top left corner at (`x`, `y`)
    /// pixels. Returns the number of glyphs handed to `sink`.
    ///
    /// # Errors
    ///
    /// Same as [`TextLayout::layout`], plus [`TextError::InvalidConfig`] if
    /// the origin overflows in 1/1024 pixel units. Nothing is drawn on error.
    pub fn render<R, S>(
        &self,
        library: &R,
        x: i32,
        y: i32,
        sink: &mut S,
    ) -> Result<usize, TextError>
    where
        R: FontResolver + ?Sized,
        S: GlyphSink<FontDescriptor> + ?Sized,
    {
        let (x, y) = origin_to_layout_units(x, y)?;
        self.render_subpixel(library, x, y, sink)
    }

    /// Like [`TextLayout::render`], with the position in 1/1024 pixel units.
    ///
    /// # Errors
    ///
    /// Same as [`TextLayout::layout`]; nothing is drawn on error.
    pub fn render_subpixel<R, S>(
        &self,
        library: &R,
        x: i32,
        y: i32,
        sink: &mut S,
    ) -> Result<usize, TextError>
    where
        R: FontResolver + ?Sized,
        S: GlyphSink<FontDescriptor> + ?Sized,
    {
        let glyphs = self.layout(library)?;
        #[allow(clippy::cast_precision_loss)]
        let scale = LAYOUT_SCALE as f32;
        #[allow(clippy::cast_precision_loss)]
        draw_glyphs(&glyphs, x as f32 / scale, y as f32 / scale, sink);
        Ok(glyphs.len())
    }
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::font::{FontMetrics, GlyphBitmap, GlyphExtents};
    use crate::library::FontLibrary;

    #[derive(Default)]
    struct Recorder(Vec<(u32, f32, f32)>);

    /// "Sans" covers a-z and "Symbols" the degree sign. Every glyph advances
    /// 10 px and every pair kerns by -1 px.
    struct TwoFaces;

    impl FontEngine for TwoFaces {
        type Font = FontDescriptor;

        fn metrics(&self, _font: &FontDescriptor) -> Result<FontMetrics, TextError> {
            Ok(FontMetrics {
                ascent: 12.0,
                descent: 4.0,
                line_height: 20.0,
                approximate_char_width: 10.0,
                approximate_digit_width: 10.0,
            })
        }

        fn glyph_extents(
            &self,
            _font: &FontDescriptor,
            _glyph: u32,
        ) -> Result<GlyphExtents, TextError> {
            Ok(GlyphExtents::default())
        }

        fn render_glyph(
            &self,
            _font: &FontDescriptor,
            glyph: u32,
        ) -> Result<GlyphBitmap, TextError> {
            Err(TextError::Rasterization {
                glyph,
                reason: "no bitmaps".into(),
            })
        }
    }

    impl FontResolver for TwoFaces {
        fn resolve(&self, desc: &FontDescriptor) -> Result<Vec<FontDescriptor>, TextError> {
            let fonts: Vec<FontDescriptor> = desc
                .families()
                .filter(|family| matches!(*family, "Sans" | "Symbols"))
                .map(|family| desc.clone().with_family(family))
                .collect();
            if fonts.is_empty() {
                return Err(TextError::FontResolution {
                    families: desc.family().to_owned(),
                });
            }
            Ok(fonts)
        }

        fn glyph_for_char(&self, font: &FontDescriptor, ch: char) -> Option<u32> {
            match font.family() {
                "Sans" => ch.is_ascii_lowercase().then_some(u32::from(ch)),
                "Symbols" => (ch == '\u{b0}').then_some(1),
                _ => None,
            }
        }

        fn advance(&self, _font: &FontDescriptor, _glyph: u32) -> f32 {
            10.0
        }

        fn kern(&self, _font: &FontDescriptor, _left: u32, _right: u32) -> f32 {
            -1.0
        }
    }

    fn two_face_layout(text: &str) -> TextLayout {
        let mut layout = TextLayout::new();
        layout.set_fonts("Sans, Symbols");
        layout.set_pixel_size(16.0);
        layout.set_text(text);
        layout
    }

    fn placed(glyphs: &[PositionedGlyph]) -> Vec<(&str, u32, f32, f32)> {
        glyphs
            .iter()
            .map(|g| (g.font.family(), g.glyph, g.x, g.y))
            .collect()
    }

    #[test]
    fn fallback_kerning_and_lines() {
        let glyphs = two_face_layout("av\u{b0}\nb").layout(&TwoFaces).unwrap();
        assert_eq!(
            placed(&glyphs),
            vec![
                ("Sans", 97, 0.0, 12.0),
                // Kerned against `a`.
                ("Sans", 118, 9.0, 12.0),
                // Different face, so no kerning.
                ("Symbols", 1, 19.0, 12.0),
                ("Sans", 98, 0.0, 32.0),
            ]
        );
    }

    #[test]
    fn uncovered_characters_use_the_missing_glyph_of_the_first_face() {
        let glyphs = two_face_layout("a?\r").layout(&TwoFaces).unwrap();
        assert_eq!(
            placed(&glyphs),
            vec![("Sans", 97, 0.0, 12.0), ("Sans", 0, 9.0, 12.0)]
        );
    }

    #[test]
    fn pixel_size_spans_the_widest_line() {
        let (width, height) = two_face_layout("av\u{b0}\nb")
            .pixel_size(&TwoFaces)
            .unwrap();
        assert!((width - 29.0).abs() < f32::EPSILON);
        assert!((height - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn render_offsets_by_the_origin() {
        let layout = two_face_layout("av\u{b0}\nb");
        let mut sink = Recorder::default();
        let drawn = layout.render(&TwoFaces, 100, 50, &mut sink).unwrap();
        assert_eq!(drawn, 4);
        assert_eq!(
            sink.0,
            vec![
                (97, 100.0, 62.0),
                (118, 109.0, 62.0),
                (1, 119.0, 62.0),
                (98, 100.0, 82.0),
            ]
        );

        let mut sink = Recorder::default();
        layout.render_subpixel(&TwoFaces, 512, 0, &mut sink).unwrap();
        assert_eq!(sink.0[0], (97, 0.5, 12.0));
    }

    #[test]
    fn origins_that_overflow_draw_nothing() {
        let layout = two_face_layout("ab");
        let mut sink = Recorder::default();
        let err = layout.render(&TwoFaces, i32::MAX, 0, &mut sink).unwrap_err();
        assert!(matches!(err, TextError::InvalidConfig(_)));
        let err = layout.render(&TwoFaces, 0, -3_000_000, &mut sink).unwrap_err();
        assert!(matches!(err, TextError::InvalidConfig(_)));
        assert!(sink.0.is_empty());
        assert_eq!(origin_to_layout_units(-2, 3).unwrap(), (-2048, 3072));
    }

    impl GlyphSink<FontDescriptor> for Recorder {
        fn draw_glyph(&mut self, _font: &FontDescriptor, glyph: u32, x: f32, y: f32) {
            self.0.push((glyph, x, y));
        }
    }

    #[test]
    fn setters_keep_the_rest_of_the_description() {
        let mut layout = TextLayout::new();
        layout.set_font_size(18.0);
        layout.set_weight(FontWeight::BOLD);
        layout.set_fonts("DejaVu Sans Mono,Monospace");
        assert_eq!(layout.fonts(), "DejaVu Sans Mono, Monospace");
        assert!((layout.font_size() - 18.0).abs() < f64::EPSILON);
        assert_eq!(layout.font_description().weight(), FontWeight::BOLD);

        layout.set_style(FontStyle::Italic);
        assert_eq!(layout.font_description().style(), FontStyle::Italic);
        assert_eq!(layout.fonts(), "DejaVu Sans Mono, Monospace");
    }

    #[test]
    fn pixel_sizes_are_absolute() {
        let mut layout = TextLayout::new();
        layout.set_pixel_size(20.0);
        assert!(layout.font_description().size_is_absolute());
        assert!((layout.font_size() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unresolvable_fonts_draw_nothing() {
        let library = FontLibrary::new();
        let mut layout = TextLayout::new();
        layout.set_text("12.5 m/s");
        let mut sink = Recorder::default();
        let err = layout.render(&library, 10, 20, &mut sink).unwrap_err();
        assert!(matches!(err, TextError::FontResolution { .. }));
        assert!(sink.0.is_empty());
    }

    #[test]
    fn replay_offsets_every_glyph() {
        let font = FontDescriptor::new("Sans").with_pixel_size(12.0);
        let glyphs = vec![
            PositionedGlyph {
                font: font.clone(),
                glyph: 5,
                x: 0.0,
                y: 10.0,
            },
            PositionedGlyph {
                font,
                glyph: 6,
                x: 7.5,
                y: 10.0,
            },
        ];
        let mut sink = Recorder::default();
        draw_glyphs(&glyphs, 100.0, 0.25, &mut sink);
        assert_eq!(sink.0, vec![(5, 100.0, 10.25), (6, 107.5, 10.25)]);
    }
}
