//! Routes individual glyph draws through the font cache and glyph atlas.

use log::{error, trace, warn};

use crate::backend::GlyphBackend;
use crate::cache::FontCache;
use crate::error::TextError;
use crate::font::FontEngine;
use crate::layout::GlyphSink;
use crate::types::TexturedQuad;

/// Texture unit glyph textures are bound to.
pub const GLYPH_TEXTURE_UNIT: u32 = 0;

/// Counters of one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Glyph quads drawn.
    pub drawn: usize,
    /// Glyphs dropped because they could not be rasterized or placed.
    pub skipped: usize,
    /// Texture sub-region uploads issued.
    pub uploads: usize,
}

/// A [`GlyphSink`] that draws each glyph from its font's atlas.
///
/// For every glyph the font's cache entry is looked up (created on first
/// use), the glyph is placed in the atlas if it is new, pending texture
/// changes are uploaded and a textured quad is drawn.
///
/// Glyphs that cannot be rasterized or do not fit an atlas are skipped with
/// a warning. Any other error ends the pass: later glyphs are ignored and
/// [`finish`](Self::finish) returns it.
pub struct GlyphDrawInterceptor<'a, E: FontEngine, B: GlyphBackend> {
    cache: &'a mut FontCache<E::Font>,
    engine: &'a E,
    backend: &'a mut B,
    color: [f32; 4],
    stats: RenderStats,
    fatal: Option<TextError>,
}

impl<'a, E: FontEngine, B: GlyphBackend> GlyphDrawInterceptor<'a, E, B> {
    /// Creates an interceptor drawing opaque white glyphs.
    pub fn new(cache: &'a mut FontCache<E::Font>, engine: &'a E, backend: &'a mut B) -> Self {
        Self {
            cache,
            engine,
            backend,
            color: [1.0; 4],
            stats: RenderStats::default(),
            fatal: None,
        }
    }

    /// Sets the glyph color (straight RGBA).
    #[must_use]
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Counters so far.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Ends the pass.
    ///
    /// # Errors
    ///
    /// Returns the first error that was not specific to a single glyph.
    pub fn finish(self) -> Result<RenderStats, TextError> {
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(self.stats),
        }
    }

    /// Draws one glyph. Returns `false` for glyphs with nothing to draw.
    fn try_draw(&mut self, font: &E::Font, glyph: u32, x: f32, y: f32) -> Result<bool, TextError> {
        let engine = self.engine;
        let entry = self.cache.get_or_create(font, |f| engine.metrics(f))?;

        let placed = match entry.atlas.get(glyph) {
            Some(placed) => placed,
            None => {
                let extents = engine.glyph_extents(font, glyph)?;
                if extents.is_empty() {
                    trace!("glyph {glyph} has no ink");
                    return Ok(false);
                }
                entry.atlas.place(glyph, extents.width, extents.height, || {
                    engine.render_glyph(font, glyph)
                })?
            }
        };

        let config = entry.atlas.config();
        let texture = entry
            .atlas
            .texture_mut(placed.texture)
            .ok_or_else(|| TextError::Gpu(format!("atlas texture {} missing", placed.texture)))?;

        let handle = match texture.gpu_handle() {
            Some(handle) => handle,
            None => {
                let handle = self
                    .backend
                    .create_texture(config.texture_size(), config.format())?;
                texture.set_gpu_handle(Some(handle));
                handle
            }
        };

        if let Some(region) = texture.dirty_region() {
            let pixels = texture.region_pixels(&region);
            self.backend.upload_subregion(
                handle,
                region.x_left,
                region.y_bottom,
                region.width(),
                region.height(),
                &pixels,
            )?;
            texture.mark_clean();
            self.stats.uploads += 1;
        }

        self.backend.bind_for_sampling(handle, GLYPH_TEXTURE_UNIT)?;

        #[allow(clippy::cast_precision_loss)]
        let (left, top) = (x + placed.bearing_x as f32, y + placed.bearing_y as f32);
        #[allow(clippy::cast_precision_loss)]
        let quad = TexturedQuad {
            texture: handle,
            dest: [
                left,
                top,
                left + placed.width() as f32,
                top + placed.height() as f32,
            ],
            uv: placed.uv(config.texture_size()),
            color: self.color,
        };
        self.backend.draw_quad(&quad)?;
        trace!("drew glyph {glyph} at ({x}, {y}) from texture {}", placed.texture);
        Ok(true)
    }
}

impl<E: FontEngine, B: GlyphBackend> GlyphSink<E::Font> for GlyphDrawInterceptor<'_, E, B> {
    fn draw_glyph(&mut self, font: &E::Font, glyph: u32, x: f32, y: f32) {
        if self.fatal.is_some() {
            return;
        }
        match self.try_draw(font, glyph, x, y) {
            Ok(true) => self.stats.drawn += 1,
            Ok(false) => {}
            Err(err) if err.is_per_glyph() => {
                warn!("skipping glyph {glyph} of {font:?}: {err}");
                self.stats.skipped += 1;
            }
            Err(err) => {
                error!("text rendering aborted at glyph {glyph} of {font:?}: {err}");
                self.fatal = Some(err);
            }
        }
    }
}
