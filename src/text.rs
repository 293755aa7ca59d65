//! Ties a font library, the font cache and a backend into one text renderer.

use log::debug;

use crate::backend::GlyphBackend;
use crate::cache::FontCache;
use crate::config::AtlasConfig;
use crate::error::TextError;
use crate::font::FontDescriptor;
use crate::interceptor::{GlyphDrawInterceptor, RenderStats};
use crate::layout::{origin_to_layout_units, TextLayout};
use crate::library::FontLibrary;

/// Draws [`TextLayout`]s through cached glyph atlases.
///
/// Owns everything a frame needs; keep one per GL context. Call
/// [`destroy`](Self::destroy) before the context goes away.
pub struct TextRenderer<B: GlyphBackend> {
    library: FontLibrary,
    cache: FontCache<FontDescriptor>,
    backend: B,
    color: [f32; 4],
}

impl<B: GlyphBackend> TextRenderer<B> {
    /// Creates a renderer with an empty cache; text is opaque white.
    pub fn new(library: FontLibrary, config: AtlasConfig, backend: B) -> Self {
        Self {
            library,
            cache: FontCache::new(config),
            backend,
            color: [1.0; 4],
        }
    }

    /// Sets the color of subsequently drawn text.
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    /// The current text color.
    #[must_use]
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// The fonts text is set in.
    pub fn library(&self) -> &FontLibrary {
        &self.library
    }

    /// Mutable access to the fonts, e.g. to register more faces.
    pub fn library_mut(&mut self) -> &mut FontLibrary {
        &mut self.library
    }

    /// The glyph atlases built so far.
    pub fn font_cache(&self) -> &FontCache<FontDescriptor> {
        &self.cache
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend, e.g. to change the viewport.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Draws `layout` with its top left corner at (`x`, `y`) pixels.
    ///
    /// # Errors
    ///
    /// Font resolution and metrics errors, and the first GPU error. Glyphs
    /// that fail on their own are skipped and counted instead. An origin
    /// that overflows in 1/1024 pixel units is a [`TextError::InvalidConfig`].
    pub fn render_layout(
        &mut self,
        layout: &TextLayout,
        x: i32,
        y: i32,
    ) -> Result<RenderStats, TextError> {
        let (x, y) = origin_to_layout_units(x, y)?;
        self.render_layout_subpixel(layout, x, y)
    }

    /// Like [`render_layout`](Self::render_layout), with the position in
    /// 1/1024 pixel units.
    ///
    /// # Errors
    ///
    /// Same as [`render_layout`](Self::render_layout).
    pub fn render_layout_subpixel(
        &mut self,
        layout: &TextLayout,
        x: i32,
        y: i32,
    ) -> Result<RenderStats, TextError> {
        let mut interceptor =
            GlyphDrawInterceptor::new(&mut self.cache, &self.library, &mut self.backend)
                .with_color(self.color);
        layout.render_subpixel(&self.library, x, y, &mut interceptor)?;
        let stats = interceptor.finish()?;
        debug!(
            "rendered {:?}: {} drawn, {} skipped, {} uploads",
            layout.text(),
            stats.drawn,
            stats.skipped,
            stats.uploads
        );
        Ok(stats)
    }

    /// Releases every GPU texture. Atlases keep their contents and are
    /// uploaded again on the next draw.
    pub fn release_textures(&mut self) {
        self.cache.release_gpu(&mut self.backend);
    }

    /// Releases every GPU texture and hands back the backend.
    pub fn destroy(mut self) -> B {
        self.release_textures();
        self.backend
    }
}
