//! The GPU surface the draw interceptor renders through.

use crate::config::PixelFormat;
use crate::error::TextError;
use crate::types::{TextureHandle, TexturedQuad};

/// Texture upload and textured-quad drawing, as needed by the glyph atlas.
///
/// [`GlowBackend`](crate::GlowBackend) implements this with OpenGL. All calls
/// happen on the rendering thread, in order.
pub trait GlyphBackend {
    /// Creates a square texture of `size` pixels, initially transparent.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Gpu`] if the texture cannot be allocated.
    fn create_texture(&mut self, size: u32, format: PixelFormat)
        -> Result<TextureHandle, TextError>;

    /// Replaces the pixels of a sub-rectangle. `pixels` holds `height` rows
    /// of `width` pixels, bottom row first, tightly packed in the texture's
    /// format.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Gpu`] for unknown handles or failed uploads.
    fn upload_subregion(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), TextError>;

    /// Binds `texture` to texture unit `unit` for sampling.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Gpu`] for unknown handles.
    fn bind_for_sampling(&mut self, texture: TextureHandle, unit: u32) -> Result<(), TextError>;

    /// Draws one glyph quad.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Gpu`] if the draw cannot be issued.
    fn draw_quad(&mut self, quad: &TexturedQuad) -> Result<(), TextError>;

    /// Releases a texture. Unknown handles are ignored.
    fn delete_texture(&mut self, texture: TextureHandle);
}
