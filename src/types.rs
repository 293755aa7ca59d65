//! Plain data exchanged between the draw interceptor and GPU backends.

use bytemuck::{Pod, Zeroable};

/// Opaque handle to a texture created by a
/// [`GlyphBackend`](crate::GlyphBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// A vertex of a glyph quad, ready for the GPU.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct GlyphVertex {
    /// Position in layout pixels (y down).
    pub position: [f32; 2],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

/// One glyph to draw: a screen rectangle sampling a rectangle of an atlas
/// texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedQuad {
    /// Texture to sample.
    pub texture: TextureHandle,
    /// Destination `[left, top, right, bottom]` in layout pixels, y down.
    pub dest: [f32; 4],
    /// Source `[u_left, v_top, u_right, v_bottom]`. `v_top` is the texture
    /// row that shows at the top of `dest`.
    pub uv: [f32; 4],
    /// Text color, straight RGBA.
    pub color: [f32; 4],
}

impl TexturedQuad {
    /// The quad as a four vertex triangle strip: top-left, bottom-left,
    /// top-right, bottom-right.
    #[must_use]
    pub fn vertices(&self) -> [GlyphVertex; 4] {
        let [left, top, right, bottom] = self.dest;
        let [u0, v_top, u1, v_bottom] = self.uv;
        [
            GlyphVertex {
                position: [left, top],
                uv: [u0, v_top],
            },
            GlyphVertex {
                position: [left, bottom],
                uv: [u0, v_bottom],
            },
            GlyphVertex {
                position: [right, top],
                uv: [u1, v_top],
            },
            GlyphVertex {
                position: [right, bottom],
                uv: [u1, v_bottom],
            },
        ]
    }
}
