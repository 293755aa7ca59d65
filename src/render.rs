//! OpenGL glyph backend: owns the glyph program, a streaming quad buffer and
//! the atlas textures, and issues draw calls.

use glow::{HasContext, PixelUnpackData};
use log::{debug, warn};
use std::sync::Arc;

use crate::{
    backend::GlyphBackend,
    config::PixelFormat,
    error::TextError,
    shaders,
    types::{GlyphVertex, TextureHandle, TexturedQuad},
};

/// Convert a `u32` to `i32` for GL API calls.
fn gl_size(value: u32) -> Result<i32, TextError> {
    i32::try_from(value).map_err(|_| TextError::Gpu(format!("dimension {value} exceeds i32::MAX")))
}

/// Value of the `u_texture` sampler uniform for texture `unit`.
fn sampler_unit(unit: u32) -> Result<i32, TextError> {
    i32::try_from(unit).map_err(|_| TextError::Gpu(format!("texture unit {unit} out of range")))
}

/// Cached uniform locations for the glyph program.
struct GlyphUniforms {
    /// `u_resolution` — viewport size in pixels.
    resolution: glow::UniformLocation,
    /// `u_texture` — sampler unit.
    texture: glow::UniformLocation,
    /// `u_color` — text color.
    color: glow::UniformLocation,
    /// `u_alpha_only` — whether the atlas is single channel.
    alpha_only: glow::UniformLocation,
}

/// An atlas texture and the format it was created with.
#[derive(Clone, Copy)]
struct GlTexture {
    texture: glow::Texture,
    format: PixelFormat,
}

/// A [`GlyphBackend`] drawing into the currently bound OpenGL framebuffer.
///
/// Quads are streamed one at a time through a single vertex buffer and
/// blended with premultiplied alpha.
///
/// # Example
///
/// ```no_run
/// # use vario_gltext::{GlowBackend, TextRenderer, FontLibrary, AtlasConfig};
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>) -> Result<(), vario_gltext::TextError> {
/// // During setup (with a current GL context):
/// let mut backend = unsafe { GlowBackend::new(gl)? };
/// backend.set_viewport([800, 480]);
/// let mut renderer = TextRenderer::new(FontLibrary::new(), AtlasConfig::default(), backend);
/// // ...
/// renderer.destroy();
/// # Ok(())
/// # }
/// ```
pub struct GlowBackend {
    /// The OpenGL context, shared via [`Arc`].
    gl: Arc<glow::Context>,

    /// Compiled glyph program.
    program: glow::Program,
    /// Cached uniform locations for [`program`](Self::program).
    uniforms: GlyphUniforms,

    /// Vertex array object with `vec2` position and uv attributes.
    vao: glow::VertexArray,
    /// Vertex buffer for streaming quad vertices.
    vbo: glow::Buffer,

    /// Textures indexed by handle; `None` once deleted.
    textures: Vec<Option<GlTexture>>,
    /// Viewport size in pixels.
    viewport: [u32; 2],
    /// Unit of the last [`bind_for_sampling`](GlyphBackend::bind_for_sampling).
    sampler: i32,
}

impl GlowBackend {
    /// Create a new backend.
    ///
    /// Compiles the glyph program and creates the quad buffers.
    ///
    /// # Safety
    ///
    /// The `gl` context must be current and valid whenever any method of the
    /// backend is called. The caller must ensure that
    /// [`destroy`](Self::destroy) is called before the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Gpu`] if shader compilation, program linking, or
    /// GL resource creation fails.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Result<Self, TextError> {
        let program = unsafe {
            shaders::compile_program(&gl, shaders::GLYPH_VERTEX_SRC, shaders::GLYPH_FRAGMENT_SRC)?
        };

        let uniform = |name: &str| {
            unsafe { gl.get_uniform_location(program, name) }
                .ok_or_else(|| TextError::Gpu(format!("{name} missing from glyph shader")))
        };
        let uniforms = GlyphUniforms {
            resolution: uniform("u_resolution")?,
            texture: uniform("u_texture")?,
            color: uniform("u_color")?,
            alpha_only: uniform("u_alpha_only")?,
        };
        let attrib = |name: &str| {
            unsafe { gl.get_attrib_location(program, name) }
                .ok_or_else(|| TextError::Gpu(format!("{name} missing from glyph shader")))
        };
        let position = attrib("a_position")?;
        let uv = attrib("a_uv")?;

        let (vao, vbo) = unsafe {
            let vao = gl.create_vertex_array().map_err(TextError::Gpu)?;
            let vbo = gl.create_buffer().map_err(TextError::Gpu)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            // GlyphVertex is 16 bytes — well within i32 range.
            #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let stride = std::mem::size_of::<GlyphVertex>() as i32;
            gl.enable_vertex_attrib_array(position);
            gl.vertex_attrib_pointer_f32(position, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(uv);
            gl.vertex_attrib_pointer_f32(uv, 2, glow::FLOAT, false, stride, 8);
            gl.bind_vertex_array(None);

            (vao, vbo)
        };

        debug!("glyph program ready");
        Ok(Self {
            gl,
            program,
            uniforms,
            vao,
            vbo,
            textures: Vec::new(),
            viewport: [1, 1],
            sampler: 0,
        })
    }

    /// Sets the viewport size quads are projected into.
    pub fn set_viewport(&mut self, size: [u32; 2]) {
        self.viewport = [size[0].max(1), size[1].max(1)];
    }

    /// Current viewport size.
    #[must_use]
    pub fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    fn texture(&self, handle: TextureHandle) -> Result<GlTexture, TextError> {
        self.textures
            .get(handle.0 as usize)
            .copied()
            .flatten()
            .ok_or_else(|| TextError::Gpu(format!("unknown texture {}", handle.0)))
    }

    /// Set default texture filtering and wrapping parameters.
    unsafe fn set_default_tex_params(gl: &glow::Context) {
        // GL constant values are small enough that the cast is always safe.
        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    /// Clean up all GL resources owned by this backend.
    ///
    /// Textures still alive are deleted too. Calling it again is a no-op for
    /// textures but deletes the program objects twice, so call it once.
    pub fn destroy(&mut self) {
        let gl = &self.gl;
        // SAFETY: the context is current per the contract of `new`.
        unsafe {
            for texture in self.textures.drain(..).flatten() {
                gl.delete_texture(texture.texture);
            }
            gl.delete_program(self.program);
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}

/// GL pixel transfer format and internal format of an atlas format.
#[expect(clippy::cast_possible_wrap)]
fn gl_formats(format: PixelFormat) -> (u32, i32) {
    match format {
        PixelFormat::Alpha8 => (glow::RED, glow::R8 as i32),
        PixelFormat::Rgba8 => (glow::RGBA, glow::RGBA8 as i32),
    }
}

impl GlyphBackend for GlowBackend {
    fn create_texture(&mut self, size: u32, format: PixelFormat) -> Result<TextureHandle, TextError> {
        let side = gl_size(size)?;
        let handle = u32::try_from(self.textures.len())
            .map(TextureHandle)
            .map_err(|_| TextError::Gpu("too many textures".into()))?;
        let (transfer, internal) = gl_formats(format);
        let blank = vec![0u8; size as usize * size as usize * format.bytes_per_pixel()];

        let gl = &self.gl;
        // SAFETY: the context is current per the contract of `new`.
        let texture = unsafe {
            let texture = gl.create_texture().map_err(TextError::Gpu)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                side,
                side,
                0,
                transfer,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(&blank)),
            );
            Self::set_default_tex_params(gl);
            gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };

        debug!("created {size}x{size} {format:?} texture {}", handle.0);
        self.textures.push(Some(GlTexture { texture, format }));
        Ok(handle)
    }

    fn upload_subregion(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), TextError> {
        let target = self.texture(texture)?;
        let expected = width as usize * height as usize * target.format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(TextError::Gpu(format!(
                "upload of {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        let (transfer, _) = gl_formats(target.format);
        let (x, y, width, height) = (gl_size(x)?, gl_size(y)?, gl_size(width)?, gl_size(height)?);

        let gl = &self.gl;
        // SAFETY: the context is current per the contract of `new`.
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(target.texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                x,
                y,
                width,
                height,
                transfer,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
        Ok(())
    }

    fn bind_for_sampling(&mut self, texture: TextureHandle, unit: u32) -> Result<(), TextError> {
        let target = self.texture(texture)?;
        let sampler = sampler_unit(unit)?;
        let gl = &self.gl;
        // SAFETY: the context is current per the contract of `new`.
        unsafe {
            gl.active_texture(glow::TEXTURE0 + unit);
            gl.bind_texture(glow::TEXTURE_2D, Some(target.texture));
        }
        self.sampler = sampler;
        Ok(())
    }

    fn draw_quad(&mut self, quad: &TexturedQuad) -> Result<(), TextError> {
        let target = self.texture(quad.texture)?;
        let vertices = quad.vertices();
        #[expect(clippy::cast_precision_loss)]
        let resolution = [self.viewport[0] as f32, self.viewport[1] as f32];
        let [r, g, b, a] = quad.color;

        let gl = &self.gl;
        // SAFETY: the context is current per the contract of `new`.
        unsafe {
            gl.enable(glow::BLEND);
            gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);

            gl.use_program(Some(self.program));
            gl.uniform_2_f32(Some(&self.uniforms.resolution), resolution[0], resolution[1]);
            gl.uniform_1_i32(Some(&self.uniforms.texture), self.sampler);
            gl.uniform_4_f32(Some(&self.uniforms.color), r, g, b, a);
            gl.uniform_1_i32(
                Some(&self.uniforms.alpha_only),
                i32::from(target.format == PixelFormat::Alpha8),
            );

            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&vertices),
                glow::STREAM_DRAW,
            );
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.bind_vertex_array(None);
        }
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        let Some(slot) = self.textures.get_mut(texture.0 as usize) else {
            warn!("deleting unknown texture {}", texture.0);
            return;
        };
        if let Some(target) = slot.take() {
            // SAFETY: the context is current per the contract of `new`.
            unsafe { self.gl.delete_texture(target.texture) };
        }
    }
}
