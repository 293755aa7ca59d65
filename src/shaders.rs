//! GLSL shader sources and compilation helpers.
//!
//! All shaders target GLSL 1.40 (OpenGL 3.1), which is widely supported on
//! desktop platforms.

use glow::HasContext;

use crate::error::TextError;

/// Vertex shader for glyph quads.
///
/// Positions arrive in layout pixels with y pointing down.
///
/// # Uniforms
///
/// | Name           | Type   | Description             |
/// |----------------|--------|-------------------------|
/// | `u_resolution` | `vec2` | Viewport size in pixels |
pub const GLYPH_VERTEX_SRC: &str = r"#version 140

in vec2 a_position;
in vec2 a_uv;

uniform vec2 u_resolution;

out vec2 v_uv;

void main() {
    v_uv = a_uv;
    // Convert from [0, resolution] to [-1, 1] (flip Y for GL)
    vec2 ndc = (a_position / u_resolution) * 2.0 - 1.0;
    ndc.y = -ndc.y;
    gl_Position = vec4(ndc, 0.0, 1.0);
}
";

/// Fragment shader for glyph quads.
///
/// Single channel atlases carry coverage in the red channel; RGBA atlases in
/// alpha. The output is the text color scaled by coverage, premultiplied.
///
/// # Uniforms
///
/// | Name           | Type        | Description                      |
/// |----------------|-------------|----------------------------------|
/// | `u_texture`    | `sampler2D` | Atlas texture unit               |
/// | `u_color`      | `vec4`      | Text color, straight alpha       |
/// | `u_alpha_only` | `bool`      | Atlas is single channel          |
pub const GLYPH_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;
uniform vec4 u_color;
uniform bool u_alpha_only;

out vec4 frag_color;

void main() {
    vec4 texel = texture(u_texture, v_uv);
    float coverage = u_alpha_only ? texel.r : texel.a;
    frag_color = vec4(u_color.rgb, u_color.a * coverage);
    frag_color.rgb *= frag_color.a;
}
";

/// Compile a shader program from vertex and fragment source strings.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns [`TextError::Gpu`] if shader compilation or program linking
/// fails.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, TextError> {
    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, vertex_src)? };
    let fs = match unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) } {
        Ok(fs) => fs,
        Err(err) => {
            unsafe { gl.delete_shader(vs) };
            return Err(err);
        }
    };

    let program = match unsafe { gl.create_program() } {
        Ok(program) => program,
        Err(err) => {
            unsafe {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
            }
            return Err(TextError::Gpu(err));
        }
    };

    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(TextError::Gpu(format!("program link error: {log}")));
        }

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
    }

    Ok(program)
}

/// Compile a single shader stage (vertex or fragment) from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, TextError> {
    unsafe {
        let shader = gl.create_shader(shader_type).map_err(TextError::Gpu)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(TextError::Gpu(format!("shader compile error: {log}")));
        }

        Ok(shader)
    }
}
