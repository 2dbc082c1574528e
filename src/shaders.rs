//! GLSL sources and the composite pass.
//!
//! All shaders target GLSL ES 1.00, which every WebGL context accepts.
//! The pass draws [`FULL_SCREEN_QUAD`] sampling the render target texture,
//! either as a plain copy or through FXAA.

use std::rc::Rc;

use crate::buffer::{Buffer, BufferBindOptions, VertexSource};
use crate::config::Antialiasing;
use crate::error::Result;
use crate::gl::Gl;
use crate::program::{AttributeDefinition, ShaderProgram, UniformDefinition, UniformType, UniformValue};
use crate::shader::{Shader, ShaderDefinition, ShaderKind};
use crate::types::FULL_SCREEN_QUAD;
use crate::vao::Vao;

/// Vertex shader shared by both composite variants.
///
/// # Attributes
///
/// | Name         | Type   | Description             |
/// |--------------|--------|-------------------------|
/// | `a_position` | `vec2` | Clip-space quad corner  |
pub const COMPOSITE_VERTEX_SRC: &str = r"precision mediump float;

attribute vec2 a_position;

varying vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + 0.5;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Fragment shader copying the render target texture unchanged.
///
/// # Uniforms
///
/// | Name        | Type        | Description        |
/// |-------------|-------------|--------------------|
/// | `u_texture` | `sampler2D` | Render target color |
pub const COPY_FRAGMENT_SRC: &str = r"precision mediump float;

uniform sampler2D u_texture;

varying vec2 v_uv;

void main() {
    gl_FragColor = texture2D(u_texture, v_uv);
}
";

/// Fragment shader applying fast approximate antialiasing.
///
/// `FXAA_REDUCE_MIN`, `FXAA_REDUCE_MUL` and `FXAA_SPAN_MAX` are injected as
/// definitions (see [`fxaa_definitions`]) and can be overridden.
///
/// # Uniforms
///
/// | Name          | Type        | Description                        |
/// |---------------|-------------|------------------------------------|
/// | `u_texture`   | `sampler2D` | Render target color                |
/// | `iResolution` | `vec2`      | Render target size in device pixels |
/// | `enabled`     | `int`       | `0` passes the texture through     |
pub const FXAA_FRAGMENT_SRC: &str = r"precision mediump float;

uniform sampler2D u_texture;
uniform vec2 iResolution;
uniform int enabled;

varying vec2 v_uv;

vec4 fxaa(sampler2D tex, vec2 uv, vec2 resolution) {
    vec2 texel = 1.0 / resolution;
    vec3 rgbNW = texture2D(tex, uv + vec2(-1.0, -1.0) * texel).rgb;
    vec3 rgbNE = texture2D(tex, uv + vec2(1.0, -1.0) * texel).rgb;
    vec3 rgbSW = texture2D(tex, uv + vec2(-1.0, 1.0) * texel).rgb;
    vec3 rgbSE = texture2D(tex, uv + vec2(1.0, 1.0) * texel).rgb;
    vec4 colorM = texture2D(tex, uv);
    vec3 rgbM = colorM.rgb;

    vec3 luma = vec3(0.299, 0.587, 0.114);
    float lumaNW = dot(rgbNW, luma);
    float lumaNE = dot(rgbNE, luma);
    float lumaSW = dot(rgbSW, luma);
    float lumaSE = dot(rgbSE, luma);
    float lumaM = dot(rgbM, luma);
    float lumaMin = min(lumaM, min(min(lumaNW, lumaNE), min(lumaSW, lumaSE)));
    float lumaMax = max(lumaM, max(max(lumaNW, lumaNE), max(lumaSW, lumaSE)));

    vec2 dir;
    dir.x = -((lumaNW + lumaNE) - (lumaSW + lumaSE));
    dir.y = ((lumaNW + lumaSW) - (lumaNE + lumaSE));

    float dirReduce = max(
        (lumaNW + lumaNE + lumaSW + lumaSE) * (0.25 * FXAA_REDUCE_MUL),
        FXAA_REDUCE_MIN);
    float rcpDirMin = 1.0 / (min(abs(dir.x), abs(dir.y)) + dirReduce);
    dir = min(vec2(FXAA_SPAN_MAX, FXAA_SPAN_MAX),
              max(vec2(-FXAA_SPAN_MAX, -FXAA_SPAN_MAX), dir * rcpDirMin)) * texel;

    vec3 rgbA = 0.5 * (
        texture2D(tex, uv + dir * (1.0 / 3.0 - 0.5)).rgb +
        texture2D(tex, uv + dir * (2.0 / 3.0 - 0.5)).rgb);
    vec3 rgbB = rgbA * 0.5 + 0.25 * (
        texture2D(tex, uv + dir * -0.5).rgb +
        texture2D(tex, uv + dir * 0.5).rgb);

    float lumaB = dot(rgbB, luma);
    if (lumaB < lumaMin || lumaB > lumaMax) {
        return vec4(rgbA, colorM.a);
    }
    return vec4(rgbB, colorM.a);
}

void main() {
    if (enabled == 0) {
        gl_FragColor = texture2D(u_texture, v_uv);
    } else {
        gl_FragColor = fxaa(u_texture, v_uv, iResolution);
    }
}
";

/// Default FXAA tuning constants.
#[must_use]
pub fn fxaa_definitions() -> Vec<ShaderDefinition> {
    vec![
        ShaderDefinition::new("FXAA_REDUCE_MIN", "(1.0 / 128.0)"),
        ShaderDefinition::new("FXAA_REDUCE_MUL", "(1.0 / 8.0)"),
        ShaderDefinition::new("FXAA_SPAN_MAX", "8.0"),
    ]
}

/// Which fragment shader the composite pass uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// Plain texture copy.
    Copy,
    /// FXAA filtered copy.
    Fxaa,
}

impl From<Antialiasing> for CompositeMode {
    fn from(antialiasing: Antialiasing) -> Self {
        match antialiasing {
            Antialiasing::Fxaa => Self::Fxaa,
            // MSAA is resolved before compositing; the copy is enough.
            Antialiasing::None | Antialiasing::Msaa => Self::Copy,
        }
    }
}

/// The full-screen draw compositing the render target onto the bound
/// framebuffer.
pub struct CompositePass<G: Gl> {
    mode: CompositeMode,
    program: ShaderProgram<G>,
    vertices: Rc<Buffer<G>>,
    vao: Vao<G>,
    definitions: Vec<ShaderDefinition>,
}

impl<G: Gl> CompositePass<G> {
    /// Declare the pass. `definitions` override the built-in shader
    /// constants when the program is first linked.
    ///
    /// # Errors
    ///
    /// Never in practice; attribute declarations are fixed.
    pub fn new(mode: CompositeMode, definitions: Vec<ShaderDefinition>) -> Result<Self> {
        let vertex = Shader::new(ShaderKind::Vertex, COMPOSITE_VERTEX_SRC);
        let (fragment, uniforms) = match mode {
            CompositeMode::Copy => (
                Shader::new(ShaderKind::Fragment, COPY_FRAGMENT_SRC),
                vec![UniformDefinition::new("u_texture", UniformType::Int(1))],
            ),
            CompositeMode::Fxaa => (
                Shader::with_definitions(ShaderKind::Fragment, FXAA_FRAGMENT_SRC, fxaa_definitions()),
                vec![
                    UniformDefinition::new("u_texture", UniformType::Int(1)),
                    UniformDefinition::new("iResolution", UniformType::Float(2)),
                    UniformDefinition::new("enabled", UniformType::Int(1)),
                ],
            ),
        };
        let program = ShaderProgram::new(
            vertex,
            fragment,
            uniforms,
            vec![AttributeDefinition::new("a_position")],
        )?;

        let vertices = Rc::new(Buffer::from_slice(
            &FULL_SCREEN_QUAD,
            BufferBindOptions {
                item_size: 2,
                ..BufferBindOptions::default()
            },
        ));
        let vao = Vao::new([("a_position", VertexSource::from(Rc::clone(&vertices)))], None);

        Ok(Self {
            mode,
            program,
            vertices,
            vao,
            definitions,
        })
    }

    /// The fragment shader variant.
    #[must_use]
    pub fn mode(&self) -> CompositeMode {
        self.mode
    }

    /// Whether the program failed to build. An errored pass draws nothing.
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.program.is_errored()
    }

    /// Draw the texture bound to unit 0 over the whole viewport. Depth
    /// writes are disabled for the draw and restored afterwards.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context with the target framebuffer and
    /// the source texture bound.
    ///
    /// # Errors
    ///
    /// The first compile or link failure of the program.
    // Render target sizes are far below f32's exact integer range.
    #[expect(clippy::cast_precision_loss)]
    pub unsafe fn draw(&mut self, gl: &G, [width, height]: [u32; 2]) -> Result<()> {
        unsafe { self.program.enable(gl, Some(&self.definitions)) }?;
        if self.program.is_errored() {
            return Ok(());
        }

        let uniforms = match self.mode {
            CompositeMode::Copy => vec![("u_texture", UniformValue::Int(0))],
            CompositeMode::Fxaa => vec![
                ("iResolution", UniformValue::from([width as f32, height as f32])),
                ("u_texture", UniformValue::Int(0)),
                ("enabled", UniformValue::Int(1)),
            ],
        };

        unsafe {
            self.program.bind(gl, &uniforms, &[])?;
            self.vao.bind(gl, &mut self.program)?;

            let depth_mask = gl.get_parameter_bool(glow::DEPTH_WRITEMASK);
            gl.depth_mask(false);
            gl.draw_arrays(glow::TRIANGLES, 0, 6);
            gl.depth_mask(depth_mask);

            self.vao.unbind(gl);
            // Without VAOs the attribute arrays are shared with the host and
            // must be enabled again next frame.
            if !gl.capabilities().vertex_array_objects {
                self.program.disable(gl);
            }
        }
        Ok(())
    }

    /// Release the program, the VAO and the vertex buffer.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the pass drew with.
    pub unsafe fn remove(&mut self, gl: &G) {
        unsafe {
            self.vao.remove(gl);
            self.vertices.remove(gl);
            self.program.remove(gl);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gl::Capabilities;
    use crate::testing::{Call, RecordingGl};

    #[test]
    fn copy_pass_draws_two_triangles_without_depth_writes() {
        let gl = RecordingGl::new();
        let mut pass = CompositePass::<RecordingGl>::new(CompositeMode::Copy, Vec::new()).unwrap();
        unsafe { pass.draw(&gl, [800, 600]) }.unwrap();

        let calls = gl.calls();
        let draw = calls
            .iter()
            .position(|call| {
                *call
                    == Call::DrawArrays {
                        mode: glow::TRIANGLES,
                        first: 0,
                        count: 6,
                    }
            })
            .unwrap();
        assert_eq!(calls[draw - 1], Call::DepthMask(false));
        assert_eq!(calls[draw + 1], Call::DepthMask(true));
        assert!(calls.contains(&Call::UniformI32 {
            location: Some("u_texture".into()),
            components: 1,
            values: vec![0],
        }));
        assert!(gl.depth_write_enabled());
    }

    #[test]
    fn fxaa_pass_sets_resolution_and_constants() {
        let gl = RecordingGl::new();
        let mut pass = CompositePass::<RecordingGl>::new(
            CompositeMode::Fxaa,
            vec![ShaderDefinition::new("FXAA_SPAN_MAX", "4.0")],
        )
        .unwrap();
        unsafe { pass.draw(&gl, [1600, 1200]) }.unwrap();

        let calls = gl.calls();
        assert!(calls.contains(&Call::UniformF32 {
            location: Some("iResolution".into()),
            components: 2,
            values: vec![1600.0, 1200.0],
        }));
        assert!(calls.contains(&Call::UniformI32 {
            location: Some("enabled".into()),
            components: 1,
            values: vec![1],
        }));
        assert!(calls.iter().any(|call| matches!(
            call,
            Call::ShaderSource { source, .. }
                if source.contains("#define FXAA_SPAN_MAX 4.0")
                    && source.contains("#define FXAA_REDUCE_MIN (1.0 / 128.0)")
        )));
    }

    #[test]
    fn failed_program_reports_once_and_skips_draws() {
        let gl = RecordingGl::new();
        gl.fail_link("bad program");
        let mut pass = CompositePass::<RecordingGl>::new(CompositeMode::Copy, Vec::new()).unwrap();

        assert!(matches!(
            unsafe { pass.draw(&gl, [1, 1]) },
            Err(Error::ProgramLink(_))
        ));
        assert!(pass.is_errored());
        assert!(unsafe { pass.draw(&gl, [1, 1]) }.is_ok());
        assert_eq!(gl.count(|call| matches!(call, Call::DrawArrays { .. })), 0);
    }

    #[test]
    fn attributes_are_enabled_every_frame_without_vaos() {
        let gl = RecordingGl::with_capabilities(Capabilities::default());
        let mut pass = CompositePass::<RecordingGl>::new(CompositeMode::Copy, Vec::new()).unwrap();
        unsafe { pass.draw(&gl, [4, 4]) }.unwrap();
        assert_eq!(gl.calls().last(), Some(&Call::DisableVertexAttribArray(0)));

        gl.clear_calls();
        unsafe {
            gl.disable_vertex_attrib_array(0);
            pass.draw(&gl, [4, 4]).unwrap();
        }
        let calls = gl.calls();
        let enable = calls
            .iter()
            .position(|call| *call == Call::EnableVertexAttribArray(0))
            .unwrap();
        let draw = calls
            .iter()
            .position(|call| matches!(call, Call::DrawArrays { .. }))
            .unwrap();
        assert!(enable < draw);
    }

    #[test]
    fn antialiasing_selects_mode() {
        assert_eq!(CompositeMode::from(Antialiasing::Fxaa), CompositeMode::Fxaa);
        assert_eq!(CompositeMode::from(Antialiasing::Msaa), CompositeMode::Copy);
        assert_eq!(CompositeMode::from(Antialiasing::None), CompositeMode::Copy);
    }

    #[test]
    fn remove_releases_everything() {
        let gl = RecordingGl::new();
        let mut pass = CompositePass::<RecordingGl>::new(CompositeMode::Copy, Vec::new()).unwrap();
        unsafe {
            pass.draw(&gl, [2, 2]).unwrap();
            pass.remove(&gl);
        }
        assert_eq!(gl.count(|call| matches!(call, Call::DeleteProgram(_))), 1);
        assert_eq!(gl.count(|call| matches!(call, Call::DeleteVertexArray(_))), 1);
        assert_eq!(gl.count(|call| matches!(call, Call::DeleteBuffer(_))), 1);
    }
}
