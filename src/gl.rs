//! The narrow GL surface the adapter draws through.
//!
//! [`Gl`] mirrors the subset of [`glow::HasContext`] this crate needs, with
//! glow's method names and argument order. [`glow::Context`] implements it
//! directly; anything else that speaks GL (a recording context in tests, a
//! different binding) can implement it too.

use std::fmt;

use glow::PixelUnpackData;

/// `UNPACK_FLIP_Y_WEBGL`, a WebGL-only pixel store flag.
pub const UNPACK_FLIP_Y_WEBGL: u32 = 0x9240;
/// `UNPACK_PREMULTIPLY_ALPHA_WEBGL`, a WebGL-only pixel store flag.
pub const UNPACK_PREMULTIPLY_ALPHA_WEBGL: u32 = 0x9241;
/// `FRAMEBUFFER_INCOMPLETE_DIMENSIONS` (GLES2 / WebGL1 only).
pub const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: u32 = 0x8CD9;
/// `ALPHA` texture format (GLES2 / WebGL).
pub const ALPHA: u32 = 0x1906;
/// `CONTEXT_LOST` as reported by `glGetError` on robust contexts.
pub const CONTEXT_LOST: u32 = 0x0507;

/// Optional GL features the adapter adapts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// WebGL2 / GLES 3 / desktop GL 3+: sized internal formats, framebuffer
    /// blits and multisampled renderbuffers.
    pub version3: bool,
    /// Vertex array objects are available (core or `OES_vertex_array_object`).
    pub vertex_array_objects: bool,
    /// Instanced attribute divisors are available (core or
    /// `ANGLE_instanced_arrays`).
    pub instanced_arrays: bool,
}

impl Capabilities {
    /// Whether multisampled render targets can be created and resolved.
    #[must_use]
    pub fn multisample(self) -> bool {
        self.version3
    }
}

/// GL entry points used by the adapter.
///
/// # Safety
///
/// Every `unsafe fn` here has the contract of the matching
/// [`glow::HasContext`] method: the context must be current and handles must
/// belong to it.
#[allow(clippy::too_many_arguments, missing_docs)]
pub trait Gl {
    /// Buffer object handle.
    type Buffer: Copy + PartialEq + fmt::Debug;
    /// Texture object handle.
    type Texture: Copy + PartialEq + fmt::Debug;
    /// Framebuffer object handle.
    type Framebuffer: Copy + PartialEq + fmt::Debug;
    /// Renderbuffer object handle.
    type Renderbuffer: Copy + PartialEq + fmt::Debug;
    /// Shader object handle.
    type Shader: Copy + PartialEq + fmt::Debug;
    /// Program object handle.
    type Program: Copy + PartialEq + fmt::Debug;
    /// Vertex array object handle.
    type VertexArray: Copy + PartialEq + fmt::Debug;
    /// Uniform location handle.
    type UniformLocation: Clone + fmt::Debug;

    /// Optional features supported by this context.
    fn capabilities(&self) -> Capabilities;

    unsafe fn is_context_lost(&self) -> bool;

    unsafe fn create_buffer(&self) -> Result<Self::Buffer, String>;
    unsafe fn delete_buffer(&self, buffer: Self::Buffer);
    unsafe fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    unsafe fn buffer_data_size(&self, target: u32, size: i32, usage: u32);
    unsafe fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32);
    unsafe fn buffer_sub_data_u8_slice(&self, target: u32, offset: i32, data: &[u8]);
    unsafe fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    unsafe fn vertex_attrib_divisor(&self, index: u32, divisor: u32);
    unsafe fn enable_vertex_attrib_array(&self, index: u32);
    unsafe fn disable_vertex_attrib_array(&self, index: u32);

    unsafe fn create_texture(&self) -> Result<Self::Texture, String>;
    unsafe fn delete_texture(&self, texture: Self::Texture);
    unsafe fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    unsafe fn active_texture(&self, unit: u32);
    unsafe fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    unsafe fn tex_sub_image_2d(
        &self,
        target: u32,
        level: i32,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    unsafe fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    unsafe fn generate_mipmap(&self, target: u32);
    unsafe fn pixel_store_bool(&self, parameter: u32, value: bool);

    unsafe fn create_framebuffer(&self) -> Result<Self::Framebuffer, String>;
    unsafe fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);
    unsafe fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>);
    unsafe fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<Self::Texture>,
        level: i32,
    );
    unsafe fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<Self::Renderbuffer>,
    );
    unsafe fn check_framebuffer_status(&self, target: u32) -> u32;
    unsafe fn blit_framebuffer(
        &self,
        src_x0: i32,
        src_y0: i32,
        src_x1: i32,
        src_y1: i32,
        dst_x0: i32,
        dst_y0: i32,
        dst_x1: i32,
        dst_y1: i32,
        mask: u32,
        filter: u32,
    );

    unsafe fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String>;
    unsafe fn delete_renderbuffer(&self, renderbuffer: Self::Renderbuffer);
    unsafe fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<Self::Renderbuffer>);
    unsafe fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32);
    unsafe fn renderbuffer_storage_multisample(
        &self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );

    unsafe fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    unsafe fn clear(&self, mask: u32);
    unsafe fn clear_buffer_f32_slice(&self, target: u32, draw_buffer: u32, values: &[f32]);

    unsafe fn create_shader(&self, shader_type: u32) -> Result<Self::Shader, String>;
    unsafe fn shader_source(&self, shader: Self::Shader, source: &str);
    unsafe fn compile_shader(&self, shader: Self::Shader);
    unsafe fn get_shader_compile_status(&self, shader: Self::Shader) -> bool;
    unsafe fn get_shader_info_log(&self, shader: Self::Shader) -> String;
    unsafe fn delete_shader(&self, shader: Self::Shader);

    unsafe fn create_program(&self) -> Result<Self::Program, String>;
    unsafe fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    unsafe fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    unsafe fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str);
    unsafe fn link_program(&self, program: Self::Program);
    unsafe fn get_program_link_status(&self, program: Self::Program) -> bool;
    unsafe fn get_program_info_log(&self, program: Self::Program) -> String;
    unsafe fn delete_program(&self, program: Self::Program);
    unsafe fn use_program(&self, program: Option<Self::Program>);
    unsafe fn get_attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    unsafe fn get_uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;

    /// `uniform{components}iv`; `components` is 1 to 4.
    unsafe fn uniform_i32_slice(
        &self,
        location: Option<&Self::UniformLocation>,
        components: u8,
        values: &[i32],
    );
    /// `uniform{components}fv`; `components` is 1 to 4.
    unsafe fn uniform_f32_slice(
        &self,
        location: Option<&Self::UniformLocation>,
        components: u8,
        values: &[f32],
    );
    /// `uniformMatrix{dimension}fv` without transposition; `dimension` is 2 to 4.
    unsafe fn uniform_matrix_f32_slice(
        &self,
        location: Option<&Self::UniformLocation>,
        dimension: u8,
        values: &[f32],
    );

    unsafe fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    unsafe fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    unsafe fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    unsafe fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    unsafe fn enable(&self, capability: u32);
    unsafe fn disable(&self, capability: u32);
    unsafe fn is_enabled(&self, capability: u32) -> bool;
    unsafe fn depth_mask(&self, flag: bool);
    /// Reads a boolean state value such as `DEPTH_WRITEMASK` or a pixel store
    /// flag.
    unsafe fn get_parameter_bool(&self, parameter: u32) -> bool;
}

impl Gl for glow::Context {
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type Framebuffer = glow::Framebuffer;
    type Renderbuffer = glow::Renderbuffer;
    type Shader = glow::Shader;
    type Program = glow::Program;
    type VertexArray = glow::VertexArray;
    type UniformLocation = glow::UniformLocation;

    fn capabilities(&self) -> Capabilities {
        let version = glow::HasContext::version(self);
        let extensions = glow::HasContext::supported_extensions(self);
        let version3 = version.major >= 3;
        Capabilities {
            version3,
            vertex_array_objects: version3
                || extensions.contains("OES_vertex_array_object")
                || extensions.contains("GL_OES_vertex_array_object")
                || extensions.contains("GL_ARB_vertex_array_object"),
            instanced_arrays: version3
                || extensions.contains("ANGLE_instanced_arrays")
                || extensions.contains("GL_ANGLE_instanced_arrays")
                || extensions.contains("GL_ARB_instanced_arrays"),
        }
    }

    unsafe fn is_context_lost(&self) -> bool {
        unsafe { glow::HasContext::get_error(self) == CONTEXT_LOST }
    }

    unsafe fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { glow::HasContext::create_buffer(self) }
    }

    unsafe fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { glow::HasContext::delete_buffer(self, buffer) }
    }

    unsafe fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { glow::HasContext::bind_buffer(self, target, buffer) }
    }

    unsafe fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        unsafe { glow::HasContext::buffer_data_size(self, target, size, usage) }
    }

    unsafe fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { glow::HasContext::buffer_data_u8_slice(self, target, data, usage) }
    }

    unsafe fn buffer_sub_data_u8_slice(&self, target: u32, offset: i32, data: &[u8]) {
        unsafe { glow::HasContext::buffer_sub_data_u8_slice(self, target, offset, data) }
    }

    unsafe fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            glow::HasContext::vertex_attrib_pointer_f32(
                self, index, size, data_type, normalized, stride, offset,
            );
        }
    }

    unsafe fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { glow::HasContext::vertex_attrib_divisor(self, index, divisor) }
    }

    unsafe fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { glow::HasContext::enable_vertex_attrib_array(self, index) }
    }

    unsafe fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { glow::HasContext::disable_vertex_attrib_array(self, index) }
    }

    unsafe fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { glow::HasContext::create_texture(self) }
    }

    unsafe fn delete_texture(&self, texture: Self::Texture) {
        unsafe { glow::HasContext::delete_texture(self, texture) }
    }

    unsafe fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        unsafe { glow::HasContext::bind_texture(self, target, texture) }
    }

    unsafe fn active_texture(&self, unit: u32) {
        unsafe { glow::HasContext::active_texture(self, unit) }
    }

    unsafe fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            glow::HasContext::tex_image_2d(
                self,
                target,
                level,
                internal_format,
                width,
                height,
                border,
                format,
                ty,
                PixelUnpackData::Slice(pixels),
            );
        }
    }

    unsafe fn tex_sub_image_2d(
        &self,
        target: u32,
        level: i32,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        unsafe {
            glow::HasContext::tex_sub_image_2d(
                self,
                target,
                level,
                x_offset,
                y_offset,
                width,
                height,
                format,
                ty,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    unsafe fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { glow::HasContext::tex_parameter_i32(self, target, parameter, value) }
    }

    unsafe fn generate_mipmap(&self, target: u32) {
        unsafe { glow::HasContext::generate_mipmap(self, target) }
    }

    unsafe fn pixel_store_bool(&self, parameter: u32, value: bool) {
        unsafe { glow::HasContext::pixel_store_bool(self, parameter, value) }
    }

    unsafe fn create_framebuffer(&self) -> Result<Self::Framebuffer, String> {
        unsafe { glow::HasContext::create_framebuffer(self) }
    }

    unsafe fn delete_framebuffer(&self, framebuffer: Self::Framebuffer) {
        unsafe { glow::HasContext::delete_framebuffer(self, framebuffer) }
    }

    unsafe fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>) {
        unsafe { glow::HasContext::bind_framebuffer(self, target, framebuffer) }
    }

    unsafe fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<Self::Texture>,
        level: i32,
    ) {
        unsafe {
            glow::HasContext::framebuffer_texture_2d(
                self,
                target,
                attachment,
                texture_target,
                texture,
                level,
            );
        }
    }

    unsafe fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<Self::Renderbuffer>,
    ) {
        unsafe {
            glow::HasContext::framebuffer_renderbuffer(
                self,
                target,
                attachment,
                renderbuffer_target,
                renderbuffer,
            );
        }
    }

    unsafe fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { glow::HasContext::check_framebuffer_status(self, target) }
    }

    unsafe fn blit_framebuffer(
        &self,
        src_x0: i32,
        src_y0: i32,
        src_x1: i32,
        src_y1: i32,
        dst_x0: i32,
        dst_y0: i32,
        dst_x1: i32,
        dst_y1: i32,
        mask: u32,
        filter: u32,
    ) {
        unsafe {
            glow::HasContext::blit_framebuffer(
                self, src_x0, src_y0, src_x1, src_y1, dst_x0, dst_y0, dst_x1, dst_y1, mask, filter,
            );
        }
    }

    unsafe fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String> {
        unsafe { glow::HasContext::create_renderbuffer(self) }
    }

    unsafe fn delete_renderbuffer(&self, renderbuffer: Self::Renderbuffer) {
        unsafe { glow::HasContext::delete_renderbuffer(self, renderbuffer) }
    }

    unsafe fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<Self::Renderbuffer>) {
        unsafe { glow::HasContext::bind_renderbuffer(self, target, renderbuffer) }
    }

    unsafe fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32) {
        unsafe { glow::HasContext::renderbuffer_storage(self, target, internal_format, width, height) }
    }

    unsafe fn renderbuffer_storage_multisample(
        &self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        unsafe {
            glow::HasContext::renderbuffer_storage_multisample(
                self,
                target,
                samples,
                internal_format,
                width,
                height,
            );
        }
    }

    unsafe fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { glow::HasContext::clear_color(self, red, green, blue, alpha) }
    }

    unsafe fn clear(&self, mask: u32) {
        unsafe { glow::HasContext::clear(self, mask) }
    }

    unsafe fn clear_buffer_f32_slice(&self, target: u32, draw_buffer: u32, values: &[f32]) {
        unsafe { glow::HasContext::clear_buffer_f32_slice(self, target, draw_buffer, values) }
    }

    unsafe fn create_shader(&self, shader_type: u32) -> Result<Self::Shader, String> {
        unsafe { glow::HasContext::create_shader(self, shader_type) }
    }

    unsafe fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { glow::HasContext::shader_source(self, shader, source) }
    }

    unsafe fn compile_shader(&self, shader: Self::Shader) {
        unsafe { glow::HasContext::compile_shader(self, shader) }
    }

    unsafe fn get_shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { glow::HasContext::get_shader_compile_status(self, shader) }
    }

    unsafe fn get_shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { glow::HasContext::get_shader_info_log(self, shader) }
    }

    unsafe fn delete_shader(&self, shader: Self::Shader) {
        unsafe { glow::HasContext::delete_shader(self, shader) }
    }

    unsafe fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { glow::HasContext::create_program(self) }
    }

    unsafe fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { glow::HasContext::attach_shader(self, program, shader) }
    }

    unsafe fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { glow::HasContext::detach_shader(self, program, shader) }
    }

    unsafe fn bind_attrib_location(&self, program: Self::Program, index: u32, name: &str) {
        unsafe { glow::HasContext::bind_attrib_location(self, program, index, name) }
    }

    unsafe fn link_program(&self, program: Self::Program) {
        unsafe { glow::HasContext::link_program(self, program) }
    }

    unsafe fn get_program_link_status(&self, program: Self::Program) -> bool {
        unsafe { glow::HasContext::get_program_link_status(self, program) }
    }

    unsafe fn get_program_info_log(&self, program: Self::Program) -> String {
        unsafe { glow::HasContext::get_program_info_log(self, program) }
    }

    unsafe fn delete_program(&self, program: Self::Program) {
        unsafe { glow::HasContext::delete_program(self, program) }
    }

    unsafe fn use_program(&self, program: Option<Self::Program>) {
        unsafe { glow::HasContext::use_program(self, program) }
    }

    unsafe fn get_attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { glow::HasContext::get_attrib_location(self, program, name) }
    }

    unsafe fn get_uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { glow::HasContext::get_uniform_location(self, program, name) }
    }

    unsafe fn uniform_i32_slice(
        &self,
        location: Option<&Self::UniformLocation>,
        components: u8,
        values: &[i32],
    ) {
        unsafe {
            match components {
                1 => glow::HasContext::uniform_1_i32_slice(self, location, values),
                2 => glow::HasContext::uniform_2_i32_slice(self, location, values),
                3 => glow::HasContext::uniform_3_i32_slice(self, location, values),
                _ => glow::HasContext::uniform_4_i32_slice(self, location, values),
            }
        }
    }

    unsafe fn uniform_f32_slice(
        &self,
        location: Option<&Self::UniformLocation>,
        components: u8,
        values: &[f32],
    ) {
        unsafe {
            match components {
                1 => glow::HasContext::uniform_1_f32_slice(self, location, values),
                2 => glow::HasContext::uniform_2_f32_slice(self, location, values),
                3 => glow::HasContext::uniform_3_f32_slice(self, location, values),
                _ => glow::HasContext::uniform_4_f32_slice(self, location, values),
            }
        }
    }

    unsafe fn uniform_matrix_f32_slice(
        &self,
        location: Option<&Self::UniformLocation>,
        dimension: u8,
        values: &[f32],
    ) {
        unsafe {
            match dimension {
                2 => glow::HasContext::uniform_matrix_2_f32_slice(self, location, false, values),
                3 => glow::HasContext::uniform_matrix_3_f32_slice(self, location, false, values),
                _ => glow::HasContext::uniform_matrix_4_f32_slice(self, location, false, values),
            }
        }
    }

    unsafe fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { glow::HasContext::create_vertex_array(self) }
    }

    unsafe fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { glow::HasContext::bind_vertex_array(self, vertex_array) }
    }

    unsafe fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { glow::HasContext::delete_vertex_array(self, vertex_array) }
    }

    unsafe fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { glow::HasContext::draw_arrays(self, mode, first, count) }
    }

    unsafe fn enable(&self, capability: u32) {
        unsafe { glow::HasContext::enable(self, capability) }
    }

    unsafe fn disable(&self, capability: u32) {
        unsafe { glow::HasContext::disable(self, capability) }
    }

    unsafe fn is_enabled(&self, capability: u32) -> bool {
        unsafe { glow::HasContext::is_enabled(self, capability) }
    }

    unsafe fn depth_mask(&self, flag: bool) {
        unsafe { glow::HasContext::depth_mask(self, flag) }
    }

    unsafe fn get_parameter_bool(&self, parameter: u32) -> bool {
        unsafe { glow::HasContext::get_parameter_i32(self, parameter) != 0 }
    }
}

/// Convert a `u32` to `i32` for GL API calls, saturating at `i32::MAX`.
pub(crate) fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Convert a GL enum to the `i32` that `tex_parameter_i32` and
/// `tex_image_2d` expect.
// GL enum values are small enough that the cast is always lossless.
#[expect(clippy::cast_possible_wrap)]
pub(crate) const fn gl_enum_i32(value: u32) -> i32 {
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_size_saturates() {
        assert_eq!(gl_size(800), 800);
        assert_eq!(gl_size(u32::MAX), i32::MAX);
    }

    #[test]
    fn multisample_requires_version3() {
        let caps = Capabilities {
            version3: false,
            vertex_array_objects: true,
            instanced_arrays: true,
        };
        assert!(!caps.multisample());
        assert!(Capabilities { version3: true, ..caps }.multisample());
    }
}
