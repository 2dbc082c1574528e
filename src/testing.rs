//! Test doubles: a GL context that records calls, a host map and a guest
//! library.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde_json::Map;

use crate::gl::{Capabilities, Gl, UNPACK_FLIP_Y_WEBGL, UNPACK_PREMULTIPLY_ALPHA_WEBGL};
use crate::guest::{DeckProps, DrawOptions, GlParameters, GuestDeck, LayerDescriptor, LayerType, MapView};
use crate::host::HostMap;
use crate::state::GlStateSnapshot;
use crate::viewport::{Padding, ViewState, Viewport};

/// A GL call as seen by [`RecordingGl`]. Handles are plain integers.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer { target: u32, buffer: Option<u32> },
    BufferDataSize { target: u32, size: i32, usage: u32 },
    BufferData { target: u32, bytes: Vec<u8>, usage: u32 },
    BufferSubData { target: u32, offset: i32, bytes: Vec<u8> },
    VertexAttribPointer {
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribDivisor { index: u32, divisor: u32 },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),

    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture { target: u32, texture: Option<u32> },
    ActiveTexture(u32),
    TexImage2d {
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<usize>,
    },
    TexSubImage2d { x: i32, y: i32, width: i32, height: i32, len: usize },
    TexParameter { parameter: u32, value: i32 },
    GenerateMipmap(u32),
    PixelStore { parameter: u32, value: bool },

    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    BindFramebuffer { target: u32, framebuffer: Option<u32> },
    FramebufferTexture2d { attachment: u32, texture: Option<u32> },
    FramebufferRenderbuffer { attachment: u32, renderbuffer: Option<u32> },
    BlitFramebuffer { src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32 },

    CreateRenderbuffer(u32),
    DeleteRenderbuffer(u32),
    BindRenderbuffer(Option<u32>),
    RenderbufferStorage { internal_format: u32, width: i32, height: i32 },
    RenderbufferStorageMultisample {
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    },

    ClearColor([f32; 4]),
    Clear(u32),
    ClearBuffer { buffer: u32, draw_buffer: u32, values: Vec<f32> },

    CreateShader(u32),
    ShaderSource { shader: u32, source: String },
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    BindAttribLocation { program: u32, index: u32, name: String },
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    UniformI32 { location: Option<String>, components: u8, values: Vec<i32> },
    UniformF32 { location: Option<String>, components: u8, values: Vec<f32> },
    UniformMatrix { location: Option<String>, dimension: u8, values: Vec<f32> },

    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),

    DrawArrays { mode: u32, first: i32, count: i32 },
    Enable(u32),
    Disable(u32),
    DepthMask(bool),
}

/// A [`Gl`] that records every call and tracks the state the adapter
/// queries back.
#[derive(Debug)]
pub struct RecordingGl {
    capabilities: Capabilities,
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u32>,
    attrib_locations: RefCell<BTreeMap<String, u32>>,
    enabled: RefCell<BTreeSet<u32>>,
    pixel_store: RefCell<BTreeMap<u32, bool>>,
    depth_mask: Cell<bool>,
    compile_error: RefCell<Option<String>>,
    link_error: RefCell<Option<String>>,
    context_lost: Cell<bool>,
    framebuffer_status: Cell<u32>,
    renderbuffer_error: RefCell<Option<String>>,
}

impl RecordingGl {
    /// A context with every optional feature.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities {
            version3: true,
            vertex_array_objects: true,
            instanced_arrays: true,
        })
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            calls: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
            attrib_locations: RefCell::new(BTreeMap::new()),
            enabled: RefCell::new(BTreeSet::new()),
            pixel_store: RefCell::new(BTreeMap::new()),
            depth_mask: Cell::new(true),
            compile_error: RefCell::new(None),
            link_error: RefCell::new(None),
            context_lost: Cell::new(false),
            framebuffer_status: Cell::new(glow::FRAMEBUFFER_COMPLETE),
            renderbuffer_error: RefCell::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Every compile fails with `log`.
    pub fn fail_compile(&self, log: &str) {
        *self.compile_error.borrow_mut() = Some(log.to_owned());
    }

    /// Every link fails with `log`.
    pub fn fail_link(&self, log: &str) {
        *self.link_error.borrow_mut() = Some(log.to_owned());
    }

    pub fn lose_context(&self) {
        self.context_lost.set(true);
    }

    /// Every renderbuffer creation fails with `log`.
    pub fn fail_renderbuffer_creation(&self, log: &str) {
        *self.renderbuffer_error.borrow_mut() = Some(log.to_owned());
    }

    pub fn set_framebuffer_status(&self, status: u32) {
        self.framebuffer_status.set(status);
    }

    /// Change a capability without recording a call.
    pub fn set_enabled(&self, capability: u32, enabled: bool) {
        let mut set = self.enabled.borrow_mut();
        if enabled {
            set.insert(capability);
        } else {
            set.remove(&capability);
        }
    }

    /// Current depth write mask.
    pub fn depth_write_enabled(&self) -> bool {
        self.depth_mask.get()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn handle(&self) -> u32 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }
}

impl Default for RecordingGl {
    fn default() -> Self {
        Self::new()
    }
}

impl Gl for RecordingGl {
    type Buffer = u32;
    type Texture = u32;
    type Framebuffer = u32;
    type Renderbuffer = u32;
    type Shader = u32;
    type Program = u32;
    type VertexArray = u32;
    type UniformLocation = String;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    unsafe fn is_context_lost(&self) -> bool {
        self.context_lost.get()
    }

    unsafe fn create_buffer(&self) -> Result<u32, String> {
        let handle = self.handle();
        self.record(Call::CreateBuffer(handle));
        Ok(handle)
    }

    unsafe fn delete_buffer(&self, buffer: u32) {
        self.record(Call::DeleteBuffer(buffer));
    }

    unsafe fn bind_buffer(&self, target: u32, buffer: Option<u32>) {
        self.record(Call::BindBuffer { target, buffer });
    }

    unsafe fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        self.record(Call::BufferDataSize { target, size, usage });
    }

    unsafe fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        self.record(Call::BufferData {
            target,
            bytes: data.to_vec(),
            usage,
        });
    }

    unsafe fn buffer_sub_data_u8_slice(&self, target: u32, offset: i32, data: &[u8]) {
        self.record(Call::BufferSubData {
            target,
            offset,
            bytes: data.to_vec(),
        });
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
        self.record(Call::VertexAttribPointer {
            index,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    unsafe fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        self.record(Call::VertexAttribDivisor { index, divisor });
    }

    unsafe fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    unsafe fn disable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::DisableVertexAttribArray(index));
    }

    unsafe fn create_texture(&self) -> Result<u32, String> {
        let handle = self.handle();
        self.record(Call::CreateTexture(handle));
        Ok(handle)
    }

    unsafe fn delete_texture(&self, texture: u32) {
        self.record(Call::DeleteTexture(texture));
    }

    unsafe fn bind_texture(&self, target: u32, texture: Option<u32>) {
        self.record(Call::BindTexture { target, texture });
    }

    unsafe fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    unsafe fn tex_image_2d(
        &self,
        _target: u32,
        _level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        _border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        self.record(Call::TexImage2d {
            internal_format,
            width,
            height,
            format,
            ty,
            pixels: pixels.map(<[u8]>::len),
        });
    }

    unsafe fn tex_sub_image_2d(
        &self,
        _target: u32,
        _level: i32,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: &[u8],
    ) {
        self.record(Call::TexSubImage2d {
            x: x_offset,
            y: y_offset,
            width,
            height,
            len: pixels.len(),
        });
    }

    unsafe fn tex_parameter_i32(&self, _target: u32, parameter: u32, value: i32) {
        self.record(Call::TexParameter { parameter, value });
    }

    unsafe fn generate_mipmap(&self, target: u32) {
        self.record(Call::GenerateMipmap(target));
    }

    unsafe fn pixel_store_bool(&self, parameter: u32, value: bool) {
        self.pixel_store.borrow_mut().insert(parameter, value);
        self.record(Call::PixelStore { parameter, value });
    }

    unsafe fn create_framebuffer(&self) -> Result<u32, String> {
        let handle = self.handle();
        self.record(Call::CreateFramebuffer(handle));
        Ok(handle)
    }

    unsafe fn delete_framebuffer(&self, framebuffer: u32) {
        self.record(Call::DeleteFramebuffer(framebuffer));
    }

    unsafe fn bind_framebuffer(&self, target: u32, framebuffer: Option<u32>) {
        self.record(Call::BindFramebuffer { target, framebuffer });
    }

    unsafe fn framebuffer_texture_2d(
        &self,
        _target: u32,
        attachment: u32,
        _texture_target: u32,
        texture: Option<u32>,
        _level: i32,
    ) {
        self.record(Call::FramebufferTexture2d { attachment, texture });
    }

    unsafe fn framebuffer_renderbuffer(
        &self,
        _target: u32,
        attachment: u32,
        _renderbuffer_target: u32,
        renderbuffer: Option<u32>,
    ) {
        self.record(Call::FramebufferRenderbuffer {
            attachment,
            renderbuffer,
        });
    }

    unsafe fn check_framebuffer_status(&self, _target: u32) -> u32 {
        self.framebuffer_status.get()
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
        self.record(Call::BlitFramebuffer {
            src: [src_x0, src_y0, src_x1, src_y1],
            dst: [dst_x0, dst_y0, dst_x1, dst_y1],
            mask,
            filter,
        });
    }

    unsafe fn create_renderbuffer(&self) -> Result<u32, String> {
        if let Some(log) = self.renderbuffer_error.borrow().clone() {
            return Err(log);
        }
        let handle = self.handle();
        self.record(Call::CreateRenderbuffer(handle));
        Ok(handle)
    }

    unsafe fn delete_renderbuffer(&self, renderbuffer: u32) {
        self.record(Call::DeleteRenderbuffer(renderbuffer));
    }

    unsafe fn bind_renderbuffer(&self, _target: u32, renderbuffer: Option<u32>) {
        self.record(Call::BindRenderbuffer(renderbuffer));
    }

    unsafe fn renderbuffer_storage(&self, _target: u32, internal_format: u32, width: i32, height: i32) {
        self.record(Call::RenderbufferStorage {
            internal_format,
            width,
            height,
        });
    }

    unsafe fn renderbuffer_storage_multisample(
        &self,
        _target: u32,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        self.record(Call::RenderbufferStorageMultisample {
            samples,
            internal_format,
            width,
            height,
        });
    }

    unsafe fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.record(Call::ClearColor([red, green, blue, alpha]));
    }

    unsafe fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    unsafe fn clear_buffer_f32_slice(&self, target: u32, draw_buffer: u32, values: &[f32]) {
        self.record(Call::ClearBuffer {
            buffer: target,
            draw_buffer,
            values: values.to_vec(),
        });
    }

    unsafe fn create_shader(&self, _shader_type: u32) -> Result<u32, String> {
        let handle = self.handle();
        self.record(Call::CreateShader(handle));
        Ok(handle)
    }

    unsafe fn shader_source(&self, shader: u32, source: &str) {
        self.record(Call::ShaderSource {
            shader,
            source: source.to_owned(),
        });
    }

    unsafe fn compile_shader(&self, shader: u32) {
        self.record(Call::CompileShader(shader));
    }

    unsafe fn get_shader_compile_status(&self, _shader: u32) -> bool {
        self.compile_error.borrow().is_none()
    }

    unsafe fn get_shader_info_log(&self, _shader: u32) -> String {
        self.compile_error.borrow().clone().unwrap_or_default()
    }

    unsafe fn delete_shader(&self, shader: u32) {
        self.record(Call::DeleteShader(shader));
    }

    unsafe fn create_program(&self) -> Result<u32, String> {
        let handle = self.handle();
        self.record(Call::CreateProgram(handle));
        Ok(handle)
    }

    unsafe fn attach_shader(&self, program: u32, shader: u32) {
        self.record(Call::AttachShader { program, shader });
    }

    unsafe fn detach_shader(&self, program: u32, shader: u32) {
        self.record(Call::DetachShader { program, shader });
    }

    unsafe fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        self.record(Call::BindAttribLocation {
            program,
            index,
            name: name.to_owned(),
        });
    }

    unsafe fn link_program(&self, program: u32) {
        self.record(Call::LinkProgram(program));
    }

    unsafe fn get_program_link_status(&self, _program: u32) -> bool {
        self.link_error.borrow().is_none()
    }

    unsafe fn get_program_info_log(&self, _program: u32) -> String {
        self.link_error.borrow().clone().unwrap_or_default()
    }

    unsafe fn delete_program(&self, program: u32) {
        self.record(Call::DeleteProgram(program));
    }

    unsafe fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    /// Locations are handed out in order of first lookup, per name.
    unsafe fn get_attrib_location(&self, _program: u32, name: &str) -> Option<u32> {
        let mut locations = self.attrib_locations.borrow_mut();
        let next = u32::try_from(locations.len()).unwrap_or(u32::MAX);
        Some(*locations.entry(name.to_owned()).or_insert(next))
    }

    unsafe fn get_uniform_location(&self, _program: u32, name: &str) -> Option<String> {
        Some(name.to_owned())
    }

    unsafe fn uniform_i32_slice(&self, location: Option<&String>, components: u8, values: &[i32]) {
        self.record(Call::UniformI32 {
            location: location.cloned(),
            components,
            values: values.to_vec(),
        });
    }

    unsafe fn uniform_f32_slice(&self, location: Option<&String>, components: u8, values: &[f32]) {
        self.record(Call::UniformF32 {
            location: location.cloned(),
            components,
            values: values.to_vec(),
        });
    }

    unsafe fn uniform_matrix_f32_slice(
        &self,
        location: Option<&String>,
        dimension: u8,
        values: &[f32],
    ) {
        self.record(Call::UniformMatrix {
            location: location.cloned(),
            dimension,
            values: values.to_vec(),
        });
    }

    unsafe fn create_vertex_array(&self) -> Result<u32, String> {
        let handle = self.handle();
        self.record(Call::CreateVertexArray(handle));
        Ok(handle)
    }

    unsafe fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    unsafe fn delete_vertex_array(&self, vertex_array: u32) {
        self.record(Call::DeleteVertexArray(vertex_array));
    }

    unsafe fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.record(Call::DrawArrays { mode, first, count });
    }

    unsafe fn enable(&self, capability: u32) {
        self.set_enabled(capability, true);
        self.record(Call::Enable(capability));
    }

    unsafe fn disable(&self, capability: u32) {
        self.set_enabled(capability, false);
        self.record(Call::Disable(capability));
    }

    unsafe fn is_enabled(&self, capability: u32) -> bool {
        self.enabled.borrow().contains(&capability)
    }

    unsafe fn depth_mask(&self, flag: bool) {
        self.depth_mask.set(flag);
        self.record(Call::DepthMask(flag));
    }

    unsafe fn get_parameter_bool(&self, parameter: u32) -> bool {
        match parameter {
            glow::DEPTH_WRITEMASK => self.depth_mask.get(),
            UNPACK_FLIP_Y_WEBGL | UNPACK_PREMULTIPLY_ALPHA_WEBGL => {
                self.pixel_store.borrow().get(&parameter).copied().unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// A host map whose camera can be changed between calls.
pub struct FakeMap {
    pub gl: Rc<RecordingGl>,
    pub size: Cell<[f64; 2]>,
    pub device_pixel_ratio: Cell<f64>,
    pub center: Cell<[f64; 2]>,
    pub zoom: Cell<f64>,
    pub pitch: Cell<f64>,
    pub rotation: Cell<f64>,
    pub padding: Cell<Padding>,
}

impl FakeMap {
    pub fn new(size: [f64; 2], device_pixel_ratio: f64) -> Self {
        Self {
            gl: Rc::new(RecordingGl::new()),
            size: Cell::new(size),
            device_pixel_ratio: Cell::new(device_pixel_ratio),
            center: Cell::new([82.92, 55.03]),
            zoom: Cell::new(10.0),
            pitch: Cell::new(0.0),
            rotation: Cell::new(0.0),
            padding: Cell::new(Padding::default()),
        }
    }
}

impl HostMap for FakeMap {
    type Gl = RecordingGl;

    fn gl(&self) -> &Rc<RecordingGl> {
        &self.gl
    }

    fn size(&self) -> [f64; 2] {
        self.size.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio.get()
    }

    fn center(&self) -> [f64; 2] {
        self.center.get()
    }

    fn zoom(&self) -> f64 {
        self.zoom.get()
    }

    fn pitch(&self) -> f64 {
        self.pitch.get()
    }

    fn rotation(&self) -> f64 {
        self.rotation.get()
    }

    fn padding(&self) -> Padding {
        self.padding.get()
    }
}

/// A guest layer instance.
#[derive(Clone, Debug, PartialEq)]
pub struct FakeLayer {
    pub id: String,
    pub offset: usize,
    pub props: Map<String, serde_json::Value>,
}

pub fn fake_layer_type() -> LayerType<FakeLayer> {
    LayerType::new(|descriptor: &LayerDescriptor, offset| FakeLayer {
        id: descriptor.id.clone(),
        offset,
        props: descriptor.props.clone(),
    })
}

/// One [`GuestDeck::draw_layers`] call.
#[derive(Clone, Debug)]
pub struct DrawRecord {
    pub reason: String,
    pub viewport: Viewport,
    pub drawn: Vec<String>,
    pub clear_canvas: bool,
    pub clear_stack: bool,
    pub framebuffer: Option<u32>,
    /// GL state observed while drawing.
    pub state: Option<GlStateSnapshot>,
}

/// A guest library that stores its props and records draws.
#[derive(Debug)]
pub struct FakeDeck {
    pub layers: Vec<FakeLayer>,
    pub view_state: Option<ViewState>,
    pub gl: Option<Rc<RecordingGl>>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub views: Option<Vec<MapView>>,
    pub parameters: Option<GlParameters>,
    pub use_device_pixels: Option<bool>,
    pub initialized: bool,
    pub needs_redraw_calls: Vec<bool>,
    pub draws: Vec<DrawRecord>,
    pub finalized: bool,
}

impl FakeDeck {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            view_state: None,
            gl: None,
            width: None,
            height: None,
            views: None,
            parameters: None,
            use_device_pixels: None,
            initialized: true,
            needs_redraw_calls: Vec::new(),
            draws: Vec::new(),
            finalized: false,
        }
    }
}

impl Default for FakeDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestDeck for FakeDeck {
    type Gl = RecordingGl;
    type Layer = FakeLayer;

    fn set_props(&mut self, props: DeckProps<RecordingGl, FakeLayer>) {
        let DeckProps {
            layers,
            view_state,
            gl,
            width,
            height,
            views,
            parameters,
            use_device_pixels,
        } = props;
        if let Some(layers) = layers {
            self.layers = layers;
        }
        self.view_state = view_state.or(self.view_state.take());
        self.gl = gl.or(self.gl.take());
        self.width = width.or(self.width);
        self.height = height.or(self.height);
        self.views = views.or(self.views.take());
        self.parameters = parameters.or(self.parameters.take());
        self.use_device_pixels = use_device_pixels.or(self.use_device_pixels);
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    fn needs_redraw(&mut self, clear_redraw_flags: bool) -> bool {
        self.needs_redraw_calls.push(clear_redraw_flags);
        false
    }

    fn draw_layers(&mut self, reason: &str, options: DrawOptions<'_, RecordingGl>) {
        let drawn = self
            .layers
            .iter()
            .filter(|layer| (options.layer_filter)(&layer.id))
            .map(|layer| layer.id.clone())
            .collect();
        let state = self
            .gl
            .as_ref()
            .map(|gl| unsafe { GlStateSnapshot::capture(&**gl) });
        self.draws.push(DrawRecord {
            reason: reason.to_owned(),
            viewport: options.viewports[0].clone(),
            drawn,
            clear_canvas: options.clear_canvas,
            clear_stack: options.clear_stack,
            framebuffer: options.framebuffer,
            state,
        });
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }
}
