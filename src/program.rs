//! Shader programs with typed uniforms and located attributes.
//!
//! Linking and locating happen at most once per program. The first failure
//! is returned to the caller and latched: every later call on an errored
//! program is a silent no-op, so a broken shader doesn't flood the frame loop
//! with driver errors.

use std::collections::BTreeMap;

use crate::buffer::{check_attribute_location_count, VertexSource};
use crate::error::{Error, Result};
use crate::gl::Gl;
use crate::shader::{Shader, ShaderDefinition};

/// Declared type of a uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformType {
    /// `1i` to `4i`: one vector of `n` ints (samplers use `Int(1)`).
    Int(u8),
    /// `1f` to `4f`: one vector of `n` floats.
    Float(u8),
    /// `1iv` to `4iv`: an array of `n`-component int vectors.
    IntArray(u8),
    /// `1fv` to `4fv`: an array of `n`-component float vectors.
    FloatArray(u8),
    /// `mat2` to `mat4`, column-major.
    Matrix(u8),
}

impl UniformType {
    fn describe(self) -> &'static str {
        match self {
            Self::Int(1) => "one int",
            Self::Int(_) => "an int vector",
            Self::Float(1) => "one float",
            Self::Float(_) => "a float vector",
            Self::IntArray(_) => "an int array",
            Self::FloatArray(_) => "a float array",
            Self::Matrix(_) => "a float matrix",
        }
    }
}

/// A value to upload to a uniform.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    /// A single int (or sampler unit).
    Int(i32),
    /// A single float.
    Float(f32),
    /// Int components.
    Ints(Vec<i32>),
    /// Float components.
    Floats(Vec<f32>),
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl<const N: usize> From<[f32; N]> for UniformValue {
    fn from(value: [f32; N]) -> Self {
        Self::Floats(value.to_vec())
    }
}

impl<const N: usize> From<[i32; N]> for UniformValue {
    fn from(value: [i32; N]) -> Self {
        Self::Ints(value.to_vec())
    }
}

/// Declaration of a uniform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformDefinition {
    /// Name in the shader.
    pub name: String,
    /// Declared type.
    pub ty: UniformType,
}

impl UniformDefinition {
    /// Declare `name` with type `ty`.
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Declaration of a vertex attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDefinition {
    /// Name in the shader.
    pub name: String,
    /// The attribute carries indices and has no location.
    pub index: bool,
    /// Fixed location bound before linking; looked up after linking when
    /// `None`.
    pub location: Option<u32>,
    /// Consecutive locations used: 1 for scalars and vectors, 2 to 4 for
    /// `mat2` to `mat4`.
    pub locations_count: u32,
}

impl AttributeDefinition {
    /// A single-location attribute looked up after linking.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: false,
            location: None,
            locations_count: 1,
        }
    }
}

/// A located uniform.
pub struct ShaderUniform<G: Gl> {
    name: String,
    ty: UniformType,
    location: Option<G::UniformLocation>,
}

impl<G: Gl> ShaderUniform<G> {
    /// Declared type.
    #[must_use]
    pub fn ty(&self) -> UniformType {
        self.ty
    }

    unsafe fn locate(&mut self, gl: &G, program: G::Program) {
        self.location = unsafe { gl.get_uniform_location(program, &self.name) };
    }

    unsafe fn bind(&self, gl: &G, value: &UniformValue) -> Result<()> {
        let location = self.location.as_ref();
        let mismatch = || Error::UniformMismatch {
            name: self.name.clone(),
            expected: self.ty.describe(),
        };

        match (self.ty, value) {
            (UniformType::Int(1) | UniformType::IntArray(1), UniformValue::Int(value)) => unsafe {
                gl.uniform_i32_slice(location, 1, &[*value]);
            },
            (UniformType::Float(1) | UniformType::FloatArray(1), UniformValue::Float(value)) => unsafe {
                gl.uniform_f32_slice(location, 1, &[*value]);
            },
            (UniformType::Int(n), UniformValue::Ints(values)) if values.len() == usize::from(n) => unsafe {
                gl.uniform_i32_slice(location, n, values);
            },
            (UniformType::Float(n), UniformValue::Floats(values)) if values.len() == usize::from(n) => unsafe {
                gl.uniform_f32_slice(location, n, values);
            },
            (UniformType::IntArray(n), UniformValue::Ints(values)) if fits(values.len(), n) => unsafe {
                gl.uniform_i32_slice(location, n, values);
            },
            (UniformType::FloatArray(n), UniformValue::Floats(values)) if fits(values.len(), n) => unsafe {
                gl.uniform_f32_slice(location, n, values);
            },
            (UniformType::Matrix(n), UniformValue::Floats(values)) if fits(values.len(), n * n) => unsafe {
                gl.uniform_matrix_f32_slice(location, n, values);
            },
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

/// `len` is a non-zero multiple of `stride`.
fn fits(len: usize, stride: u8) -> bool {
    let stride = usize::from(stride);
    stride != 0 && len != 0 && len % stride == 0
}

/// A vertex attribute of a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderAttribute {
    name: String,
    index: bool,
    location: Option<u32>,
    locations_count: u32,
    enabled: bool,
}

impl ShaderAttribute {
    /// Build from a definition.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLocationCount`] for a count outside `1..=4`.
    pub fn new(definition: AttributeDefinition) -> Result<Self> {
        check_attribute_location_count(definition.locations_count)?;
        Ok(Self {
            name: definition.name,
            index: definition.index,
            location: definition.location,
            locations_count: definition.locations_count,
            enabled: false,
        })
    }

    /// Name in the shader.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First location, once known.
    #[must_use]
    pub fn location(&self) -> Option<u32> {
        self.location
    }

    /// Consecutive locations used.
    #[must_use]
    pub fn locations_count(&self) -> u32 {
        self.locations_count
    }

    /// Whether the attribute carries indices.
    #[must_use]
    pub fn is_index(&self) -> bool {
        self.index
    }

    unsafe fn bind_location<G: Gl>(&self, gl: &G, program: G::Program) {
        if let (Some(location), false) = (self.location, self.index) {
            unsafe { gl.bind_attrib_location(program, location, &self.name) };
        }
    }

    unsafe fn locate<G: Gl>(&mut self, gl: &G, program: G::Program) {
        if self.location.is_none() && !self.index {
            self.location = unsafe { gl.get_attrib_location(program, &self.name) };
        }
    }

    /// Enable every location of the attribute.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub(crate) unsafe fn enable_locations<G: Gl>(&self, gl: &G) {
        if let (Some(location), false) = (self.location, self.index) {
            for i in 0..self.locations_count {
                unsafe { gl.enable_vertex_attrib_array(location + i) };
            }
        }
    }

    unsafe fn bind<G: Gl>(&mut self, gl: &G, source: &VertexSource<G>) -> Result<()> {
        if !self.enabled && !self.index {
            unsafe { self.enable_locations(gl) };
            self.enabled = true;
        }
        match self.location {
            Some(location) => unsafe { source.bind(gl, location, self.locations_count) },
            None => {
                tracing::trace!(attribute = %self.name, "attribute is not active, skipping");
                Ok(())
            }
        }
    }

    unsafe fn disable<G: Gl>(&mut self, gl: &G) {
        if self.enabled && !self.index {
            if let Some(location) = self.location {
                for i in 0..self.locations_count {
                    unsafe { gl.disable_vertex_attrib_array(location + i) };
                }
            }
            self.enabled = false;
        }
    }
}

/// A linked pair of vertex and fragment shaders.
pub struct ShaderProgram<G: Gl> {
    vertex: Shader<G>,
    fragment: Shader<G>,
    uniforms: BTreeMap<String, ShaderUniform<G>>,
    attributes: BTreeMap<String, ShaderAttribute>,
    handle: Option<G::Program>,
    linked: bool,
    located: bool,
    errored: bool,
}

impl<G: Gl> ShaderProgram<G> {
    /// Declare a program. Nothing is compiled until [`enable`](Self::enable)
    /// or [`link`](Self::link).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLocationCount`] for an attribute with a location
    /// count outside `1..=4`.
    pub fn new(
        vertex: Shader<G>,
        fragment: Shader<G>,
        uniforms: Vec<UniformDefinition>,
        attributes: Vec<AttributeDefinition>,
    ) -> Result<Self> {
        let uniforms = uniforms
            .into_iter()
            .map(|definition| {
                let uniform = ShaderUniform {
                    name: definition.name.clone(),
                    ty: definition.ty,
                    location: None,
                };
                (definition.name, uniform)
            })
            .collect();
        let attributes = attributes
            .into_iter()
            .map(|definition| Ok((definition.name.clone(), ShaderAttribute::new(definition)?)))
            .collect::<Result<_>>()?;

        Ok(Self {
            vertex,
            fragment,
            uniforms,
            attributes,
            handle: None,
            linked: false,
            located: false,
            errored: false,
        })
    }

    /// Declared attributes by name.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, ShaderAttribute> {
        &self.attributes
    }

    /// Whether linking has failed. An errored program ignores every call.
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// The linked GL program, if any.
    #[must_use]
    pub fn handle(&self) -> Option<G::Program> {
        self.handle
    }

    /// Link and locate if needed, then make the program current.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// The first compile or link failure; see [`link`](Self::link).
    pub unsafe fn enable(&mut self, gl: &G, external: Option<&[ShaderDefinition]>) -> Result<()> {
        if self.errored {
            return Ok(());
        }
        unsafe {
            self.link(gl, external)?;
            self.locate(gl);
        }
        if let Some(program) = self.handle {
            unsafe { gl.use_program(Some(program)) };
        }
        Ok(())
    }

    /// Compile both shaders and link them. Does nothing once linked or
    /// errored; `external` definitions only apply to the first link.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`], [`Error::ContextLost`], [`Error::ShaderCompile`]
    /// or [`Error::ProgramLink`]. Any of them marks the program as errored.
    pub unsafe fn link(&mut self, gl: &G, external: Option<&[ShaderDefinition]>) -> Result<()> {
        if self.linked || self.errored {
            return Ok(());
        }
        let result = unsafe { self.try_link(gl, external) };
        if let Err(err) = &result {
            tracing::error!(%err, "shader program failed to link");
            self.errored = true;
        }
        result
    }

    unsafe fn try_link(&mut self, gl: &G, external: Option<&[ShaderDefinition]>) -> Result<()> {
        let program = unsafe { gl.create_program() }.map_err(Error::Allocation)?;
        self.handle = Some(program);

        let vertex = unsafe { self.vertex.get(gl, external) }?;
        let fragment = unsafe { self.fragment.get(gl, external) }?;

        unsafe {
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            for attribute in self.attributes.values() {
                attribute.bind_location(gl, program);
            }
            gl.link_program(program);

            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                let log = if log.trim().is_empty() {
                    "Couldn't get shader program info log".to_owned()
                } else {
                    log
                };
                return Err(Error::ProgramLink(log));
            }

            // Shaders can be detached and deleted after successful linking.
            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            self.vertex.remove(gl);
            self.fragment.remove(gl);
        }

        self.linked = true;
        Ok(())
    }

    /// Look up attribute and uniform locations. Does nothing once located,
    /// errored or before linking.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub unsafe fn locate(&mut self, gl: &G) {
        let Some(program) = self.handle else {
            return;
        };
        if self.located || self.errored {
            return;
        }
        for attribute in self.attributes.values_mut() {
            unsafe { attribute.locate(gl, program) };
        }
        for uniform in self.uniforms.values_mut() {
            unsafe { uniform.locate(gl, program) };
        }
        self.located = true;
    }

    /// Upload uniform values and bind attribute sources by name.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context with this program current.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownUniform`] or [`Error::UnknownAttribute`] for names the
    /// program does not declare, [`Error::UniformMismatch`] for values of the
    /// wrong shape, or any [`Buffer::bind`](crate::buffer::Buffer::bind)
    /// error.
    pub unsafe fn bind(
        &mut self,
        gl: &G,
        uniforms: &[(&str, UniformValue)],
        attributes: &[(&str, &VertexSource<G>)],
    ) -> Result<()> {
        if self.errored {
            return Ok(());
        }
        for (name, value) in uniforms {
            let uniform = self
                .uniforms
                .get(*name)
                .ok_or_else(|| Error::UnknownUniform((*name).to_owned()))?;
            unsafe { uniform.bind(gl, value) }?;
        }
        for (name, source) in attributes {
            let attribute = self
                .attributes
                .get_mut(*name)
                .ok_or_else(|| Error::UnknownAttribute((*name).to_owned()))?;
            unsafe { attribute.bind(gl, source) }?;
        }
        Ok(())
    }

    /// Disable every enabled attribute array.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub unsafe fn disable(&mut self, gl: &G) {
        if self.errored {
            return;
        }
        for attribute in self.attributes.values_mut() {
            unsafe { attribute.disable(gl) };
        }
    }

    /// Delete the program and any shader objects still alive. Safe to call
    /// repeatedly. A removed program links again on next use unless it has
    /// errored.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the program was linked with.
    pub unsafe fn remove(&mut self, gl: &G) {
        unsafe {
            if let Some(program) = self.handle.take() {
                gl.delete_program(program);
            }
            self.vertex.remove(gl);
            self.fragment.remove(gl);
        }
        self.linked = false;
        self.located = false;
        for attribute in self.attributes.values_mut() {
            attribute.enabled = false;
        }
    }
}
