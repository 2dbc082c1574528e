//! Vertex array objects binding named vertex sources to program attributes.
//!
//! On contexts without vertex array objects every [`Vao::bind`] binds the
//! attributes through the program instead.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::buffer::{Buffer, VertexSource};
use crate::error::{Error, Result};
use crate::gl::Gl;
use crate::program::ShaderProgram;

/// Named vertex sources plus an optional index buffer.
pub struct Vao<G: Gl> {
    attributes: BTreeMap<String, VertexSource<G>>,
    aliases: BTreeMap<String, String>,
    indices: Option<Rc<Buffer<G>>>,
    handle: Option<G::VertexArray>,
}

/// A copy shares the vertex sources but not the GL object.
impl<G: Gl> Clone for Vao<G> {
    fn clone(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            aliases: self.aliases.clone(),
            indices: self.indices.clone(),
            handle: None,
        }
    }
}

impl<G: Gl> Vao<G> {
    /// Create a VAO over `attributes`, keyed by attribute name.
    pub fn new<I, S>(attributes: I, indices: Option<Rc<Buffer<G>>>) -> Self
    where
        I: IntoIterator<Item = (S, VertexSource<G>)>,
        S: Into<String>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(name, source)| (name.into(), source))
                .collect(),
            aliases: BTreeMap::new(),
            indices,
            handle: None,
        }
    }

    /// Combine the attributes and aliases of `vaos`, later entries winning.
    /// The index buffer comes from the first VAO. `None` for an empty slice.
    #[must_use]
    pub fn merge(vaos: &[Self]) -> Option<Self> {
        let first = vaos.first()?;
        let mut merged = Self {
            indices: first.indices.clone(),
            ..Self::new(std::iter::empty::<(String, VertexSource<G>)>(), None)
        };
        for vao in vaos {
            merged.attributes.extend(vao.attributes.clone());
            merged.aliases.extend(vao.aliases.clone());
        }
        Some(merged)
    }

    /// The vertex array object, if created.
    #[must_use]
    pub fn handle(&self) -> Option<G::VertexArray> {
        self.handle
    }

    /// GL type of the index buffer, if any.
    #[must_use]
    pub fn elements_gl_type(&self) -> Option<u32> {
        self.indices.as_ref().map(|indices| indices.gl_type())
    }

    /// Replace or add the source for `name`. Drops the GL object so the next
    /// bind records the new layout.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the VAO was created with.
    pub unsafe fn set_attribute(
        &mut self,
        gl: &G,
        name: impl Into<String>,
        source: VertexSource<G>,
    ) {
        self.attributes.insert(name.into(), source);
        unsafe { self.remove(gl) };
    }

    /// Map shader attribute names to VAO attribute names, for example
    /// `texcoord_color` to `texcoord_0`. Drops the GL object.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the VAO was created with.
    pub unsafe fn set_attributes_aliases<I, S, T>(&mut self, gl: &G, aliases: I)
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        self.aliases.extend(
            aliases
                .into_iter()
                .map(|(shader, vao)| (shader.into(), vao.into())),
        );
        unsafe { self.remove(gl) };
    }

    /// Bind the VAO, recording the attribute layout of `program` on first
    /// use.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context with `program` current.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the vertex array cannot be created, or any
    /// [`Buffer::bind`] error.
    pub unsafe fn bind(&mut self, gl: &G, program: &mut ShaderProgram<G>) -> Result<()> {
        if !gl.capabilities().vertex_array_objects {
            return unsafe { self.bind_through_program(gl, program) };
        }

        if let Some(vao) = self.handle {
            unsafe { gl.bind_vertex_array(Some(vao)) };
            return Ok(());
        }

        let vao = unsafe { gl.create_vertex_array() }.map_err(Error::Allocation)?;
        unsafe { gl.bind_vertex_array(Some(vao)) };
        self.handle = Some(vao);
        unsafe { self.record_attributes(gl, program) }
    }

    /// Unbind any VAO so attributes can be bound directly again.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub unsafe fn unbind(&self, gl: &G) {
        if gl.capabilities().vertex_array_objects {
            unsafe { gl.bind_vertex_array(None) };
        }
    }

    /// Delete the GL object. Safe to call repeatedly.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the VAO was created with.
    pub unsafe fn remove(&mut self, gl: &G) {
        if let Some(vao) = self.handle.take() {
            unsafe { gl.delete_vertex_array(vao) };
        }
    }

    fn source_for(&self, shader_name: &str) -> Option<&VertexSource<G>> {
        let name = self
            .aliases
            .get(shader_name)
            .map_or(shader_name, String::as_str);
        self.attributes.get(name)
    }

    unsafe fn record_attributes(&self, gl: &G, program: &ShaderProgram<G>) -> Result<()> {
        for (name, attribute) in program.attributes() {
            let Some(source) = self.source_for(name) else {
                tracing::trace!(attribute = %name, "vao has no source for attribute");
                continue;
            };
            let Some(location) = attribute.location() else {
                continue;
            };
            unsafe {
                attribute.enable_locations(gl);
                source.bind(gl, location, attribute.locations_count())?;
            }
        }
        unsafe { self.bind_indices(gl) }
    }

    unsafe fn bind_through_program(&self, gl: &G, program: &mut ShaderProgram<G>) -> Result<()> {
        let sources: Vec<(String, &VertexSource<G>)> = program
            .attributes()
            .keys()
            .filter_map(|name| Some((name.clone(), self.source_for(name)?)))
            .collect();
        let sources: Vec<(&str, &VertexSource<G>)> = sources
            .iter()
            .map(|(name, source)| (name.as_str(), *source))
            .collect();
        unsafe {
            program.bind(gl, &[], &sources)?;
            self.bind_indices(gl)
        }
    }

    unsafe fn bind_indices(&self, gl: &G) -> Result<()> {
        match &self.indices {
            Some(indices) => unsafe { indices.bind(gl, 0, None, 1) },
            None => Ok(()),
        }
    }
}
