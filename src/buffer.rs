//! Vertex and index buffers.
//!
//! A [`Buffer`] keeps its initial data on the CPU until it is first bound,
//! uploads it, and keeps it afterwards so a removed buffer can be prepared
//! again with the same contents.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::gl::{gl_size, Gl};

/// Component type of buffer data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit float.
    Float,
    /// 8-bit unsigned integer.
    UnsignedByte,
    /// 16-bit unsigned integer.
    UnsignedShort,
    /// 32-bit unsigned integer.
    UnsignedInt,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
}

impl DataType {
    /// Every supported data type.
    pub const ALL: [Self; 7] = [
        Self::Float,
        Self::UnsignedByte,
        Self::UnsignedShort,
        Self::UnsignedInt,
        Self::Byte,
        Self::Short,
        Self::Int,
    ];

    /// Size of one component in bytes.
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Float | Self::Int | Self::UnsignedInt => 4,
        }
    }

    /// The GL enum for this type.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Float => glow::FLOAT,
            Self::UnsignedByte => glow::UNSIGNED_BYTE,
            Self::UnsignedShort => glow::UNSIGNED_SHORT,
            Self::UnsignedInt => glow::UNSIGNED_INT,
            Self::Byte => glow::BYTE,
            Self::Short => glow::SHORT,
            Self::Int => glow::INT,
        }
    }

    /// Whether the type can index vertices.
    #[must_use]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt
        )
    }
}

/// Bind target of a [`Buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex attribute data.
    Array,
    /// Vertex indices.
    ElementArray,
}

impl BufferKind {
    fn target(self) -> u32 {
        match self {
            Self::Array => glow::ARRAY_BUFFER,
            Self::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Upload usage hint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    #[default]
    StaticDraw,
    /// Rewritten frequently.
    DynamicDraw,
}

impl BufferUsage {
    fn gl_enum(self) -> u32 {
        match self {
            Self::StaticDraw => glow::STATIC_DRAW,
            Self::DynamicDraw => glow::DYNAMIC_DRAW,
        }
    }
}

/// How buffer contents map onto a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferBindOptions {
    /// Components per vertex.
    pub item_size: u32,
    /// Component type.
    pub data_type: DataType,
    /// Normalize integer components to `[0, 1]` or `[-1, 1]`.
    pub normalized: bool,
    /// Byte stride between vertices; `0` means tightly packed.
    pub stride: u32,
    /// Byte offset of the first component.
    pub offset: u32,
    /// Instances per attribute advance; `0` disables instancing.
    pub instance_divisor: u32,
    /// Upload usage hint.
    pub usage: BufferUsage,
}

impl Default for BufferBindOptions {
    fn default() -> Self {
        Self {
            item_size: 3,
            data_type: DataType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
            instance_divisor: 0,
            usage: BufferUsage::StaticDraw,
        }
    }
}

/// Initial contents of a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferData {
    /// Bytes to upload.
    Bytes(Vec<u8>),
    /// Size in bytes of an uninitialized allocation.
    Len(usize),
}

impl BufferData {
    fn byte_length(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Len(len) => *len,
        }
    }
}

/// Attribute location counts must lie in `1..=4` (`mat2` to `mat4` use 2 to 4).
///
/// # Errors
///
/// [`Error::InvalidLocationCount`] otherwise.
pub fn check_attribute_location_count(count: u32) -> Result<()> {
    if (1..=4).contains(&count) {
        Ok(())
    } else {
        Err(Error::InvalidLocationCount(count))
    }
}

/// A GL buffer object, allocated on first bind.
pub struct Buffer<G: Gl> {
    kind: BufferKind,
    options: BufferBindOptions,
    data: RefCell<BufferData>,
    handle: Cell<Option<G::Buffer>>,
}

impl<G: Gl> Buffer<G> {
    /// An array buffer holding `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>, options: BufferBindOptions) -> Self {
        Self::new(BufferData::Bytes(bytes), options, BufferKind::Array)
    }

    /// An array buffer holding the bytes of `items`.
    #[must_use]
    pub fn from_slice<T: Pod>(items: &[T], options: BufferBindOptions) -> Self {
        Self::from_bytes(bytemuck::cast_slice(items).to_vec(), options)
    }

    /// An uninitialized array buffer of `byte_length` bytes, to be filled with
    /// [`sub_data`](Self::sub_data).
    #[must_use]
    pub fn with_size(byte_length: usize, options: BufferBindOptions) -> Self {
        Self::new(BufferData::Len(byte_length), options, BufferKind::Array)
    }

    /// An index buffer. Index types must be unsigned; anything else is
    /// replaced with [`DataType::UnsignedInt`].
    #[must_use]
    pub fn element_array(data: BufferData, options: BufferBindOptions) -> Self {
        Self::new(data, options, BufferKind::ElementArray)
    }

    fn new(data: BufferData, mut options: BufferBindOptions, kind: BufferKind) -> Self {
        if kind == BufferKind::ElementArray && !options.data_type.is_unsigned() {
            tracing::warn!(
                data_type = ?options.data_type,
                "index buffers need UnsignedByte, UnsignedShort or UnsignedInt, using UnsignedInt",
            );
            options.data_type = DataType::UnsignedInt;
        }
        Self {
            kind,
            options,
            data: RefCell::new(data),
            handle: Cell::new(None),
        }
    }

    /// Bind target.
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Default bind options.
    #[must_use]
    pub fn options(&self) -> &BufferBindOptions {
        &self.options
    }

    /// Size in bytes.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.data.borrow().byte_length()
    }

    /// The GL enum of the declared component type.
    #[must_use]
    pub fn gl_type(&self) -> u32 {
        self.options.data_type.gl_enum()
    }

    /// The GL object, if currently allocated.
    #[must_use]
    pub fn handle(&self) -> Option<G::Buffer> {
        self.handle.get()
    }

    /// Allocate the GL object and upload the initial data. Does nothing if
    /// already allocated.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the buffer object cannot be created.
    pub unsafe fn prepare(&self, gl: &G) -> Result<G::Buffer> {
        if let Some(buffer) = self.handle.get() {
            return Ok(buffer);
        }

        let target = self.kind.target();
        let usage = self.options.usage.gl_enum();
        let buffer = unsafe { gl.create_buffer() }.map_err(Error::Allocation)?;
        unsafe {
            gl.bind_buffer(target, Some(buffer));
            match &*self.data.borrow() {
                BufferData::Bytes(bytes) => gl.buffer_data_u8_slice(target, bytes, usage),
                BufferData::Len(len) => {
                    gl.buffer_data_size(target, i32::try_from(*len).unwrap_or(i32::MAX), usage);
                }
            }
        }
        self.handle.set(Some(buffer));
        Ok(buffer)
    }

    /// Bind the buffer, preparing it first if needed.
    ///
    /// Array buffers are also pointed at attribute `location`. With
    /// `locations_count > 1` (matrix attributes) consecutive locations are
    /// bound, column `i` starting `i * locations_count` components after
    /// `offset`. `options` overrides the buffer's own bind options.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLocationCount`] for a count outside `1..=4`, or
    /// [`Error::Allocation`] if the buffer object cannot be created.
    pub unsafe fn bind(
        &self,
        gl: &G,
        location: u32,
        options: Option<&BufferBindOptions>,
        locations_count: u32,
    ) -> Result<()> {
        let buffer = unsafe { self.prepare(gl) }?;

        match self.kind {
            BufferKind::ElementArray => unsafe {
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            },
            BufferKind::Array => {
                check_attribute_location_count(locations_count)?;
                let options = options.unwrap_or(&self.options);
                let data_type = options.data_type.gl_enum();

                unsafe { gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer)) };

                if locations_count == 1 {
                    unsafe {
                        gl.vertex_attrib_pointer_f32(
                            location,
                            gl_size(options.item_size),
                            data_type,
                            options.normalized,
                            gl_size(options.stride),
                            gl_size(options.offset),
                        );
                        bind_divisor(gl, location, options);
                    }
                } else {
                    let column = locations_count * options.data_type.size();
                    for i in 0..locations_count {
                        unsafe {
                            gl.vertex_attrib_pointer_f32(
                                location + i,
                                gl_size(locations_count),
                                data_type,
                                options.normalized,
                                gl_size(options.stride),
                                gl_size(options.offset + i * column),
                            );
                            bind_divisor(gl, location + i, options);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Overwrite part of the buffer starting at byte `offset`. Prepares the
    /// buffer first if needed.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] if the written range does not fit in an
    /// `i32`, [`Error::Allocation`] if the buffer object cannot be created.
    pub unsafe fn sub_data(&self, gl: &G, offset: usize, bytes: &[u8]) -> Result<()> {
        let invalid = || Error::InvalidRange { offset, len: bytes.len() };
        let end = offset.checked_add(bytes.len()).ok_or_else(invalid)?;
        let gl_offset = i32::try_from(offset).map_err(|_| invalid())?;
        i32::try_from(end).map_err(|_| invalid())?;

        let buffer = unsafe { self.prepare(gl) }?;
        let target = self.kind.target();
        unsafe {
            gl.bind_buffer(target, Some(buffer));
            gl.buffer_sub_data_u8_slice(target, gl_offset, bytes);
        }

        if let BufferData::Bytes(retained) = &mut *self.data.borrow_mut() {
            if let Some(range) = retained.get_mut(offset..end) {
                range.copy_from_slice(bytes);
            }
        }
        Ok(())
    }

    /// Delete the GL object. Safe to call repeatedly; the next bind
    /// re-uploads the retained data.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the buffer was prepared with.
    pub unsafe fn remove(&self, gl: &G) {
        if let Some(buffer) = self.handle.take() {
            unsafe { gl.delete_buffer(buffer) };
        }
    }
}

unsafe fn bind_divisor<G: Gl>(gl: &G, location: u32, options: &BufferBindOptions) {
    if options.instance_divisor == 0 {
        return;
    }
    if gl.capabilities().instanced_arrays {
        unsafe { gl.vertex_attrib_divisor(location, options.instance_divisor) };
    } else {
        tracing::error!(
            location,
            "can't set up instanced attribute divisor, instanced arrays are not supported",
        );
    }
}

/// A view of a shared [`Buffer`] with its own bind options, for interleaved
/// attributes.
pub struct BufferChannel<G: Gl> {
    buffer: Rc<Buffer<G>>,
    /// Bind options used for this channel.
    pub options: BufferBindOptions,
}

impl<G: Gl> Clone for BufferChannel<G> {
    fn clone(&self) -> Self {
        Self {
            buffer: Rc::clone(&self.buffer),
            options: self.options,
        }
    }
}

impl<G: Gl> BufferChannel<G> {
    /// A channel reading `buffer` with `options`.
    pub fn new(buffer: Rc<Buffer<G>>, options: BufferBindOptions) -> Self {
        Self { buffer, options }
    }

    /// The underlying buffer.
    #[must_use]
    pub fn buffer(&self) -> &Rc<Buffer<G>> {
        &self.buffer
    }
}

/// Anything that can feed a vertex attribute.
pub enum VertexSource<G: Gl> {
    /// A buffer with its own bind options.
    Buffer(Rc<Buffer<G>>),
    /// A channel into a shared buffer.
    Channel(BufferChannel<G>),
}

impl<G: Gl> Clone for VertexSource<G> {
    fn clone(&self) -> Self {
        match self {
            Self::Buffer(buffer) => Self::Buffer(Rc::clone(buffer)),
            Self::Channel(channel) => Self::Channel(channel.clone()),
        }
    }
}

impl<G: Gl> From<Rc<Buffer<G>>> for VertexSource<G> {
    fn from(buffer: Rc<Buffer<G>>) -> Self {
        Self::Buffer(buffer)
    }
}

impl<G: Gl> From<BufferChannel<G>> for VertexSource<G> {
    fn from(channel: BufferChannel<G>) -> Self {
        Self::Channel(channel)
    }
}

impl<G: Gl> VertexSource<G> {
    /// Bind to `location`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// See [`Buffer::bind`].
    pub unsafe fn bind(&self, gl: &G, location: u32, locations_count: u32) -> Result<()> {
        match self {
            Self::Buffer(buffer) => unsafe { buffer.bind(gl, location, None, locations_count) },
            Self::Channel(channel) => unsafe {
                channel
                    .buffer
                    .bind(gl, location, Some(&channel.options), locations_count)
            },
        }
    }
}
