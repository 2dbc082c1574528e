//! Error types for the adapter.

use thiserror::Error;

/// Errors produced while configuring layers or allocating GPU resources.
#[derive(Error, Debug)]
pub enum Error {
    /// A layer was constructed without an id.
    #[error("layer must have a unique id")]
    MissingId,

    /// `create_shader` failed, or the context was lost while creating it.
    #[error("failed to create shader (shader is null: {shader_null}, context is lost: {context_lost})")]
    ContextLost {
        /// Whether the driver returned no shader object.
        shader_null: bool,
        /// Whether the context reported itself as lost.
        context_lost: bool,
    },

    /// GLSL compilation failed. The message carries the erroneous line when
    /// the driver log points at one.
    #[error("{0}")]
    ShaderCompile(String),

    /// Program linking failed.
    #[error("failed to link shader program: {0}")]
    ProgramLink(String),

    /// A `create_*` call returned no object.
    #[error("failed to allocate GL object: {0}")]
    Allocation(String),

    /// Attribute location counts must be 1, 2, 3 or 4.
    #[error("invalid attribute location count {0}, must be 1, 2, 3 or 4")]
    InvalidLocationCount(u32),

    /// A buffer write reached past what GL can address.
    #[error("buffer range of {len} bytes at offset {offset} is out of range")]
    InvalidRange {
        /// Byte offset of the write.
        offset: usize,
        /// Length of the write in bytes.
        len: usize,
    },

    /// A uniform was bound that the program does not declare.
    #[error("shader program has no uniform named `{0}`")]
    UnknownUniform(String),

    /// An attribute was bound that the program does not declare.
    #[error("shader program has no attribute named `{0}`")]
    UnknownAttribute(String),

    /// A uniform value does not match the declared uniform type.
    #[error("uniform `{name}` expects {expected}")]
    UniformMismatch {
        /// Uniform name.
        name: String,
        /// Human-readable description of the declared type.
        expected: &'static str,
    },

    /// Encoded texture data could not be decoded.
    #[error("failed to decode texture image: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for adapter operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
