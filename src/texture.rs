//! 2D textures.

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::gl::{
    gl_enum_i32, gl_size, Capabilities, Gl, ALPHA, UNPACK_FLIP_Y_WEBGL,
    UNPACK_PREMULTIPLY_ALPHA_WEBGL,
};

/// Texture sampling filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    /// `NEAREST`.
    Nearest,
    /// `NEAREST_MIPMAP_NEAREST`.
    NearestMipmapNearest,
    /// `NEAREST_MIPMAP_LINEAR`.
    NearestMipmapLinear,
    /// `LINEAR`.
    Linear,
    /// `LINEAR_MIPMAP_NEAREST`.
    LinearMipmapNearest,
    /// `LINEAR_MIPMAP_LINEAR`.
    LinearMipmapLinear,
}

impl Filter {
    fn gl_enum(self) -> u32 {
        match self {
            Self::Nearest => glow::NEAREST,
            Self::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            Self::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            Self::Linear => glow::LINEAR,
            Self::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
            Self::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }
    }

    fn uses_mipmaps(self) -> bool {
        !matches!(self, Self::Nearest | Self::Linear)
    }
}

/// Texture coordinate wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrap {
    /// `CLAMP_TO_EDGE`.
    ClampToEdge,
    /// `REPEAT`.
    Repeat,
    /// `MIRRORED_REPEAT`.
    MirroredRepeat,
}

impl Wrap {
    fn gl_enum(self) -> u32 {
        match self {
            Self::ClampToEdge => glow::CLAMP_TO_EDGE,
            Self::Repeat => glow::REPEAT,
            Self::MirroredRepeat => glow::MIRRORED_REPEAT,
        }
    }
}

/// Pixel format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// `RGBA`.
    Rgba,
    /// `RGB`.
    Rgb,
    /// `ALPHA`.
    Alpha,
    /// `DEPTH_COMPONENT`.
    DepthComponent,
    /// `RED`; only available on version-3 contexts.
    Red,
}

impl TextureFormat {
    fn gl_enum(self, caps: Capabilities) -> Option<u32> {
        match self {
            Self::Rgba => Some(glow::RGBA),
            Self::Rgb => Some(glow::RGB),
            Self::Alpha => Some(ALPHA),
            Self::DepthComponent => Some(glow::DEPTH_COMPONENT),
            Self::Red => caps.version3.then_some(glow::RED),
        }
    }
}

/// Pixel component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureDataType {
    /// `UNSIGNED_BYTE`.
    UnsignedByte,
    /// `FLOAT`.
    Float,
    /// `UNSIGNED_INT`.
    UnsignedInt,
}

impl TextureDataType {
    fn gl_enum(self) -> u32 {
        match self {
            Self::UnsignedByte => glow::UNSIGNED_BYTE,
            Self::Float => glow::FLOAT,
            Self::UnsignedInt => glow::UNSIGNED_INT,
        }
    }
}

/// Sampling and upload parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureOptions {
    /// Magnification filter.
    pub mag_filter: Filter,
    /// Minification filter.
    pub min_filter: Filter,
    /// Horizontal wrapping.
    pub wrap_s: Wrap,
    /// Vertical wrapping.
    pub wrap_t: Wrap,
    /// Pixel format.
    pub format: TextureFormat,
    /// Component type.
    pub data_type: TextureDataType,
    /// Generate mipmaps after upload when the min filter samples them.
    pub generate_mipmaps: bool,
    /// Flip rows on upload.
    pub flip_y: bool,
    /// Premultiply alpha on upload.
    pub premultiply_alpha: bool,
    /// Allocation size for raw pixel data or empty textures.
    pub size: Option<[u32; 2]>,
    /// Default texture unit for [`Texture::enable`].
    pub unit: Option<u32>,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::LinearMipmapLinear,
            wrap_s: Wrap::ClampToEdge,
            wrap_t: Wrap::ClampToEdge,
            format: TextureFormat::Rgba,
            data_type: TextureDataType::UnsignedByte,
            generate_mipmaps: true,
            flip_y: true,
            premultiply_alpha: true,
            size: None,
            unit: None,
        }
    }
}

/// Where texture contents come from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum TextureSource {
    /// Uninitialized storage of [`TextureOptions::size`], or nothing without a
    /// size.
    #[default]
    Empty,
    /// Raw pixels laid out per [`TextureOptions::size`].
    Pixels(Vec<u8>),
    /// A decoded image; its own dimensions are used.
    Image(RgbaImage),
}

/// A GL texture object, allocated on first use.
pub struct Texture<G: Gl> {
    options: TextureOptions,
    source: TextureSource,
    handle: Option<G::Texture>,
}

impl<G: Gl> Texture<G> {
    /// Create a texture from `source`.
    pub fn new(source: TextureSource, options: TextureOptions) -> Self {
        Self {
            options,
            source,
            handle: None,
        }
    }

    /// Create an empty texture of `size` pixels.
    pub fn empty(size: [u32; 2], options: TextureOptions) -> Self {
        Self::new(
            TextureSource::Empty,
            TextureOptions {
                size: Some(size),
                ..options
            },
        )
    }

    /// Decode a PNG or JPEG image into an RGBA texture.
    ///
    /// # Errors
    ///
    /// [`Error::Image`] if the bytes cannot be decoded.
    pub fn from_encoded(bytes: &[u8], options: TextureOptions) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(Error::Image)?;
        Ok(Self::new(
            TextureSource::Image(image.to_rgba8()),
            TextureOptions {
                format: TextureFormat::Rgba,
                data_type: TextureDataType::UnsignedByte,
                ..options
            },
        ))
    }

    /// Upload parameters.
    #[must_use]
    pub fn options(&self) -> &TextureOptions {
        &self.options
    }

    /// The GL object, if currently allocated.
    #[must_use]
    pub fn handle(&self) -> Option<G::Texture> {
        self.handle
    }

    /// Allocate the GL object, upload the source and set sampling
    /// parameters. Does nothing if already allocated. Leaves `TEXTURE_2D`
    /// unbound.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the texture object cannot be created.
    pub unsafe fn prepare(&mut self, gl: &G) -> Result<G::Texture> {
        if let Some(texture) = self.handle {
            return Ok(texture);
        }

        let options = self.options;
        let texture = unsafe { gl.create_texture() }.map_err(Error::Allocation)?;
        let format = options.format.gl_enum(gl.capabilities());
        let ty = options.data_type.gl_enum();

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_bool(UNPACK_FLIP_Y_WEBGL, options.flip_y);
            gl.pixel_store_bool(UNPACK_PREMULTIPLY_ALPHA_WEBGL, options.premultiply_alpha);

            if let Some(format) = format {
                let internal = internal_format(format, ty, gl.capabilities());
                match (&self.source, options.size) {
                    (TextureSource::Image(image), _) => gl.tex_image_2d(
                        glow::TEXTURE_2D,
                        0,
                        gl_enum_i32(format),
                        gl_size(image.width()),
                        gl_size(image.height()),
                        0,
                        format,
                        ty,
                        Some(image.as_raw()),
                    ),
                    (TextureSource::Pixels(pixels), Some([width, height])) => gl.tex_image_2d(
                        glow::TEXTURE_2D,
                        0,
                        gl_enum_i32(internal),
                        gl_size(width),
                        gl_size(height),
                        0,
                        format,
                        ty,
                        Some(pixels),
                    ),
                    (TextureSource::Empty, Some([width, height])) => gl.tex_image_2d(
                        glow::TEXTURE_2D,
                        0,
                        gl_enum_i32(internal),
                        gl_size(width),
                        gl_size(height),
                        0,
                        format,
                        ty,
                        None,
                    ),
                    (_, None) => {}
                }
            }

            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                gl_enum_i32(options.wrap_s.gl_enum()),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                gl_enum_i32(options.wrap_t.gl_enum()),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                gl_enum_i32(options.mag_filter.gl_enum()),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                gl_enum_i32(options.min_filter.gl_enum()),
            );

            if options.generate_mipmaps && options.min_filter.uses_mipmaps() {
                gl.generate_mipmap(glow::TEXTURE_2D);
            }

            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        self.handle = Some(texture);
        Ok(texture)
    }

    /// Bind the texture to `TEXTURE_2D`, preparing it first if needed.
    ///
    /// `unit` (or [`TextureOptions::unit`] when `None`) selects the active
    /// texture unit first.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the texture object cannot be created.
    pub unsafe fn enable(&mut self, gl: &G, unit: Option<u32>) -> Result<G::Texture> {
        if let Some(unit) = unit.or(self.options.unit) {
            unsafe { gl.active_texture(glow::TEXTURE0 + unit) };
        }
        let texture = unsafe { self.prepare(gl) }?;
        unsafe { gl.bind_texture(glow::TEXTURE_2D, Some(texture)) };
        Ok(texture)
    }

    /// Replace the `size` pixel rectangle at `offset` with `pixels`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if the texture object cannot be created.
    pub unsafe fn sub_image(
        &mut self,
        gl: &G,
        pixels: &[u8],
        [x, y]: [u32; 2],
        [width, height]: [u32; 2],
    ) -> Result<()> {
        let texture = unsafe { self.prepare(gl) }?;
        let Some(format) = self.options.format.gl_enum(gl.capabilities()) else {
            return Ok(());
        };
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_bool(UNPACK_FLIP_Y_WEBGL, self.options.flip_y);
            gl.pixel_store_bool(UNPACK_PREMULTIPLY_ALPHA_WEBGL, self.options.premultiply_alpha);
            gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                gl_size(x),
                gl_size(y),
                gl_size(width),
                gl_size(height),
                format,
                self.options.data_type.gl_enum(),
                pixels,
            );
        }
        Ok(())
    }

    /// Delete the GL object. Safe to call repeatedly.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the texture was prepared with.
    pub unsafe fn remove(&mut self, gl: &G) {
        if let Some(texture) = self.handle.take() {
            unsafe { gl.delete_texture(texture) };
        }
    }
}

/// Sized internal formats are required for depth and float textures on
/// version-3 contexts.
fn internal_format(format: u32, ty: u32, caps: Capabilities) -> u32 {
    if !caps.version3 {
        return format;
    }
    match (format, ty) {
        (glow::DEPTH_COMPONENT, _) => glow::DEPTH_COMPONENT24,
        (glow::RGBA, glow::FLOAT) => glow::RGBA32F,
        (glow::RED, glow::FLOAT) => glow::R32F,
        _ => format,
    }
}
