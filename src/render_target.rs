//! Off-screen framebuffer with a color texture and a depth attachment.

use crate::error::{Error, Result};
use crate::gl::{gl_size, Gl, FRAMEBUFFER_INCOMPLETE_DIMENSIONS};
use crate::texture::{Filter, Texture, TextureDataType, TextureFormat, TextureOptions};

/// Depth attachment of a [`RenderTarget`].
enum Depth<G: Gl> {
    Renderbuffer(G::Renderbuffer),
    Texture(Texture<G>),
}

/// A framebuffer rendering into a texture.
///
/// GL objects are created on first [`bind`](Self::bind) and dropped by
/// [`set_size`](Self::set_size), so a resize only allocates again when the
/// target is next used.
pub struct RenderTarget<G: Gl> {
    size: [u32; 2],
    options: TextureOptions,
    depth_texture: bool,
    texture: Texture<G>,
    framebuffer: Option<G::Framebuffer>,
    depth: Option<Depth<G>>,
}

impl<G: Gl> RenderTarget<G> {
    /// A target of `size` pixels (each axis at least 1) whose color texture
    /// uses `options`. Mipmaps are never generated for render targets.
    pub fn new(size: [u32; 2], options: TextureOptions) -> Self {
        let size = size.map(|axis| axis.max(1));
        let options = TextureOptions {
            generate_mipmaps: false,
            ..options
        };
        Self {
            size,
            options,
            depth_texture: false,
            texture: Texture::empty(size, options),
            framebuffer: None,
            depth: None,
        }
    }

    /// Attach depth as a texture instead of a renderbuffer.
    #[must_use]
    pub fn with_depth_texture(mut self) -> Self {
        self.depth_texture = true;
        self
    }

    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// The framebuffer, if prepared.
    #[must_use]
    pub fn framebuffer(&self) -> Option<G::Framebuffer> {
        self.framebuffer
    }

    /// The color texture.
    pub fn texture_mut(&mut self) -> &mut Texture<G> {
        &mut self.texture
    }

    /// The depth texture, when the target uses one and is prepared.
    #[must_use]
    pub fn depth_texture(&self) -> Option<&Texture<G>> {
        match &self.depth {
            Some(Depth::Texture(texture)) => Some(texture),
            _ => None,
        }
    }

    /// Bind the framebuffer, preparing it first if needed.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if a GL object cannot be created.
    pub unsafe fn bind(&mut self, gl: &G) -> Result<G::Framebuffer> {
        let framebuffer = match self.framebuffer {
            Some(framebuffer) => framebuffer,
            None => unsafe { self.prepare(gl) }?,
        };
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer)) };
        Ok(framebuffer)
    }

    /// Bind the default framebuffer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub unsafe fn unbind(&self, gl: &G) {
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
    }

    /// Change the size, releasing GL objects. They are recreated on the
    /// next [`bind`](Self::bind).
    ///
    /// # Safety
    ///
    /// `gl` must be the context the target was prepared with.
    pub unsafe fn set_size(&mut self, gl: &G, size: [u32; 2]) {
        unsafe { self.remove(gl) };
        self.size = size.map(|axis| axis.max(1));
        self.texture = Texture::empty(self.size, self.options);
    }

    /// Release every GL object. Safe to call repeatedly.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the target was prepared with.
    pub unsafe fn remove(&mut self, gl: &G) {
        unsafe {
            self.texture.remove(gl);
            match self.depth.take() {
                Some(Depth::Renderbuffer(renderbuffer)) => gl.delete_renderbuffer(renderbuffer),
                Some(Depth::Texture(mut texture)) => texture.remove(gl),
                None => {}
            }
            if let Some(framebuffer) = self.framebuffer.take() {
                gl.delete_framebuffer(framebuffer);
            }
        }
    }

    unsafe fn prepare(&mut self, gl: &G) -> Result<G::Framebuffer> {
        let color = unsafe { self.texture.prepare(gl) }?;
        let framebuffer = unsafe { gl.create_framebuffer() }.map_err(Error::Allocation)?;

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );
        }

        if let Err(error) = unsafe { self.attach_depth(gl) } {
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                gl.delete_framebuffer(framebuffer);
            }
            return Err(error);
        }

        unsafe {
            check_complete(gl);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        self.framebuffer = Some(framebuffer);
        Ok(framebuffer)
    }

    /// Attach a depth texture or renderbuffer to the bound framebuffer.
    unsafe fn attach_depth(&mut self, gl: &G) -> Result<()> {
        let [width, height] = self.size;
        if self.depth_texture {
            let mut depth = Texture::empty(
                self.size,
                TextureOptions {
                    mag_filter: Filter::Nearest,
                    min_filter: Filter::Nearest,
                    format: TextureFormat::DepthComponent,
                    data_type: TextureDataType::UnsignedInt,
                    premultiply_alpha: false,
                    generate_mipmaps: false,
                    ..TextureOptions::default()
                },
            );
            let handle = unsafe { depth.prepare(gl) }?;
            self.depth = Some(Depth::Texture(depth));
            unsafe {
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::TEXTURE_2D,
                    Some(handle),
                    0,
                );
            }
        } else {
            let renderbuffer = unsafe { gl.create_renderbuffer() }.map_err(Error::Allocation)?;
            self.depth = Some(Depth::Renderbuffer(renderbuffer));
            unsafe {
                gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
                gl.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    glow::DEPTH_COMPONENT16,
                    gl_size(width),
                    gl_size(height),
                );
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::RENDERBUFFER,
                    Some(renderbuffer),
                );
            }
        }
        Ok(())
    }
}

/// Log an incomplete framebuffer. Incompleteness is usually transient and
/// fixed by the next resize, so it is never an error.
unsafe fn check_complete<G: Gl>(gl: &G) {
    let status = unsafe { gl.check_framebuffer_status(glow::FRAMEBUFFER) };
    match status {
        glow::FRAMEBUFFER_COMPLETE => {}
        glow::FRAMEBUFFER_UNSUPPORTED => tracing::warn!("framebuffer is unsupported"),
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
            tracing::warn!("framebuffer incomplete attachment");
        }
        FRAMEBUFFER_INCOMPLETE_DIMENSIONS => tracing::warn!("framebuffer incomplete dimensions"),
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            tracing::warn!("framebuffer incomplete missing attachment");
        }
        status => tracing::warn!(status, "unexpected framebuffer status"),
    }
}
