//! The shared off-screen render target and the pass compositing it onto the
//! host framebuffer.
//!
//! One [`Compositor`] exists per GL context. Every layer of that context
//! draws into the same target; with MSAA the guest draws into a dedicated
//! multisampled framebuffer that is resolved into the target's texture with a
//! blit before compositing.

use std::rc::Rc;

use crate::config::{Antialiasing, DeckOptions};
use crate::error::{Error, Result};
use crate::gl::{gl_size, Gl};
use crate::render_target::RenderTarget;
use crate::shader::ShaderDefinition;
use crate::shaders::{CompositeMode, CompositePass};
use crate::state::GlStateSnapshot;
use crate::texture::{Filter, TextureOptions};

/// Multisampled color and depth renderbuffers behind their own framebuffer.
struct Msaa<G: Gl> {
    framebuffer: G::Framebuffer,
    color: G::Renderbuffer,
    depth: G::Renderbuffer,
}

impl<G: Gl> Msaa<G> {
    unsafe fn new(gl: &G, [width, height]: [u32; 2], samples: u8) -> Result<Self> {
        let (w, h) = (gl_size(width), gl_size(height));
        let samples = i32::from(samples);

        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(Error::Allocation)?;
            let color = gl.create_renderbuffer().map_err(Error::Allocation)?;
            let depth = gl.create_renderbuffer().map_err(Error::Allocation)?;

            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(color));
            gl.renderbuffer_storage_multisample(glow::RENDERBUFFER, samples, glow::RGBA8, w, h);
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage_multisample(
                glow::RENDERBUFFER,
                samples,
                glow::DEPTH_COMPONENT24,
                w,
                h,
            );

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::RENDERBUFFER,
                Some(color),
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );

            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            Ok(Self {
                framebuffer,
                color,
                depth,
            })
        }
    }

    unsafe fn remove(self, gl: &G) {
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_renderbuffer(self.color);
            gl.delete_renderbuffer(self.depth);
        }
    }
}

/// Render target, optional multisample buffer and composite pass of one GL
/// context.
///
/// GL objects are released when the compositor is dropped.
pub struct Compositor<G: Gl> {
    gl: Rc<G>,
    target: RenderTarget<G>,
    msaa: Option<Msaa<G>>,
    pass: Option<CompositePass<G>>,
    antialiasing: Antialiasing,
    samples: u8,
    definitions: Vec<ShaderDefinition>,
}

impl<G: Gl> Compositor<G> {
    /// A compositor for a target of `size` device pixels. Nothing is
    /// allocated until the target is first bound.
    ///
    /// MSAA on a context without multisampling falls back to no
    /// antialiasing.
    pub fn new(gl: Rc<G>, size: [u32; 2], options: &DeckOptions) -> Self {
        let target = RenderTarget::new(
            size,
            TextureOptions {
                mag_filter: Filter::Linear,
                min_filter: Filter::Linear,
                flip_y: false,
                premultiply_alpha: false,
                ..TextureOptions::default()
            },
        );
        let antialiasing = supported_antialiasing(&*gl, options.antialiasing);
        Self {
            gl,
            target,
            msaa: None,
            pass: None,
            antialiasing,
            samples: options.msaa_samples.max(1),
            definitions: options.shader_definitions.clone(),
        }
    }

    /// The shared context.
    #[must_use]
    pub fn gl(&self) -> &Rc<G> {
        &self.gl
    }

    /// Render target size in device pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.target.size()
    }

    /// Antialiasing in effect.
    #[must_use]
    pub fn antialiasing(&self) -> Antialiasing {
        self.antialiasing
    }

    /// Choose the antialiasing mode. Only possible until the composite pass
    /// is built by the first composite; returns whether the mode was applied.
    pub fn configure_antialiasing(&mut self, antialiasing: Antialiasing) -> bool {
        if self.pass.is_some() {
            return false;
        }
        self.antialiasing = supported_antialiasing(&*self.gl, antialiasing);
        true
    }

    /// Resize to `size` device pixels. Previous contents are discarded and
    /// the target is reallocated immediately.
    ///
    /// # Safety
    ///
    /// The compositor's context must be current.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if a GL object cannot be created.
    pub unsafe fn resize(&mut self, size: [u32; 2]) -> Result<()> {
        tracing::debug!(width = size[0], height = size[1], "resizing render target");
        unsafe {
            let gl = &*self.gl;
            self.target.set_size(gl, size);
            if let Some(msaa) = self.msaa.take() {
                msaa.remove(gl);
            }
        }
        unsafe {
            self.bind_draw_target()?;
            self.unbind();
        }
        Ok(())
    }

    /// Bind the framebuffer the guest draws into: the multisample buffer with
    /// MSAA, the render target otherwise. Allocates on first use.
    ///
    /// # Safety
    ///
    /// The compositor's context must be current.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] if a GL object cannot be created.
    pub unsafe fn bind_draw_target(&mut self) -> Result<G::Framebuffer> {
        let gl = &*self.gl;
        // Allocation writes pixel store flags the host owns.
        let host = self
            .target
            .framebuffer()
            .is_none()
            .then(|| unsafe { GlStateSnapshot::capture(gl) });
        let resolve = unsafe { self.target.bind(gl) };
        if let Some(host) = host {
            unsafe { host.apply(gl) };
        }
        let resolve = resolve?;
        if self.antialiasing != Antialiasing::Msaa {
            return Ok(resolve);
        }

        let framebuffer = match self.msaa.as_ref().map(|msaa| msaa.framebuffer) {
            Some(framebuffer) => framebuffer,
            None => {
                let msaa = unsafe { Msaa::new(gl, self.target.size(), self.samples) }?;
                let framebuffer = msaa.framebuffer;
                self.msaa = Some(msaa);
                framebuffer
            }
        };
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer)) };
        Ok(framebuffer)
    }

    /// Bind the host's default framebuffer.
    ///
    /// # Safety
    ///
    /// The compositor's context must be current.
    pub unsafe fn unbind(&self) {
        unsafe { self.target.unbind(&*self.gl) };
    }

    /// Resolve the multisample buffer into the render target's texture. Does
    /// nothing without MSAA.
    ///
    /// # Safety
    ///
    /// The compositor's context must be current.
    pub unsafe fn resolve_msaa(&self) {
        let (Some(msaa), Some(resolve)) = (&self.msaa, self.target.framebuffer()) else {
            return;
        };
        let gl = &*self.gl;
        let [width, height] = self.target.size().map(gl_size);
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(msaa.framebuffer));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(resolve));
            gl.clear_buffer_f32_slice(glow::COLOR, 0, &[0.0; 4]);
            gl.blit_framebuffer(
                0,
                0,
                width,
                height,
                0,
                0,
                width,
                height,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    /// Draw the render target over the host's default framebuffer.
    ///
    /// # Safety
    ///
    /// The compositor's context must be current.
    ///
    /// # Errors
    ///
    /// The first compile or link failure of the composite program, or
    /// [`Error::Allocation`].
    pub unsafe fn composite(&mut self) -> Result<()> {
        if self.pass.is_none() {
            self.pass = Some(CompositePass::new(
                CompositeMode::from(self.antialiasing),
                self.definitions.clone(),
            )?);
        }
        let gl = &*self.gl;
        let size = self.target.size();
        let Some(pass) = self.pass.as_mut() else {
            return Ok(());
        };

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.target.texture_mut().enable(gl, Some(0))?;
            pass.draw(gl, size)
        }
    }

    /// Release every GL object. The compositor stays usable and allocates
    /// again on next use.
    ///
    /// # Safety
    ///
    /// The compositor's context must be current.
    pub unsafe fn remove(&mut self) {
        let gl = &*self.gl;
        unsafe {
            self.target.remove(gl);
            if let Some(msaa) = self.msaa.take() {
                msaa.remove(gl);
            }
            if let Some(mut pass) = self.pass.take() {
                pass.remove(gl);
            }
        }
    }
}

impl<G: Gl> Drop for Compositor<G> {
    fn drop(&mut self) {
        // SAFETY: the compositor shares the host map's context, which is
        // current for the whole lifetime of the map.
        unsafe { self.remove() };
    }
}

fn supported_antialiasing<G: Gl>(gl: &G, requested: Antialiasing) -> Antialiasing {
    if requested == Antialiasing::Msaa && !gl.capabilities().multisample() {
        tracing::warn!("multisampling is not supported by this context, disabling antialiasing");
        return Antialiasing::None;
    }
    requested
}
