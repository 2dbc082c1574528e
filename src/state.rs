//! GL global state arbitration between the host map and the guest library.
//!
//! Both renderers draw into one context. Each keeps its own stack of
//! [`GlStateSnapshot`]s; switching owner pushes the outgoing owner's state and
//! restores the incoming owner's last saved state. Guest work additionally
//! starts from fixed defaults (no unpack flip, no premultiply, no face
//! culling), which the guest library assumes and never sets itself.

use crate::gl::{Gl, UNPACK_FLIP_Y_WEBGL, UNPACK_PREMULTIPLY_ALPHA_WEBGL};

/// The global GL flags the host and the guest disagree on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlStateSnapshot {
    /// `CULL_FACE` enabled.
    pub cull_face: bool,
    /// `UNPACK_FLIP_Y_WEBGL` pixel store flag.
    pub unpack_flip_y: bool,
    /// `UNPACK_PREMULTIPLY_ALPHA_WEBGL` pixel store flag.
    pub unpack_premultiply_alpha: bool,
    /// `DEPTH_TEST` enabled.
    pub depth_test: bool,
    /// Depth writes enabled.
    pub depth_mask: bool,
}

impl GlStateSnapshot {
    /// State the guest library expects on entry.
    pub const GUEST_DEFAULTS: Self = Self {
        cull_face: false,
        unpack_flip_y: false,
        unpack_premultiply_alpha: false,
        depth_test: true,
        depth_mask: true,
    };

    /// Read the current flags from `gl`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub unsafe fn capture<G: Gl>(gl: &G) -> Self {
        unsafe {
            Self {
                cull_face: gl.is_enabled(glow::CULL_FACE),
                unpack_flip_y: gl.get_parameter_bool(UNPACK_FLIP_Y_WEBGL),
                unpack_premultiply_alpha: gl.get_parameter_bool(UNPACK_PREMULTIPLY_ALPHA_WEBGL),
                depth_test: gl.is_enabled(glow::DEPTH_TEST),
                depth_mask: gl.get_parameter_bool(glow::DEPTH_WRITEMASK),
            }
        }
    }

    /// Write every flag to `gl`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    pub unsafe fn apply<G: Gl>(self, gl: &G) {
        unsafe {
            set_capability(gl, glow::CULL_FACE, self.cull_face);
            set_capability(gl, glow::DEPTH_TEST, self.depth_test);
            gl.pixel_store_bool(UNPACK_FLIP_Y_WEBGL, self.unpack_flip_y);
            gl.pixel_store_bool(UNPACK_PREMULTIPLY_ALPHA_WEBGL, self.unpack_premultiply_alpha);
            gl.depth_mask(self.depth_mask);
        }
    }

    /// Force the flags the guest library assumes, keeping depth state.
    unsafe fn apply_guest_defaults<G: Gl>(gl: &G) {
        unsafe {
            gl.pixel_store_bool(UNPACK_FLIP_Y_WEBGL, false);
            gl.pixel_store_bool(UNPACK_PREMULTIPLY_ALPHA_WEBGL, false);
            gl.disable(glow::CULL_FACE);
        }
    }
}

unsafe fn set_capability<G: Gl>(gl: &G, capability: u32, enabled: bool) {
    unsafe {
        if enabled {
            gl.enable(capability);
        } else {
            gl.disable(capability);
        }
    }
}

/// The host and guest state stacks of one GL context.
#[derive(Debug, Default)]
pub struct StateArbiter {
    host: Vec<GlStateSnapshot>,
    guest: Vec<GlStateSnapshot>,
}

impl StateArbiter {
    /// Empty stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the context to the guest until the returned scope ends.
    ///
    /// Saves the host state, restores the guest state left by the previous
    /// scope (if any) and forces the guest defaults. Only one scope can be
    /// open at a time.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context that stays current until the
    /// scope is dropped.
    pub unsafe fn enter_guest<'a, G: Gl>(&'a mut self, gl: &'a G) -> GuestScope<'a, G> {
        unsafe {
            self.host.push(GlStateSnapshot::capture(gl));
            if let Some(guest) = self.guest.pop() {
                guest.apply(gl);
            }
            GlStateSnapshot::apply_guest_defaults(gl);
        }
        GuestScope { arbiter: self, gl }
    }

    /// No guest scope is open and at most one guest state is saved.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.host.is_empty() && self.guest.len() <= 1
    }

    /// The guest state saved by the last scope.
    #[must_use]
    pub fn saved_guest_state(&self) -> Option<&GlStateSnapshot> {
        self.guest.last()
    }
}

/// Guest ownership of the context. Dropping it saves the guest state and
/// restores the host state.
#[must_use = "dropping the scope immediately hands the context back to the host"]
pub struct GuestScope<'a, G: Gl> {
    arbiter: &'a mut StateArbiter,
    gl: &'a G,
}

impl<G: Gl> GuestScope<'_, G> {
    /// The context the scope was opened on.
    #[must_use]
    pub fn gl(&self) -> &G {
        self.gl
    }

    /// Hand the context back to the host.
    pub fn leave(self) {}
}

impl<G: Gl> Drop for GuestScope<'_, G> {
    fn drop(&mut self) {
        // SAFETY: `enter_guest` requires the context to stay current for the
        // lifetime of the scope.
        unsafe {
            self.arbiter.guest.push(GlStateSnapshot::capture(self.gl));
            if let Some(host) = self.arbiter.host.pop() {
                host.apply(self.gl);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::RecordingGl;

    #[test]
    fn guest_starts_from_defaults_and_host_is_restored() {
        let gl = RecordingGl::new();
        unsafe {
            gl.enable(glow::CULL_FACE);
            gl.pixel_store_bool(UNPACK_FLIP_Y_WEBGL, true);
            gl.pixel_store_bool(UNPACK_PREMULTIPLY_ALPHA_WEBGL, true);
        }
        let host = unsafe { GlStateSnapshot::capture(&gl) };

        let mut arbiter = StateArbiter::new();
        {
            let scope = unsafe { arbiter.enter_guest(&gl) };
            let inside = unsafe { GlStateSnapshot::capture(scope.gl()) };
            assert!(!inside.cull_face);
            assert!(!inside.unpack_flip_y);
            assert!(!inside.unpack_premultiply_alpha);
            scope.leave();
        }

        assert_eq!(unsafe { GlStateSnapshot::capture(&gl) }, host);
        assert!(arbiter.is_balanced());
    }

    #[test]
    fn guest_state_survives_between_scopes() {
        let gl = RecordingGl::new();
        let mut arbiter = StateArbiter::new();

        let scope = unsafe { arbiter.enter_guest(&gl) };
        unsafe { scope.gl().depth_mask(false) };
        drop(scope);
        assert!(unsafe { gl.get_parameter_bool(glow::DEPTH_WRITEMASK) });
        assert!(!arbiter.saved_guest_state().unwrap().depth_mask);

        let scope = unsafe { arbiter.enter_guest(&gl) };
        assert!(!unsafe { scope.gl().get_parameter_bool(glow::DEPTH_WRITEMASK) });
        drop(scope);
        assert!(arbiter.is_balanced());
    }

    #[test]
    fn early_return_still_restores_host() {
        fn guest_work(arbiter: &mut StateArbiter, gl: &RecordingGl) -> Result<(), ()> {
            let _scope = unsafe { arbiter.enter_guest(gl) };
            unsafe { gl.enable(glow::CULL_FACE) };
            Err(())
        }

        let gl = RecordingGl::new();
        let mut arbiter = StateArbiter::new();
        assert!(guest_work(&mut arbiter, &gl).is_err());
        assert!(!unsafe { gl.is_enabled(glow::CULL_FACE) });
        assert!(arbiter.saved_guest_state().unwrap().cull_face);
        assert!(arbiter.is_balanced());
    }

    #[test]
    fn repeated_frames_stay_balanced() {
        let gl = RecordingGl::new();
        let mut arbiter = StateArbiter::new();
        for _ in 0..10 {
            unsafe { arbiter.enter_guest(&gl) }.leave();
            assert!(arbiter.is_balanced());
        }
    }

    #[test]
    fn open_scope_is_unbalanced() {
        let gl = RecordingGl::new();
        let mut arbiter = StateArbiter::new();
        let scope = unsafe { arbiter.enter_guest(&gl) };
        assert_eq!(scope.arbiter.host.len(), 1);
        drop(scope);
        assert!(arbiter.is_balanced());
    }
}
