//! Per-context frame bookkeeping.
//!
//! Every layer drawn in one host frame shares the render target. The first
//! draw after a frame start clears color and depth; later draws clear color
//! only so depth written by earlier layers is kept.

use crate::viewport::Viewport;

/// Where the shared render target is in the current host frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramePhase {
    /// Nothing drawn yet, or torn down.
    #[default]
    Idle,
    /// The host started a frame; the next draw clears the target.
    FrameStarted,
    /// A layer is drawing into the target.
    Drawing,
    /// The target was composited onto the host framebuffer.
    Composited,
}

/// Frame state shared by every layer of one context.
#[derive(Clone, Debug, Default)]
pub struct FrameState {
    phase: FramePhase,
    framestart: bool,
    viewport: Option<Viewport>,
}

impl FrameState {
    /// An idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Whether the next draw is the first of the frame.
    #[must_use]
    pub fn is_frame_start(&self) -> bool {
        self.framestart || self.phase == FramePhase::Idle
    }

    /// The host started a frame.
    pub fn start_frame(&mut self) {
        self.framestart = true;
        self.phase = FramePhase::FrameStarted;
        tracing::trace!("frame started");
    }

    /// A layer starts drawing. Returns `true` for the first draw of the frame,
    /// which owns the full clear; the cached viewport is dropped then.
    ///
    /// A draw without a preceding frame start counts as the first one.
    pub fn begin_draw(&mut self) -> bool {
        let first = self.is_frame_start();
        if first {
            self.framestart = false;
            self.viewport = None;
        }
        self.phase = FramePhase::Drawing;
        first
    }

    /// The layer was composited.
    pub fn finish_draw(&mut self) {
        self.phase = FramePhase::Composited;
    }

    /// Back to idle, dropping the cached viewport.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The viewport cached for this frame.
    #[must_use]
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// The cached viewport, built with `build` if this frame has none yet.
    /// The flag is `true` when it was just built.
    pub fn viewport_or_insert_with(&mut self, build: impl FnOnce() -> Viewport) -> (&Viewport, bool) {
        let created = self.viewport.is_none();
        (self.viewport.get_or_insert_with(build), created)
    }
}
