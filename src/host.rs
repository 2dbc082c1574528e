//! The host map toolkit, seen from the adapter.

use std::rc::Rc;

use crate::gl::Gl;
use crate::viewport::Padding;

/// The map that owns the GL context, the default framebuffer and the frame
/// loop.
///
/// Camera getters report the host's own conventions; [`crate::viewport`]
/// translates them for the guest library.
pub trait HostMap {
    /// GL binding of the shared context.
    type Gl: Gl;

    /// The shared context. Its pointer identity keys the
    /// [`DeckRegistry`](crate::DeckRegistry).
    fn gl(&self) -> &Rc<Self::Gl>;

    /// Canvas size in CSS pixels.
    fn size(&self) -> [f64; 2];

    /// Device pixels per CSS pixel.
    fn device_pixel_ratio(&self) -> f64;

    /// Map center as `[longitude, latitude]`. Longitude may lie outside
    /// `[-180, 180]`.
    fn center(&self) -> [f64; 2];

    /// Host zoom level.
    fn zoom(&self) -> f64;

    /// Pitch in degrees.
    fn pitch(&self) -> f64;

    /// Clockwise rotation in degrees.
    fn rotation(&self) -> f64;

    /// Viewport padding in CSS pixels.
    fn padding(&self) -> Padding;
}

/// Events the host emits that the adapter reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// A new host frame begins; the shared render target must be cleared
    /// once.
    FrameStart,
    /// The canvas was resized.
    Resize,
    /// The camera moved.
    Move,
}

/// Render target size for a canvas: `ceil(css * ratio)` per axis, at least
/// one pixel.
#[must_use]
// Clamped to the u32 range by the float-to-int cast.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn device_size(size: [f64; 2], device_pixel_ratio: f64) -> [u32; 2] {
    size.map(|css| {
        let device = (css * device_pixel_ratio).ceil();
        if device.is_finite() && device >= 1.0 {
            device as u32
        } else {
            1
        }
    })
}
