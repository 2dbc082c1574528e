//! The guest visualization library, seen from the adapter.
//!
//! The guest owns its scene graph; the adapter only pushes props, asks it to
//! draw a filtered set of layers into a given framebuffer, and checks layer
//! membership.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RenderingMode;
use crate::gl::Gl;
use crate::viewport::{ViewState, Viewport, VIEWPORT_ID};

/// A guest library instance bound to one GL context.
pub trait GuestDeck {
    /// GL binding of the shared context.
    type Gl: Gl;
    /// Guest layer instances built from [`LayerDescriptor`]s.
    type Layer;

    /// Merge `props` into the guest's props. `None` fields are left as they
    /// are.
    fn set_props(&mut self, props: DeckProps<Self::Gl, Self::Layer>);

    /// Whether the guest finished initializing and can draw.
    fn is_initialized(&self) -> bool;

    /// Whether a layer with `id` is in the guest's active layer list.
    fn has_layer(&self, id: &str) -> bool;

    /// Whether the guest wants a redraw. With `clear_redraw_flags`, pending
    /// redraw requests are dropped.
    fn needs_redraw(&mut self, clear_redraw_flags: bool) -> bool;

    /// Draw the layers accepted by `options.layer_filter` into
    /// `options.framebuffer`.
    fn draw_layers(&mut self, reason: &str, options: DrawOptions<'_, Self::Gl>);

    /// Release guest resources. Called once when the context goes away.
    fn finalize(&mut self) {}
}

/// Props pushed to the guest. Only `Some` fields are applied.
pub struct DeckProps<G: Gl, L> {
    /// Full layer list, in draw order.
    pub layers: Option<Vec<L>>,
    /// Camera.
    pub view_state: Option<ViewState>,
    /// The shared context.
    pub gl: Option<Rc<G>>,
    /// Canvas width in CSS pixels.
    pub width: Option<f64>,
    /// Canvas height in CSS pixels.
    pub height: Option<f64>,
    /// Views the guest renders.
    pub views: Option<Vec<MapView>>,
    /// Default GL parameters for guest draws.
    pub parameters: Option<GlParameters>,
    /// Render at device resolution.
    pub use_device_pixels: Option<bool>,
}

impl<G: Gl, L> Default for DeckProps<G, L> {
    fn default() -> Self {
        Self {
            layers: None,
            view_state: None,
            gl: None,
            width: None,
            height: None,
            views: None,
            parameters: None,
            use_device_pixels: None,
        }
    }
}

impl<G: Gl, L> fmt::Debug for DeckProps<G, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckProps")
            .field("layers", &self.layers.as_ref().map(Vec::len))
            .field("view_state", &self.view_state)
            .field("gl", &self.gl.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("views", &self.views)
            .field("parameters", &self.parameters)
            .field("use_device_pixels", &self.use_device_pixels)
            .finish()
    }
}

/// Arguments of [`GuestDeck::draw_layers`].
pub struct DrawOptions<'a, G: Gl> {
    /// Viewports to draw; one per host frame.
    pub viewports: &'a [Viewport],
    /// Accepts the ids of the layers to draw.
    pub layer_filter: &'a dyn Fn(&str) -> bool,
    /// Clear the canvas before drawing. The adapter clears the render target
    /// itself, so this is always `false`.
    pub clear_canvas: bool,
    /// Reset the guest's per-frame layer stack; `true` for the first draw of
    /// a frame.
    pub clear_stack: bool,
    /// Framebuffer to draw into.
    pub framebuffer: Option<G::Framebuffer>,
}

/// A guest view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapView {
    /// View id.
    pub id: String,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            id: VIEWPORT_ID.to_owned(),
        }
    }
}

/// GL state the guest applies around its draws.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlParameters {
    /// Depth writes.
    pub depth_mask: bool,
    /// Depth testing.
    pub depth_test: bool,
    /// Blending.
    pub blend: bool,
    /// `blendFuncSeparate` arguments.
    pub blend_func: [u32; 4],
    /// `POLYGON_OFFSET_FILL`.
    pub polygon_offset_fill: bool,
    /// Depth comparison.
    pub depth_func: u32,
    /// Blend equation.
    pub blend_equation: u32,
}

impl Default for GlParameters {
    fn default() -> Self {
        Self {
            depth_mask: true,
            depth_test: true,
            blend: true,
            blend_func: [
                glow::SRC_ALPHA,
                glow::ONE_MINUS_SRC_ALPHA,
                glow::ONE,
                glow::ONE_MINUS_SRC_ALPHA,
            ],
            polygon_offset_fill: true,
            depth_func: glow::LEQUAL,
            blend_equation: glow::FUNC_ADD,
        }
    }
}

/// Everything needed to build one guest layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Layer id, fixed at construction.
    pub id: String,
    /// 2D overlay or 3D layer.
    #[serde(default)]
    pub rendering_mode: RenderingMode,
    /// Layer-specific props, passed to the guest as they are.
    #[serde(default, flatten)]
    pub props: Map<String, Value>,
}

impl LayerDescriptor {
    /// A descriptor with no layer-specific props.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rendering_mode: RenderingMode::default(),
            props: Map::new(),
        }
    }
}

/// Constructor of guest layers: called with the descriptor and the layer's
/// position in the rebuilt list (`_offset`).
pub struct LayerType<L>(Rc<dyn Fn(&LayerDescriptor, usize) -> L>);

impl<L> LayerType<L> {
    /// Wrap a constructor.
    pub fn new(build: impl Fn(&LayerDescriptor, usize) -> L + 'static) -> Self {
        Self(Rc::new(build))
    }

    /// Build a layer at `offset`.
    pub fn build(&self, descriptor: &LayerDescriptor, offset: usize) -> L {
        (self.0)(descriptor, offset)
    }
}

impl<L> Clone for LayerType<L> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<L> fmt::Debug for LayerType<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LayerType")
    }
}
