//! Draws layers of a [deck.gl]-style visualization library inside a host map
//! that owns the OpenGL/WebGL context, using [glow].
//!
//! The host map drives the frame loop and calls each custom layer once per
//! frame. Every [`DeckLayer`] asks the guest library to draw just that layer
//! into a render target shared by all layers of the map, then composites the
//! target onto the host's framebuffer with a full-screen pass. Host GL state
//! is saved before the guest draws and restored before the host continues.
//!
//! # Features
//!
//! - **One guest instance per GL context**, looked up through a
//!   [`DeckRegistry`] keyed by context identity.
//! - **Antialiasing**: none, FXAA in the composite pass, or MSAA with a blit
//!   resolve. MSAA falls back to none without WebGL2-class contexts.
//! - **Camera translation**: the host's center, zoom, rotation, pitch and
//!   padding become the guest's view state and viewport.
//! - **GPU building blocks** ([`buffer`], [`texture`], [`program`], [`vao`],
//!   [`render_target`]) that adapt to the context's capabilities.
//!
//! # Safety
//!
//! Methods issuing GL calls are `unsafe`: the context they are called with
//! must be current and must be the context the resources were created on.
//!
//! [deck.gl]: https://deck.gl
//! [glow]: https://docs.rs/glow

pub mod buffer;
pub mod compositor;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod gl;
pub mod guest;
pub mod host;
pub mod layer;
pub mod program;
pub mod render_target;
pub mod shader;
pub mod shaders;
pub mod state;
pub mod texture;
mod types;
pub mod vao;
pub mod viewport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Antialiasing, DeckOptions, RenderingMode};
pub use context::{DeckContext, DeckHandle, DeckRegistry};
pub use error::{Error, Result};
pub use gl::{Capabilities, Gl};
pub use guest::{DeckProps, DrawOptions, GuestDeck, LayerDescriptor, LayerType};
pub use host::{HostEvent, HostMap};
pub use layer::{CustomLayer, DeckLayer, LayerOptions};
pub use viewport::{view_state, viewport, ViewState, Viewport};
