//! Adapter configuration.
//!
//! Options deserialize from the same camelCase shape integrators pass on the
//! JavaScript side, so they can live in a JSON settings file.

use serde::{Deserialize, Serialize};

use crate::shader::ShaderDefinition;

/// Default number of samples for the multisampled render target.
pub const DEFAULT_MSAA_SAMPLES: u8 = 4;

/// How the off-screen render target is antialiased before compositing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Antialiasing {
    /// Plain texture copy.
    #[default]
    None,
    /// Fast approximate antialiasing in the composite shader.
    Fxaa,
    /// Draw into a multisampled buffer and resolve it with a framebuffer blit.
    Msaa,
}

/// Whether a layer is drawn as a flat overlay or with depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderingMode {
    /// Flat overlay.
    #[serde(rename = "2d")]
    TwoD,
    /// Depth-tested 3D layer.
    #[default]
    #[serde(rename = "3d")]
    ThreeD,
}

/// Options for one guest-library instance bound to a host map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeckOptions {
    /// Antialiasing applied when compositing.
    pub antialiasing: Antialiasing,
    /// Sample count for [`Antialiasing::Msaa`].
    pub msaa_samples: u8,
    /// Ignore host add/remove notifications; the integrator manages the
    /// guest layer list itself.
    pub skip_map_add_remove_events: bool,
    /// The guest instance is owned by the integrator (for example a UI
    /// framework binding), so the adapter never rewrites its layer list.
    pub external: bool,
    /// `#define`s that override composite shader constants such as
    /// `FXAA_SPAN_MAX`.
    pub shader_definitions: Vec<ShaderDefinition>,
}

impl Default for DeckOptions {
    fn default() -> Self {
        Self {
            antialiasing: Antialiasing::None,
            msaa_samples: DEFAULT_MSAA_SAMPLES,
            skip_map_add_remove_events: false,
            external: false,
            shader_definitions: Vec::new(),
        }
    }
}
