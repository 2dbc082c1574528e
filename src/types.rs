//! Vertex data for the composite pass.

use bytemuck::{Pod, Zeroable};

/// A vertex of the full-screen composite geometry, in clip space.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Clip-space position.
    pub position: [f32; 2],
}

/// Two triangles covering the whole viewport.
pub const FULL_SCREEN_QUAD: [Vertex; 6] = [
    Vertex { position: [-1.0, -1.0] },
    Vertex { position: [1.0, -1.0] },
    Vertex { position: [-1.0, 1.0] },
    Vertex { position: [-1.0, 1.0] },
    Vertex { position: [1.0, -1.0] },
    Vertex { position: [1.0, 1.0] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space() {
        for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(FULL_SCREEN_QUAD.iter().any(|vertex| vertex.position == corner));
        }
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&FULL_SCREEN_QUAD).len(), 48);
    }
}
