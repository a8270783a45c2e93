//! Fragment - the per-pixel payload of a software draw call

/// Everything one draw call writes into a pixel it covers
///
/// The raw depth must already be in window space (what a perspective
/// projection produces, in [0, 1]); use
/// `DepthUnprojectionParams::project` to derive it from a metric distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// RGBA color written to the color plane
    pub color: [u8; 4],
    /// Raw window-space depth, compared against the depth plane
    pub depth: f32,
    /// Identifier written to the object-id plane
    pub object_id: u32,
    /// Identifier written to the triangle-id plane, when present
    pub triangle_id: u32,
}

impl Default for Fragment {
    fn default() -> Self {
        Self {
            color: [255, 255, 255, 255],
            depth: 0.5,
            object_id: 1,
            triangle_id: 1,
        }
    }
}
