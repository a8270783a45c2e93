//! Pixel formats for caller-supplied readback memory

/// Pixel format of a readback view or device buffer
///
/// Each framebuffer channel accepts a specific set of formats:
/// color is always `R8G8B8A8_UNORM`, depth is always `R32_SFLOAT`, and the
/// id channels accept any single-channel integer-interpretable format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PixelFormat {
    /// 4-channel 8-bit color
    R8G8B8A8_UNORM,
    /// Single-channel 32-bit float (metric depth)
    R32_SFLOAT,
    /// Single-channel 16-bit unsigned integer
    R16_UINT,
    /// Single-channel 32-bit unsigned integer
    R32_UINT,
    /// Single-channel 32-bit signed integer
    R32_SINT,
}

impl PixelFormat {
    /// Size of one pixel in bytes
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::R8G8B8A8_UNORM => 4,
            PixelFormat::R32_SFLOAT => 4,
            PixelFormat::R16_UINT => 2,
            PixelFormat::R32_UINT => 4,
            PixelFormat::R32_SINT => 4,
        }
    }

    /// True if this format is accepted by the color channel
    pub fn is_color(self) -> bool {
        matches!(self, PixelFormat::R8G8B8A8_UNORM)
    }

    /// True if this format is accepted by the depth channel
    pub fn is_depth(self) -> bool {
        matches!(self, PixelFormat::R32_SFLOAT)
    }

    /// True if this format is accepted by the object-id/triangle-id channels
    pub fn is_id(self) -> bool {
        matches!(
            self,
            PixelFormat::R16_UINT | PixelFormat::R32_UINT | PixelFormat::R32_SINT
        )
    }
}

#[cfg(test)]
#[path = "pixel_tests.rs"]
mod tests;
