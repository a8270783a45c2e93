//! ImageViewMut2D - caller-owned 2D memory view for host readback
//!
//! A readback operation fully populates the view or does not complete;
//! there is no partial-fill outcome. The view borrows the caller's memory,
//! so the caller keeps ownership and allocation strategy.

use crate::error::Result;
use crate::context::PixelFormat;
use crate::gfx_bail;

/// Mutable 2D view over caller-owned pixel memory
///
/// The view's extent and pixel format are validated against the target
/// framebuffer by the readback operations; the byte length is validated
/// here at construction.
pub struct ImageViewMut2D<'a> {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: &'a mut [u8],
}

impl<'a> ImageViewMut2D<'a> {
    /// Create a view over raw bytes
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `format` - Pixel format of the memory
    /// * `data` - Caller-owned memory of exactly `width * height *
    ///   bytes_per_pixel` bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the byte length does not match the extent.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: &'a mut [u8]) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            gfx_bail!("aurora::ImageViewMut2D",
                "view memory is {} bytes, extent {}x{} with format {:?} needs {}",
                data.len(), width, height, format, expected);
        }
        Ok(Self { width, height, format, data })
    }

    /// Create an `R32_SFLOAT` view over an f32 slice
    pub fn from_f32(width: u32, height: u32, data: &'a mut [f32]) -> Result<Self> {
        Self::new(width, height, PixelFormat::R32_SFLOAT, bytemuck::cast_slice_mut(data))
    }

    /// Create an `R32_UINT` view over a u32 slice
    pub fn from_u32(width: u32, height: u32, data: &'a mut [u32]) -> Result<Self> {
        Self::new(width, height, PixelFormat::R32_UINT, bytemuck::cast_slice_mut(data))
    }

    /// Create an `R16_UINT` view over a u16 slice
    pub fn from_u16(width: u32, height: u32, data: &'a mut [u16]) -> Result<Self> {
        Self::new(width, height, PixelFormat::R16_UINT, bytemuck::cast_slice_mut(data))
    }

    /// Create an `R8G8B8A8_UNORM` view over raw bytes
    pub fn from_rgba8(width: u32, height: u32, data: &'a mut [u8]) -> Result<Self> {
        Self::new(width, height, PixelFormat::R8G8B8A8_UNORM, data)
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Extent as (width, height)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel format of the underlying memory
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Read access to the underlying bytes
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Write access to the underlying bytes
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

#[cfg(test)]
#[path = "image_view_tests.rs"]
mod tests;
