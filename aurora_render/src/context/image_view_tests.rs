//! Unit tests for ImageViewMut2D

use super::*;
use crate::error::Error;

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_new_accepts_exact_length() {
    let mut data = vec![0u8; 8 * 4 * 4];
    let view = ImageViewMut2D::new(8, 4, PixelFormat::R8G8B8A8_UNORM, &mut data).unwrap();
    assert_eq!(view.size(), (8, 4));
    assert_eq!(view.format(), PixelFormat::R8G8B8A8_UNORM);
}

#[test]
fn test_new_rejects_short_memory() {
    let mut data = vec![0u8; 8 * 4 * 4 - 1];
    let result = ImageViewMut2D::new(8, 4, PixelFormat::R8G8B8A8_UNORM, &mut data);
    assert!(matches!(result, Err(Error::BackendError(_))));
}

#[test]
fn test_new_rejects_long_memory() {
    let mut data = vec![0u8; 8 * 4 * 4 + 4];
    let result = ImageViewMut2D::new(8, 4, PixelFormat::R8G8B8A8_UNORM, &mut data);
    assert!(result.is_err());
}

#[test]
fn test_new_accounts_for_pixel_size() {
    // R16_UINT pixels are 2 bytes, so the same extent needs half the memory.
    let mut data = vec![0u8; 8 * 4 * 2];
    assert!(ImageViewMut2D::new(8, 4, PixelFormat::R16_UINT, &mut data).is_ok());

    let mut data = vec![0u8; 8 * 4 * 4];
    assert!(ImageViewMut2D::new(8, 4, PixelFormat::R16_UINT, &mut data).is_err());
}

// ============================================================================
// Typed Constructor Tests
// ============================================================================

#[test]
fn test_from_f32_sets_depth_format() {
    let mut data = vec![0.0f32; 6];
    let view = ImageViewMut2D::from_f32(3, 2, &mut data).unwrap();
    assert_eq!(view.format(), PixelFormat::R32_SFLOAT);
    assert_eq!(view.data().len(), 24);
}

#[test]
fn test_from_u32_sets_id_format() {
    let mut data = vec![0u32; 6];
    let view = ImageViewMut2D::from_u32(3, 2, &mut data).unwrap();
    assert_eq!(view.format(), PixelFormat::R32_UINT);
}

#[test]
fn test_from_u16_sets_narrow_id_format() {
    let mut data = vec![0u16; 6];
    let view = ImageViewMut2D::from_u16(3, 2, &mut data).unwrap();
    assert_eq!(view.format(), PixelFormat::R16_UINT);
    assert_eq!(view.data().len(), 12);
}

#[test]
fn test_from_rgba8_rejects_extent_mismatch() {
    let mut data = vec![0u8; 3 * 2 * 4];
    assert!(ImageViewMut2D::from_rgba8(3, 3, &mut data).is_err());
}

// ============================================================================
// Access Tests
// ============================================================================

#[test]
fn test_writes_through_view_reach_caller_memory() {
    let mut data = vec![0.0f32; 4];
    {
        let mut view = ImageViewMut2D::from_f32(2, 2, &mut data).unwrap();
        let bytes = view.data_mut();
        bytes[0..4].copy_from_slice(&7.5f32.to_ne_bytes());
    }
    assert_eq!(data[0], 7.5);
}
