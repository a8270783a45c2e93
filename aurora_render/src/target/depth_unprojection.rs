//! Depth unprojection - raw window-space depth to linear metric depth
//!
//! The renderer's perspective projection writes a non-linear depth value
//! `d` in [0, 1] into the depth attachment. Unprojection inverts that
//! mapping back to metric distance along the view axis. Host and device
//! transports both go through [`DepthUnprojectionParams::unproject`], a
//! single pure formula, so the two paths cannot drift apart numerically.

use glam::Mat4;

/// Coefficients of the depth unprojection, derived from the camera's
/// perspective projection
///
/// For a GL-convention projection the linear depth of a raw sample `d` is
/// `b / (d + a)`. Samples at the far plane (`d == 1`) unproject to `0.0`,
/// the "no hit" convention: a background pixel carries no distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthUnprojectionParams {
    /// Additive coefficient, `(m22 - 1) / 2` of the projection matrix
    pub a: f32,
    /// Scale coefficient, `m32 / 2` of the projection matrix
    pub b: f32,
}

impl DepthUnprojectionParams {
    /// Derive the coefficients from a perspective projection matrix
    ///
    /// The matrix must follow the GL depth convention (NDC z in [-1, 1]),
    /// e.g. `glam::Mat4::perspective_rh_gl`.
    pub fn from_projection(projection: &Mat4) -> Self {
        Self {
            a: (projection.z_axis.z - 1.0) * 0.5,
            b: projection.w_axis.z * 0.5,
        }
    }

    /// Derive the coefficients directly from the near and far plane
    /// distances of a perspective projection
    pub fn from_near_far(near: f32, far: f32) -> Self {
        Self {
            a: -far / (far - near),
            b: -far * near / (far - near),
        }
    }

    /// Convert one raw depth sample to linear metric depth
    ///
    /// This is the shared formula of both readback transports. Far-plane
    /// samples map to `0.0`.
    pub fn unproject(self, raw: f32) -> f32 {
        if raw >= 1.0 {
            0.0
        } else {
            self.b / (raw + self.a)
        }
    }

    /// Forward mapping: the raw depth sample a perspective projection
    /// produces for a point at metric depth `z`, with `z` in (near, far]
    ///
    /// Inverse of [`unproject`](Self::unproject); used by renderers that
    /// synthesize depth samples and by the round-trip tests.
    pub fn project(self, z: f32) -> f32 {
        self.b / z - self.a
    }
}

/// Unproject a slice of raw depth samples in place
///
/// Host-transport counterpart of
/// [`GraphicsContext::unproject_depth_on_device`](crate::context::GraphicsContext::unproject_depth_on_device).
pub fn unproject_depth(params: DepthUnprojectionParams, depth: &mut [f32]) {
    for d in depth.iter_mut() {
        *d = params.unproject(*d);
    }
}

#[cfg(test)]
#[path = "depth_unprojection_tests.rs"]
mod tests;
