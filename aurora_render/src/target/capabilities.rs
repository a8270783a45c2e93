//! Capability set for the channel x transport matrix
//!
//! Which readback combinations a render target supports is resolved once,
//! from the compile-time feature flags and the routines supplied at
//! construction, never discovered by failure at call time.

bitflags::bitflags! {
    /// Supported readback operations of a render target
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// `read_frame_rgba`
        const COLOR_HOST = 1 << 0;
        /// `read_frame_depth`
        const DEPTH_HOST = 1 << 1;
        /// `read_frame_object_id`
        const OBJECT_ID_HOST = 1 << 2;
        /// `read_frame_triangle_id` (triangle-sensor feature)
        const TRIANGLE_ID_HOST = 1 << 3;
        /// `read_frame_rgba_gpu` (gpu-interop feature)
        const COLOR_DEVICE = 1 << 4;
        /// `read_frame_depth_gpu` (gpu-interop feature + device routine)
        const DEPTH_DEVICE = 1 << 5;
        /// `read_frame_object_id_gpu` (gpu-interop feature)
        const OBJECT_ID_DEVICE = 1 << 6;
        /// `read_frame_triangle_id_gpu` (both features)
        const TRIANGLE_ID_DEVICE = 1 << 7;
    }
}
