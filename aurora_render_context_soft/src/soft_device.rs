//! SoftDeviceBuffer - emulated device-resident memory

use aurora_render::aurora::context::DeviceBuffer;

/// Caller-owned buffer in the emulated device memory space
///
/// Stands in for a CUDA/Vulkan device allocation: the context refuses to
/// copy into it unless the device ids match, and the contents are only
/// inspectable through the accessors here, never through a host readback
/// view.
pub struct SoftDeviceBuffer {
    device: u32,
    data: Vec<u8>,
}

impl SoftDeviceBuffer {
    /// Allocate a zeroed buffer of `len` bytes on device `device`
    pub fn new(device: u32, len: usize) -> Self {
        Self { device, data: vec![0; len] }
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Contents reinterpreted as f32 samples
    pub fn to_f32_vec(&self) -> Vec<f32> {
        bytemuck::pod_collect_to_vec(&self.data)
    }

    /// Contents reinterpreted as u32 samples
    pub fn to_u32_vec(&self) -> Vec<u32> {
        bytemuck::pod_collect_to_vec(&self.data)
    }
}

impl DeviceBuffer for SoftDeviceBuffer {
    fn device_id(&self) -> u32 {
        self.device
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
