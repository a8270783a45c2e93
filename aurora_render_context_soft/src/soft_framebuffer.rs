//! SoftFramebuffer - CPU-resident attachment planes

use aurora_render::aurora::context::{ClearValues, FramebufferDesc};

/// One offscreen framebuffer: a set of same-extent memory planes
///
/// The triangle-id plane exists only when requested at creation; the
/// linear-depth plane is the destination of the emulated device
/// unprojection routine and is rewritten on every invocation.
pub(crate) struct SoftFramebuffer {
    pub width: u32,
    pub height: u32,
    pub color: Vec<u8>,
    pub depth: Vec<f32>,
    pub linear_depth: Vec<f32>,
    pub object_id: Vec<u32>,
    pub triangle_id: Option<Vec<u32>>,
}

impl SoftFramebuffer {
    pub fn new(desc: &FramebufferDesc) -> Self {
        let pixels = desc.width as usize * desc.height as usize;
        Self {
            width: desc.width,
            height: desc.height,
            color: vec![0; pixels * 4],
            depth: vec![1.0; pixels],
            linear_depth: vec![0.0; pixels],
            object_id: vec![0; pixels],
            triangle_id: desc.with_triangle_id.then(|| vec![0; pixels]),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn clear(&mut self, values: &ClearValues) {
        for px in self.color.chunks_exact_mut(4) {
            px.copy_from_slice(&values.color);
        }
        self.depth.fill(values.depth);
        self.linear_depth.fill(0.0);
        self.object_id.fill(values.object_id);
        if let Some(ids) = &mut self.triangle_id {
            ids.fill(values.triangle_id);
        }
    }
}
