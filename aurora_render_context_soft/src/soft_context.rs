//! SoftContext - CPU implementation of the graphics context seam

use std::rc::Rc;

use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use aurora_render::aurora::context::{
    Attachment, Binding, ClearValues, DepthUnprojectionRoutine, DeviceBuffer, FramebufferDesc,
    FramebufferId, GraphicsContext, ImageViewMut2D, PixelFormat, TriangleIdRoutine,
};
use aurora_render::aurora::target::{unproject_depth, DepthUnprojectionParams};
use aurora_render::aurora::{Error, Result};
use aurora_render::{gfx_bail, render_debug, render_error, render_trace};

use crate::fragment::Fragment;
use crate::soft_device::SoftDeviceBuffer;
use crate::soft_framebuffer::SoftFramebuffer;

const SOURCE: &str = "aurora::SoftContext";

/// The display-system stand-in of a windowed context
struct DefaultPlane {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Headless software graphics context
///
/// Framebuffer attachments are plain memory planes and the "device" is an
/// emulated second memory space, so the full readback surface (host and
/// device transports, both depth paths) runs deterministically on any
/// machine.
///
/// External draw calls are emulated by [`draw_rect`](Self::draw_rect),
/// which writes one [`Fragment`] across a rectangle of the bound
/// framebuffer with a less-or-equal depth test.
pub struct SoftContext {
    framebuffers: SlotMap<FramebufferId, SoftFramebuffer>,
    binding: Binding,
    default_plane: Option<DefaultPlane>,
    device: u32,
    /// Attachments already registered for device access; registration is
    /// lazy and logged once per (framebuffer, attachment) pair
    registered: FxHashSet<(FramebufferId, Attachment)>,
}

impl SoftContext {
    /// Create a context without a default framebuffer
    ///
    /// Blits to the default framebuffer become defined no-ops.
    pub fn new_headless() -> Self {
        Self {
            framebuffers: SlotMap::with_key(),
            binding: Binding::Default,
            default_plane: None,
            device: 0,
            registered: FxHashSet::default(),
        }
    }

    /// Create a context with a default (display) framebuffer of the given
    /// extent
    pub fn new_windowed(width: u32, height: u32) -> Self {
        let mut ctx = Self::new_headless();
        ctx.default_plane = Some(DefaultPlane {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        });
        ctx
    }

    /// Place the context on a different emulated device
    pub fn with_device_id(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    /// Handle to the emulated device-resident depth unprojection routine
    pub fn depth_unprojection_routine() -> Rc<dyn DepthUnprojectionRoutine> {
        Rc::new(SoftDepthRoutine)
    }

    /// Handle to the emulated device-resident triangle-id routine
    pub fn triangle_id_routine() -> Rc<dyn TriangleIdRoutine> {
        Rc::new(SoftTriangleRoutine)
    }

    /// Contents of the default framebuffer, if the context has one
    pub fn default_rgba(&self) -> Option<&[u8]> {
        self.default_plane.as_ref().map(|p| p.rgba.as_slice())
    }

    /// Extent of the default framebuffer, if the context has one
    pub fn default_size(&self) -> Option<(u32, u32)> {
        self.default_plane.as_ref().map(|p| (p.width, p.height))
    }

    /// Emulated draw call: write `fragment` across a rectangle of the
    /// currently bound offscreen framebuffer
    ///
    /// Pixels fail the less-or-equal depth test individually; the
    /// rectangle is clipped to the framebuffer extent.
    ///
    /// # Panics
    ///
    /// Panics if no offscreen framebuffer is bound.
    pub fn draw_rect(&mut self, x: u32, y: u32, width: u32, height: u32, fragment: &Fragment) {
        let id = match self.binding {
            Binding::Framebuffer(id) => id,
            Binding::Default => panic!("draw_rect requires an offscreen framebuffer binding"),
        };
        let fb = &mut self.framebuffers[id];

        let x_end = x.saturating_add(width).min(fb.width);
        let y_end = y.saturating_add(height).min(fb.height);
        for py in y.min(fb.height)..y_end {
            for px in x.min(fb.width)..x_end {
                let i = (py * fb.width + px) as usize;
                if fragment.depth <= fb.depth[i] {
                    fb.color[i * 4..i * 4 + 4].copy_from_slice(&fragment.color);
                    fb.depth[i] = fragment.depth;
                    fb.object_id[i] = fragment.object_id;
                    if let Some(ids) = &mut fb.triangle_id {
                        ids[i] = fragment.triangle_id;
                    }
                }
            }
        }
    }

    fn framebuffer(&self, id: FramebufferId) -> Result<&SoftFramebuffer> {
        match self.framebuffers.get(id) {
            Some(fb) => Ok(fb),
            None => {
                render_error!(SOURCE, "unknown framebuffer handle");
                Err(Error::InvalidResource("unknown framebuffer handle".to_string()))
            }
        }
    }

    fn framebuffer_mut(&mut self, id: FramebufferId) -> Result<&mut SoftFramebuffer> {
        match self.framebuffers.get_mut(id) {
            Some(fb) => Ok(fb),
            None => {
                render_error!(SOURCE, "unknown framebuffer handle");
                Err(Error::InvalidResource("unknown framebuffer handle".to_string()))
            }
        }
    }
}

impl GraphicsContext for SoftContext {
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferId> {
        if desc.width == 0 || desc.height == 0 {
            gfx_bail!(SOURCE, "cannot allocate a {}x{} framebuffer", desc.width, desc.height);
        }
        let id = self.framebuffers.insert(SoftFramebuffer::new(desc));
        render_debug!(SOURCE, "allocated {}x{} framebuffer (triangle-id plane: {})",
            desc.width, desc.height, desc.with_triangle_id);
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) {
        if self.framebuffers.remove(id).is_none() {
            return;
        }
        self.registered.retain(|(fid, _)| *fid != id);
        if self.binding == Binding::Framebuffer(id) {
            self.binding = Binding::Default;
        }
        render_debug!(SOURCE, "released framebuffer");
    }

    fn current_binding(&self) -> Binding {
        self.binding
    }

    fn bind(&mut self, binding: Binding) {
        render_trace!(SOURCE, "binding {:?}", binding);
        self.binding = binding;
    }

    fn clear(&mut self, id: FramebufferId, values: &ClearValues) -> Result<()> {
        self.framebuffer_mut(id)?.clear(values);
        Ok(())
    }

    fn read_attachment(
        &mut self,
        id: FramebufferId,
        attachment: Attachment,
        view: &mut ImageViewMut2D<'_>,
    ) -> Result<()> {
        let fb = self.framebuffer(id)?;
        if view.size() != (fb.width, fb.height) {
            gfx_bail!(SOURCE, "view extent {}x{} does not match framebuffer extent {}x{}",
                view.width(), view.height(), fb.width, fb.height);
        }

        match (attachment, view.format()) {
            (Attachment::Color, PixelFormat::R8G8B8A8_UNORM) => {
                view.data_mut().copy_from_slice(&fb.color);
            }
            (Attachment::Depth, PixelFormat::R32_SFLOAT) => {
                write_f32_plane(&fb.depth, view.data_mut());
            }
            (Attachment::LinearDepth, PixelFormat::R32_SFLOAT) => {
                write_f32_plane(&fb.linear_depth, view.data_mut());
            }
            (Attachment::ObjectId, format) => {
                write_id_plane(&fb.object_id, format, view.data_mut())?;
            }
            (Attachment::TriangleId, format) => {
                let Some(ids) = &fb.triangle_id else {
                    gfx_bail!(SOURCE, "framebuffer has no triangle-id plane");
                };
                write_id_plane(ids, format, view.data_mut())?;
            }
            (attachment, format) => {
                gfx_bail!(SOURCE, "attachment {:?} cannot be read as {:?}", attachment, format);
            }
        }
        Ok(())
    }

    fn unproject_depth_on_device(
        &mut self,
        id: FramebufferId,
        params: DepthUnprojectionParams,
    ) -> Result<()> {
        render_trace!(SOURCE, "running depth unprojection routine");
        let fb = self.framebuffer_mut(id)?;
        fb.linear_depth.copy_from_slice(&fb.depth);
        unproject_depth(params, &mut fb.linear_depth);
        Ok(())
    }

    fn blit_to_default(&mut self, id: FramebufferId) -> Result<()> {
        let Some(fb) = self.framebuffers.get(id) else {
            render_error!(SOURCE, "unknown framebuffer handle");
            return Err(Error::InvalidResource("unknown framebuffer handle".to_string()));
        };
        let Some(plane) = &mut self.default_plane else {
            // Headless: nothing to present to.
            render_trace!(SOURCE, "blit skipped, no default framebuffer");
            return Ok(());
        };

        // Overlapping top-left region, row by row.
        let copy_w = fb.width.min(plane.width) as usize * 4;
        let copy_h = fb.height.min(plane.height);
        for row in 0..copy_h {
            let src = row as usize * fb.width as usize * 4;
            let dst = row as usize * plane.width as usize * 4;
            plane.rgba[dst..dst + copy_w].copy_from_slice(&fb.color[src..src + copy_w]);
        }
        Ok(())
    }

    fn device_id(&self) -> u32 {
        self.device
    }

    fn copy_attachment_to_device(
        &mut self,
        id: FramebufferId,
        attachment: Attachment,
        dst: &mut dyn DeviceBuffer,
    ) -> Result<()> {
        let Some(buffer) = dst.as_any_mut().downcast_mut::<SoftDeviceBuffer>() else {
            gfx_bail!(SOURCE, "foreign device buffer type");
        };
        if buffer.device_id() != self.device {
            gfx_bail!(SOURCE, "buffer on device {} cannot receive a copy from device {}",
                buffer.device_id(), self.device);
        }

        let Some(fb) = self.framebuffers.get(id) else {
            render_error!(SOURCE, "unknown framebuffer handle");
            return Err(Error::InvalidResource("unknown framebuffer handle".to_string()));
        };

        if self.registered.insert((id, attachment)) {
            render_debug!(SOURCE, "registered attachment {:?} for device access", attachment);
        }

        let expected = match attachment {
            Attachment::Color => fb.pixel_count() * 4,
            Attachment::Depth | Attachment::LinearDepth => fb.pixel_count() * 4,
            Attachment::ObjectId | Attachment::TriangleId => fb.pixel_count() * 4,
        };
        if buffer.len() != expected {
            gfx_bail!(SOURCE, "device buffer is {} bytes, attachment {:?} needs {}",
                buffer.len(), attachment, expected);
        }

        match attachment {
            Attachment::Color => buffer.data_mut().copy_from_slice(&fb.color),
            Attachment::Depth => write_f32_plane(&fb.depth, buffer.data_mut()),
            Attachment::LinearDepth => write_f32_plane(&fb.linear_depth, buffer.data_mut()),
            Attachment::ObjectId => write_u32_plane(&fb.object_id, buffer.data_mut()),
            Attachment::TriangleId => {
                let Some(ids) = &fb.triangle_id else {
                    gfx_bail!(SOURCE, "framebuffer has no triangle-id plane");
                };
                write_u32_plane(ids, buffer.data_mut());
            }
        }
        Ok(())
    }
}

// ===== PLANE SERIALIZATION =====

// Destinations may be arbitrary caller byte slices, so samples go out
// through to_ne_bytes instead of a typed cast.
fn write_f32_plane(plane: &[f32], out: &mut [u8]) {
    for (px, sample) in out.chunks_exact_mut(4).zip(plane) {
        px.copy_from_slice(&sample.to_ne_bytes());
    }
}

fn write_u32_plane(plane: &[u32], out: &mut [u8]) {
    for (px, sample) in out.chunks_exact_mut(4).zip(plane) {
        px.copy_from_slice(&sample.to_ne_bytes());
    }
}

fn write_id_plane(plane: &[u32], format: PixelFormat, out: &mut [u8]) -> Result<()> {
    match format {
        PixelFormat::R32_UINT | PixelFormat::R32_SINT => {
            write_u32_plane(plane, out);
        }
        PixelFormat::R16_UINT => {
            for (px, sample) in out.chunks_exact_mut(2).zip(plane) {
                px.copy_from_slice(&(*sample as u16).to_ne_bytes());
            }
        }
        format => {
            gfx_bail!(SOURCE, "id plane cannot be read as {:?}", format);
        }
    }
    Ok(())
}

// ===== ROUTINES =====

struct SoftDepthRoutine;

impl DepthUnprojectionRoutine for SoftDepthRoutine {
    fn name(&self) -> &str {
        "soft_depth_unprojection"
    }
}

struct SoftTriangleRoutine;

impl TriangleIdRoutine for SoftTriangleRoutine {
    fn name(&self) -> &str {
        "soft_triangle_id"
    }
}

#[cfg(test)]
#[path = "soft_context_tests.rs"]
mod tests;
