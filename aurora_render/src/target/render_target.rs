//! RenderTarget - offscreen framebuffer plus per-frame result extraction
//!
//! Holds a framebuffer and encapsulates the logic of retrieving rendering
//! results of various types (RGBA, depth, object-id, triangle-id) from it,
//! into either host memory or, when built with the `gpu-interop` feature,
//! caller-owned device memory.
//!
//! Caller mistakes are precondition violations and fail fast with a panic:
//! a wrong view extent or pixel format, a readback outside the readable
//! window, re-entering the render bracket, requesting device depth readback
//! without a device unprojection routine, or a device buffer on a different
//! device than the context. None of these are recoverable runtime errors;
//! they are bugs in the calling layer.

use std::rc::Rc;

use crate::error::Result;
use crate::context::{
    Attachment, Binding, ClearValues, DepthUnprojectionRoutine, FramebufferDesc, FramebufferId,
    ImageViewMut2D, SharedContext, TriangleIdRoutine,
};
#[cfg(feature = "gpu-interop")]
use crate::context::DeviceBuffer;
use crate::target::{Capabilities, DepthUnprojectionParams};
use crate::{render_debug, render_trace};

const SOURCE: &str = "aurora::RenderTarget";

/// Render bracket state machine
///
/// Readback is valid only in `Readable`; draw calls are valid only in
/// `Rendering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetState {
    /// Constructed, no frame rendered yet
    Idle,
    /// Inside a render bracket (between enter and exit)
    Rendering,
    /// A frame has been rendered and can be read back
    Readable,
}

/// Offscreen render target
///
/// Constructed once per viewport/sensor with an immutable extent; the
/// framebuffer and its attachments live exactly as long as the target.
/// The internal framebuffer objects are never exposed; all access goes
/// through the bracket and readback operations.
///
/// # Example
///
/// ```no_run
/// # use std::rc::Rc;
/// # use aurora_render::aurora::context::SharedContext;
/// # use aurora_render::aurora::target::{RenderTarget, DepthUnprojectionParams};
/// # fn context() -> SharedContext { unimplemented!() }
/// let ctx = context();
/// let params = DepthUnprojectionParams::from_near_far(0.1, 100.0);
/// let mut target = RenderTarget::new(ctx, (640, 480), params, None, None)?;
///
/// target.render_enter()?;
/// // ... external renderer issues draw calls ...
/// target.render_exit();
///
/// let mut rgba = vec![0u8; 640 * 480 * 4];
/// let mut view = aurora_render::aurora::context::ImageViewMut2D::from_rgba8(640, 480, &mut rgba)?;
/// target.read_frame_rgba(&mut view)?;
/// # Ok::<(), aurora_render::aurora::Error>(())
/// ```
pub struct RenderTarget {
    inner: Inner,
}

/// Private implementation, reachable only through the public operations
struct Inner {
    ctx: SharedContext,
    framebuffer: FramebufferId,
    size: (u32, u32),
    params: DepthUnprojectionParams,
    depth_routine: Option<Rc<dyn DepthUnprojectionRoutine>>,
    // Held to keep the device routine alive for the target's lifetime.
    #[allow(dead_code)]
    triangle_routine: Option<Rc<dyn TriangleIdRoutine>>,
    state: TargetState,
    saved_binding: Option<Binding>,
}

impl RenderTarget {
    /// Create a render target
    ///
    /// # Arguments
    ///
    /// * `ctx` - Graphics context the framebuffer lives on
    /// * `size` - Framebuffer extent in pixels as (width, height), both >= 1
    /// * `params` - Depth unprojection coefficients, see
    ///   [`DepthUnprojectionParams`]
    /// * `depth_routine` - Device-side depth unprojection program. Depth is
    ///   unprojected on the host if `None`. Must be `Some` to use
    ///   `read_frame_depth_gpu`.
    /// * `triangle_routine` - Device-side triangle-id program; only its
    ///   presence is observed
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or the backend cannot
    /// complete the framebuffer.
    pub fn new(
        ctx: SharedContext,
        size: (u32, u32),
        params: DepthUnprojectionParams,
        depth_routine: Option<Rc<dyn DepthUnprojectionRoutine>>,
        triangle_routine: Option<Rc<dyn TriangleIdRoutine>>,
    ) -> Result<Self> {
        let (width, height) = size;
        if width == 0 || height == 0 {
            crate::render_error!(SOURCE, "framebuffer extent must be at least 1x1, got {}x{}",
                width, height);
            return Err(crate::error::Error::InitializationFailed(format!(
                "framebuffer extent must be at least 1x1, got {}x{}",
                width, height
            )));
        }

        let desc = FramebufferDesc {
            width,
            height,
            with_triangle_id: cfg!(feature = "triangle-sensor"),
        };
        let framebuffer = ctx.borrow_mut().create_framebuffer(&desc)?;

        render_debug!(SOURCE,
            "created {}x{} render target (depth routine: {}, triangle routine: {})",
            width, height,
            depth_routine.as_ref().map_or("none", |r| r.name()),
            triangle_routine.as_ref().map_or("none", |r| r.name()));

        Ok(Self {
            inner: Inner {
                ctx,
                framebuffer,
                size,
                params,
                depth_routine,
                triangle_routine,
                state: TargetState::Idle,
                saved_binding: None,
            },
        })
    }

    /// Enter the render bracket
    ///
    /// Saves the currently bound framebuffer, binds this target's
    /// framebuffer and clears every attachment: color to opaque black,
    /// depth to the far sentinel, the id planes to the background sentinel.
    /// All draw calls targeting this frame must happen before the matching
    /// [`render_exit`](Self::render_exit).
    ///
    /// # Panics
    ///
    /// Panics if called again before the matching `render_exit`.
    pub fn render_enter(&mut self) -> Result<()> {
        self.inner.render_enter()
    }

    /// Exit the render bracket
    ///
    /// Restores the framebuffer binding captured by
    /// [`render_enter`](Self::render_enter), making the frame's results
    /// available to the readback operations.
    ///
    /// # Panics
    ///
    /// Panics if the target is not inside a render bracket.
    pub fn render_exit(&mut self) {
        self.inner.render_exit()
    }

    /// The immutable framebuffer extent as (width, height)
    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.inner.size
    }

    /// The readback combinations this target supports, resolved at build
    /// and construction time
    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    /// Retrieve the RGBA rendering results
    ///
    /// # Arguments
    ///
    /// * `view` - Preallocated memory that will be fully populated with the
    ///   result; must be `R8G8B8A8_UNORM` at the framebuffer extent
    ///
    /// # Panics
    ///
    /// Panics on extent or format mismatch, or if no frame is readable.
    pub fn read_frame_rgba(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.inner.read_frame_rgba(view)
    }

    /// Retrieve the metric depth rendering results
    ///
    /// The view must be `R32_SFLOAT` at the framebuffer extent. Without a
    /// device unprojection routine the raw depth is unprojected on the
    /// host; with one, unprojection runs on the device before the copy.
    /// Both configurations produce the same values. Background pixels (far
    /// plane) read as `0.0`.
    ///
    /// # Panics
    ///
    /// Panics on extent or format mismatch, or if no frame is readable.
    pub fn read_frame_depth(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.inner.read_frame_depth(view)
    }

    /// Retrieve the object-id rendering results
    ///
    /// The view must be a single-channel integer format (`R16_UINT`,
    /// `R32_UINT` or `R32_SINT`) at the framebuffer extent. Background
    /// pixels carry the sentinel `0`.
    ///
    /// # Panics
    ///
    /// Panics on extent or format mismatch, or if no frame is readable.
    pub fn read_frame_object_id(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.inner.read_frame_object_id(view)
    }

    /// Retrieve the triangle-id rendering results
    ///
    /// Same memory contract as
    /// [`read_frame_object_id`](Self::read_frame_object_id).
    #[cfg(feature = "triangle-sensor")]
    pub fn read_frame_triangle_id(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.inner.read_frame_triangle_id(view)
    }

    /// Copy the color attachment into the display system's default
    /// framebuffer
    ///
    /// A defined no-op in headless configurations, where the external
    /// display collaborator exposes no default framebuffer.
    ///
    /// # Panics
    ///
    /// Panics if no frame is readable.
    pub fn blit_rgba_to_default(&mut self) -> Result<()> {
        self.inner.blit_rgba_to_default()
    }

    /// Read the RGBA rendering result directly into device memory
    ///
    /// # Arguments
    ///
    /// * `dst` - Caller-owned buffer of exactly `width * height * 4` bytes,
    ///   resident on the same device as the context
    ///
    /// # Panics
    ///
    /// Panics on a size or device mismatch, or if no frame is readable.
    #[cfg(feature = "gpu-interop")]
    pub fn read_frame_rgba_gpu(&mut self, dst: &mut dyn DeviceBuffer) -> Result<()> {
        self.inner.read_frame_gpu(Attachment::Color, 4, dst)
    }

    /// Read the metric depth rendering result directly into device memory
    ///
    /// Requires the target to have been constructed with a device
    /// unprojection routine; the host fallback cannot populate a device
    /// buffer. The buffer holds `width * height` f32 values.
    ///
    /// # Panics
    ///
    /// Panics if no device routine is configured, on a size or device
    /// mismatch, or if no frame is readable.
    #[cfg(feature = "gpu-interop")]
    pub fn read_frame_depth_gpu(&mut self, dst: &mut dyn DeviceBuffer) -> Result<()> {
        self.inner.read_frame_depth_gpu(dst)
    }

    /// Read the object-id rendering result directly into device memory
    ///
    /// The buffer holds `width * height` 32-bit integers.
    ///
    /// # Panics
    ///
    /// Panics on a size or device mismatch, or if no frame is readable.
    #[cfg(feature = "gpu-interop")]
    pub fn read_frame_object_id_gpu(&mut self, dst: &mut dyn DeviceBuffer) -> Result<()> {
        self.inner.read_frame_gpu(Attachment::ObjectId, 4, dst)
    }

    /// Read the triangle-id rendering result directly into device memory
    ///
    /// The buffer holds `width * height` 32-bit integers.
    ///
    /// # Panics
    ///
    /// Panics on a size or device mismatch, or if no frame is readable.
    #[cfg(all(feature = "gpu-interop", feature = "triangle-sensor"))]
    pub fn read_frame_triangle_id_gpu(&mut self, dst: &mut dyn DeviceBuffer) -> Result<()> {
        self.inner.read_frame_gpu(Attachment::TriangleId, 4, dst)
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        render_debug!(SOURCE, "destroying {}x{} render target",
            self.inner.size.0, self.inner.size.1);
        self.inner.ctx.borrow_mut().destroy_framebuffer(self.inner.framebuffer);
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl Inner {
    fn render_enter(&mut self) -> Result<()> {
        assert!(
            self.state != TargetState::Rendering,
            "render_enter called while already inside a render bracket"
        );
        render_trace!(SOURCE, "entering render bracket");

        let mut ctx = self.ctx.borrow_mut();
        let saved = ctx.current_binding();
        ctx.bind(Binding::Framebuffer(self.framebuffer));
        if let Err(err) = ctx.clear(self.framebuffer, &ClearValues::default()) {
            // Leave the context exactly as we found it; the bracket never
            // opened.
            ctx.bind(saved);
            return Err(err);
        }
        self.saved_binding = Some(saved);
        self.state = TargetState::Rendering;
        Ok(())
    }

    fn render_exit(&mut self) {
        assert!(
            self.state == TargetState::Rendering,
            "render_exit called outside a render bracket"
        );
        render_trace!(SOURCE, "exiting render bracket");

        // saved_binding was set by the matching render_enter
        let saved = self.saved_binding.take().unwrap_or(Binding::Default);
        self.ctx.borrow_mut().bind(saved);
        self.state = TargetState::Readable;
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::COLOR_HOST
            | Capabilities::DEPTH_HOST
            | Capabilities::OBJECT_ID_HOST;
        if cfg!(feature = "triangle-sensor") {
            caps |= Capabilities::TRIANGLE_ID_HOST;
        }
        if cfg!(feature = "gpu-interop") {
            caps |= Capabilities::COLOR_DEVICE | Capabilities::OBJECT_ID_DEVICE;
            if self.depth_routine.is_some() {
                caps |= Capabilities::DEPTH_DEVICE;
            }
            if cfg!(feature = "triangle-sensor") {
                caps |= Capabilities::TRIANGLE_ID_DEVICE;
            }
        }
        caps
    }

    // ===== PRECONDITIONS =====

    fn require_readable(&self, op: &str) {
        assert!(
            self.state == TargetState::Readable,
            "{} requires a rendered frame (call render_enter/render_exit first)",
            op
        );
    }

    fn require_extent(&self, view: &ImageViewMut2D<'_>, op: &str) {
        assert!(
            view.size() == self.size,
            "{}: view extent {}x{} does not match framebuffer extent {}x{}",
            op, view.width(), view.height(), self.size.0, self.size.1
        );
    }

    // ===== HOST TRANSPORT =====

    fn read_frame_rgba(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.require_readable("read_frame_rgba");
        self.require_extent(view, "read_frame_rgba");
        assert!(
            view.format().is_color(),
            "read_frame_rgba: unsupported pixel format {:?}",
            view.format()
        );
        self.ctx.borrow_mut().read_attachment(self.framebuffer, Attachment::Color, view)
    }

    fn read_frame_depth(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.require_readable("read_frame_depth");
        self.require_extent(view, "read_frame_depth");
        assert!(
            view.format().is_depth(),
            "read_frame_depth: unsupported pixel format {:?} (expected R32_SFLOAT)",
            view.format()
        );

        let mut ctx = self.ctx.borrow_mut();
        match &self.depth_routine {
            Some(_) => {
                // Unproject on the device, then copy the linear plane out.
                ctx.unproject_depth_on_device(self.framebuffer, self.params)?;
                ctx.read_attachment(self.framebuffer, Attachment::LinearDepth, view)
            }
            None => {
                // Copy the raw plane out, then unproject on the host with
                // the same formula the device routine applies.
                ctx.read_attachment(self.framebuffer, Attachment::Depth, view)?;
                for px in view.data_mut().chunks_exact_mut(4) {
                    let raw = f32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
                    px.copy_from_slice(&self.params.unproject(raw).to_ne_bytes());
                }
                Ok(())
            }
        }
    }

    fn read_frame_object_id(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.require_readable("read_frame_object_id");
        self.require_extent(view, "read_frame_object_id");
        assert!(
            view.format().is_id(),
            "read_frame_object_id: unsupported pixel format {:?}",
            view.format()
        );
        self.ctx.borrow_mut().read_attachment(self.framebuffer, Attachment::ObjectId, view)
    }

    #[cfg(feature = "triangle-sensor")]
    fn read_frame_triangle_id(&mut self, view: &mut ImageViewMut2D<'_>) -> Result<()> {
        self.require_readable("read_frame_triangle_id");
        self.require_extent(view, "read_frame_triangle_id");
        assert!(
            view.format().is_id(),
            "read_frame_triangle_id: unsupported pixel format {:?}",
            view.format()
        );
        self.ctx.borrow_mut().read_attachment(self.framebuffer, Attachment::TriangleId, view)
    }

    fn blit_rgba_to_default(&mut self) -> Result<()> {
        self.require_readable("blit_rgba_to_default");
        self.ctx.borrow_mut().blit_to_default(self.framebuffer)
    }

    // ===== DEVICE TRANSPORT =====

    #[cfg(feature = "gpu-interop")]
    fn read_frame_gpu(
        &mut self,
        attachment: Attachment,
        element_size: usize,
        dst: &mut dyn DeviceBuffer,
    ) -> Result<()> {
        self.require_readable("device readback");
        self.require_device_buffer(element_size, dst);
        self.ctx.borrow_mut().copy_attachment_to_device(self.framebuffer, attachment, dst)
    }

    #[cfg(feature = "gpu-interop")]
    fn read_frame_depth_gpu(&mut self, dst: &mut dyn DeviceBuffer) -> Result<()> {
        self.require_readable("read_frame_depth_gpu");
        assert!(
            self.depth_routine.is_some(),
            "read_frame_depth_gpu requires a device depth-unprojection routine, \
             but none was supplied at construction"
        );
        self.require_device_buffer(std::mem::size_of::<f32>(), dst);

        let mut ctx = self.ctx.borrow_mut();
        ctx.unproject_depth_on_device(self.framebuffer, self.params)?;
        ctx.copy_attachment_to_device(self.framebuffer, Attachment::LinearDepth, dst)
    }

    #[cfg(feature = "gpu-interop")]
    fn require_device_buffer(&self, element_size: usize, dst: &dyn DeviceBuffer) {
        // A device mismatch is a programming mistake in the caller, not a
        // recoverable condition.
        let ctx_device = self.ctx.borrow().device_id();
        assert!(
            dst.device_id() == ctx_device,
            "device buffer lives on device {} but the rendering context is on device {}",
            dst.device_id(), ctx_device
        );
        let expected = self.size.0 as usize * self.size.1 as usize * element_size;
        assert!(
            dst.len() == expected,
            "device buffer is {} bytes, extent {}x{} needs {}",
            dst.len(), self.size.0, self.size.1, expected
        );
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
