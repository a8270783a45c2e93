//! GraphicsContext trait - backend seam for render-capture operations
//!
//! A context owns the actual attachment storage and the default (display)
//! framebuffer, if any. `RenderTarget` drives it through opaque handles and
//! never exposes the attachments themselves.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::context::ImageViewMut2D;
use crate::target::DepthUnprojectionParams;

slotmap::new_key_type! {
    /// Opaque handle to a backend framebuffer
    pub struct FramebufferId;
}

/// The render destination a context is currently bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    /// The display system's default framebuffer
    Default,
    /// An offscreen framebuffer owned by a render target
    Framebuffer(FramebufferId),
}

/// One typed image plane of a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// 4-channel 8-bit color
    Color,
    /// Raw non-linear depth as produced by the projection
    Depth,
    /// Linear metric depth, populated by the device unprojection routine
    LinearDepth,
    /// Per-pixel object identifiers
    ObjectId,
    /// Per-pixel triangle identifiers (present only when requested at
    /// framebuffer creation)
    TriangleId,
}

/// Descriptor for creating an offscreen framebuffer
#[derive(Debug, Clone, Copy)]
pub struct FramebufferDesc {
    /// Width in pixels (>= 1)
    pub width: u32,
    /// Height in pixels (>= 1)
    pub height: u32,
    /// Allocate a triangle-id attachment alongside the standard three
    pub with_triangle_id: bool,
}

/// Values written into every attachment at the start of a render bracket
#[derive(Debug, Clone, Copy)]
pub struct ClearValues {
    /// Clear color (RGBA)
    pub color: [u8; 4],
    /// Raw depth far sentinel
    pub depth: f32,
    /// Object-id background sentinel
    pub object_id: u32,
    /// Triangle-id background sentinel
    pub triangle_id: u32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            depth: 1.0,
            object_id: 0,
            triangle_id: 0,
        }
    }
}

/// Backend seam trait
///
/// Implemented by concrete contexts (the software context, a GL context, ...).
/// All operations are blocking: when a readback call returns, the destination
/// memory is fully populated ("no torn frames"). The trait is deliberately
/// not `Send`: a graphics context belongs to the thread that created it and
/// callers share it as [`SharedContext`] without internal locking.
pub trait GraphicsContext {
    /// Create an offscreen framebuffer with color, depth and object-id
    /// attachments (plus triangle-id when requested), all at the descriptor's
    /// extent
    ///
    /// # Errors
    ///
    /// Returns an error if the framebuffer cannot be completed by the
    /// backend.
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<FramebufferId>;

    /// Destroy a framebuffer and all its attachments
    ///
    /// Destroying the currently bound framebuffer rebinds the default one.
    /// Unknown handles are ignored.
    fn destroy_framebuffer(&mut self, id: FramebufferId);

    /// The currently bound render destination
    fn current_binding(&self) -> Binding;

    /// Bind a render destination for subsequent draw calls
    fn bind(&mut self, binding: Binding);

    /// Clear every attachment of a framebuffer to the given values
    fn clear(&mut self, id: FramebufferId, values: &ClearValues) -> Result<()>;

    /// Blocking host copy of one attachment into the caller's view
    ///
    /// The backend converts its attachment storage into the view's pixel
    /// format; the view extent must equal the framebuffer extent.
    fn read_attachment(
        &mut self,
        id: FramebufferId,
        attachment: Attachment,
        view: &mut ImageViewMut2D<'_>,
    ) -> Result<()>;

    /// Run the device-resident depth unprojection, rewriting the
    /// `LinearDepth` plane from the raw `Depth` plane
    ///
    /// Only called for targets constructed with a
    /// [`DepthUnprojectionRoutine`]; the backend must apply the exact
    /// formula of [`DepthUnprojectionParams::unproject`].
    fn unproject_depth_on_device(
        &mut self,
        id: FramebufferId,
        params: DepthUnprojectionParams,
    ) -> Result<()>;

    /// Copy the color attachment into the default framebuffer
    ///
    /// A no-op for headless contexts that have no default framebuffer.
    fn blit_to_default(&mut self, id: FramebufferId) -> Result<()>;

    /// Identifier of the device this context renders on
    fn device_id(&self) -> u32;

    /// Blocking device-to-device copy of one attachment into a caller-owned
    /// device buffer
    ///
    /// The buffer must live on the context's device and hold exactly
    /// `width * height * element_size` bytes for the attachment.
    fn copy_attachment_to_device(
        &mut self,
        id: FramebufferId,
        attachment: Attachment,
        dst: &mut dyn DeviceBuffer,
    ) -> Result<()>;
}

/// Shared handle to a graphics context
///
/// Single-threaded by design: the underlying context is not thread-safe, so
/// sharing goes through `Rc<RefCell<..>>` rather than a lock.
pub type SharedContext = Rc<RefCell<dyn GraphicsContext>>;

// ===== ROUTINES =====

/// Handle to a device-resident depth-unprojection program
///
/// Created by a backend and passed to `RenderTarget::new`. Its presence is
/// the capability signal that depth can be unprojected on the device; the
/// actual invocation goes through
/// [`GraphicsContext::unproject_depth_on_device`].
pub trait DepthUnprojectionRoutine {
    /// Identifier used in logs
    fn name(&self) -> &str;
}

/// Handle to a device-resident triangle-id program
///
/// Only its existence matters to the render target: it signals that the
/// external renderer writes triangle identifiers during the bracket.
pub trait TriangleIdRoutine {
    /// Identifier used in logs
    fn name(&self) -> &str;
}

// ===== DEVICE BUFFERS =====

/// Caller-owned device-resident buffer for the device readback transport
///
/// The buffer must remain valid and resident on its device for the duration
/// of the copy. Backends downcast through `as_any_mut` to reach their
/// concrete buffer type.
pub trait DeviceBuffer {
    /// Identifier of the device the buffer lives on
    fn device_id(&self) -> u32;

    /// Buffer length in bytes
    fn len(&self) -> usize;

    /// True if the buffer holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend access to the concrete buffer type
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
