//! Unit tests for RenderTarget
//!
//! Uses a recording mock context, so every test runs without a real
//! backend and can assert on the exact call sequence the target issues.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::SlotMap;

use super::*;
use crate::context::GraphicsContext;
use crate::error::Error;

// ============================================================================
// Mock Context
// ============================================================================

/// Records every backend call as a string for sequence assertions.
/// Readback calls leave the caller's view untouched, which lets tests
/// prefill a view with raw samples and observe the host-side transform.
struct MockContext {
    calls: Vec<String>,
    framebuffers: SlotMap<FramebufferId, FramebufferDesc>,
    binding: Binding,
    device: u32,
    fail_create: bool,
    fail_clear: bool,
}

impl MockContext {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            framebuffers: SlotMap::with_key(),
            binding: Binding::Default,
            device: 0,
            fail_create: false,
            fail_clear: false,
        }
    }
}

impl GraphicsContext for MockContext {
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> crate::error::Result<FramebufferId> {
        if self.fail_create {
            return Err(Error::BackendError("mock create failure".to_string()));
        }
        self.calls.push(format!(
            "create_framebuffer {}x{} triangle:{}",
            desc.width, desc.height, desc.with_triangle_id
        ));
        Ok(self.framebuffers.insert(*desc))
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) {
        if self.framebuffers.remove(id).is_some() {
            self.calls.push("destroy_framebuffer".to_string());
        }
    }

    fn current_binding(&self) -> Binding {
        self.binding
    }

    fn bind(&mut self, binding: Binding) {
        self.calls.push(format!("bind {:?}", binding));
        self.binding = binding;
    }

    fn clear(&mut self, _id: FramebufferId, values: &ClearValues) -> crate::error::Result<()> {
        if self.fail_clear {
            return Err(Error::BackendError("mock clear failure".to_string()));
        }
        self.calls.push(format!(
            "clear color:{:?} depth:{} object:{} triangle:{}",
            values.color, values.depth, values.object_id, values.triangle_id
        ));
        Ok(())
    }

    fn read_attachment(
        &mut self,
        _id: FramebufferId,
        attachment: Attachment,
        view: &mut ImageViewMut2D<'_>,
    ) -> crate::error::Result<()> {
        self.calls.push(format!("read_attachment {:?} {:?}", attachment, view.format()));
        Ok(())
    }

    fn unproject_depth_on_device(
        &mut self,
        _id: FramebufferId,
        _params: DepthUnprojectionParams,
    ) -> crate::error::Result<()> {
        self.calls.push("unproject_depth_on_device".to_string());
        Ok(())
    }

    fn blit_to_default(&mut self, _id: FramebufferId) -> crate::error::Result<()> {
        self.calls.push("blit_to_default".to_string());
        Ok(())
    }

    fn device_id(&self) -> u32 {
        self.device
    }

    fn copy_attachment_to_device(
        &mut self,
        _id: FramebufferId,
        attachment: Attachment,
        _dst: &mut dyn crate::context::DeviceBuffer,
    ) -> crate::error::Result<()> {
        self.calls.push(format!("copy_attachment_to_device {:?}", attachment));
        Ok(())
    }
}

struct MockDepthRoutine;

impl DepthUnprojectionRoutine for MockDepthRoutine {
    fn name(&self) -> &str {
        "mock_depth_routine"
    }
}

#[cfg(feature = "triangle-sensor")]
struct MockTriangleRoutine;

#[cfg(feature = "triangle-sensor")]
impl TriangleIdRoutine for MockTriangleRoutine {
    fn name(&self) -> &str {
        "mock_triangle_routine"
    }
}

#[cfg(feature = "gpu-interop")]
struct MockDeviceBuffer {
    device: u32,
    data: Vec<u8>,
}

#[cfg(feature = "gpu-interop")]
impl crate::context::DeviceBuffer for MockDeviceBuffer {
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

// ============================================================================
// Helpers
// ============================================================================

fn mock_pair() -> (Rc<RefCell<MockContext>>, SharedContext) {
    let mock = Rc::new(RefCell::new(MockContext::new()));
    let ctx: SharedContext = mock.clone();
    (mock, ctx)
}

fn test_params() -> DepthUnprojectionParams {
    DepthUnprojectionParams::from_near_far(0.1, 100.0)
}

fn readable_target(ctx: SharedContext, size: (u32, u32)) -> RenderTarget {
    let mut target = RenderTarget::new(ctx, size, test_params(), None, None).unwrap();
    target.render_enter().unwrap();
    target.render_exit();
    target
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_new_creates_framebuffer_at_extent() {
    let (mock, ctx) = mock_pair();
    let target = RenderTarget::new(ctx, (640, 480), test_params(), None, None).unwrap();

    assert_eq!(target.framebuffer_size(), (640, 480));
    assert_eq!(
        mock.borrow().calls[0],
        format!("create_framebuffer 640x480 triangle:{}", cfg!(feature = "triangle-sensor"))
    );
}

#[test]
fn test_new_rejects_zero_width() {
    let (_mock, ctx) = mock_pair();
    let result = RenderTarget::new(ctx, (0, 480), test_params(), None, None);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_new_rejects_zero_height() {
    let (_mock, ctx) = mock_pair();
    let result = RenderTarget::new(ctx, (640, 0), test_params(), None, None);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_new_propagates_backend_failure() {
    let (mock, ctx) = mock_pair();
    mock.borrow_mut().fail_create = true;
    let result = RenderTarget::new(ctx, (4, 4), test_params(), None, None);
    assert!(matches!(result, Err(Error::BackendError(_))));
}

#[test]
fn test_drop_destroys_framebuffer() {
    let (mock, ctx) = mock_pair();
    {
        let _target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();
    }
    assert!(mock.borrow().calls.contains(&"destroy_framebuffer".to_string()));
    assert!(mock.borrow().framebuffers.is_empty());
}

// ============================================================================
// Render Bracket Tests
// ============================================================================

#[test]
fn test_render_enter_binds_and_clears() {
    let (mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    target.render_enter().unwrap();

    let calls = &mock.borrow().calls;
    assert!(calls[1].starts_with("bind Framebuffer"));
    assert_eq!(calls[2], "clear color:[0, 0, 0, 255] depth:1 object:0 triangle:0");
}

#[test]
fn test_render_exit_restores_saved_binding() {
    let (mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    assert_eq!(mock.borrow().binding, Binding::Default);
    target.render_enter().unwrap();
    assert!(matches!(mock.borrow().binding, Binding::Framebuffer(_)));
    target.render_exit();
    assert_eq!(mock.borrow().binding, Binding::Default);
}

#[test]
fn test_render_bracket_can_repeat() {
    let (_mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    target.render_enter().unwrap();
    target.render_exit();
    target.render_enter().unwrap();
    target.render_exit();
}

#[test]
fn test_failed_clear_leaves_binding_and_bracket_untouched() {
    let (mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    mock.borrow_mut().fail_clear = true;
    assert!(matches!(target.render_enter(), Err(Error::BackendError(_))));
    // The bracket never opened: the previous binding is back in place.
    assert_eq!(mock.borrow().binding, Binding::Default);

    // A later bracket must save and restore the real enclosing binding,
    // not the target's own framebuffer.
    mock.borrow_mut().fail_clear = false;
    target.render_enter().unwrap();
    assert!(matches!(mock.borrow().binding, Binding::Framebuffer(_)));
    target.render_exit();
    assert_eq!(mock.borrow().binding, Binding::Default);
}

#[test]
#[should_panic(expected = "already inside a render bracket")]
fn test_render_enter_twice_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    target.render_enter().unwrap();
    target.render_enter().unwrap();
}

#[test]
#[should_panic(expected = "outside a render bracket")]
fn test_render_exit_without_enter_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    target.render_exit();
}

// ============================================================================
// Host Readback Tests
// ============================================================================

#[test]
fn test_read_frame_rgba_reads_color_attachment() {
    let (mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    let mut pixels = vec![0u8; 4 * 4 * 4];
    let mut view = ImageViewMut2D::from_rgba8(4, 4, &mut pixels).unwrap();
    target.read_frame_rgba(&mut view).unwrap();

    assert!(mock.borrow().calls.contains(&"read_attachment Color R8G8B8A8_UNORM".to_string()));
}

#[test]
#[should_panic(expected = "requires a rendered frame")]
fn test_read_frame_rgba_before_render_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    let mut pixels = vec![0u8; 4 * 4 * 4];
    let mut view = ImageViewMut2D::from_rgba8(4, 4, &mut pixels).unwrap();
    let _ = target.read_frame_rgba(&mut view);
}

#[test]
#[should_panic(expected = "requires a rendered frame")]
fn test_read_frame_rgba_during_render_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();
    target.render_enter().unwrap();

    let mut pixels = vec![0u8; 4 * 4 * 4];
    let mut view = ImageViewMut2D::from_rgba8(4, 4, &mut pixels).unwrap();
    let _ = target.read_frame_rgba(&mut view);
}

#[test]
#[should_panic(expected = "does not match framebuffer extent")]
fn test_read_frame_rgba_extent_mismatch_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    let mut pixels = vec![0u8; 8 * 8 * 4];
    let mut view = ImageViewMut2D::from_rgba8(8, 8, &mut pixels).unwrap();
    let _ = target.read_frame_rgba(&mut view);
}

#[test]
#[should_panic(expected = "unsupported pixel format")]
fn test_read_frame_rgba_format_mismatch_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    let mut depth = vec![0.0f32; 4 * 4];
    let mut view = ImageViewMut2D::from_f32(4, 4, &mut depth).unwrap();
    let _ = target.read_frame_rgba(&mut view);
}

#[test]
fn test_read_frame_depth_host_path_unprojects_in_place() {
    let (mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (2, 2));

    // The mock leaves the view untouched, so prefilling it with raw
    // samples exposes the host-side transform.
    let params = test_params();
    let mut depth = vec![params.project(5.0); 4];
    depth[3] = 1.0;
    let mut view = ImageViewMut2D::from_f32(2, 2, &mut depth).unwrap();
    target.read_frame_depth(&mut view).unwrap();
    drop(view);

    assert!((depth[0] - 5.0).abs() < 1e-4);
    assert_eq!(depth[3], 0.0);
    assert!(mock.borrow().calls.contains(&"read_attachment Depth R32_SFLOAT".to_string()));
    assert!(!mock.borrow().calls.contains(&"unproject_depth_on_device".to_string()));
}

#[test]
fn test_read_frame_depth_device_path_reads_linear_plane() {
    let (mock, ctx) = mock_pair();
    let routine: Rc<dyn DepthUnprojectionRoutine> = Rc::new(MockDepthRoutine);
    let mut target =
        RenderTarget::new(ctx, (2, 2), test_params(), Some(routine), None).unwrap();
    target.render_enter().unwrap();
    target.render_exit();

    let mut depth = vec![0.0f32; 4];
    let mut view = ImageViewMut2D::from_f32(2, 2, &mut depth).unwrap();
    target.read_frame_depth(&mut view).unwrap();

    let calls = &mock.borrow().calls;
    assert!(calls.contains(&"unproject_depth_on_device".to_string()));
    assert!(calls.contains(&"read_attachment LinearDepth R32_SFLOAT".to_string()));
    assert!(!calls.contains(&"read_attachment Depth R32_SFLOAT".to_string()));
}

#[test]
#[should_panic(expected = "expected R32_SFLOAT")]
fn test_read_frame_depth_format_mismatch_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    let mut pixels = vec![0u8; 4 * 4 * 4];
    let mut view = ImageViewMut2D::from_rgba8(4, 4, &mut pixels).unwrap();
    let _ = target.read_frame_depth(&mut view);
}

#[test]
fn test_read_frame_object_id_accepts_integer_formats() {
    let (mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    let mut wide = vec![0u32; 4 * 4];
    let mut view = ImageViewMut2D::from_u32(4, 4, &mut wide).unwrap();
    target.read_frame_object_id(&mut view).unwrap();

    let mut narrow = vec![0u16; 4 * 4];
    let mut view = ImageViewMut2D::from_u16(4, 4, &mut narrow).unwrap();
    target.read_frame_object_id(&mut view).unwrap();

    let calls = &mock.borrow().calls;
    assert!(calls.contains(&"read_attachment ObjectId R32_UINT".to_string()));
    assert!(calls.contains(&"read_attachment ObjectId R16_UINT".to_string()));
}

#[test]
#[should_panic(expected = "unsupported pixel format")]
fn test_read_frame_object_id_rejects_float_format() {
    let (_mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    let mut depth = vec![0.0f32; 4 * 4];
    let mut view = ImageViewMut2D::from_f32(4, 4, &mut depth).unwrap();
    let _ = target.read_frame_object_id(&mut view);
}

#[cfg(feature = "triangle-sensor")]
#[test]
fn test_read_frame_triangle_id_reads_triangle_attachment() {
    let (mock, ctx) = mock_pair();
    let routine: Rc<dyn TriangleIdRoutine> = Rc::new(MockTriangleRoutine);
    let mut target =
        RenderTarget::new(ctx, (4, 4), test_params(), None, Some(routine)).unwrap();
    target.render_enter().unwrap();
    target.render_exit();

    let mut ids = vec![0u32; 4 * 4];
    let mut view = ImageViewMut2D::from_u32(4, 4, &mut ids).unwrap();
    target.read_frame_triangle_id(&mut view).unwrap();

    assert!(mock.borrow().calls.contains(&"read_attachment TriangleId R32_UINT".to_string()));
}

// ============================================================================
// Blit Tests
// ============================================================================

#[test]
fn test_blit_rgba_to_default() {
    let (mock, ctx) = mock_pair();
    let mut target = readable_target(ctx, (4, 4));

    target.blit_rgba_to_default().unwrap();
    assert!(mock.borrow().calls.contains(&"blit_to_default".to_string()));
}

#[test]
#[should_panic(expected = "requires a rendered frame")]
fn test_blit_before_render_panics() {
    let (_mock, ctx) = mock_pair();
    let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();
    let _ = target.blit_rgba_to_default();
}

// ============================================================================
// Capability Tests
// ============================================================================

#[test]
fn test_capabilities_host_channels_always_present() {
    let (_mock, ctx) = mock_pair();
    let target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    let caps = target.capabilities();
    assert!(caps.contains(Capabilities::COLOR_HOST));
    assert!(caps.contains(Capabilities::DEPTH_HOST));
    assert!(caps.contains(Capabilities::OBJECT_ID_HOST));
    assert_eq!(caps.contains(Capabilities::TRIANGLE_ID_HOST), cfg!(feature = "triangle-sensor"));
}

#[cfg(feature = "gpu-interop")]
#[test]
fn test_capabilities_device_depth_needs_routine() {
    let (_mock, ctx) = mock_pair();
    let target = RenderTarget::new(ctx.clone(), (4, 4), test_params(), None, None).unwrap();
    assert!(target.capabilities().contains(Capabilities::COLOR_DEVICE));
    assert!(!target.capabilities().contains(Capabilities::DEPTH_DEVICE));

    let routine: Rc<dyn DepthUnprojectionRoutine> = Rc::new(MockDepthRoutine);
    let with_routine =
        RenderTarget::new(ctx, (4, 4), test_params(), Some(routine), None).unwrap();
    assert!(with_routine.capabilities().contains(Capabilities::DEPTH_DEVICE));
}

#[cfg(not(feature = "gpu-interop"))]
#[test]
fn test_capabilities_no_device_channels_without_interop() {
    let (_mock, ctx) = mock_pair();
    let target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

    let caps = target.capabilities();
    assert!(!caps.intersects(
        Capabilities::COLOR_DEVICE
            | Capabilities::DEPTH_DEVICE
            | Capabilities::OBJECT_ID_DEVICE
            | Capabilities::TRIANGLE_ID_DEVICE
    ));
}

// ============================================================================
// Device Readback Tests
// ============================================================================

#[cfg(feature = "gpu-interop")]
mod gpu {
    use super::*;

    #[test]
    fn test_read_frame_rgba_gpu_copies_color() {
        let (mock, ctx) = mock_pair();
        let mut target = readable_target(ctx, (4, 4));

        let mut buffer = MockDeviceBuffer { device: 0, data: vec![0u8; 4 * 4 * 4] };
        target.read_frame_rgba_gpu(&mut buffer).unwrap();

        assert!(mock.borrow().calls.contains(&"copy_attachment_to_device Color".to_string()));
    }

    #[test]
    fn test_read_frame_object_id_gpu_copies_ids() {
        let (mock, ctx) = mock_pair();
        let mut target = readable_target(ctx, (4, 4));

        let mut buffer = MockDeviceBuffer { device: 0, data: vec![0u8; 4 * 4 * 4] };
        target.read_frame_object_id_gpu(&mut buffer).unwrap();

        assert!(mock.borrow().calls.contains(&"copy_attachment_to_device ObjectId".to_string()));
    }

    #[test]
    fn test_read_frame_depth_gpu_runs_routine_then_copies() {
        let (mock, ctx) = mock_pair();
        let routine: Rc<dyn DepthUnprojectionRoutine> = Rc::new(MockDepthRoutine);
        let mut target =
            RenderTarget::new(ctx, (4, 4), test_params(), Some(routine), None).unwrap();
        target.render_enter().unwrap();
        target.render_exit();

        let mut buffer = MockDeviceBuffer { device: 0, data: vec![0u8; 4 * 4 * 4] };
        target.read_frame_depth_gpu(&mut buffer).unwrap();

        let calls = &mock.borrow().calls;
        assert!(calls.contains(&"unproject_depth_on_device".to_string()));
        assert!(calls.contains(&"copy_attachment_to_device LinearDepth".to_string()));
    }

    #[test]
    #[should_panic(expected = "requires a device depth-unprojection routine")]
    fn test_read_frame_depth_gpu_without_routine_panics() {
        let (_mock, ctx) = mock_pair();
        let mut target = readable_target(ctx, (4, 4));

        let mut buffer = MockDeviceBuffer { device: 0, data: vec![0u8; 4 * 4 * 4] };
        let _ = target.read_frame_depth_gpu(&mut buffer);
    }

    #[test]
    #[should_panic(expected = "but the rendering context is on device")]
    fn test_device_mismatch_panics() {
        let (_mock, ctx) = mock_pair();
        let mut target = readable_target(ctx, (4, 4));

        let mut buffer = MockDeviceBuffer { device: 1, data: vec![0u8; 4 * 4 * 4] };
        let _ = target.read_frame_rgba_gpu(&mut buffer);
    }

    #[test]
    #[should_panic(expected = "needs")]
    fn test_device_buffer_size_mismatch_panics() {
        let (_mock, ctx) = mock_pair();
        let mut target = readable_target(ctx, (4, 4));

        let mut buffer = MockDeviceBuffer { device: 0, data: vec![0u8; 16] };
        let _ = target.read_frame_rgba_gpu(&mut buffer);
    }

    #[test]
    #[should_panic(expected = "requires a rendered frame")]
    fn test_device_readback_before_render_panics() {
        let (_mock, ctx) = mock_pair();
        let mut target = RenderTarget::new(ctx, (4, 4), test_params(), None, None).unwrap();

        let mut buffer = MockDeviceBuffer { device: 0, data: vec![0u8; 4 * 4 * 4] };
        let _ = target.read_frame_rgba_gpu(&mut buffer);
    }
}
