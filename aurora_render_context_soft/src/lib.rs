/*!
# Aurora Render - Software Context Backend

Headless software implementation of the aurora_render graphics context.

This crate provides a CPU-resident backend that implements the
`GraphicsContext` trait with plain memory planes instead of GPU
attachments, plus an emulated device memory space for the device readback
transport. Every operation is deterministic and runs without a display or
graphics driver, which makes the backend the reference substrate for
integration tests and CI.

Draw calls are stood in for by [`SoftContext::draw_rect`]: it writes a
single [`Fragment`] across a rectangle of the bound framebuffer with the
usual less-or-equal depth test.
*/

// Software implementation modules
mod soft_context;
mod soft_framebuffer;
mod soft_device;
mod fragment;

pub use soft_context::SoftContext;
pub use soft_device::SoftDeviceBuffer;
pub use fragment::Fragment;
