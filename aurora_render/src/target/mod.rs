//! Target module - the render-target aggregate and depth unprojection
//!
//! A render target is constructed once per viewport/sensor and owns exactly
//! one offscreen framebuffer for its whole lifetime.

// Module declarations
pub mod render_target;
pub mod depth_unprojection;
pub mod capabilities;

// Re-exports
pub use render_target::RenderTarget;
pub use depth_unprojection::{DepthUnprojectionParams, unproject_depth};
pub use capabilities::Capabilities;
