/*!
# Aurora Render

Offscreen render-target and readback library for 3D sensor pipelines.

This crate owns the destination side of a rendering pipeline: a
multi-attachment offscreen framebuffer (color, metric depth, object-id and
optionally triangle-id) plus the logic for extracting per-frame results into
caller-supplied memory, on the host or on a GPU device. The scene graph,
shader programs, and windowing system are external collaborators that issue
their draw calls between `render_enter()` and `render_exit()`.

## Architecture

- **RenderTarget**: aggregate root owning one framebuffer and the render
  bracket / readback operations
- **GraphicsContext**: backend seam trait implemented by concrete contexts
  (software, GL, ...)
- **DepthUnprojectionParams**: the shared pure depth-unprojection formula,
  used identically by the host and device transports
- **ImageViewMut2D**: caller-owned, format-checked 2D memory view for host
  readback

Backend implementations provide concrete `GraphicsContext` types; the
`aurora_render_context_soft` crate ships a headless software context.

## Feature flags

- `triangle-sensor`: compiles in the triangle-id channel
- `gpu-interop`: compiles in the device readback transport
*/

// Internal modules
mod error;
pub mod log;
pub mod context;
pub mod target;

// Main aurora namespace module
pub mod aurora {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        pub use crate::log::{set_logger, reset_logger, dispatch, dispatch_detailed};
    }

    // Backend seam sub-module
    pub mod context {
        pub use crate::context::*;
    }

    // Render target sub-module
    pub mod target {
        pub use crate::target::*;
    }
}

// Re-export math library at crate root
pub use glam;
