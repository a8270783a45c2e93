//! Error types for the Aurora render library
//!
//! Only genuine backend failures travel through `Result`. Caller mistakes
//! (wrong view extent, wrong pixel encoding, readback outside the readable
//! window, a device buffer on the wrong device) are precondition violations
//! and fail fast with a panic instead of an error code.

use std::fmt;

/// Result type for Aurora render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Aurora render errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (software context, GL, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (framebuffer, attachment, buffer, ...)
    InvalidResource(String),

    /// Initialization failed (context, render target construction)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Log an error and return it as a `BackendError`
///
/// # Example
///
/// ```no_run
/// # use aurora_render::{gfx_bail, aurora::Result};
/// # fn lookup(name: &str) -> Option<u32> { None }
/// fn framebuffer(name: &str) -> Result<u32> {
///     match lookup(name) {
///         Some(id) => Ok(id),
///         None => gfx_bail!("aurora::context", "unknown framebuffer '{}'", name),
///     }
/// }
/// ```
#[macro_export]
macro_rules! gfx_bail {
    ($source:expr, $($arg:tt)*) => {{
        $crate::render_error!($source, $($arg)*);
        return Err($crate::aurora::Error::BackendError(format!($($arg)*)));
    }};
}
