//! Context module - the backend seam and the caller memory contract

// Module declarations
pub mod context;
pub mod pixel;
pub mod image_view;

// Re-export everything from context.rs
pub use context::*;

// Re-export from other modules
pub use pixel::*;
pub use image_view::*;
