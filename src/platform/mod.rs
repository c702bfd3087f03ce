//! Process-level integrations.

pub mod panic_capture;

pub use panic_capture::{catch_render, CapturedPanic};
