//! Application contract between the runtime loop and the studio.
//!
//! The runtime owns windows, GPUs and graphics contexts; applications see
//! them through [`FrameCtx`] once per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
