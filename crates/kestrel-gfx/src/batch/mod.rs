//! Implicit batching of 2D geometry.

mod renderer;
mod state;
mod vertex;

pub use renderer::{BatchConfig, BatchRenderer};
pub use state::{exceeds_capacity, needs_flush, BatchState};
pub use vertex::BatchVertex;
