//! Core data types: timesteps and the bounded experience buffer.

pub mod experience_buffer;
pub mod timestep;

pub use experience_buffer::{BatchOrder, BatchedView, ExperienceBuffer};
pub use timestep::{Context, Timestep, TimestepBatch};
