//! Chunks and the brushes that edit them

pub mod brush;
pub mod chunk;

pub use brush::Brush;
pub use chunk::{Chunk, ModifyInstance};
