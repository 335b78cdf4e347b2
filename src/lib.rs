//! Isovox - editable voxel density fields with pluggable isosurface extraction

pub mod core;
pub mod math;
pub mod density;
pub mod mesh;
pub mod voxel;
