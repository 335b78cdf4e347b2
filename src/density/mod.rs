//! Density fields: base shapes, CSG edits and the pre-sampled chunk grid.

pub mod field;
pub mod grid;
pub mod ledger;
pub mod primitive;
pub mod shape;
pub mod simulation;

pub use field::{BaseDensityProperties, DensityField, FieldView};
pub use grid::{flatten, unflatten, SampleGrid};
pub use ledger::{CsgOperation, ModificationEntry, ModificationLedger};
pub use primitive::DensityPrimitive;
pub use shape::{ShapeKind, ShapeSelector};
pub use simulation::SimulationMode;
