//! Brush placement: turns a user-issued shape, operation and transform into
//! a field edit.

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::density::{CsgOperation, ModificationEntry, ShapeKind};

/// A shape stamped into the world with a CSG operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub shape: ShapeKind,
    pub operation: CsgOperation,
    /// World-space center
    pub position: Vec3,
    /// Uniform scale, used as the shape radius
    pub scale: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Sphere,
            operation: CsgOperation::Union,
            position: Vec3::ZERO,
            scale: 4.0,
        }
    }
}

impl Brush {
    pub fn new(shape: ShapeKind, operation: CsgOperation, position: Vec3, scale: f32) -> Self {
        Self { shape, operation, position, scale }
    }

    /// Sphere brush that adds material
    pub fn sphere(position: Vec3, scale: f32) -> Self {
        Self::new(ShapeKind::Sphere, CsgOperation::Union, position, scale)
    }

    /// Sphere brush that carves material
    pub fn carve(position: Vec3, scale: f32) -> Self {
        Self::new(ShapeKind::Sphere, CsgOperation::Difference, position, scale)
    }

    pub fn with_operation(mut self, operation: CsgOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Move the brush to `position`
    pub fn moved_to(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Ledger entry for this brush
    pub fn as_modification(&self) -> ModificationEntry {
        ModificationEntry::new(self.shape, self.position, self.scale, self.operation)
    }

    /// Per-axis ceiling of the position, the key edits are stored under
    pub fn coordinates(&self) -> IVec3 {
        self.position.ceil().as_ivec3()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_modification() {
        let brush = Brush::new(ShapeKind::Torus, CsgOperation::Intersection, Vec3::new(1.0, 2.0, 3.0), 6.0);
        let entry = brush.as_modification();
        assert_eq!(entry.shape, ShapeKind::Torus);
        assert_eq!(entry.radius, 6.0);
        assert_eq!(entry.operation, CsgOperation::Intersection);
        assert_eq!(entry.key(), brush.coordinates());
    }

    #[test]
    fn test_coordinates_use_ceiling() {
        let brush = Brush::sphere(Vec3::new(1.2, -0.5, 3.0), 2.0);
        assert_eq!(brush.coordinates(), IVec3::new(2, 0, 3));
    }

    #[test]
    fn test_builders() {
        let brush = Brush::carve(Vec3::ZERO, 3.0).moved_to(Vec3::ONE);
        assert_eq!(brush.operation, CsgOperation::Difference);
        assert_eq!(brush.position, Vec3::ONE);
        assert_eq!(brush.with_operation(CsgOperation::Union).operation, CsgOperation::Union);
    }
}
