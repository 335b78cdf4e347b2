//! Modification ledger: the persistent list of brush edits applied to a field.
//!
//! Entries are keyed by the ceiling of their position, so re-issuing an
//! edit at the same brush location replaces the previous one. Composition
//! folds every entry against the evolving base value in insertion order.

use std::collections::HashMap;

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::primitive::DensityPrimitive;
use super::shape::{ShapeKind, ShapeSelector};

/// Boolean operation used to combine an edit with the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CsgOperation {
    /// Add material
    #[default]
    Union,
    /// Carve material
    Difference,
    /// Keep only the overlap
    Intersection,
}

impl CsgOperation {
    /// Combine a base density with an edit's density
    #[inline]
    pub fn combine(self, base: f32, edit: f32) -> f32 {
        match self {
            CsgOperation::Union => base.min(edit),
            CsgOperation::Difference => base.max(-edit),
            CsgOperation::Intersection => base.max(edit),
        }
    }
}

/// One brush edit: shape, placement, radius and operation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModificationEntry {
    pub shape: ShapeKind,
    pub position: Vec3,
    pub radius: f32,
    pub operation: CsgOperation,
}

impl ModificationEntry {
    pub fn new(shape: ShapeKind, position: Vec3, radius: f32, operation: CsgOperation) -> Self {
        Self { shape, position, radius, operation }
    }

    /// Discretized position the ledger keys this entry by
    pub fn key(&self) -> IVec3 {
        self.position.ceil().as_ivec3()
    }

    /// Density primitive for this entry
    pub fn primitive(&self, selector: &ShapeSelector) -> DensityPrimitive {
        selector.select(self.shape, self.position, self.radius)
    }
}

/// Ordered, position-keyed collection of edits
#[derive(Debug, Clone, Default)]
pub struct ModificationLedger {
    entries: Vec<ModificationEntry>,
    /// Primitive for each entry, parallel to `entries`
    primitives: Vec<DensityPrimitive>,
    /// Index: discretized position -> slot in `entries`
    index: HashMap<IVec3, usize>,
    selector: ShapeSelector,
}

impl ModificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit. Returns the entry it replaced, if one existed at the
    /// same key.
    pub(crate) fn apply(&mut self, entry: ModificationEntry) -> Option<ModificationEntry> {
        let primitive = entry.primitive(&self.selector);
        match self.index.get(&entry.key()) {
            Some(&slot) => {
                let previous = std::mem::replace(&mut self.entries[slot], entry);
                self.primitives[slot] = primitive;
                Some(previous)
            }
            None => {
                self.index.insert(entry.key(), self.entries.len());
                self.entries.push(entry);
                self.primitives.push(primitive);
                None
            }
        }
    }

    /// Fold every entry into `base` at world position `p`
    pub fn compose_density(&self, base: f32, p: Vec3) -> f32 {
        self.entries
            .iter()
            .zip(&self.primitives)
            .fold(base, |density, (entry, primitive)| {
                entry.operation.combine(density, primitive.density(p))
            })
    }

    /// Entry stored under the key of `position`
    pub fn get(&self, position: Vec3) -> Option<&ModificationEntry> {
        let slot = *self.index.get(&position.ceil().as_ivec3())?;
        self.entries.get(slot)
    }

    pub fn entries(&self) -> &[ModificationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_edit(position: Vec3, radius: f32, operation: CsgOperation) -> ModificationEntry {
        ModificationEntry::new(ShapeKind::Sphere, position, radius, operation)
    }

    #[test]
    fn test_combine() {
        assert_eq!(CsgOperation::Union.combine(2.0, -1.0), -1.0);
        assert_eq!(CsgOperation::Difference.combine(-3.0, -1.0), 1.0);
        assert_eq!(CsgOperation::Intersection.combine(-3.0, -1.0), -1.0);
    }

    #[test]
    fn test_empty_ledger_is_identity() {
        let ledger = ModificationLedger::new();
        assert_eq!(ledger.compose_density(1.5, Vec3::ZERO), 1.5);
    }

    #[test]
    fn test_union_adds_material() {
        let mut ledger = ModificationLedger::new();
        ledger.apply(sphere_edit(Vec3::splat(4.0), 3.0, CsgOperation::Union));
        assert!(ledger.compose_density(10.0, Vec3::splat(4.0)) < 0.0);
        assert_eq!(ledger.compose_density(10.0, Vec3::splat(40.0)), 10.0);
    }

    #[test]
    fn test_difference_carves() {
        let mut ledger = ModificationLedger::new();
        ledger.apply(sphere_edit(Vec3::ZERO, 3.0, CsgOperation::Difference));
        assert!(ledger.compose_density(-5.0, Vec3::ZERO) > 0.0);
        // Outside the brush the base is untouched
        assert_eq!(ledger.compose_density(-5.0, Vec3::splat(20.0)), -5.0);
    }

    #[test]
    fn test_same_key_overwrites() {
        let mut ledger = ModificationLedger::new();
        assert!(ledger.apply(sphere_edit(Vec3::new(1.2, 1.2, 1.2), 3.0, CsgOperation::Union)).is_none());
        let replaced = ledger.apply(sphere_edit(Vec3::new(1.7, 1.9, 1.1), 5.0, CsgOperation::Difference));
        assert_eq!(replaced.map(|e| e.radius), Some(3.0));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].operation, CsgOperation::Difference);
        assert_eq!(ledger.get(Vec3::splat(1.5)).map(|e| e.radius), Some(5.0));
    }

    #[test]
    fn test_union_and_intersection_idempotent() {
        let p = Vec3::new(2.0, 1.0, 0.5);
        for op in [CsgOperation::Union, CsgOperation::Intersection] {
            let edit = sphere_edit(Vec3::ZERO, 4.0, op);
            let mut once = ModificationLedger::new();
            once.apply(edit);
            let mut twice = ModificationLedger::new();
            twice.apply(edit);
            twice.apply(edit);
            assert_eq!(once.compose_density(0.5, p), twice.compose_density(0.5, p));
        }
    }

    #[test]
    fn test_distinct_positions_accumulate() {
        let mut ledger = ModificationLedger::new();
        ledger.apply(sphere_edit(Vec3::new(0.0, 0.0, 0.0), 3.0, CsgOperation::Union));
        ledger.apply(sphere_edit(Vec3::new(10.0, 0.0, 0.0), 3.0, CsgOperation::Union));
        assert_eq!(ledger.len(), 2);
        assert!(ledger.compose_density(5.0, Vec3::ZERO) < 0.0);
        assert!(ledger.compose_density(5.0, Vec3::new(10.0, 0.0, 0.0)) < 0.0);
        assert!(ledger.compose_density(5.0, Vec3::new(5.0, 0.0, 0.0)) > 0.0);
    }
}
