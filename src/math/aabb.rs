//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Tightest box around `points`, or `None` if there are none
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Aabb::new(first, first);
        for p in points {
            aabb.expand(p);
        }
        Some(aabb)
    }

    /// Box covering one chunk's cells
    pub fn from_chunk(origin: Vec3, chunk_size: usize) -> Self {
        Self::new(origin, origin + Vec3::splat(chunk_size as f32))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive containment, with `epsilon` slack on every side
    pub fn contains_point(&self, p: Vec3, epsilon: f32) -> bool {
        p.cmpge(self.min - epsilon).all() && p.cmple(self.max + epsilon).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Grow to include `point`
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Same box shifted by `offset`
    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.5)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::from_chunk(Vec3::ZERO, 16);
        assert!(aabb.contains_point(Vec3::splat(16.0), 0.0));
        assert!(!aabb.contains_point(Vec3::new(16.5, 0.0, 0.0), 0.0));
        assert!(aabb.contains_point(Vec3::new(16.5, 0.0, 0.0), 1.0));
    }

    #[test]
    fn test_intersects_and_translated() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = a.translated(Vec3::splat(0.5));
        let c = a.translated(Vec3::splat(2.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.merged(&c), Aabb::new(Vec3::ZERO, Vec3::splat(3.0)));
    }
}
