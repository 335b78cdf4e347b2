//! Flattened cubic sample grid.
//!
//! Samples are stored row-major as `x + y·S + z·S²`, where `S` is the grid
//! side length (chunk size plus border).

use glam::Vec3;

/// Flatten a grid coordinate into an array index
#[inline]
pub fn flatten(x: usize, y: usize, z: usize, size: usize) -> usize {
    x + y * size + z * size * size
}

/// Inverse of `flatten`
#[inline]
pub fn unflatten(index: usize, size: usize) -> (usize, usize, usize) {
    (index % size, (index / size) % size, index / (size * size))
}

/// Cubic grid of density samples
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    size: usize,
    values: Vec<f32>,
}

impl SampleGrid {
    /// Grid of side `size` filled with `fill`
    pub fn new(size: usize, fill: f32) -> Self {
        Self {
            size,
            values: vec![fill; size * size * size],
        }
    }

    /// Grid of side `size` with each sample computed from its coordinate
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(size * size * size);
        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    values.push(f(x, y, z));
                }
            }
        }
        Self { size, values }
    }

    /// Side length
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        flatten(x, y, z, self.size)
    }

    /// Sample at a grid coordinate. Panics when out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    /// Sample at a grid coordinate, or `None` when out of bounds
    pub fn try_get(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if x < self.size && y < self.size && z < self.size {
            Some(self.get(x, y, z))
        } else {
            None
        }
    }

    /// Central-difference gradient at a grid point (one-sided at the edges)
    pub fn gradient(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let last = self.size - 1;
        let axis = |lo: (usize, usize, usize), hi: (usize, usize, usize), span: usize| {
            if span == 0 {
                0.0
            } else {
                (self.get(hi.0, hi.1, hi.2) - self.get(lo.0, lo.1, lo.2)) / span as f32
            }
        };
        let (x0, x1) = (x.saturating_sub(1), (x + 1).min(last));
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(last));
        let (z0, z1) = (z.saturating_sub(1), (z + 1).min(last));
        Vec3::new(
            axis((x0, y, z), (x1, y, z), x1 - x0),
            axis((x, y0, z), (x, y1, z), y1 - y0),
            axis((x, y, z0), (x, y, z1), z1 - z0),
        )
    }

    /// Trilinearly interpolated gradient at a continuous grid position
    pub fn gradient_at(&self, p: Vec3) -> Vec3 {
        let max = (self.size - 1) as f32;
        let p = p.clamp(Vec3::ZERO, Vec3::splat(max));
        let base = p.floor().min(Vec3::splat((max - 1.0).max(0.0)));
        let t = p - base;
        let (bx, by, bz) = (base.x as usize, base.y as usize, base.z as usize);
        let last = self.size - 1;

        let mut g = Vec3::ZERO;
        for corner in 0..8 {
            let dx = corner & 1;
            let dy = (corner >> 1) & 1;
            let dz = (corner >> 2) & 1;
            let wx = if dx == 1 { t.x } else { 1.0 - t.x };
            let wy = if dy == 1 { t.y } else { 1.0 - t.y };
            let wz = if dz == 1 { t.z } else { 1.0 - t.z };
            let gx = (bx + dx).min(last);
            let gy = (by + dy).min(last);
            let gz = (bz + dz).min(last);
            g += self.gradient(gx, gy, gz) * (wx * wy * wz);
        }
        g
    }

    /// Outward unit normal at a continuous grid position.
    ///
    /// Density grows outward, so this is the normalized gradient.
    pub fn normal_at(&self, p: Vec3) -> Vec3 {
        self.gradient_at(p).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_convention() {
        assert_eq!(flatten(1, 0, 0, 4), 1);
        assert_eq!(flatten(0, 1, 0, 4), 4);
        assert_eq!(flatten(0, 0, 1, 4), 16);
        assert_eq!(flatten(3, 2, 1, 4), 3 + 8 + 16);
    }

    #[test]
    fn test_unflatten_inverts_flatten() {
        for i in [0, 5, 17, 63] {
            let (x, y, z) = unflatten(i, 4);
            assert_eq!(flatten(x, y, z, 4), i);
        }
    }

    #[test]
    fn test_from_fn_layout() {
        let grid = SampleGrid::from_fn(3, |x, y, z| (x + 10 * y + 100 * z) as f32);
        assert_eq!(grid.len(), 27);
        assert_eq!(grid.get(2, 1, 0), 12.0);
        assert_eq!(grid.values()[flatten(1, 2, 2, 3)], 221.0);
        assert_eq!(grid.try_get(3, 0, 0), None);
    }

    #[test]
    fn test_gradient_of_linear_field() {
        let grid = SampleGrid::from_fn(5, |x, y, z| 2.0 * x as f32 - y as f32 + 0.5 * z as f32);
        let g = grid.gradient(2, 2, 2);
        assert!((g - Vec3::new(2.0, -1.0, 0.5)).length() < 1e-5);
        let g = grid.gradient_at(Vec3::new(1.3, 2.7, 0.4));
        assert!((g - Vec3::new(2.0, -1.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_normal_points_outward_on_sphere() {
        let c = Vec3::splat(4.0);
        let grid = SampleGrid::from_fn(9, |x, y, z| {
            (Vec3::new(x as f32, y as f32, z as f32) - c).length() - 3.0
        });
        let n = grid.normal_at(Vec3::new(7.0, 4.0, 4.0));
        assert!(n.x > 0.9);
    }
}
