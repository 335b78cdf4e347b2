//! Dual contouring: the cell vertex minimizes the quadratic error against
//! the tangent planes at the cell's edge crossings.

use glam::{Mat3, Vec3};

use super::dual::{edge_crossings, polygonize_dual};
use super::marching_cubes::Cell;
use super::surface_nets::mass_point;
use super::{IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::density::SampleGrid;

/// Dual contouring mesher
#[derive(Debug, Clone, Copy)]
pub struct DualContouringMesher {
    /// Pull toward the mass point; keeps flat and degenerate cells stable
    pub regularization: f32,
}

impl Default for DualContouringMesher {
    fn default() -> Self {
        Self { regularization: 0.05 }
    }
}

impl DualContouringMesher {
    /// Solve the cell's QEF, clamped to the cell bounds
    pub(crate) fn solve(&self, grid: &SampleGrid, cell: &Cell) -> Vec3 {
        let mass = mass_point(cell);
        let mut ata = Mat3::from_diagonal(Vec3::splat(self.regularization));
        let mut atb = mass * self.regularization;
        for p in edge_crossings(cell) {
            let n = grid.normal_at(p);
            ata += Mat3::from_cols(n * n.x, n * n.y, n * n.z);
            atb += n * n.dot(p);
        }

        let min = cell.positions[0];
        if ata.determinant().abs() < 1e-6 {
            return mass;
        }
        let v = ata.inverse() * atb;
        if !v.is_finite() {
            return mass;
        }
        v.clamp(min, min + Vec3::ONE)
    }
}

impl Polygonizer for DualContouringMesher {
    fn algorithm(&self) -> IsosurfaceAlgorithm {
        IsosurfaceAlgorithm::DualContouring
    }

    fn polygonize(&self, grid: &SampleGrid, chunk_size: usize) -> MeshData {
        polygonize_dual(grid, chunk_size, |grid, cell| self.solve(grid, cell))
    }

    /// Two triangles per quad
    fn triangle_multiplier(&self) -> usize {
        6
    }
}
