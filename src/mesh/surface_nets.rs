//! Naive surface nets: the cell vertex is the mean of its edge crossings.

use glam::Vec3;

use super::dual::{edge_crossings, polygonize_dual};
use super::marching_cubes::Cell;
use super::{IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::density::SampleGrid;

/// Naive surface nets mesher
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceNetsMesher;

/// Average of the zero crossings on the cell's edges
pub(crate) fn mass_point(cell: &Cell) -> Vec3 {
    let (sum, count) = edge_crossings(cell).fold((Vec3::ZERO, 0u32), |(sum, count), p| (sum + p, count + 1));
    if count == 0 {
        cell.positions[0] + Vec3::splat(0.5)
    } else {
        sum / count as f32
    }
}

impl Polygonizer for SurfaceNetsMesher {
    fn algorithm(&self) -> IsosurfaceAlgorithm {
        IsosurfaceAlgorithm::NaiveSurfaceNets
    }

    fn polygonize(&self, grid: &SampleGrid, chunk_size: usize) -> MeshData {
        polygonize_dual(grid, chunk_size, |_, cell| mass_point(cell))
    }

    /// Two triangles per quad
    fn triangle_multiplier(&self) -> usize {
        6
    }
}
