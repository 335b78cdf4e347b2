//! Marching tetrahedra: each cell is split into six tetrahedra sharing the
//! main diagonal, which removes the ambiguous cases of marching cubes.

use glam::Vec3;

use super::marching_cubes::Cell;
use super::{cell_count, interpolate, polygonize_slabs, push_oriented_triangle, IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::density::SampleGrid;

/// Corner indices of the six tetrahedra around the 0-6 diagonal
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 5, 1, 6],
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
];

/// Marching tetrahedra mesher
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingTetrahedraMesher;

impl Polygonizer for MarchingTetrahedraMesher {
    fn algorithm(&self) -> IsosurfaceAlgorithm {
        IsosurfaceAlgorithm::MarchingTetrahedra
    }

    fn polygonize(&self, grid: &SampleGrid, chunk_size: usize) -> MeshData {
        let n = cell_count(grid, chunk_size);
        polygonize_slabs(n, |z, mesh| {
            for y in 0..n {
                for x in 0..n {
                    let cell = Cell::load(grid, x, y, z);
                    let case = cell.case_index();
                    if case == 0 || case == 0xff {
                        continue;
                    }
                    for tet in &TETRAHEDRA {
                        march_tetrahedron(grid, &cell, tet, mesh);
                    }
                }
            }
        })
    }

    fn triangle_multiplier(&self) -> usize {
        3
    }
}

fn march_tetrahedron(grid: &SampleGrid, cell: &Cell, tet: &[usize; 4], mesh: &mut MeshData) {
    let (inside, outside): (Vec<usize>, Vec<usize>) = tet.iter().partition(|&&c| cell.values[c] < 0.0);
    let crossing = |a: usize, b: usize| {
        interpolate(cell.positions[a], cell.positions[b], cell.values[a], cell.values[b])
    };

    match (inside.as_slice(), outside.as_slice()) {
        ([a], [b, c, d]) | ([b, c, d], [a]) => {
            push_oriented_triangle(mesh, grid, [crossing(*a, *b), crossing(*a, *c), crossing(*a, *d)]);
        }
        ([a, b], [c, d]) => {
            let quad: [Vec3; 4] = [crossing(*a, *c), crossing(*a, *d), crossing(*b, *d), crossing(*b, *c)];
            push_oriented_triangle(mesh, grid, [quad[0], quad[1], quad[2]]);
            push_oriented_triangle(mesh, grid, [quad[0], quad[2], quad[3]]);
        }
        _ => {}
    }
}
