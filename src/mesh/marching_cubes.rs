//! Classic table-driven marching cubes.

use glam::Vec3;

use super::tables::{CORNER_OFFSETS, EDGE_CONNECTIONS, EDGE_TABLE, TRI_TABLE};
use super::{cell_count, interpolate, polygonize_slabs, push_oriented_triangle, IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::density::SampleGrid;

/// Marching cubes mesher
#[derive(Debug, Clone, Copy, Default)]
pub struct MarchingCubesMesher;

/// Corner positions and samples of one cell
pub(crate) struct Cell {
    pub positions: [Vec3; 8],
    pub values: [f32; 8],
}

impl Cell {
    pub fn load(grid: &SampleGrid, x: usize, y: usize, z: usize) -> Self {
        let mut positions = [Vec3::ZERO; 8];
        let mut values = [0.0; 8];
        for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
            let (gx, gy, gz) = (x + offset[0], y + offset[1], z + offset[2]);
            positions[i] = Vec3::new(gx as f32, gy as f32, gz as f32);
            values[i] = grid.get(gx, gy, gz);
        }
        Self { positions, values }
    }

    /// Case index: bit `i` set when corner `i` is inside
    pub fn case_index(&self) -> usize {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v < 0.0)
            .fold(0, |index, (i, _)| index | (1 << i))
    }

    /// Zero crossing on cell edge `edge`
    pub fn edge_crossing(&self, edge: usize) -> Vec3 {
        let [a, b] = EDGE_CONNECTIONS[edge];
        interpolate(self.positions[a], self.positions[b], self.values[a], self.values[b])
    }
}

impl Polygonizer for MarchingCubesMesher {
    fn algorithm(&self) -> IsosurfaceAlgorithm {
        IsosurfaceAlgorithm::MarchingCubes
    }

    fn polygonize(&self, grid: &SampleGrid, chunk_size: usize) -> MeshData {
        let n = cell_count(grid, chunk_size);
        polygonize_slabs(n, |z, mesh| {
            for y in 0..n {
                for x in 0..n {
                    march_cell(grid, &Cell::load(grid, x, y, z), mesh);
                }
            }
        })
    }

    fn triangle_multiplier(&self) -> usize {
        3
    }
}

fn march_cell(grid: &SampleGrid, cell: &Cell, mesh: &mut MeshData) {
    let case = cell.case_index();
    let edges = EDGE_TABLE[case];
    if edges == 0 {
        return;
    }

    let mut crossings = [Vec3::ZERO; 12];
    for (edge, crossing) in crossings.iter_mut().enumerate() {
        if edges & (1 << edge) != 0 {
            *crossing = cell.edge_crossing(edge);
        }
    }

    for tri in TRI_TABLE[case].chunks_exact(3) {
        if tri[0] < 0 {
            break;
        }
        push_oriented_triangle(
            mesh,
            grid,
            [crossings[tri[0] as usize], crossings[tri[1] as usize], crossings[tri[2] as usize]],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_grids::sphere;

    #[test]
    fn test_case_index() {
        let grid = SampleGrid::from_fn(2, |x, y, z| if (x, y, z) == (1, 1, 0) { -1.0 } else { 1.0 });
        // Corner 2 is (1, 1, 0)
        assert_eq!(Cell::load(&grid, 0, 0, 0).case_index(), 1 << 2);
    }

    #[test]
    fn test_vertices_lie_on_surface() {
        let grid = sphere(12, Vec3::splat(5.5), 3.7);
        let mesh = MarchingCubesMesher.polygonize(&grid, 11);
        assert!(!mesh.is_empty());
        for v in &mesh.vertices {
            let r = (Vec3::from_array(*v) - Vec3::splat(5.5)).length();
            assert!((r - 3.7).abs() < 0.25, "radius {}", r);
        }
    }

    #[test]
    fn test_plane_normals_point_up() {
        let grid = SampleGrid::from_fn(5, |_, y, _| y as f32 - 1.5);
        let mesh = MarchingCubesMesher.polygonize(&grid, 4);
        // 4x4 cells crossed, two triangles each
        assert_eq!(mesh.counter, 32);
        for tri in mesh.triangles.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[tri[i] as usize]));
            assert!((b - a).cross(c - a).y > 0.0);
        }
        for n in mesh.normals.unwrap() {
            assert!((Vec3::from_array(n) - Vec3::Y).length() < 1e-5);
        }
    }
}
