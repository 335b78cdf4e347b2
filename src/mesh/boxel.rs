//! Blocky face extraction.
//!
//! Sample `p` is treated as the unit voxel `[p, p + 1)`, solid when its
//! density is negative. A quad is emitted on every shared face between a
//! solid and an empty voxel, facing the empty side. Each chunk owns the
//! faces on planes `1..=chunk_size` of each axis; the plane at 0 belongs to
//! the neighbor.

use glam::Vec3;

use super::{cell_count, polygonize_slabs, IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::density::SampleGrid;

/// Blocky voxel mesher
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxelMesher;

impl Polygonizer for BoxelMesher {
    fn algorithm(&self) -> IsosurfaceAlgorithm {
        IsosurfaceAlgorithm::Boxel
    }

    fn polygonize(&self, grid: &SampleGrid, chunk_size: usize) -> MeshData {
        let n = cell_count(grid, chunk_size);
        polygonize_slabs(n, |z, mesh| {
            for y in 0..n {
                for x in 0..n {
                    let solid = grid.get(x, y, z) < 0.0;
                    let p = [x, y, z];
                    for axis in 0..3 {
                        let mut q = p;
                        q[axis] += 1;
                        let neighbor_solid = grid.get(q[0], q[1], q[2]) < 0.0;
                        if solid != neighbor_solid {
                            push_face(mesh, p, axis, solid);
                        }
                    }
                }
            }
        })
    }

    /// Two triangles per face
    fn triangle_multiplier(&self) -> usize {
        6
    }
}

/// Quad on the `+axis` face of voxel `p`, facing `+axis` when `outward`
fn push_face(mesh: &mut MeshData, p: [usize; 3], axis: usize, outward: bool) {
    let b = (axis + 1) % 3;
    let c = (axis + 2) % 3;
    let mut origin = Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32);
    origin[axis] += 1.0;
    let mut eb = Vec3::ZERO;
    eb[b] = 1.0;
    let mut ec = Vec3::ZERO;
    ec[c] = 1.0;
    let mut normal = Vec3::ZERO;
    normal[axis] = if outward { 1.0 } else { -1.0 };

    // eb x ec points along +axis, so this order is counter-clockwise from +axis
    let mut corners = [origin, origin + eb, origin + eb + ec, origin + ec];
    if !outward {
        corners.reverse();
    }
    let base = mesh.push_vertex(corners[0], normal);
    for corner in &corners[1..] {
        mesh.push_vertex(*corner, normal);
    }
    mesh.triangles.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    mesh.counter += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_grids::signed_volume;

    #[test]
    fn test_single_voxel_is_a_closed_cube() {
        let grid = SampleGrid::from_fn(5, |x, y, z| if (x, y, z) == (2, 2, 2) { -1.0 } else { 1.0 });
        let mesh = BoxelMesher.polygonize(&grid, 4);
        assert_eq!(mesh.counter, 6);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangles.len(), 36);
        assert!((signed_volume(&mesh) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normals_face_empty_side() {
        let grid = SampleGrid::from_fn(3, |_, y, _| if y == 0 { -1.0 } else { 1.0 });
        let mesh = BoxelMesher.polygonize(&grid, 2);
        // Floor of 2x2 voxels exposes 4 top faces
        assert_eq!(mesh.counter, 4);
        for n in mesh.normals.unwrap() {
            assert_eq!(n, [0.0, 1.0, 0.0]);
        }
        for v in mesh.vertices {
            assert_eq!(v[1], 1.0);
        }
    }

    #[test]
    fn test_faces_only_on_owned_planes() {
        // Solid everywhere except the border layer
        let grid = SampleGrid::from_fn(5, |x, y, z| if x < 4 && y < 4 && z < 4 { -1.0 } else { 1.0 });
        let mesh = BoxelMesher.polygonize(&grid, 4);
        // Only the three +axis boundary planes face the border: 3 * 16 faces
        assert_eq!(mesh.counter, 48);
    }
}
