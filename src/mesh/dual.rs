//! Shared skeleton of the dual methods (surface nets, dual contouring).
//!
//! One vertex is placed in every cell the surface crosses, and one quad is
//! emitted for every grid edge with a sign change, joining the four cells
//! around that edge. A chunk owns the edges starting at `[0, chunk_size)`
//! along their own axis and at `[1, chunk_size]` on the other two, so
//! neighboring chunks never emit the same quad. Reaching `chunk_size` on
//! the other axes needs a border of at least 2; with a border of 1 the last
//! row of quads is dropped.

use glam::Vec3;
use rayon::prelude::*;

use super::marching_cubes::Cell;
use super::tables::EDGE_CONNECTIONS;
use super::MeshData;
use crate::density::{flatten, SampleGrid};

const UNASSIGNED: u32 = u32::MAX;

/// Surface vertex of a cell, with its normal
#[derive(Debug, Clone, Copy)]
struct CellVertex {
    position: Vec3,
    normal: Vec3,
}

/// Zero crossings on the edges of `cell`
pub(crate) fn edge_crossings(cell: &Cell) -> impl Iterator<Item = Vec3> + '_ {
    EDGE_CONNECTIONS
        .iter()
        .enumerate()
        .filter(|(_, [a, b])| (cell.values[*a] < 0.0) != (cell.values[*b] < 0.0))
        .map(|(edge, _)| cell.edge_crossing(edge))
}

/// Build a dual mesh, using `place` to position the vertex of each
/// crossed cell.
pub(crate) fn polygonize_dual<F>(grid: &SampleGrid, chunk_size: usize, place: F) -> MeshData
where
    F: Fn(&SampleGrid, &Cell) -> Vec3 + Sync,
{
    let cells = grid.size().saturating_sub(1);
    let chunk = chunk_size.min(cells);
    // Cells that can carry a vertex referenced by this chunk's quads
    let span = (chunk + 1).min(cells);
    if chunk == 0 || span < 2 {
        return MeshData::with_normals();
    }

    let place = &place;
    let vertices: Vec<Option<CellVertex>> = (0..span)
        .into_par_iter()
        .flat_map_iter(move |z| {
            (0..span).flat_map(move |y| {
                (0..span).map(move |x| {
                    let cell = Cell::load(grid, x, y, z);
                    let case = cell.case_index();
                    if case == 0 || case == 0xff {
                        return None;
                    }
                    let position = place(grid, &cell);
                    Some(CellVertex { position, normal: grid.normal_at(position) })
                })
            })
        })
        .collect();

    let hi = span - 1;
    let quads: Vec<[usize; 4]> = (0..chunk.max(hi + 1))
        .into_par_iter()
        .flat_map_iter(|z| {
            let mut slab = Vec::new();
            for y in 0..=hi {
                for x in 0..=hi {
                    for axis in 0..3 {
                        if let Some(quad) = edge_quad(grid, [x, y, z], axis, chunk, hi, span) {
                            slab.push(quad);
                        }
                    }
                }
            }
            slab
        })
        .collect();

    let mut mesh = MeshData::with_normals();
    let mut remap = vec![UNASSIGNED; vertices.len()];
    'quads: for quad in quads {
        let mut corners = [0u32; 4];
        for (corner, &cell) in corners.iter_mut().zip(&quad) {
            if remap[cell] == UNASSIGNED {
                let Some(vertex) = vertices[cell] else {
                    continue 'quads;
                };
                remap[cell] = mesh.push_vertex(vertex.position, vertex.normal);
            }
            *corner = remap[cell];
        }
        let [a, b, c, d] = corners;
        mesh.triangles.extend_from_slice(&[a, b, c, a, c, d]);
        mesh.counter += 1;
    }
    mesh
}

/// Cells around the edge from `p` along `axis`, wound counter-clockwise when
/// seen from the empty side. `None` when the edge is not owned or not
/// crossed.
fn edge_quad(
    grid: &SampleGrid,
    p: [usize; 3],
    axis: usize,
    chunk: usize,
    hi: usize,
    span: usize,
) -> Option<[usize; 4]> {
    let b = (axis + 1) % 3;
    let c = (axis + 2) % 3;
    if p[axis] >= chunk || p[b] == 0 || p[c] == 0 || p[b] > hi || p[c] > hi {
        return None;
    }
    let mut q = p;
    q[axis] += 1;
    let d0 = grid.get(p[0], p[1], p[2]);
    let d1 = grid.get(q[0], q[1], q[2]);
    let inside = d0 < 0.0;
    if inside == (d1 < 0.0) {
        return None;
    }

    let cell = |db: usize, dc: usize| {
        let mut m = p;
        m[b] -= db;
        m[c] -= dc;
        flatten(m[0], m[1], m[2], span)
    };
    // e_b x e_c = e_axis, so this order faces +axis
    let quad = [cell(1, 1), cell(0, 1), cell(0, 0), cell(1, 0)];
    Some(if inside { quad } else { [quad[3], quad[2], quad[1], quad[0]] })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroid(_: &SampleGrid, cell: &Cell) -> Vec3 {
        cell.positions[0] + Vec3::splat(0.5)
    }

    #[test]
    fn test_plane_quads_face_up() {
        let grid = SampleGrid::from_fn(6, |_, y, _| y as f32 - 2.5);
        let mesh = polygonize_dual(&grid, 4, centroid);
        // Vertical edges crossing y = 2.5 with x, z in [1, 4]
        assert_eq!(mesh.counter, 16);
        assert_eq!(mesh.triangles.len(), 96);
        for tri in mesh.triangles.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[tri[i] as usize]));
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn test_thin_border_drops_last_row() {
        let grid = SampleGrid::from_fn(5, |_, y, _| y as f32 - 2.5);
        let mesh = polygonize_dual(&grid, 4, centroid);
        // x, z limited to [1, 3]
        assert_eq!(mesh.counter, 9);
    }

    #[test]
    fn test_vertices_are_shared() {
        let grid = SampleGrid::from_fn(6, |_, y, _| y as f32 - 2.5);
        let mesh = polygonize_dual(&grid, 4, centroid);
        // Cells x, z in [0, 4] at y = 2
        assert_eq!(mesh.vertices.len(), 25);
    }
}
