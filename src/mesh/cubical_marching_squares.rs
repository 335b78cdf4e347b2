//! Cubical marching squares.
//!
//! Each cell face is contoured on its own with marching squares, resolving
//! the saddle case by the average of the face corners. Because a crossed
//! cell edge is shared by exactly two faces, the face segments chain into
//! closed loops, which are fanned into triangles around their centroid.

use glam::Vec3;

use super::marching_cubes::Cell;
use super::{cell_count, polygonize_slabs, push_oriented_triangle, IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::density::SampleGrid;

/// Cell faces as corner cycles, with the cell edge between each consecutive
/// pair of corners
const FACES: [([usize; 4], [usize; 4]); 6] = [
    ([0, 1, 2, 3], [0, 1, 2, 3]),
    ([4, 5, 6, 7], [4, 5, 6, 7]),
    ([0, 1, 5, 4], [0, 9, 4, 8]),
    ([3, 2, 6, 7], [2, 10, 6, 11]),
    ([0, 3, 7, 4], [3, 11, 7, 8]),
    ([1, 2, 6, 5], [1, 10, 5, 9]),
];

/// Cubical marching squares mesher
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicalMarchingSquaresMesher;

impl Polygonizer for CubicalMarchingSquaresMesher {
    fn algorithm(&self) -> IsosurfaceAlgorithm {
        IsosurfaceAlgorithm::CubicalMarchingSquares
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
                    for contour in contours(&cell) {
                        triangulate(grid, &cell, &contour, mesh);
                    }
                }
            }
        })
    }

    fn triangle_multiplier(&self) -> usize {
        3
    }
}

/// Segments of one face, as pairs of cell edge ids
fn face_segments(cell: &Cell, corners: &[usize; 4], edges: &[usize; 4], out: &mut Vec<[usize; 2]>) {
    let inside = corners.map(|c| cell.values[c] < 0.0);
    let crossed: Vec<usize> = (0..4).filter(|&i| inside[i] != inside[(i + 1) % 4]).collect();
    match crossed.len() {
        2 => out.push([edges[crossed[0]], edges[crossed[1]]]),
        4 => {
            let center = corners.iter().map(|&c| cell.values[c]).sum::<f32>() * 0.25;
            if (center < 0.0) == inside[0] {
                // Corners 0 and 2 connect through the center; cut off 1 and 3
                out.push([edges[0], edges[1]]);
                out.push([edges[2], edges[3]]);
            } else {
                out.push([edges[3], edges[0]]);
                out.push([edges[1], edges[2]]);
            }
        }
        _ => {}
    }
}

/// Closed loops of crossed edge ids
fn contours(cell: &Cell) -> Vec<Vec<usize>> {
    let mut segments = Vec::with_capacity(8);
    for (corners, edges) in &FACES {
        face_segments(cell, corners, edges, &mut segments);
    }

    let mut links: [[Option<usize>; 2]; 12] = [[None; 2]; 12];
    for &[a, b] in &segments {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(slot) = links[from].iter_mut().find(|slot| slot.is_none()) {
                *slot = Some(to);
            }
        }
    }

    let mut visited = [false; 12];
    let mut loops = Vec::new();
    for start in 0..12 {
        if visited[start] || links[start][0].is_none() {
            continue;
        }
        let mut contour = vec![start];
        visited[start] = true;
        let mut previous = start;
        let mut current = links[start][0];
        while let Some(edge) = current {
            if visited[edge] {
                break;
            }
            visited[edge] = true;
            contour.push(edge);
            current = links[edge]
                .iter()
                .flatten()
                .copied()
                .find(|&next| next != previous);
            previous = edge;
        }
        if contour.len() >= 3 {
            loops.push(contour);
        }
    }
    loops
}

fn triangulate(grid: &SampleGrid, cell: &Cell, contour: &[usize], mesh: &mut MeshData) {
    let points: Vec<Vec3> = contour.iter().map(|&edge| cell.edge_crossing(edge)).collect();
    if let [a, b, c] = points[..] {
        push_oriented_triangle(mesh, grid, [a, b, c]);
        return;
    }
    let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;
    for (i, &p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        push_oriented_triangle(mesh, grid, [centroid, p, q]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tables::EDGE_CONNECTIONS;

    #[test]
    fn test_face_edges_join_face_corners() {
        for (corners, edges) in &FACES {
            for i in 0..4 {
                let mut pair = EDGE_CONNECTIONS[edges[i]];
                pair.sort();
                let mut expected = [corners[i], corners[(i + 1) % 4]];
                expected.sort();
                assert_eq!(pair, expected);
            }
        }
    }

    #[test]
    fn test_single_corner_gives_triangle() {
        let grid = SampleGrid::from_fn(2, |x, y, z| if (x, y, z) == (1, 1, 1) { -1.0 } else { 1.0 });
        let cell = Cell::load(&grid, 0, 0, 0);
        let loops = contours(&cell);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 3);
    }

    #[test]
    fn test_plane_cell_gives_quad_loop() {
        let grid = SampleGrid::from_fn(2, |_, y, _| y as f32 - 0.5);
        let loops = contours(&Cell::load(&grid, 0, 0, 0));
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);

        let mesh = CubicalMarchingSquaresMesher.polygonize(&grid, 1);
        // Fan of four triangles around the centroid
        assert_eq!(mesh.counter, 4);
        for tri in mesh.triangles.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.vertices[tri[i] as usize]));
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn test_opposite_corners_separate() {
        // Diagonal corners 0 and 6 inside: two separate caps
        let grid = SampleGrid::from_fn(2, |x, y, z| match (x, y, z) {
            (0, 0, 0) | (1, 1, 1) => -0.2,
            _ => 1.0,
        });
        let loops = contours(&Cell::load(&grid, 0, 0, 0));
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.len() == 3));
    }
}
