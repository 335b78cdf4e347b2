//! Isosurface extraction.
//!
//! Six polygonizers share one contract: they read a composed `SampleGrid`
//! and emit a `MeshData` in chunk-local coordinates. `MeshBuilder` runs them
//! in the background against a density field.

pub mod tables;
pub mod boxel;
pub mod marching_cubes;
pub mod marching_tetrahedra;
pub mod dual;
pub mod surface_nets;
pub mod dual_contouring;
pub mod cubical_marching_squares;
pub mod builder;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::density::SampleGrid;
use crate::math::Aabb;

pub use boxel::BoxelMesher;
pub use builder::{BuilderState, MeshBuilder};
pub use cubical_marching_squares::CubicalMarchingSquaresMesher;
pub use dual_contouring::DualContouringMesher;
pub use marching_cubes::MarchingCubesMesher;
pub use marching_tetrahedra::MarchingTetrahedraMesher;
pub use surface_nets::SurfaceNetsMesher;

/// Meshing algorithm identifiers, in the order of their numeric ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IsosurfaceAlgorithm {
    Boxel,
    MarchingCubes,
    MarchingTetrahedra,
    NaiveSurfaceNets,
    DualContouring,
    CubicalMarchingSquares,
}

impl IsosurfaceAlgorithm {
    pub const ALL: [IsosurfaceAlgorithm; 6] = [
        IsosurfaceAlgorithm::Boxel,
        IsosurfaceAlgorithm::MarchingCubes,
        IsosurfaceAlgorithm::MarchingTetrahedra,
        IsosurfaceAlgorithm::NaiveSurfaceNets,
        IsosurfaceAlgorithm::DualContouring,
        IsosurfaceAlgorithm::CubicalMarchingSquares,
    ];

    /// Map a numeric id; unknown ids are a configuration error
    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or(Error::UnknownAlgorithm(id))
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            IsosurfaceAlgorithm::Boxel => "Boxel",
            IsosurfaceAlgorithm::MarchingCubes => "MarchingCubes",
            IsosurfaceAlgorithm::MarchingTetrahedra => "MarchingTetrahedra",
            IsosurfaceAlgorithm::NaiveSurfaceNets => "NaiveSurfaceNets",
            IsosurfaceAlgorithm::DualContouring => "DualContouring",
            IsosurfaceAlgorithm::CubicalMarchingSquares => "CubicalMarchingSquares",
        }
    }

    /// Smallest field border that lets neighboring chunks' meshes meet.
    ///
    /// Dual methods place a vertex in the cell past the chunk edge, which
    /// reads samples two layers out.
    pub fn min_border_size(self) -> usize {
        match self {
            IsosurfaceAlgorithm::NaiveSurfaceNets | IsosurfaceAlgorithm::DualContouring => 2,
            _ => 1,
        }
    }

    /// Polygonizer implementing this algorithm
    pub fn polygonizer(self) -> Arc<dyn Polygonizer> {
        match self {
            IsosurfaceAlgorithm::Boxel => Arc::new(BoxelMesher),
            IsosurfaceAlgorithm::MarchingCubes => Arc::new(MarchingCubesMesher),
            IsosurfaceAlgorithm::MarchingTetrahedra => Arc::new(MarchingTetrahedraMesher),
            IsosurfaceAlgorithm::NaiveSurfaceNets => Arc::new(SurfaceNetsMesher),
            IsosurfaceAlgorithm::DualContouring => Arc::new(DualContouringMesher::default()),
            IsosurfaceAlgorithm::CubicalMarchingSquares => Arc::new(CubicalMarchingSquaresMesher),
        }
    }
}

impl fmt::Display for IsosurfaceAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IsosurfaceAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(id) = s.parse::<u32>() {
            return Self::from_id(id);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownAlgorithmName(s.to_string()))
    }
}

/// Accepts a name or numeric id. Unknown values are rejected.
impl<'de> Deserialize<'de> for IsosurfaceAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(u32),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Id(id) => Self::from_id(id),
            Repr::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// One isosurface extraction strategy
pub trait Polygonizer: Send + Sync {
    fn algorithm(&self) -> IsosurfaceAlgorithm;

    /// Extract the surface of the cells `[0, chunk_size)` on each axis.
    ///
    /// Samples past the chunk (the border) are read but produce no cells of
    /// their own.
    fn polygonize(&self, grid: &SampleGrid, chunk_size: usize) -> MeshData;

    /// Index entries contributed per counted primitive
    fn triangle_multiplier(&self) -> usize;
}

/// Polygonizer output, ready for a render or collision backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Chunk-local vertex positions
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<u32>,
    /// Emitted primitives (faces, triangles or quads depending on algorithm)
    pub counter: usize,
    pub normals: Option<Vec<[f32; 3]>>,
    /// World offset of the chunk the mesh belongs to
    pub origin: Vec3,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty mesh with normals enabled
    pub fn with_normals() -> Self {
        Self {
            normals: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// No primitives were emitted
    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Append a vertex and return its index
    #[inline]
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position.to_array());
        if let Some(normals) = self.normals.as_mut() {
            normals.push(normal.to_array());
        }
        index
    }

    /// Append `other`, rebasing its indices
    pub fn merge(&mut self, other: MeshData) {
        if self.vertices.is_empty() {
            self.normals = other.normals;
        } else {
            match (self.normals.as_mut(), other.normals) {
                (Some(normals), Some(more)) => normals.extend(more),
                _ => self.normals = None,
            }
        }
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.triangles.extend(other.triangles.into_iter().map(|i| i + base));
        self.counter += other.counter;
    }

    /// World-space bounds of the vertices
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|&v| Vec3::from_array(v) + self.origin))
    }

    /// Vertex positions as raw bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Indices as raw bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    pub fn normal_bytes(&self) -> Option<&[u8]> {
        self.normals.as_deref().map(bytemuck::cast_slice)
    }
}

/// Cells per axis a polygonizer walks for this grid
#[inline]
pub(crate) fn cell_count(grid: &SampleGrid, chunk_size: usize) -> usize {
    chunk_size.min(grid.size().saturating_sub(1))
}

/// Run `slab` for each z layer in parallel and merge the partial meshes in
/// z order.
pub(crate) fn polygonize_slabs<F>(layers: usize, slab: F) -> MeshData
where
    F: Fn(usize, &mut MeshData) + Send + Sync,
{
    (0..layers)
        .into_par_iter()
        .map(|z| {
            let mut mesh = MeshData::with_normals();
            slab(z, &mut mesh);
            mesh
        })
        .collect::<Vec<_>>()
        .into_iter()
        .fold(MeshData::with_normals(), |mut acc, part| {
            acc.merge(part);
            acc
        })
}

/// Linear zero crossing between two samples
#[inline]
pub(crate) fn interpolate(p0: Vec3, p1: Vec3, v0: f32, v1: f32) -> Vec3 {
    let denom = v1 - v0;
    if denom.abs() < 1e-6 {
        return (p0 + p1) * 0.5;
    }
    let t = (-v0 / denom).clamp(0.0, 1.0);
    p0 + (p1 - p0) * t
}

/// Append a triangle with unshared vertices, wound so it faces down the
/// density gradient (outward).
pub(crate) fn push_oriented_triangle(mesh: &mut MeshData, grid: &SampleGrid, corners: [Vec3; 3]) {
    let [a, mut b, mut c] = corners;
    let na = grid.normal_at(a);
    let mut nb = grid.normal_at(b);
    let mut nc = grid.normal_at(c);
    let face = (b - a).cross(c - a);
    if face.length_squared() < 1e-12 {
        return;
    }
    if face.dot(na + nb + nc) < 0.0 {
        std::mem::swap(&mut b, &mut c);
        std::mem::swap(&mut nb, &mut nc);
    }
    let i0 = mesh.push_vertex(a, na);
    let i1 = mesh.push_vertex(b, nb);
    let i2 = mesh.push_vertex(c, nc);
    mesh.triangles.extend_from_slice(&[i0, i1, i2]);
    mesh.counter += 1;
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_grids::{signed_volume, sphere};

    #[test]
    fn test_algorithm_ids() {
        for algorithm in IsosurfaceAlgorithm::ALL {
            assert_eq!(IsosurfaceAlgorithm::from_id(algorithm.id()).unwrap(), algorithm);
            assert_eq!(algorithm.polygonizer().algorithm(), algorithm);
        }
        assert!(matches!(IsosurfaceAlgorithm::from_id(6), Err(Error::UnknownAlgorithm(6))));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("DualContouring".parse::<IsosurfaceAlgorithm>().unwrap(), IsosurfaceAlgorithm::DualContouring);
        assert_eq!("boxel".parse::<IsosurfaceAlgorithm>().unwrap(), IsosurfaceAlgorithm::Boxel);
        assert_eq!("2".parse::<IsosurfaceAlgorithm>().unwrap(), IsosurfaceAlgorithm::MarchingTetrahedra);
        assert!(matches!("Raymarch".parse::<IsosurfaceAlgorithm>(), Err(Error::UnknownAlgorithmName(_))));
    }

    #[test]
    fn test_deserialize_rejects_unknown() {
        let by_name: IsosurfaceAlgorithm = serde_json::from_str("\"NaiveSurfaceNets\"").unwrap();
        assert_eq!(by_name, IsosurfaceAlgorithm::NaiveSurfaceNets);
        assert!(serde_json::from_str::<IsosurfaceAlgorithm>("17").is_err());
    }

    #[test]
    fn test_merge_rebases_indices() {
        let mut a = MeshData::with_normals();
        a.push_vertex(Vec3::ZERO, Vec3::Y);
        a.triangles.push(0);
        a.counter = 1;
        let mut b = MeshData::with_normals();
        b.push_vertex(Vec3::ONE, Vec3::Y);
        b.push_vertex(Vec3::X, Vec3::Y);
        b.triangles.extend([1, 0]);
        b.counter = 1;
        a.merge(b);
        assert_eq!(a.triangles, vec![0, 2, 1]);
        assert_eq!(a.counter, 2);
        assert_eq!(a.normals.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_bounds_include_origin() {
        let mut mesh = MeshData::new();
        mesh.push_vertex(Vec3::ZERO, Vec3::ZERO);
        mesh.push_vertex(Vec3::splat(2.0), Vec3::ZERO);
        mesh.origin = Vec3::new(16.0, 0.0, 0.0);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(16.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(18.0, 2.0, 2.0));
        assert!(MeshData::new().bounds().is_none());
    }

    #[test]
    fn test_byte_views() {
        let mut mesh = MeshData::new();
        mesh.push_vertex(Vec3::ONE, Vec3::ZERO);
        mesh.triangles.extend([0, 0, 0]);
        assert_eq!(mesh.vertex_bytes().len(), 12);
        assert_eq!(mesh.index_bytes().len(), 12);
        assert!(mesh.normal_bytes().is_none());
    }

    #[test]
    fn test_every_algorithm_meshes_a_sphere() {
        let grid = sphere(18, Vec3::splat(8.0), 5.0);
        for algorithm in IsosurfaceAlgorithm::ALL {
            let mesher = algorithm.polygonizer();
            let mesh = mesher.polygonize(&grid, 16);
            assert!(!mesh.is_empty(), "{} produced nothing", algorithm);
            assert_eq!(mesh.counter * mesher.triangle_multiplier(), mesh.triangles.len(), "{}", algorithm);
            assert!(mesh.triangles.iter().all(|&i| (i as usize) < mesh.vertices.len()));
            assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(mesh.vertices.len()));
            // Closed surface with outward winding encloses positive volume
            let volume = signed_volume(&mesh);
            let expected = 4.0 / 3.0 * std::f32::consts::PI * 125.0;
            assert!(volume > expected * 0.6 && volume < expected * 1.6, "{}: volume {}", algorithm, volume);
        }
    }

    #[test]
    fn test_every_algorithm_skips_empty_and_full_fields() {
        let empty = SampleGrid::new(9, 1.0);
        let full = SampleGrid::new(9, -1.0);
        for algorithm in IsosurfaceAlgorithm::ALL {
            let mesher = algorithm.polygonizer();
            assert!(mesher.polygonize(&empty, 8).is_empty());
            assert!(mesher.polygonize(&full, 8).is_empty());
        }
    }
}
