//! Background mesh extraction against a density field.
//!
//! A builder moves Idle -> Scheduled -> Ready and back to Idle when the
//! mesh is taken. Scheduling waits on a dependency handle (normally the
//! density job that last wrote the field) before reading any samples.
//! Nothing blocks: the owner calls `try_get_mesh_data` once per tick.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;

use super::{IsosurfaceAlgorithm, MeshData, Polygonizer};
use crate::core::error::Error;
use crate::core::job::{JobHandle, Task};
use crate::core::types::Result;
use crate::density::{DensityField, FieldView};

/// Externally visible builder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// Nothing scheduled
    Idle,
    /// Waiting on the density dependency or extracting
    Scheduled,
    /// Mesh available from `try_get_mesh_data`
    Ready,
}

enum Stage {
    Idle,
    /// Dependency not yet complete
    Waiting(JobHandle),
    Running(Task<MeshData>),
    Ready(MeshData),
}

/// Runs one polygonizer over one field
pub struct MeshBuilder {
    algorithm: IsosurfaceAlgorithm,
    polygonizer: Arc<dyn Polygonizer>,
    view: FieldView,
    /// World offset stamped on produced meshes
    offset: Vec3,
    chunk_size: usize,
    stage: Stage,
}

impl MeshBuilder {
    pub fn new(algorithm: IsosurfaceAlgorithm, field: &DensityField, offset: Vec3) -> Self {
        Self {
            algorithm,
            polygonizer: algorithm.polygonizer(),
            view: field.view(),
            offset,
            chunk_size: field.chunk_size(),
            stage: Stage::Idle,
        }
    }

    /// Builder for a numeric algorithm id. Unknown ids are a configuration
    /// error.
    pub fn for_algorithm_id(id: u32, field: &DensityField, offset: Vec3) -> Result<Self> {
        Ok(Self::new(IsosurfaceAlgorithm::from_id(id)?, field, offset))
    }

    pub fn algorithm(&self) -> IsosurfaceAlgorithm {
        self.algorithm
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// Index entries per counted primitive of this builder's meshes
    pub fn triangle_multiplier(&self) -> usize {
        self.polygonizer.triangle_multiplier()
    }

    pub fn state(&self) -> BuilderState {
        match self.stage {
            Stage::Idle => BuilderState::Idle,
            Stage::Waiting(_) | Stage::Running(_) => BuilderState::Scheduled,
            Stage::Ready(_) => BuilderState::Ready,
        }
    }

    /// Start extracting once `dependency` completes.
    ///
    /// Rejected with `MeshJobPending` while a previous extraction is still
    /// scheduled, and with `BorderTooThin` when the field's border cannot
    /// close this algorithm's seams. An unclaimed ready mesh is discarded.
    pub fn schedule_mesh_job(&mut self, dependency: JobHandle) -> Result<()> {
        match self.stage {
            Stage::Waiting(_) | Stage::Running(_) => {
                log::warn!("Rejected {} mesh job: one is already scheduled", self.algorithm);
                return Err(Error::MeshJobPending);
            }
            Stage::Ready(_) => log::debug!("Discarding unclaimed {} mesh", self.algorithm),
            Stage::Idle => {}
        }
        let border = self.view.grid_size() - self.view.chunk_size();
        let required = self.algorithm.min_border_size();
        if border < required {
            return Err(Error::BorderTooThin { algorithm: self.algorithm.name(), required, border });
        }
        if !self.view.is_allocated() {
            return Err(Error::FieldNotAllocated);
        }
        self.stage = Stage::Waiting(dependency);
        self.poll();
        Ok(())
    }

    /// Advance the state machine without blocking
    pub fn poll(&mut self) {
        match &self.stage {
            Stage::Waiting(dependency) if dependency.is_completed() => {
                self.stage = Stage::Running(self.spawn());
            }
            Stage::Running(task) => match task.try_take() {
                None => {}
                Some(Some(mesh)) => self.stage = Stage::Ready(mesh),
                Some(None) => {
                    log::warn!("{} mesh job failed; producing an empty mesh", self.algorithm);
                    self.stage = Stage::Ready(MeshData { origin: self.offset, ..Default::default() });
                }
            },
            _ => {}
        }
    }

    fn spawn(&self) -> Task<MeshData> {
        let polygonizer = Arc::clone(&self.polygonizer);
        let view = self.view.clone();
        let offset = self.offset;
        let chunk_size = self.chunk_size;
        let algorithm = self.algorithm;
        Task::spawn(move || {
            let start = Instant::now();
            let mut mesh = match view.raw() {
                Some(grid) => polygonizer.polygonize(&grid, chunk_size),
                None => MeshData::new(),
            };
            mesh.origin = offset;
            log::debug!(
                "{} mesh at {:?}: {} primitives, {} vertices in {:.2?}",
                algorithm,
                offset,
                mesh.counter,
                mesh.vertices.len(),
                start.elapsed()
            );
            mesh
        })
    }

    /// Take the finished mesh, if any. Returns the builder to Idle.
    pub fn try_get_mesh_data(&mut self) -> Option<MeshData> {
        self.poll();
        if !matches!(self.stage, Stage::Ready(_)) {
            return None;
        }
        match std::mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Block until a running extraction finishes and drop its result.
    ///
    /// The dependency of a waiting job is owned by the field, which
    /// completes it on its own dispose.
    pub fn dispose(&mut self) {
        if let Stage::Running(task) = std::mem::replace(&mut self.stage, Stage::Idle) {
            task.handle().complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job;
    use crate::density::{BaseDensityProperties, CsgOperation, ShapeKind};
    use glam::IVec3;

    fn field(border_size: usize) -> DensityField {
        let props = BaseDensityProperties {
            border_size,
            shape: ShapeKind::Sphere,
            center: Vec3::splat(8.0),
            radius: 8.0,
            ..Default::default()
        };
        DensityField::initialize(props, IVec3::ZERO, 16).unwrap()
    }

    fn wait_for_mesh(builder: &mut MeshBuilder) -> MeshData {
        loop {
            if let Some(mesh) = builder.try_get_mesh_data() {
                return mesh;
            }
            std::thread::yield_now();
        }
    }

    #[test]
    fn test_unknown_algorithm_id() {
        let field = field(1);
        assert!(matches!(
            MeshBuilder::for_algorithm_id(42, &field, Vec3::ZERO),
            Err(Error::UnknownAlgorithm(42))
        ));
    }

    #[test]
    fn test_mesh_after_dependency() {
        let field = field(1);
        let mut builder = MeshBuilder::new(IsosurfaceAlgorithm::MarchingCubes, &field, Vec3::new(16.0, 0.0, 0.0));
        assert_eq!(builder.state(), BuilderState::Idle);
        builder.schedule_mesh_job(field.pending_handle()).unwrap();
        let mesh = wait_for_mesh(&mut builder);
        assert!(!mesh.is_empty());
        assert_eq!(mesh.origin, Vec3::new(16.0, 0.0, 0.0));
        assert_eq!(mesh.counter * builder.triangle_multiplier(), mesh.triangles.len());
        assert_eq!(builder.state(), BuilderState::Idle);
        assert!(builder.try_get_mesh_data().is_none());
    }

    #[test]
    fn test_waits_for_dependency() {
        let field = field(1);
        field.pending_handle().complete();
        let mut builder = MeshBuilder::new(IsosurfaceAlgorithm::Boxel, &field, Vec3::ZERO);

        let (release, blocked) = std::sync::mpsc::channel::<()>();
        let dependency = job::spawn(move || {
            let _ = blocked.recv();
        });
        builder.schedule_mesh_job(dependency.clone()).unwrap();
        assert_eq!(builder.state(), BuilderState::Scheduled);
        assert!(builder.try_get_mesh_data().is_none());
        assert!(matches!(builder.schedule_mesh_job(JobHandle::completed()), Err(Error::MeshJobPending)));

        release.send(()).unwrap();
        dependency.complete();
        assert!(!wait_for_mesh(&mut builder).is_empty());
    }

    #[test]
    fn test_mesh_reflects_modification() {
        let mut field = field(2);
        field.pending_handle().complete();
        let mut builder = MeshBuilder::new(IsosurfaceAlgorithm::NaiveSurfaceNets, &field, Vec3::ZERO);
        builder.schedule_mesh_job(field.pending_handle()).unwrap();
        let before = wait_for_mesh(&mut builder);

        let handle = field
            .schedule_modification(ShapeKind::Sphere, Vec3::splat(8.0), 4.0, CsgOperation::Difference)
            .unwrap();
        builder.schedule_mesh_job(handle).unwrap();
        let after = wait_for_mesh(&mut builder);
        // Carved cavity adds an inner surface
        assert!(after.counter > before.counter);
    }

    #[test]
    fn test_unbuilt_field_rejected() {
        let props = BaseDensityProperties::default();
        let field = DensityField::lazy(props, IVec3::ZERO, 8).unwrap();
        let mut builder = MeshBuilder::new(IsosurfaceAlgorithm::MarchingCubes, &field, Vec3::ZERO);
        assert!(matches!(
            builder.schedule_mesh_job(JobHandle::completed()),
            Err(Error::FieldNotAllocated)
        ));
    }

    #[test]
    fn test_dual_algorithms_need_wide_border() {
        let thin = field(1);
        thin.pending_handle().complete();
        for algorithm in [IsosurfaceAlgorithm::NaiveSurfaceNets, IsosurfaceAlgorithm::DualContouring] {
            let mut builder = MeshBuilder::new(algorithm, &thin, Vec3::ZERO);
            assert!(matches!(
                builder.schedule_mesh_job(thin.pending_handle()),
                Err(Error::BorderTooThin { required: 2, border: 1, .. })
            ));
            assert_eq!(builder.state(), BuilderState::Idle);
        }
        let mut builder = MeshBuilder::new(IsosurfaceAlgorithm::MarchingCubes, &thin, Vec3::ZERO);
        assert!(builder.schedule_mesh_job(thin.pending_handle()).is_ok());
        builder.dispose();
    }

    #[test]
    fn test_dispose_waits_for_running_job() {
        let field = field(2);
        let mut builder = MeshBuilder::new(IsosurfaceAlgorithm::DualContouring, &field, Vec3::ZERO);
        builder.schedule_mesh_job(field.pending_handle()).unwrap();
        builder.dispose();
        assert_eq!(builder.state(), BuilderState::Idle);
    }
}
