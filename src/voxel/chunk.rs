//! Chunk driver: one density field, one mesh builder and a queue of
//! pending edits, advanced once per tick.

use std::collections::VecDeque;

use glam::{IVec3, Vec3};

use crate::core::config::ChunkConfig;
use crate::core::job::JobHandle;
use crate::core::types::Result;
use crate::density::{CsgOperation, DensityField, ModificationEntry, ShapeKind, SimulationMode};
use crate::math::Aabb;
use crate::mesh::{BuilderState, MeshBuilder, MeshData};
use super::brush::Brush;

/// An edit waiting for its turn on the field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifyInstance {
    pub entry: ModificationEntry,
    /// Discretized brush position
    pub coordinates: IVec3,
}

impl ModifyInstance {
    pub fn new(entry: ModificationEntry) -> Self {
        Self { entry, coordinates: entry.key() }
    }
}

impl From<&Brush> for ModifyInstance {
    fn from(brush: &Brush) -> Self {
        Self {
            entry: brush.as_modification(),
            coordinates: brush.coordinates(),
        }
    }
}

/// A meshed region of the density world
pub struct Chunk {
    /// Integer chunk coordinate
    pub position: IVec3,
    /// World offset of the chunk's first sample
    offset: Vec3,
    field: DensityField,
    builder: MeshBuilder,
    pending: VecDeque<ModifyInstance>,
    simulation: SimulationMode,
    /// A mesh job is outstanding on the builder
    awaiting_mesh: bool,
}

impl Chunk {
    /// Build the field and mesh builder for `position`.
    ///
    /// With `pre_generate` the density job starts immediately and the first
    /// mesh is scheduled behind it; otherwise both wait for the first tick.
    /// The configured border is widened when the algorithm needs more to
    /// join its neighbors.
    pub fn create(config: &ChunkConfig, position: IVec3, offset: Vec3) -> Result<Self> {
        let origin = offset.floor().as_ivec3();
        let mut density = config.density;
        let required = config.algorithm.min_border_size();
        if density.border_size < required {
            log::debug!(
                "Widening border of chunk {:?} from {} to {} for {}",
                position, density.border_size, required, config.algorithm
            );
            density.border_size = required;
        }
        let field = if config.pre_generate {
            DensityField::initialize(density, origin, config.chunk_size)?
        } else {
            DensityField::lazy(density, origin, config.chunk_size)?
        };
        let builder = MeshBuilder::new(config.algorithm, &field, offset);
        let mut chunk = Self {
            position,
            offset,
            field,
            builder,
            pending: VecDeque::new(),
            simulation: density.simulation,
            awaiting_mesh: false,
        };
        if config.pre_generate {
            chunk.schedule_mesh(chunk.field.pending_handle())?;
        }
        log::debug!(
            "Created chunk {:?} ({}, size {}, pre-generated: {})",
            position, config.algorithm, config.chunk_size, config.pre_generate
        );
        Ok(chunk)
    }

    /// Queue an edit; edits are admitted one per tick in FIFO order
    pub fn modify(&mut self, shape: ShapeKind, position: Vec3, radius: f32, operation: CsgOperation) {
        self.enqueue(ModifyInstance::new(ModificationEntry::new(shape, position, radius, operation)));
    }

    /// Queue the edit a brush describes
    pub fn apply_brush(&mut self, brush: &Brush) {
        self.enqueue(ModifyInstance::from(brush));
    }

    fn enqueue(&mut self, instance: ModifyInstance) {
        log::debug!("Queued {:?} at {:?} on chunk {:?}", instance.entry.operation, instance.coordinates, self.position);
        self.pending.push_back(instance);
    }

    /// Advance the chunk by one tick.
    ///
    /// Returns a mesh when one finishes and has primitives. Empty meshes are
    /// dropped.
    pub fn tick(&mut self, time: f32) -> Result<Option<MeshData>> {
        if self.awaiting_mesh {
            let Some(mesh) = self.builder.try_get_mesh_data() else {
                return Ok(None);
            };
            self.awaiting_mesh = false;
            if mesh.is_empty() {
                log::debug!("Chunk {:?} produced an empty mesh; skipping", self.position);
                return Ok(None);
            }
            return Ok(Some(mesh));
        }

        if !self.field.is_allocated() {
            let handle = self.field.build()?;
            self.schedule_mesh(handle)?;
            return Ok(None);
        }

        if let Some(&instance) = self.pending.front() {
            let handle = self.field.schedule_entry(instance.entry)?;
            self.pending.pop_front();
            log::debug!(
                "Admitted {:?} {:?} r={} on chunk {:?} ({} left)",
                instance.entry.operation,
                instance.entry.shape,
                instance.entry.radius,
                self.position,
                self.pending.len()
            );
            self.schedule_mesh(handle)?;
            return Ok(None);
        }

        if self.simulation.is_active() {
            let handle = self.field.schedule_update(time)?;
            self.schedule_mesh(handle)?;
        }
        Ok(None)
    }

    fn schedule_mesh(&mut self, dependency: JobHandle) -> Result<()> {
        self.builder.schedule_mesh_job(dependency)?;
        self.awaiting_mesh = true;
        Ok(())
    }

    /// No queued edits and no outstanding mesh
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && !self.awaiting_mesh
    }

    pub fn pending_modifications(&self) -> usize {
        self.pending.len()
    }

    pub fn builder_state(&self) -> BuilderState {
        self.builder.state()
    }

    pub fn field(&self) -> &DensityField {
        &self.field
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// World box covered by the chunk's cells
    pub fn bounds(&self) -> Aabb {
        Aabb::from_chunk(self.offset, self.field.chunk_size())
    }

    /// Wait for outstanding work and release the field
    pub fn dispose(&mut self) {
        self.builder.dispose();
        self.field.dispose();
        self.pending.clear();
        self.awaiting_mesh = false;
        log::debug!("Disposed chunk {:?}", self.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use crate::mesh::IsosurfaceAlgorithm;

    fn config(pre_generate: bool) -> ChunkConfig {
        ChunkConfig {
            chunk_size: 16,
            algorithm: IsosurfaceAlgorithm::MarchingCubes,
            pre_generate,
            ..Default::default()
        }
    }

    /// Tick until the chunk goes idle, collecting meshes
    fn run(chunk: &mut Chunk) -> Vec<MeshData> {
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut meshes = Vec::new();
        let mut frame = 0;
        while Instant::now() < deadline {
            if let Some(mesh) = chunk.tick(frame as f32 * 0.016).unwrap() {
                meshes.push(mesh);
            }
            if chunk.is_idle() {
                break;
            }
            frame += 1;
            std::thread::sleep(Duration::from_millis(1));
        }
        meshes
    }

    #[test]
    fn test_pre_generated_chunk_meshes() {
        let mut chunk = Chunk::create(&config(true), IVec3::ZERO, Vec3::ZERO).unwrap();
        assert!(!chunk.is_idle());
        let meshes = run(&mut chunk);
        assert_eq!(meshes.len(), 1);
        assert!(!meshes[0].is_empty());
    }

    #[test]
    fn test_lazy_chunk_builds_on_first_tick() {
        let mut chunk = Chunk::create(&config(false), IVec3::ZERO, Vec3::ZERO).unwrap();
        assert!(!chunk.field().is_allocated());
        assert!(chunk.is_idle());
        assert!(chunk.tick(0.0).unwrap().is_none());
        assert!(chunk.field().is_allocated());
        assert_eq!(run(&mut chunk).len(), 1);
    }

    #[test]
    fn test_edits_admitted_one_per_tick() {
        let mut chunk = Chunk::create(&config(true), IVec3::ZERO, Vec3::ZERO).unwrap();
        run(&mut chunk);
        chunk.modify(ShapeKind::Sphere, Vec3::splat(8.0), 4.0, CsgOperation::Difference);
        chunk.apply_brush(&Brush::new(ShapeKind::Cube, CsgOperation::Union, Vec3::new(2.0, 2.0, 2.0), 3.0));
        assert_eq!(chunk.pending_modifications(), 2);

        chunk.tick(0.0).unwrap();
        assert_eq!(chunk.pending_modifications(), 1);
        let meshes = run(&mut chunk);
        assert_eq!(meshes.len(), 2);
        assert_eq!(chunk.field().modifications().len(), 2);
        assert!(chunk.field().sample(8, 8, 8) > 0.0);
    }

    #[test]
    fn test_empty_mesh_is_skipped() {
        let mut config = config(true);
        config.density.shape = ShapeKind::None;
        let mut chunk = Chunk::create(&config, IVec3::ZERO, Vec3::ZERO).unwrap();
        assert!(run(&mut chunk).is_empty());
        assert!(chunk.is_idle());
    }

    #[test]
    fn test_simulated_chunk_keeps_remeshing() {
        let mut config = config(true);
        config.density.simulation = SimulationMode::Pulse;
        let mut chunk = Chunk::create(&config, IVec3::ZERO, Vec3::ZERO).unwrap();
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut meshes = 0;
        let mut frame = 0;
        while meshes < 3 && Instant::now() < deadline {
            if chunk.tick(frame as f32 * 0.1).unwrap().is_some() {
                meshes += 1;
            }
            frame += 1;
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(meshes, 3);
        chunk.dispose();
        assert!(!chunk.field().is_allocated());
    }

    #[test]
    fn test_dual_algorithm_widens_border() {
        let mut config = config(true);
        config.algorithm = IsosurfaceAlgorithm::DualContouring;
        assert_eq!(config.density.border_size, 1);
        let mut chunk = Chunk::create(&config, IVec3::ZERO, Vec3::ZERO).unwrap();
        assert_eq!(chunk.field().properties().border_size, 2);
        assert_eq!(chunk.field().grid_size(), 18);
        assert_eq!(run(&mut chunk).len(), 1);
    }

    #[test]
    fn test_mesh_origin_and_bounds() {
        // Straddles the base sphere centered at (8, 8, 8)
        let offset = Vec3::new(8.0, 0.0, 0.0);
        let mut chunk = Chunk::create(&config(true), IVec3::new(1, 0, 0), offset).unwrap();
        let mesh = run(&mut chunk).pop().unwrap();
        assert_eq!(mesh.origin, offset);
        let bounds = mesh.bounds().unwrap();
        assert!(chunk.bounds().contains_point(bounds.min, 1e-4));
        assert!(chunk.bounds().contains_point(bounds.max, 1e-4));
    }
}
