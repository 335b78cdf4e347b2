//! Density field: the pre-sampled grid of one chunk plus its edit ledger.
//!
//! The field exclusively owns its sample array. Re-sampling runs as a
//! background job; at most one job may be in flight, and starting another
//! before the previous handle completes is rejected with
//! `Error::DensityJobPending`. Mesh builders read through a `FieldView`
//! and must wait for the producing job's handle before reading.
//!
//! Stored samples always carry the ledger: a base pass folds every entry
//! into the freshly sampled shape, and a new edit is folded into the
//! stored values. An edit that replaces another at the same key triggers a
//! full base pass so the replaced edit leaves no trace.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use glam::{IVec3, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::job::{self, JobHandle};
use crate::core::types::Result;
use super::grid::{unflatten, SampleGrid};
use super::ledger::{CsgOperation, ModificationEntry, ModificationLedger};
use super::primitive::DensityPrimitive;
use super::shape::{ShapeKind, ShapeSelector};
use super::simulation::{SimulationMode, TIME_SCALE};

/// Immutable per-chunk description of the base shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseDensityProperties {
    /// Extra samples past the chunk on the positive side of each axis
    pub border_size: usize,
    pub shape: ShapeKind,
    pub center: Vec3,
    pub radius: f32,
    pub simulation: SimulationMode,
}

impl Default for BaseDensityProperties {
    fn default() -> Self {
        Self {
            border_size: 1,
            shape: ShapeKind::Sphere,
            center: Vec3::splat(8.0),
            radius: 8.0,
            simulation: SimulationMode::None,
        }
    }
}

impl BaseDensityProperties {
    /// Base primitive these properties describe
    pub fn primitive(&self) -> DensityPrimitive {
        ShapeSelector::new().select(self.shape, self.center, self.radius)
    }
}

/// What a density job writes into each sample
#[derive(Debug, Clone, Copy)]
enum DensityPass {
    /// Overwrite with the base shape at simulation time `t`, ledger folded in
    Base { t: f32 },
    /// Fold one edit into the current value
    Modify { primitive: DensityPrimitive, operation: CsgOperation },
}

/// State shared between the field, its jobs and its views
#[derive(Debug, Default)]
struct FieldShared {
    grid: RwLock<Option<SampleGrid>>,
    ledger: RwLock<ModificationLedger>,
    /// Mirrors `grid.is_some()` without waiting on a running job
    allocated: AtomicBool,
    /// Simulation time of the last base pass, as `f32` bits
    base_time: AtomicU32,
}

impl FieldShared {
    fn base_time(&self) -> f32 {
        f32::from_bits(self.base_time.load(Ordering::Acquire))
    }
}

/// Geometry of a field: where its grid sits in world space
#[derive(Debug, Clone, Copy, PartialEq)]
struct FieldLayout {
    base: DensityPrimitive,
    simulation: SimulationMode,
    chunk_origin: IVec3,
    chunk_size: usize,
    /// Grid side length, chunk size plus border
    size: usize,
}

impl FieldLayout {
    #[inline]
    fn world(&self, x: usize, y: usize, z: usize) -> Vec3 {
        self.chunk_origin.as_vec3() + Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Base shape at time `t` with every ledger entry folded in
    #[inline]
    fn composed(&self, ledger: &ModificationLedger, p: Vec3, t: f32) -> f32 {
        ledger.compose_density(self.simulation.density(&self.base, p, t), p)
    }

    fn run(&self, pass: DensityPass, grid: &mut SampleGrid, ledger: &ModificationLedger) {
        let size = self.size;
        grid.values_mut()
            .par_chunks_mut(size * size)
            .enumerate()
            .for_each(|(z, slab)| {
                for (i, value) in slab.iter_mut().enumerate() {
                    let (x, y, _) = unflatten(i, size);
                    let p = self.world(x, y, z);
                    *value = match pass {
                        DensityPass::Base { t } => self.composed(ledger, p, t),
                        DensityPass::Modify { primitive, operation } => {
                            operation.combine(*value, primitive.density(p))
                        }
                    };
                }
            });
    }
}

/// Pre-sampled density for one chunk
pub struct DensityField {
    properties: BaseDensityProperties,
    layout: FieldLayout,
    shared: Arc<FieldShared>,
    pending: JobHandle,
    selector: ShapeSelector,
}

impl DensityField {
    /// Create a field and immediately schedule its base generation.
    ///
    /// The returned field's `pending_handle()` completes once every sample
    /// has been written.
    pub fn initialize(properties: BaseDensityProperties, chunk_origin: IVec3, chunk_size: usize) -> Result<Self> {
        let mut field = Self::lazy(properties, chunk_origin, chunk_size)?;
        field.build()?;
        Ok(field)
    }

    /// Create a field whose sample array is allocated on the first `build`
    pub fn lazy(properties: BaseDensityProperties, chunk_origin: IVec3, chunk_size: usize) -> Result<Self> {
        if properties.border_size == 0 {
            return Err(Error::InvalidBorder(properties.border_size));
        }
        let layout = FieldLayout {
            base: properties.primitive(),
            simulation: properties.simulation,
            chunk_origin,
            chunk_size,
            size: chunk_size + properties.border_size,
        };
        Ok(Self {
            properties,
            layout,
            shared: Arc::new(FieldShared::default()),
            pending: JobHandle::completed(),
            selector: ShapeSelector::new(),
        })
    }

    /// Allocate and sample the grid if that has not happened yet.
    ///
    /// Returns the handle of the generation job, or of whatever job is
    /// already outstanding.
    pub fn build(&mut self) -> Result<JobHandle> {
        if self.is_allocated() {
            return Ok(self.pending.clone());
        }
        let size = self.layout.size;
        log::debug!(
            "Allocating density field at {:?}: {}^3 samples",
            self.layout.chunk_origin, size
        );
        *self.shared.grid.write().unwrap_or_else(PoisonError::into_inner) = Some(SampleGrid::new(size, 0.0));
        self.shared.allocated.store(true, Ordering::Release);
        let t = self.shared.base_time();
        self.schedule(DensityPass::Base { t })
    }

    /// Record an edit in the ledger and re-sample the whole bordered grid.
    ///
    /// Fails with `DensityJobPending` while a previous job is running.
    pub fn schedule_modification(
        &mut self,
        shape: ShapeKind,
        center: Vec3,
        radius: f32,
        operation: CsgOperation,
    ) -> Result<JobHandle> {
        self.schedule_entry(ModificationEntry::new(shape, center, radius, operation))
    }

    /// `schedule_modification` for a prepared entry
    pub fn schedule_entry(&mut self, entry: ModificationEntry) -> Result<JobHandle> {
        self.check_schedulable()?;
        let replaced = self
            .shared
            .ledger
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(entry);
        if replaced.is_some() {
            // The old edit is baked into the samples; re-sample from the base
            log::debug!("Edit at {:?} replaced an earlier edit at the same key", entry.key());
            let t = self.shared.base_time();
            return self.schedule(DensityPass::Base { t });
        }
        self.schedule(DensityPass::Modify {
            primitive: entry.primitive(&self.selector),
            operation: entry.operation,
        })
    }

    /// Re-sample the base shape at engine time `time`, re-applying every
    /// ledger entry on top.
    pub fn schedule_update(&mut self, time: f32) -> Result<JobHandle> {
        self.check_schedulable()?;
        let t = time * TIME_SCALE;
        self.shared.base_time.store(t.to_bits(), Ordering::Release);
        self.schedule(DensityPass::Base { t })
    }

    fn check_schedulable(&self) -> Result<()> {
        if !self.pending.is_completed() {
            log::warn!("Rejected density job: one is already running at {:?}", self.layout.chunk_origin);
            return Err(Error::DensityJobPending);
        }
        if !self.is_allocated() {
            return Err(Error::FieldNotAllocated);
        }
        Ok(())
    }

    fn schedule(&mut self, pass: DensityPass) -> Result<JobHandle> {
        if !self.pending.is_completed() {
            return Err(Error::DensityJobPending);
        }
        let shared = Arc::clone(&self.shared);
        let layout = self.layout;
        log::debug!("Scheduling {:?} over {} samples", pass, layout.size.pow(3));
        self.pending = job::spawn(move || {
            let mut grid = shared.grid.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(grid) = grid.as_mut() {
                let ledger = shared.ledger.read().unwrap_or_else(PoisonError::into_inner);
                layout.run(pass, grid, &ledger);
            }
        });
        Ok(self.pending.clone())
    }

    /// Composed density at a grid coordinate: the base shape with every
    /// ledger entry folded in, read from the stored samples.
    ///
    /// Precondition: no job is pending. Coordinates outside the grid, or a
    /// field that was never built, are composed live.
    pub fn sample(&self, x: usize, y: usize, z: usize) -> f32 {
        self.view().sample(x, y, z)
    }

    /// Read-only view for mesh builders
    pub fn view(&self) -> FieldView {
        FieldView {
            shared: Arc::clone(&self.shared),
            layout: self.layout,
        }
    }

    /// Handle of the most recently scheduled job
    pub fn pending_handle(&self) -> JobHandle {
        self.pending.clone()
    }

    pub fn is_allocated(&self) -> bool {
        self.shared.allocated.load(Ordering::Acquire)
    }

    pub fn properties(&self) -> &BaseDensityProperties {
        &self.properties
    }

    pub fn chunk_origin(&self) -> IVec3 {
        self.layout.chunk_origin
    }

    pub fn chunk_size(&self) -> usize {
        self.layout.chunk_size
    }

    /// Grid side length including the border
    pub fn grid_size(&self) -> usize {
        self.layout.size
    }

    /// Copy of the ledger entries
    pub fn modifications(&self) -> Vec<ModificationEntry> {
        self.shared
            .ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    /// Wait for outstanding work, then release the sample array.
    ///
    /// Precondition: called once, at teardown.
    pub fn dispose(&mut self) {
        self.pending.complete();
        self.shared.allocated.store(false, Ordering::Release);
        self.shared.grid.write().unwrap_or_else(PoisonError::into_inner).take();
        log::debug!("Disposed density field at {:?}", self.layout.chunk_origin);
    }
}

/// Shared read-only access to a field's samples and ledger
#[derive(Clone)]
pub struct FieldView {
    shared: Arc<FieldShared>,
    layout: FieldLayout,
}

impl FieldView {
    pub fn chunk_size(&self) -> usize {
        self.layout.chunk_size
    }

    pub fn grid_size(&self) -> usize {
        self.layout.size
    }

    pub fn is_allocated(&self) -> bool {
        self.shared.allocated.load(Ordering::Acquire)
    }

    /// See `DensityField::sample`
    pub fn sample(&self, x: usize, y: usize, z: usize) -> f32 {
        let stored = self
            .shared
            .grid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|grid| grid.try_get(x, y, z));
        if let Some(value) = stored {
            return value;
        }
        let ledger = self.shared.ledger.read().unwrap_or_else(PoisonError::into_inner);
        self.layout.composed(&ledger, self.layout.world(x, y, z), self.shared.base_time())
    }

    /// Copy of the stored samples, as mesh extraction reads them
    pub fn raw(&self) -> Option<SampleGrid> {
        self.shared.grid.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fresh evaluation of the base shape and the whole ledger over the
    /// grid, independent of the stored samples.
    ///
    /// `None` if the field has not been built or has been disposed.
    pub fn compose(&self) -> Option<SampleGrid> {
        if !self.is_allocated() {
            return None;
        }
        let layout = self.layout;
        let t = self.shared.base_time();
        let mut composed = SampleGrid::new(layout.size, 0.0);
        let ledger = self.shared.ledger.read().unwrap_or_else(PoisonError::into_inner);
        layout.run(DensityPass::Base { t }, &mut composed, &ledger);
        Some(composed)
    }
}
