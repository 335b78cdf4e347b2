//! Mesh a single chunk, apply a few brushes and report what each algorithm
//! produced.
//!
//! Usage: mesh_chunk [config.json] [--algorithm <name|id>] [--all]

use std::time::{Duration, Instant};

use glam::{IVec3, Vec3};

use isovox::core::config::ChunkConfig;
use isovox::core::time::FrameTimer;
use isovox::core::{logging, Result};
use isovox::density::{CsgOperation, ShapeKind};
use isovox::mesh::{IsosurfaceAlgorithm, MeshData};
use isovox::voxel::{Brush, Chunk};

const TICK: Duration = Duration::from_millis(16);
const TIMEOUT: Duration = Duration::from_secs(60);

fn main() {
    logging::init();
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut config = ChunkConfig::default();
    let mut algorithms = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--all" => algorithms.extend(IsosurfaceAlgorithm::ALL),
            "--algorithm" | "-a" => {
                let value = args.next().unwrap_or_default();
                algorithms.push(value.parse()?);
            }
            path => config = ChunkConfig::load(path)?,
        }
    }
    if algorithms.is_empty() {
        algorithms.push(config.algorithm);
    }

    for algorithm in algorithms {
        let config = ChunkConfig { algorithm, ..config };
        mesh_with(&config)?;
    }
    Ok(())
}

fn mesh_with(config: &ChunkConfig) -> Result<()> {
    let start = Instant::now();
    let mut chunk = Chunk::create(config, IVec3::ZERO, Vec3::ZERO)?;

    let center = config.density.center;
    chunk.apply_brush(&Brush::carve(center, config.density.radius * 0.5));
    chunk.apply_brush(&Brush::new(ShapeKind::Cube, CsgOperation::Union, center + Vec3::new(0.0, config.density.radius, 0.0), 3.0));
    chunk.modify(ShapeKind::Torus, center, config.density.radius + 2.0, CsgOperation::Union);

    let mut timer = FrameTimer::fixed_step(TICK);
    let mut last: Option<MeshData> = None;
    while !chunk.is_idle() || timer.frame_count() == 0 {
        timer.tick();
        if let Some(mesh) = chunk.tick(timer.time())? {
            log::debug!("Frame {}: {} primitives", timer.frame_count(), mesh.counter);
            last = Some(mesh);
        }
        if start.elapsed() > TIMEOUT {
            log::warn!("{}: gave up waiting for the chunk to settle", config.algorithm);
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    match last {
        Some(mesh) => log::info!(
            "{}: {} primitives, {} vertices, {} index bytes, bounds {:?} in {:.2?} ({} frames)",
            config.algorithm,
            mesh.counter,
            mesh.vertex_count(),
            mesh.index_bytes().len(),
            mesh.bounds(),
            start.elapsed(),
            timer.frame_count()
        ),
        None => log::info!("{}: chunk produced no surface", config.algorithm),
    }
    chunk.dispose();
    Ok(())
}
