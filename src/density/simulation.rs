//! Time-driven modulation of a field's base shape.

use std::sync::LazyLock;

use glam::Vec3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::primitive::DensityPrimitive;

/// Relative radius swing of `SimulationMode::Pulse`
pub const PULSE_AMPLITUDE: f32 = 0.25;
/// Density offset amplitude of `SimulationMode::Noise`
pub const NOISE_AMPLITUDE: f32 = 3.0;
pub const NOISE_FREQUENCY: f32 = 0.1;
/// Wave height of `SimulationMode::Tide`
pub const TIDE_AMPLITUDE: f32 = 2.0;
pub const TIDE_FREQUENCY: f32 = 0.2;
/// Engine time is scaled by this before it reaches the density functions
pub const TIME_SCALE: f32 = 2.0;

const NOISE_SEED: u32 = 7;

static SIMULATION_NOISE: LazyLock<Perlin> = LazyLock::new(|| Perlin::new(NOISE_SEED));

/// How a field evolves over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    /// Static field
    #[default]
    None,
    /// Radius breathes in and out
    Pulse,
    /// 4D noise drifting through the shape
    Noise,
    /// Travelling waves over the XZ plane
    Tide,
}

impl SimulationMode {
    pub fn is_active(self) -> bool {
        self != SimulationMode::None
    }

    /// Base density of `shape` at `p` and simulation time `t`
    pub fn density(self, shape: &DensityPrimitive, p: Vec3, t: f32) -> f32 {
        match self {
            SimulationMode::None => shape.density(p),
            SimulationMode::Pulse => match shape.radius() {
                Some(radius) => shape
                    .with_radius(radius * (1.0 + PULSE_AMPLITUDE * t.sin()))
                    .density(p),
                None => shape.density(p),
            },
            SimulationMode::Noise => {
                let n = p * NOISE_FREQUENCY;
                let offset = SIMULATION_NOISE.get([
                    n.x as f64,
                    n.y as f64,
                    n.z as f64,
                    (t * NOISE_FREQUENCY) as f64,
                ]) as f32;
                shape.density(p) + offset * NOISE_AMPLITUDE
            }
            SimulationMode::Tide => {
                let wave = (TIDE_FREQUENCY * p.x + t).sin() * (TIDE_FREQUENCY * p.z + t).cos();
                shape.density(p) + wave * TIDE_AMPLITUDE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere() -> DensityPrimitive {
        DensityPrimitive::Sphere { center: Vec3::ZERO, radius: 8.0 }
    }

    #[test]
    fn test_none_matches_shape() {
        let p = Vec3::new(3.0, 1.0, 2.0);
        assert_eq!(SimulationMode::None.density(&sphere(), p, 12.0), sphere().density(p));
    }

    #[test]
    fn test_pulse_grows_and_shrinks() {
        let p = Vec3::new(8.5, 0.0, 0.0);
        let peak = std::f32::consts::FRAC_PI_2;
        // At peak the radius is 10, so the point is inside
        assert!(SimulationMode::Pulse.density(&sphere(), p, peak) < 0.0);
        // At trough the radius is 6
        assert!(SimulationMode::Pulse.density(&sphere(), p, -peak) > 0.0);
    }

    #[test]
    fn test_tide_is_bounded() {
        let plane = DensityPrimitive::Plane { center: Vec3::ZERO, rotation: glam::Quat::IDENTITY };
        for t in [0.0, 0.7, 3.1] {
            let d = SimulationMode::Tide.density(&plane, Vec3::new(4.0, 0.0, 9.0), t);
            assert!(d.abs() <= TIDE_AMPLITUDE + 1e-4);
        }
    }

    #[test]
    fn test_noise_keeps_deep_interior_solid() {
        let d = SimulationMode::Noise.density(&sphere(), Vec3::ZERO, 5.0);
        assert!(d < 0.0);
    }
}
