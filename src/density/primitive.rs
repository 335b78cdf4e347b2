//! Density primitives: closed-form implicit shapes.
//!
//! Every primitive maps a world-space point to a signed scalar, negative
//! inside and positive outside. Values are only required to be
//! sign-consistent, not exact distances.

use std::sync::LazyLock;

use glam::{Quat, Vec3};
use noise::{NoiseFn, Perlin};

/// Tube radius of the torus primitive
pub const TORUS_TUBE_RADIUS: f32 = 4.0;
/// Scale applied to the heart's unit-sized implicit equation
pub const HEART_SCALE: f32 = 1.25;
/// Half-extent of the tangle cube in its canonical coordinates
pub const GOURSAT_EXTENT: f32 = 3.5;
/// Height of the planet's surface relief
pub const PLANET_RELIEF: f32 = 2.0;
/// Spatial frequency of the planet's surface relief
pub const PLANET_FREQUENCY: f32 = 0.15;

const PLANET_SEED: u32 = 1337;

static PLANET_NOISE: LazyLock<Perlin> = LazyLock::new(|| Perlin::new(PLANET_SEED));

/// A placed density shape, ready to be evaluated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DensityPrimitive {
    /// Empty space; neutral under union and difference
    None,
    Sphere { center: Vec3, radius: f32 },
    /// Squared-offset pseudo-distance box
    Cube { center: Vec3, radius: f32, rotation: Quat },
    /// Vertical capsule
    Capsule { center: Vec3, radius: f32, rotation: Quat },
    /// Ring in the XZ plane
    Torus { center: Vec3, radius: f32, rotation: Quat },
    Heart { center: Vec3, radius: f32, rotation: Quat },
    /// Square pyramid, apex up
    Pyramid { center: Vec3, radius: f32, rotation: Quat },
    /// Table-cut gem
    Rubin { center: Vec3, radius: f32, rotation: Quat },
    /// Tangle cube
    GoursatsSurface { center: Vec3, radius: f32, rotation: Quat },
    /// Ground plane through `center`, solid below
    Plane { center: Vec3, rotation: Quat },
    /// Sphere with noise relief
    Planet { center: Vec3, radius: f32 },
}

/// Rotate a world-space point into the local frame of a shape
#[inline]
fn to_local(p: Vec3, center: Vec3, rotation: Quat) -> Vec3 {
    rotation.inverse() * (p - center)
}

impl DensityPrimitive {
    /// Density at a world-space position
    pub fn density(&self, p: Vec3) -> f32 {
        match *self {
            DensityPrimitive::None => f32::INFINITY,
            DensityPrimitive::Sphere { center, radius } => sphere(p - center, radius),
            DensityPrimitive::Cube { center, radius, rotation } => {
                cube(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::Capsule { center, radius, rotation } => {
                capsule(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::Torus { center, radius, rotation } => {
                torus(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::Heart { center, radius, rotation } => {
                heart(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::Pyramid { center, radius, rotation } => {
                pyramid(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::Rubin { center, radius, rotation } => {
                rubin(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::GoursatsSurface { center, radius, rotation } => {
                goursat(to_local(p, center, rotation), radius)
            }
            DensityPrimitive::Plane { center, rotation } => to_local(p, center, rotation).y,
            DensityPrimitive::Planet { center, radius } => planet(p - center, radius),
        }
    }

    /// Density at `(x, y, z)`
    #[inline]
    pub fn density_at(&self, x: f32, y: f32, z: f32) -> f32 {
        self.density(Vec3::new(x, y, z))
    }

    /// Same shape with its radius replaced (used by time-driven pulsing)
    pub fn with_radius(self, new_radius: f32) -> Self {
        match self {
            DensityPrimitive::Sphere { center, .. } => DensityPrimitive::Sphere { center, radius: new_radius },
            DensityPrimitive::Cube { center, rotation, .. } => DensityPrimitive::Cube { center, radius: new_radius, rotation },
            DensityPrimitive::Capsule { center, rotation, .. } => DensityPrimitive::Capsule { center, radius: new_radius, rotation },
            DensityPrimitive::Torus { center, rotation, .. } => DensityPrimitive::Torus { center, radius: new_radius, rotation },
            DensityPrimitive::Heart { center, rotation, .. } => DensityPrimitive::Heart { center, radius: new_radius, rotation },
            DensityPrimitive::Pyramid { center, rotation, .. } => DensityPrimitive::Pyramid { center, radius: new_radius, rotation },
            DensityPrimitive::Rubin { center, rotation, .. } => DensityPrimitive::Rubin { center, radius: new_radius, rotation },
            DensityPrimitive::GoursatsSurface { center, rotation, .. } => {
                DensityPrimitive::GoursatsSurface { center, radius: new_radius, rotation }
            }
            DensityPrimitive::Planet { center, .. } => DensityPrimitive::Planet { center, radius: new_radius },
            DensityPrimitive::None | DensityPrimitive::Plane { .. } => self,
        }
    }

    /// Radius the shape was built with, if it has one
    pub fn radius(&self) -> Option<f32> {
        match *self {
            DensityPrimitive::Sphere { radius, .. }
            | DensityPrimitive::Cube { radius, .. }
            | DensityPrimitive::Capsule { radius, .. }
            | DensityPrimitive::Torus { radius, .. }
            | DensityPrimitive::Heart { radius, .. }
            | DensityPrimitive::Pyramid { radius, .. }
            | DensityPrimitive::Rubin { radius, .. }
            | DensityPrimitive::GoursatsSurface { radius, .. }
            | DensityPrimitive::Planet { radius, .. } => Some(radius),
            DensityPrimitive::None | DensityPrimitive::Plane { .. } => None,
        }
    }
}

// =============================================================================
// Shape formulas (local space, shape centered at origin)
// =============================================================================

#[inline]
pub fn sphere(q: Vec3, radius: f32) -> f32 {
    q.length() - radius
}

/// Largest squared axis offset minus squared radius.
///
/// Not a true distance; the zero set is the axis-aligned box of half-size
/// `radius`.
#[inline]
pub fn cube(q: Vec3, radius: f32) -> f32 {
    let r2 = radius * radius;
    let xd = q.x * q.x - r2;
    let yd = q.y * q.y - r2;
    let zd = q.z * q.z - r2;
    xd.max(yd).max(zd)
}

#[inline]
pub fn capsule(q: Vec3, radius: f32) -> f32 {
    let half_height = radius * 0.5;
    let closest = Vec3::new(0.0, q.y.clamp(-half_height, half_height), 0.0);
    (q - closest).length() - radius * 0.5
}

#[inline]
pub fn torus(q: Vec3, radius: f32) -> f32 {
    let ring = (q.x * q.x + q.z * q.z).sqrt() - radius;
    (ring * ring + q.y * q.y).sqrt() - TORUS_TUBE_RADIUS
}

/// Taubin heart surface, Y up
#[inline]
pub fn heart(q: Vec3, radius: f32) -> f32 {
    let s = q * (HEART_SCALE / radius);
    let (x2, y2, z2) = (s.x * s.x, s.y * s.y, s.z * s.z);
    let y3 = y2 * s.y;
    let a = x2 + 2.25 * z2 + y2 - 1.0;
    a * a * a - x2 * y3 - 0.1125 * z2 * y3
}

#[inline]
pub fn pyramid(q: Vec3, radius: f32) -> f32 {
    let half = radius * 0.5;
    let base = -(q.y + half);
    let sides = q.x.abs().max(q.z.abs()) - (half - q.y);
    base.max(sides)
}

#[inline]
pub fn rubin(q: Vec3, radius: f32) -> f32 {
    let octahedron = q.x.abs() + q.y.abs() + q.z.abs() - radius;
    let table = q.y - radius * 0.5;
    octahedron.max(table)
}

/// Tangle cube: x⁴ - 5x² + y⁴ - 5y² + z⁴ - 5z² + 11.8
#[inline]
pub fn goursat(q: Vec3, radius: f32) -> f32 {
    let s = q * (GOURSAT_EXTENT / radius);
    let term = |v: f32| {
        let v2 = v * v;
        v2 * v2 - 5.0 * v2
    };
    term(s.x) + term(s.y) + term(s.z) + 11.8
}

#[inline]
pub fn planet(q: Vec3, radius: f32) -> f32 {
    let n = q * PLANET_FREQUENCY;
    let relief = PLANET_NOISE.get([n.x as f64, n.y as f64, n.z as f64]) as f32;
    q.length() - radius + relief * PLANET_RELIEF
}
