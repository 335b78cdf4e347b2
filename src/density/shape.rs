//! Shape kinds and the selector that turns them into density primitives.

use glam::{Quat, Vec3};
use serde::{Deserialize, Deserializer, Serialize};

use super::primitive::DensityPrimitive;

/// Radius bias applied to spheres and cubes
pub const SOLID_RADIUS_BIAS: f32 = 1.0;
/// Radius bias applied to tori and planets
pub const RING_RADIUS_BIAS: f32 = 5.0;

/// Shape identifiers, in the order of their numeric ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ShapeKind {
    None,
    #[default]
    Sphere,
    Cube,
    Capsule,
    Torus,
    Heart,
    Pyramid,
    Rubin,
    GoursatsSurface,
    Plane,
    Planet,
}

impl ShapeKind {
    /// Shape used for any id the selector does not recognize
    pub const FALLBACK: ShapeKind = ShapeKind::Rubin;

    pub const ALL: [ShapeKind; 11] = [
        ShapeKind::None,
        ShapeKind::Sphere,
        ShapeKind::Cube,
        ShapeKind::Capsule,
        ShapeKind::Torus,
        ShapeKind::Heart,
        ShapeKind::Pyramid,
        ShapeKind::Rubin,
        ShapeKind::GoursatsSurface,
        ShapeKind::Plane,
        ShapeKind::Planet,
    ];

    /// Map a numeric id to a shape; unknown ids fall back to `FALLBACK`
    pub fn from_id(id: u32) -> Self {
        Self::ALL.get(id as usize).copied().unwrap_or(Self::FALLBACK)
    }

    /// Numeric id of this shape
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Map a shape name to a shape; unknown names fall back to `FALLBACK`
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .unwrap_or(Self::FALLBACK)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::None => "None",
            ShapeKind::Sphere => "Sphere",
            ShapeKind::Cube => "Cube",
            ShapeKind::Capsule => "Capsule",
            ShapeKind::Torus => "Torus",
            ShapeKind::Heart => "Heart",
            ShapeKind::Pyramid => "Pyramid",
            ShapeKind::Rubin => "Rubin",
            ShapeKind::GoursatsSurface => "GoursatsSurface",
            ShapeKind::Plane => "Plane",
            ShapeKind::Planet => "Planet",
        }
    }

    /// Amount subtracted from the requested radius before construction
    pub fn radius_bias(self) -> f32 {
        match self {
            ShapeKind::Sphere | ShapeKind::Cube => SOLID_RADIUS_BIAS,
            ShapeKind::Torus | ShapeKind::Planet => RING_RADIUS_BIAS,
            _ => 0.0,
        }
    }
}

/// Accepts either a shape name or a numeric id, never fails on unknown values.
impl<'de> Deserialize<'de> for ShapeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(u32),
            Name(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Id(id) => ShapeKind::from_id(id),
            Repr::Name(name) => ShapeKind::from_name(&name),
        })
    }
}

/// Turns a shape kind plus placement into a density primitive
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeSelector;

impl ShapeSelector {
    pub fn new() -> Self {
        Self
    }

    /// Axis-aligned primitive for `kind` at `center`
    pub fn select(&self, kind: ShapeKind, center: Vec3, radius: f32) -> DensityPrimitive {
        self.select_oriented(kind, center, radius, Quat::IDENTITY)
    }

    /// Primitive for `kind` at `center`, rotated by `rotation`.
    ///
    /// Spheres and planets are rotation invariant and ignore it.
    pub fn select_oriented(&self, kind: ShapeKind, center: Vec3, radius: f32, rotation: Quat) -> DensityPrimitive {
        let radius = radius - kind.radius_bias();
        match kind {
            ShapeKind::None => DensityPrimitive::None,
            ShapeKind::Sphere => DensityPrimitive::Sphere { center, radius },
            ShapeKind::Cube => DensityPrimitive::Cube { center, radius, rotation },
            ShapeKind::Capsule => DensityPrimitive::Capsule { center, radius, rotation },
            ShapeKind::Torus => DensityPrimitive::Torus { center, radius, rotation },
            ShapeKind::Heart => DensityPrimitive::Heart { center, radius, rotation },
            ShapeKind::Pyramid => DensityPrimitive::Pyramid { center, radius, rotation },
            ShapeKind::Rubin => DensityPrimitive::Rubin { center, radius, rotation },
            ShapeKind::GoursatsSurface => DensityPrimitive::GoursatsSurface { center, radius, rotation },
            ShapeKind::Plane => DensityPrimitive::Plane { center, rotation },
            ShapeKind::Planet => DensityPrimitive::Planet { center, radius },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id_roundtrip() {
        for kind in ShapeKind::ALL {
            assert_eq!(ShapeKind::from_id(kind.id()), kind);
        }
    }

    #[test]
    fn test_unknown_id_falls_back() {
        assert_eq!(ShapeKind::from_id(11), ShapeKind::Rubin);
        assert_eq!(ShapeKind::from_id(u32::MAX), ShapeKind::Rubin);
        assert_eq!(ShapeKind::from_name("dodecahedron"), ShapeKind::Rubin);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ShapeKind::from_name("GoursatsSurface"), ShapeKind::GoursatsSurface);
        assert_eq!(ShapeKind::from_name("sphere"), ShapeKind::Sphere);
    }

    #[test]
    fn test_radius_biases() {
        let selector = ShapeSelector::new();
        let c = Vec3::ZERO;
        assert_eq!(selector.select(ShapeKind::Sphere, c, 8.0).radius(), Some(7.0));
        assert_eq!(selector.select(ShapeKind::Cube, c, 8.0).radius(), Some(7.0));
        assert_eq!(selector.select(ShapeKind::Torus, c, 8.0).radius(), Some(3.0));
        assert_eq!(selector.select(ShapeKind::Planet, c, 8.0).radius(), Some(3.0));
        assert_eq!(selector.select(ShapeKind::Capsule, c, 8.0).radius(), Some(8.0));
        assert_eq!(selector.select(ShapeKind::Heart, c, 8.0).radius(), Some(8.0));
    }

    #[test]
    fn test_select_none() {
        let selector = ShapeSelector::new();
        assert_eq!(selector.select(ShapeKind::None, Vec3::ONE, 4.0), DensityPrimitive::None);
    }

    #[test]
    fn test_deserialize_name_or_id() {
        let by_name: ShapeKind = serde_json::from_str("\"Torus\"").unwrap();
        let by_id: ShapeKind = serde_json::from_str("4").unwrap();
        let unknown: ShapeKind = serde_json::from_str("42").unwrap();
        assert_eq!(by_name, ShapeKind::Torus);
        assert_eq!(by_id, ShapeKind::Torus);
        assert_eq!(unknown, ShapeKind::Rubin);
    }

    #[test]
    fn test_every_shape_sign_consistent() {
        let selector = ShapeSelector::new();
        let center = Vec3::splat(8.0);
        // A point known to be solid for each shape at radius 12
        let inside = |kind: ShapeKind| match kind {
            ShapeKind::Torus => center + Vec3::new(7.0, 0.0, 0.0),
            ShapeKind::GoursatsSurface => center + Vec3::splat(1.58 * 12.0 / 3.5),
            _ => center + Vec3::new(0.0, -0.5, 0.0),
        };
        for kind in ShapeKind::ALL {
            let shape = selector.select(kind, center, 12.0);
            let far = center + Vec3::new(60.0, 60.0, 60.0);
            assert!(shape.density(far) > 0.0, "{:?} should be empty far away", kind);
            if kind != ShapeKind::None {
                assert!(shape.density(inside(kind)) < 0.0, "{:?} should be solid inside", kind);
            }
        }
    }
}
