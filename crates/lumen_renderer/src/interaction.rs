//! Result of a ray/scene query.

use crate::{Material, Surface};
use lumen_math::{DVec3, Ray};
use std::sync::Arc;

/// Record of the nearest ray-surface intersection.
///
/// A missed ray has no interaction at all (`Scene::intersect` returns
/// `None`), so every record here is a real hit.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Ray parameter of the hit
    pub t: f64,
    /// Point of intersection
    pub position: DVec3,
    /// Outward geometric normal
    pub normal: DVec3,
    /// Normal flipped to face against the incoming ray
    pub shading_normal: DVec3,
    /// Whether the ray arrived on the side the geometric normal points to
    pub front_face: bool,
    /// Material at the hit, shared with the surface
    pub material: Arc<Material>,
    /// Index of the hit surface in the scene
    pub surface_index: usize,
}

impl Interaction {
    /// Build the record for a hit on `surface` at distance `t`.
    pub fn new(ray: &Ray, t: f64, surface: &Surface, surface_index: usize) -> Self {
        let position = ray.at(t);
        let normal = surface.normal(position);

        // If the ray and normal point in the same direction, we're inside
        let front_face = ray.direction().dot(normal) < 0.0;
        let shading_normal = if front_face { normal } else { -normal };

        Self {
            t,
            position,
            normal,
            shading_normal,
            front_face,
            material: Arc::clone(surface.material()),
            surface_index,
        }
    }

    /// Origin for a ray leaving the surface on the side `dir` points to.
    pub fn offset_origin(&self, dir: DVec3) -> DVec3 {
        let scale = lumen_math::RAY_EPSILON * (1.0 + self.position.abs().max_element());
        if dir.dot(self.shading_normal) >= 0.0 {
            self.position + self.shading_normal * scale
        } else {
            self.position - self.shading_normal * scale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Sphere};

    #[test]
    fn test_face_normal_from_outside_and_inside() {
        let surface: Surface =
            Sphere::new(DVec3::ZERO, 1.0, Arc::new(Material::diffuse(Color::ONE))).into();

        let outside = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);
        let hit = Interaction::new(&outside, 4.0, &surface, 3);
        assert!(hit.front_face);
        assert!((hit.shading_normal - DVec3::Z).length() < 1e-12);
        assert_eq!(hit.surface_index, 3);

        let inside = Ray::new(DVec3::ZERO, DVec3::Z);
        let hit = Interaction::new(&inside, 1.0, &surface, 0);
        assert!(!hit.front_face);
        assert!((hit.shading_normal + DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_offset_origin_sides() {
        let surface: Surface =
            Sphere::new(DVec3::ZERO, 1.0, Arc::new(Material::diffuse(Color::ONE))).into();
        let ray = Ray::new(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z);
        let hit = Interaction::new(&ray, 4.0, &surface, 0);
        assert!(hit.offset_origin(DVec3::Z).z > 1.0);
        assert!(hit.offset_origin(-DVec3::Z).z < 1.0);
    }
}
