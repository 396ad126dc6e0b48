//! Light transport estimators.
//!
//! Both integrators walk a camera path in an explicit loop. The pieces
//! they share live here: refraction-medium bookkeeping, the choice between
//! specular and diffuse scattering, russian roulette and next-event
//! estimation of direct light.

mod path_tracer;
mod photon_mapper;

pub use path_tracer::PathTracer;
pub use photon_mapper::{Photon, PhotonMapper, PhotonMaps, ShadowPhoton};

use crate::sampling::{gen_f64, reflect, refract};
use crate::{Color, Interaction, Material, Scene};
use lumen_math::{DVec3, Ray};
use rand::RngCore;
use smallvec::SmallVec;

/// Radiance estimator for a single camera ray.
pub trait Integrator: Sync {
    fn sample_ray(&self, ray: Ray, rng: &mut dyn RngCore) -> Color;
}

/// Refractive indices of the media a path is nested in, innermost last.
#[derive(Debug, Clone)]
pub(crate) struct MediumStack {
    stack: SmallVec<[f64; 4]>,
}

impl MediumStack {
    pub fn new(ior: f64) -> Self {
        let mut stack = SmallVec::new();
        stack.push(ior);
        Self { stack }
    }

    /// Index of the medium the path currently travels in.
    pub fn current(&self) -> f64 {
        self.stack.last().copied().unwrap_or(1.0)
    }

    /// Index on the far side of `hit`: the material when entering it, the
    /// enclosing medium when leaving.
    pub fn beyond(&self, hit: &Interaction) -> f64 {
        if hit.front_face {
            hit.material.ior
        } else if self.stack.len() > 1 {
            self.stack[self.stack.len() - 2]
        } else {
            self.current()
        }
    }

    /// Record a transmission through `hit`.
    pub fn cross(&mut self, hit: &Interaction) {
        if hit.front_face {
            self.stack.push(hit.material.ior);
        } else if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

/// Outcome of scattering at a surface.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scatter {
    /// Mirror reflection or transmission, weighted by the specular BRDF
    Specular(Ray),
    /// Lambertian scattering; the caller samples the direction
    Diffuse,
}

/// Pick the scattering event at `hit` from Fresnel-weighted probabilities.
///
/// Perfect mirrors always reflect. Otherwise the ray reflects specularly
/// with the Fresnel probability, refracts with the material's transparency
/// and scatters diffusely in the remaining cases.
pub(crate) fn scatter(
    ray: &Ray,
    hit: &Interaction,
    media: &mut MediumStack,
    rng: &mut dyn RngCore,
) -> Scatter {
    let m = &hit.material;
    let dir = ray.direction();
    let n = hit.shading_normal;
    let n1 = media.current();
    let n2 = media.beyond(hit);

    let mirror = |media: &MediumStack| {
        let d = reflect(dir, n);
        Scatter::Specular(
            Ray::new(hit.offset_origin(d), d)
                .with_medium(media.current())
                .with_specular(true),
        )
    };

    if m.perfect_mirror || gen_f64(rng) < m.fresnel(n1, n2, n, dir) {
        return mirror(media);
    }
    if m.transparency > 0.0 && gen_f64(rng) < m.transparency {
        return match refract(dir, n, n1, n2) {
            Some(d) => {
                media.cross(hit);
                Scatter::Specular(
                    Ray::new(hit.offset_origin(d), d)
                        .with_medium(media.current())
                        .with_specular(true),
                )
            }
            None => mirror(media),
        };
    }
    Scatter::Diffuse
}

/// Russian roulette with the material's survival chance.
///
/// Returns the weight that keeps the estimate unbiased, or `None` when the
/// path is absorbed.
pub(crate) fn roulette(material: &Material, rng: &mut dyn RngCore) -> Option<f64> {
    let absorb = (1.0 - material.reflect_probability).clamp(0.0, 1.0);
    if absorb >= 1.0 || gen_f64(rng) < absorb {
        None
    } else {
        Some(1.0 / (1.0 - absorb))
    }
}

/// Irradiance-weighted radiance arriving at `hit` straight from one light.
///
/// One light is picked by power and one point sampled uniformly on it;
/// the result is `Le * cos_x * cos_l * A / (d^2 * p_light)` and still needs
/// multiplying by the BRDF. Zero when the scene has no lights.
pub(crate) fn direct_light(scene: &Scene, hit: &Interaction, rng: &mut dyn RngCore) -> Color {
    let Some((light, p_light)) = scene.pick_light(gen_f64(rng)) else {
        return Color::ZERO;
    };
    let target = light.point(gen_f64(rng), gen_f64(rng));
    let to_light = target - hit.position;
    let d2 = to_light.length_squared();
    if d2 <= 0.0 {
        return Color::ZERO;
    }
    let dist = d2.sqrt();
    let wi = to_light / dist;

    let cos_x = wi.dot(hit.shading_normal);
    let cos_l = -wi.dot(light.normal(target));
    if cos_x <= 0.0 || cos_l <= 0.0 {
        return Color::ZERO;
    }

    let shadow = Ray::new(hit.offset_origin(wi), wi);
    if scene.intersect_within(&shadow, dist * (1.0 - 1e-5)).is_some() {
        return Color::ZERO;
    }
    light.material().emittance * (cos_x * cos_l * light.area() / (d2 * p_light))
}

/// Origin and direction of a diffuse bounce, cosine-distributed about the
/// shading normal.
pub(crate) fn diffuse_bounce(hit: &Interaction, media: &MediumStack, rng: &mut dyn RngCore) -> Ray {
    let d: DVec3 = crate::sampling::cosine_hemisphere(hit.shading_normal, rng);
    Ray::new(hit.offset_origin(d), d).with_medium(media.current())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::{Sphere, Surface, Triangle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn hit_on(surface: Surface, ray: &Ray) -> Interaction {
        let t = surface.intersect(ray, lumen_math::Interval::FORWARD).unwrap();
        Interaction::new(ray, t, &surface, 0)
    }

    #[test]
    fn test_medium_stack_enter_and_leave() {
        let glass = Surface::from(Sphere::new(DVec3::ZERO, 1.0, Arc::new(Material::glass(1.5))));
        let mut media = MediumStack::new(1.0);

        let outside = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::Z);
        let enter = hit_on(glass.clone(), &outside);
        assert_eq!(media.beyond(&enter), 1.5);
        media.cross(&enter);
        assert_eq!(media.current(), 1.5);

        let inside = Ray::new(DVec3::ZERO, DVec3::Z);
        let leave = hit_on(glass, &inside);
        assert!(!leave.front_face);
        assert_eq!(media.beyond(&leave), 1.0);
        media.cross(&leave);
        assert_eq!(media.current(), 1.0);

        // Leaving more often than entering keeps the outer medium
        media.cross(&leave);
        assert_eq!(media.current(), 1.0);
    }

    #[test]
    fn test_scatter_mirror_always_reflects() {
        let mirror = Surface::from(Sphere::new(DVec3::ZERO, 1.0, Arc::new(Material::mirror(Color::ONE))));
        let ray = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::Z);
        let hit = hit_on(mirror, &ray);
        let mut rng = StdRng::seed_from_u64(3);
        let mut media = MediumStack::new(1.0);
        for _ in 0..100 {
            match scatter(&ray, &hit, &mut media, &mut rng) {
                Scatter::Specular(r) => {
                    assert!((r.direction() + DVec3::Z).length() < 1e-12);
                    assert!(r.is_specular());
                }
                Scatter::Diffuse => panic!("mirror scattered diffusely"),
            }
        }
    }

    #[test]
    fn test_scatter_matte_is_diffuse() {
        let matte = Surface::from(Sphere::new(DVec3::ZERO, 1.0, Arc::new(Material::default())));
        let ray = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::Z);
        let hit = hit_on(matte, &ray);
        let mut rng = StdRng::seed_from_u64(3);
        let mut media = MediumStack::new(1.0);
        for _ in 0..100 {
            assert!(matches!(scatter(&ray, &hit, &mut media, &mut rng), Scatter::Diffuse));
        }
    }

    #[test]
    fn test_scatter_glass_mostly_refracts_head_on() {
        let glass = Surface::from(Sphere::new(DVec3::ZERO, 1.0, Arc::new(Material::glass(1.5))));
        let ray = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::Z);
        let hit = hit_on(glass, &ray);
        let mut rng = StdRng::seed_from_u64(5);
        let mut refracted = 0;
        for _ in 0..1000 {
            let mut media = MediumStack::new(1.0);
            if let Scatter::Specular(r) = scatter(&ray, &hit, &mut media, &mut rng) {
                if r.direction().z > 0.0 {
                    refracted += 1;
                    assert_eq!(r.medium_ior(), 1.5);
                }
            }
        }
        // Fresnel reflectance at normal incidence is 4%
        assert!((900..=990).contains(&refracted), "{}", refracted);
    }

    #[test]
    fn test_roulette_weight() {
        let mut rng = StdRng::seed_from_u64(9);
        let m = Material::default().with_reflect_probability(0.5);
        let mut survived = 0;
        for _ in 0..10_000 {
            if let Some(w) = roulette(&m, &mut rng) {
                assert!((w - 2.0).abs() < 1e-12);
                survived += 1;
            }
        }
        assert!((4500..5500).contains(&survived));
        assert!(roulette(&Material::default().with_reflect_probability(0.0), &mut rng).is_none());
    }

    #[test]
    fn test_direct_light_without_lights_is_zero() {
        let matte = Arc::new(Material::default());
        let scene = Scene::new(
            vec![Sphere::new(DVec3::ZERO, 1.0, Arc::clone(&matte)).into()],
            &Settings::default(),
        );
        let ray = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::Z);
        let hit = scene.intersect(&ray).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(direct_light(&scene, &hit, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_direct_light_matches_small_light() {
        // A small light straight above a floor point: E ~= Le * A / d^2
        let matte = Arc::new(Material::default());
        let lamp = Arc::new(Material::emissive(Color::ONE));
        let s = 0.01;
        let h = 2.0;
        let surfaces: Vec<Surface> = vec![
            Triangle::new(
                DVec3::new(-5.0, 0.0, -5.0),
                DVec3::new(5.0, 0.0, 5.0),
                DVec3::new(5.0, 0.0, -5.0),
                Arc::clone(&matte),
            )
            .into(),
            // Wound so the normal faces down onto the floor
            Triangle::new(
                DVec3::new(1.0 - s, h, -1.0 - s),
                DVec3::new(1.0 + s, h, -1.0 - s),
                DVec3::new(1.0 - s, h, -1.0 + s),
                lamp,
            )
            .into(),
        ];
        let scene = Scene::new(surfaces, &Settings::default());
        let ray = Ray::new(DVec3::new(1.0, 1.0, -1.0), -DVec3::Y);
        let hit = scene.intersect(&ray).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let e = direct_light(&scene, &hit, &mut rng);
        let area = 2.0 * s * s;
        let expected = area / (h * h);
        assert!((e.x - expected).abs() < 0.01 * expected, "{} vs {}", e.x, expected);
    }
}
