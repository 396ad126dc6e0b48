use super::{diffuse_bounce, direct_light, roulette, scatter, Integrator, MediumStack, Scatter};
use crate::diagnostics::{BiasEvent, Diagnostics};
use crate::settings::RenderSettings;
use crate::{Color, Scene};
use lumen_math::Ray;
use rand::RngCore;
use std::f64::consts::PI;
use std::sync::Arc;

/// Unidirectional path tracer with next-event estimation.
///
/// Emission is only counted where next-event estimation could not have
/// sampled it: on the camera ray and right after a specular bounce.
pub struct PathTracer {
    scene: Arc<Scene>,
    max_ray_depth: u32,
    min_ray_depth: u32,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PathTracer {
    pub fn new(scene: Arc<Scene>, settings: &RenderSettings, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            scene,
            max_ray_depth: settings.max_ray_depth,
            min_ray_depth: settings.min_ray_depth,
            diagnostics,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

impl Integrator for PathTracer {
    fn sample_ray(&self, mut ray: Ray, rng: &mut dyn RngCore) -> Color {
        let scene = &*self.scene;
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut media = MediumStack::new(ray.medium_ior());
        let mut count_emission = true;
        let mut depth = 0;

        loop {
            let Some(hit) = scene.intersect(&ray) else {
                radiance += throughput * scene.sky_color(&ray);
                break;
            };
            if depth >= self.max_ray_depth {
                self.diagnostics.report(BiasEvent::PathDepthExceeded);
                break;
            }
            let m = Arc::clone(&hit.material);

            if depth >= self.min_ray_depth {
                match roulette(&m, rng) {
                    Some(weight) => throughput *= weight,
                    None => break,
                }
            }

            if count_emission && hit.front_face {
                radiance += throughput * m.emittance;
            }

            match scatter(&ray, &hit, &mut media, rng) {
                Scatter::Specular(next) => {
                    throughput *= m.specular_brdf();
                    ray = next;
                    count_emission = true;
                }
                Scatter::Diffuse => {
                    let next = diffuse_bounce(&hit, &media, rng);
                    let f = m.diffuse_brdf(next.direction(), -ray.direction());
                    radiance += throughput * f * direct_light(scene, &hit, rng);
                    // Cosine sampling cancels the cosine, leaving f * pi
                    throughput *= f * PI;
                    ray = next;
                    count_emission = false;
                }
            }

            if throughput == Color::ZERO {
                break;
            }
            depth += 1;
        }
        radiance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CapturingDiagnostics;
    use crate::scenes;
    use crate::settings::Settings;
    use lumen_math::DVec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn furnace_tracer(settings: &Settings) -> PathTracer {
        let scene = Arc::new(Scene::new(scenes::furnace(1.0, 0.5).surfaces, settings));
        PathTracer::new(scene, &settings.render, Arc::new(CapturingDiagnostics::new()))
    }

    fn mean_radiance(integrator: &dyn Integrator, samples: usize, seed: u64) -> f64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sum = 0.0;
        for i in 0..samples {
            // Spread camera rays over the sphere of directions
            let a = i as f64 * 2.399_963;
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / samples as f64;
            let r = (1.0 - z * z).sqrt();
            let dir = DVec3::new(r * a.cos(), r * a.sin(), z);
            sum += integrator.sample_ray(Ray::new(DVec3::ZERO, dir), &mut rng).x;
        }
        sum / samples as f64
    }

    #[test]
    fn test_furnace_converges_to_analytic_radiance() {
        // L = Le / (1 - rho) = 1 / (1 - 0.5)
        let tracer = furnace_tracer(&Settings::default());
        let mean = mean_radiance(&tracer, 20_000, 1);
        assert!((mean - 2.0).abs() < 0.05, "mean radiance {}", mean);
    }

    #[test]
    fn test_roulette_is_unbiased() {
        let mut no_roulette = Settings::default();
        no_roulette.render.min_ray_depth = 1000;
        no_roulette.render.max_ray_depth = 1000;
        let mut eager = Settings::default();
        eager.render.min_ray_depth = 0;

        let reference = mean_radiance(&furnace_tracer(&no_roulette), 10_000, 2);
        let with_roulette = mean_radiance(&furnace_tracer(&eager), 10_000, 3);
        assert!(
            (reference - with_roulette).abs() < 0.06,
            "{} vs {}",
            reference,
            with_roulette
        );
    }

    #[test]
    fn test_depth_cap_reports_bias() {
        let mut settings = Settings::default();
        settings.render.max_ray_depth = 2;
        settings.render.min_ray_depth = 100;
        let scene = Arc::new(Scene::new(scenes::furnace(1.0, 0.5).surfaces, &settings));
        let diag = Arc::new(CapturingDiagnostics::new());
        let tracer = PathTracer::new(scene, &settings.render, diag.clone());

        let mut rng = StdRng::seed_from_u64(4);
        let l = tracer.sample_ray(Ray::new(DVec3::ZERO, DVec3::X), &mut rng);
        assert!(l.x > 0.0);
        assert_eq!(diag.count(BiasEvent::PathDepthExceeded), 1);
    }

    #[test]
    fn test_miss_returns_sky() {
        let settings = Settings::default();
        let scene = Arc::new(Scene::new(Vec::new(), &settings).with_sky(Color::new(0.1, 0.2, 0.3)));
        let tracer = PathTracer::new(scene, &settings.render, Arc::new(CapturingDiagnostics::new()));
        let mut rng = StdRng::seed_from_u64(0);
        let l = tracer.sample_ray(Ray::new(DVec3::ZERO, DVec3::Y), &mut rng);
        assert_eq!(l, Color::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_sphere_scene_is_lit_from_above() {
        let settings = Settings::default();
        let demo = scenes::lit_sphere();
        let scene = Arc::new(Scene::new(demo.surfaces, &settings));
        let tracer = PathTracer::new(scene, &settings.render, Arc::new(CapturingDiagnostics::new()));
        let mut rng = StdRng::seed_from_u64(6);

        let mut top = 0.0;
        let mut bottom = 0.0;
        for _ in 0..2000 {
            let down = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::new(0.0, 0.6, 3.0));
            let up = Ray::new(DVec3::new(0.0, 0.0, -3.0), DVec3::new(0.0, -0.6, 3.0));
            top += tracer.sample_ray(down, &mut rng).x;
            bottom += tracer.sample_ray(up, &mut rng).x;
        }
        assert!(top > 2.0 * bottom, "top {} bottom {}", top, bottom);
    }
}
