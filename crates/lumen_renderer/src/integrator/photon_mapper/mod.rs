//! Two-pass photon mapping.
//!
//! Pass 1 ([`emission`]) shoots photons from the lights into four maps.
//! Pass 2 walks camera paths like the path tracer but answers deep
//! diffuse vertices from photon density instead of tracing further.

mod emission;
mod estimate;
mod photon;

pub use photon::{Photon, PhotonMaps, ShadowPhoton};

use super::{diffuse_bounce, direct_light, roulette, scatter, Integrator, MediumStack, Scatter};
use crate::diagnostics::{BiasEvent, Diagnostics};
use crate::error::RenderResult;
use crate::settings::{PhotonSettings, Settings};
use crate::{Color, Interaction, Scene};
use estimate::{cone_estimate, disk_estimate};
use lumen_math::Ray;
use rand::RngCore;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Instant;

pub struct PhotonMapper {
    scene: Arc<Scene>,
    maps: PhotonMaps,
    settings: PhotonSettings,
    max_ray_depth: u32,
    min_ray_depth: u32,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PhotonMapper {
    /// Validate `settings` and run the photon pass.
    pub fn new(scene: Arc<Scene>, settings: &Settings, diagnostics: Arc<dyn Diagnostics>) -> RenderResult<Self> {
        settings.validate()?;

        let start = Instant::now();
        let maps = emission::emit_photons(&scene, settings, diagnostics.as_ref())?;
        log::info!(
            "Photon maps: {} direct, {} indirect, {} caustic, {} shadow in {:.2?}",
            maps.direct.len(),
            maps.indirect.len(),
            maps.caustic.len(),
            maps.shadow.len(),
            start.elapsed()
        );

        Ok(Self {
            scene,
            maps,
            settings: settings.photons.clone(),
            max_ray_depth: settings.render.max_ray_depth,
            min_ray_depth: settings.render.min_ray_depth,
            diagnostics,
        })
    }

    pub fn maps(&self) -> &PhotonMaps {
        &self.maps
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Some point near `hit` lies behind an occluder as seen from a light.
    pub fn has_shadow_photons(&self, hit: &Interaction) -> bool {
        !self
            .maps
            .shadow
            .radius_empty(hit.position, self.settings.shadow_radius)
    }

    /// Shadow photons nearby and no direct photons: no light reaches here.
    fn provably_unlit(&self, hit: &Interaction) -> bool {
        self.settings.use_shadow_photons
            && self.has_shadow_photons(hit)
            && self
                .maps
                .direct
                .radius_empty(hit.position, self.settings.shadow_radius)
    }
}

impl Integrator for PhotonMapper {
    fn sample_ray(&self, mut ray: Ray, rng: &mut dyn RngCore) -> Color {
        let scene = &*self.scene;
        let s = &self.settings;
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut media = MediumStack::new(ray.medium_ior());
        let mut last_specular = false;
        let mut diffuse_seen = false;
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

            // Past a diffuse vertex, light is counted by photons and direct sampling
            if !diffuse_seen && hit.front_face {
                radiance += throughput * m.emittance;
            }

            match scatter(&ray, &hit, &mut media, rng) {
                Scatter::Specular(next) => {
                    throughput *= m.specular_brdf();
                    ray = next;
                    last_specular = true;
                }
                Scatter::Diffuse => {
                    let wo = -ray.direction();
                    radiance += throughput
                        * cone_estimate(&self.maps.caustic, &hit, wo, s.k_nearest, s.caustic_max_radius);

                    let primary = depth == 0
                        || last_specular
                        || hit.t > s.min_bounce_distance
                        || s.direct_visualization;
                    if !primary {
                        let indirect = disk_estimate(&self.maps.indirect, &hit, wo, s.k_nearest, s.max_radius);
                        // A sparse neighbourhood is not trusted; trace on instead
                        if indirect.found >= s.k_nearest {
                            let direct = disk_estimate(&self.maps.direct, &hit, wo, s.k_nearest, s.max_radius);
                            radiance += throughput * (direct.radiance + indirect.radiance);
                            break;
                        }
                    }

                    let next = diffuse_bounce(&hit, &media, rng);
                    let f = m.diffuse_brdf(next.direction(), wo);
                    if !self.provably_unlit(&hit) {
                        radiance += throughput * f * direct_light(scene, &hit, rng);
                    }
                    throughput *= f * PI;
                    ray = next;
                    last_specular = false;
                    diffuse_seen = true;
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
