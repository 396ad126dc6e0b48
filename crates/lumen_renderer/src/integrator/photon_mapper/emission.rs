//! Pass 1: emit photons from the lights and deposit them into maps.

use super::photon::{Photon, PhotonBuffers, PhotonMaps, ShadowPhoton};
use crate::diagnostics::{BiasEvent, Diagnostics};
use crate::error::{RenderError, RenderResult};
use crate::integrator::{diffuse_bounce, scatter, MediumStack, Scatter};
use crate::progress::Progress;
use crate::sampling::{cosine_hemisphere, gen_f64, stream_seed, PHOTON_STREAM, SHUFFLE_STREAM};
use crate::settings::{PhotonSettings, Settings};
use crate::work_queue::WorkQueue;
use crate::{max_channel, Color, Scene, Surface};
use lumen_math::{Ray, RAY_EPSILON};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;

/// Photons emitted from one light, each carrying `flux`.
#[derive(Debug, Clone, Copy)]
struct EmissionBatch {
    light: usize,
    count: usize,
    flux: Color,
}

/// Split the photon budget across lights by power and cut it into batches.
fn plan_batches(lights: &[Surface], settings: &PhotonSettings) -> Vec<EmissionBatch> {
    let power = |s: &Surface| s.flux().element_sum();
    let total: f64 = lights.iter().map(power).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut batches = Vec::new();
    for (index, light) in lights.iter().enumerate() {
        let share = power(light) / total;
        let count = (settings.emissions as f64 * share).round() as usize;
        if count == 0 {
            continue;
        }
        let flux = light.flux() / count as f64;
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(settings.batch_size);
            batches.push(EmissionBatch {
                light: index,
                count: n,
                flux,
            });
            remaining -= n;
        }
    }
    batches
}

/// Traces single photons through the scene.
pub(super) struct PhotonTracer<'a> {
    scene: &'a Scene,
    settings: &'a PhotonSettings,
    max_depth: u32,
    min_depth: u32,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> PhotonTracer<'a> {
    pub fn new(scene: &'a Scene, settings: &'a Settings, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            scene,
            settings: &settings.photons,
            max_depth: settings.render.max_ray_depth,
            min_depth: settings.render.min_ray_depth,
            diagnostics,
        }
    }

    /// Emit one photon from a uniformly chosen point of `light`.
    pub fn emit(&self, light: &Surface, flux: Color, rng: &mut dyn RngCore, out: &mut PhotonBuffers) {
        let point = light.point(gen_f64(rng), gen_f64(rng));
        let normal = light.normal(point);
        let dir = cosine_hemisphere(normal, rng);
        let origin = point + normal * (RAY_EPSILON * (1.0 + point.abs().max_element()));
        self.trace(Ray::new(origin, dir).with_medium(self.scene.ior()), flux, rng, out);
    }

    fn trace(&self, mut ray: Ray, mut flux: Color, rng: &mut dyn RngCore, out: &mut PhotonBuffers) {
        let keep = (1.0 / self.settings.caustic_factor).min(1.0);
        let mut media = MediumStack::new(ray.medium_ior());
        let mut last_specular = false;
        let mut depth = 0;

        while let Some(hit) = self.scene.intersect(&ray) {
            if depth >= self.max_depth {
                self.diagnostics.report(BiasEvent::PhotonDepthExceeded);
                return;
            }
            let m = Arc::clone(&hit.material);
            let incoming = ray.direction();

            let new_flux = match scatter(&ray, &hit, &mut media, rng) {
                Scatter::Specular(next) => {
                    if depth == 0 && self.settings.use_shadow_photons {
                        self.trace_shadow(&ray, hit.t, out);
                    }
                    ray = next;
                    last_specular = true;
                    flux * m.specular_brdf()
                }
                Scatter::Diffuse => {
                    if depth > 0 && last_specular {
                        out.caustic.push(Photon::new(hit.position, flux, incoming));
                    } else if gen_f64(rng) < keep {
                        let photon = Photon::new(hit.position, flux / keep, incoming);
                        if depth == 0 {
                            out.direct.push(photon);
                            if self.settings.use_shadow_photons {
                                self.trace_shadow(&ray, hit.t, out);
                            }
                        } else {
                            out.indirect.push(photon);
                        }
                    }
                    ray = diffuse_bounce(&hit, &media, rng);
                    last_specular = false;
                    // Cosine sampling leaves albedo as the bounce weight
                    flux * m.reflectance
                }
            };

            let old = max_channel(flux);
            if old <= 0.0 {
                return;
            }
            let cap = if depth > self.min_depth { 0.9 } else { 1.0 };
            let survive = f64::min(cap, max_channel(new_flux) / old);
            if survive <= 0.0 || gen_f64(rng) >= survive {
                return;
            }
            flux = new_flux / survive;
            depth += 1;
        }
    }

    /// Record every diffuse surface behind the first hit of `ray`.
    fn trace_shadow(&self, ray: &Ray, first_t: f64, out: &mut PhotonBuffers) {
        let dir = ray.direction();
        let mut origin = ray.at(first_t);
        for _ in 0..self.max_depth {
            let offset = RAY_EPSILON * (1.0 + origin.abs().max_element());
            let shadow = Ray::new(origin + dir * offset, dir);
            let Some(hit) = self.scene.intersect(&shadow) else {
                return;
            };
            if !hit.material.perfect_mirror && hit.material.transparency < 1.0 {
                out.shadow.push(ShadowPhoton::new(hit.position));
            }
            origin = hit.position;
        }
    }
}

/// Run pass 1 on a pool of scoped workers and build the four maps.
pub(super) fn emit_photons(
    scene: &Scene,
    settings: &Settings,
    diagnostics: &dyn Diagnostics,
) -> RenderResult<PhotonMaps> {
    let lights = scene.emissives();
    let mut batches = plan_batches(lights, &settings.photons);
    if batches.is_empty() {
        log::warn!("Scene has no lights with positive flux; photon maps stay empty");
        return Ok(PhotonMaps::default());
    }
    let total: usize = batches.iter().map(|b| b.count).sum();

    // Shuffle so no worker ends up with all of one light
    let seed = settings.render.seed;
    batches.shuffle(&mut StdRng::seed_from_u64(stream_seed(seed, SHUFFLE_STREAM, 0)));
    let queue: WorkQueue<EmissionBatch> = batches.into_iter().collect();

    let threads = settings.photon_threads();
    log::info!(
        "Emitting {} photons from {} lights on {} threads",
        total,
        lights.len(),
        threads
    );

    let tracer = PhotonTracer::new(scene, settings, diagnostics);
    let progress = Progress::new("Photon emission", "photons", total);

    let joined = crossbeam::scope(|scope| {
        scope.spawn(|_| progress.monitor());

        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let (queue, tracer, progress) = (&queue, &tracer, &progress);
                scope.spawn(move |_| {
                    let mut rng = StdRng::seed_from_u64(stream_seed(seed, PHOTON_STREAM, worker));
                    let mut buffers = PhotonBuffers::default();
                    while let Some(batch) = queue.get_work() {
                        let light = &lights[batch.light];
                        for _ in 0..batch.count {
                            tracer.emit(light, batch.flux, &mut rng, &mut buffers);
                        }
                        progress.add(batch.count);
                    }
                    buffers
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        progress.finish();
        results
    })
    .map_err(|_| RenderError::WorkerPanicked)?;

    let buffers = joined
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| RenderError::WorkerPanicked)?;
    Ok(PhotonMaps::from_buffers(buffers, settings.photons.octree_leaf_capacity))
}
