//! Static scene: geometry behind a BVH plus the light list.

use crate::settings::Settings;
use crate::{Bvh, Color, Interaction, Surface};
use lumen_math::{BoundingBox, Interval, Ray};

pub struct Scene {
    bvh: Bvh,
    emissives: Vec<Surface>,
    /// Running sum of light power, parallel to `emissives`
    light_cdf: Vec<f64>,
    total_flux: Color,
    sky: Color,
    ior: f64,
}

/// Scalar power used to weigh lights against each other.
fn power(flux: Color) -> f64 {
    flux.x + flux.y + flux.z
}

impl Scene {
    /// Build the BVH over `surfaces` and index the emitters among them.
    pub fn new(surfaces: Vec<Surface>, settings: &Settings) -> Self {
        let emissives: Vec<Surface> = surfaces
            .iter()
            .filter(|s| s.material().is_emissive() && s.area() > 0.0)
            .cloned()
            .collect();

        let mut light_cdf = Vec::with_capacity(emissives.len());
        let mut total_flux = Color::ZERO;
        let mut running = 0.0;
        for light in &emissives {
            let flux = light.flux();
            total_flux += flux;
            running += power(flux);
            light_cdf.push(running);
        }

        let bvh = Bvh::new(surfaces, &settings.bvh);
        log::info!(
            "Scene: {} surfaces, {} lights, total flux {:.3?}",
            bvh.len(),
            emissives.len(),
            total_flux
        );

        Self {
            bvh,
            emissives,
            light_cdf,
            total_flux,
            sky: Color::ZERO,
            ior: settings.ior,
        }
    }

    /// Radiance seen by rays that leave the scene.
    pub fn with_sky(mut self, sky: Color) -> Self {
        self.sky = sky;
        self
    }

    /// Nearest hit in front of the ray origin.
    pub fn intersect(&self, ray: &Ray) -> Option<Interaction> {
        self.intersect_within(ray, f64::INFINITY)
    }

    /// Nearest hit closer than `t_max`.
    pub fn intersect_within(&self, ray: &Ray, t_max: f64) -> Option<Interaction> {
        let (index, t) = self.bvh.intersect(ray, Interval::new(0.0, t_max))?;
        Some(Interaction::new(ray, t, &self.bvh.surfaces()[index], index))
    }

    pub fn surface(&self, index: usize) -> &Surface {
        &self.bvh.surfaces()[index]
    }

    pub fn emissives(&self) -> &[Surface] {
        &self.emissives
    }

    pub fn sky_color(&self, _ray: &Ray) -> Color {
        self.sky
    }

    /// Refractive index of the medium surrounding all geometry.
    pub fn ior(&self) -> f64 {
        self.ior
    }

    /// Sum of the flux of every light.
    pub fn total_flux(&self) -> Color {
        self.total_flux
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bvh.bounds()
    }

    /// Light chosen in proportion to its power for `u` in [0, 1).
    ///
    /// Returns the light and the probability of picking it, or `None` when
    /// the scene has no lights.
    pub fn pick_light(&self, u: f64) -> Option<(&Surface, f64)> {
        let total = *self.light_cdf.last()?;
        if total <= 0.0 {
            return None;
        }
        let target = u * total;
        let index = self
            .light_cdf
            .partition_point(|&c| c <= target)
            .min(self.emissives.len() - 1);
        let previous = if index == 0 { 0.0 } else { self.light_cdf[index - 1] };
        Some((&self.emissives[index], (self.light_cdf[index] - previous) / total))
    }
}
