//! Render configuration.
//!
//! Every group deserializes with defaults for missing fields, so a
//! settings file only needs to name what it changes.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};

/// How the scene BVH is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BvhStrategy {
    /// Convert an octree over surface centroids directly into BVH nodes
    Octree,
    /// Binned surface-area-heuristic split into two children
    #[default]
    BinarySah,
    /// Binned surface-area-heuristic split along two axes into up to four children
    QuaternarySah,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    pub strategy: BvhStrategy,
    /// Hard cap on surfaces per leaf
    pub max_leaf_surfaces: usize,
    /// Bins per axis for SAH evaluation
    pub sah_bins: usize,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            strategy: BvhStrategy::default(),
            max_leaf_surfaces: 4,
            sah_bins: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub bucket_size: u32,
    /// Worker threads; 0 picks the core count minus `reserved_threads`
    pub threads: usize,
    pub reserved_threads: usize,
    pub seed: u64,
    /// Hard bounce cap; reaching it truncates the path
    pub max_ray_depth: u32,
    /// Bounces before russian roulette may terminate a path
    pub min_ray_depth: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            samples_per_pixel: 16,
            bucket_size: 32,
            threads: 0,
            reserved_threads: 1,
            seed: 0,
            max_ray_depth: 64,
            min_ray_depth: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonSettings {
    /// Photons emitted from all lights together
    pub emissions: usize,
    /// Emissions per work item
    pub batch_size: usize,
    /// Emission threads; 0 picks the core count
    pub threads: usize,
    /// Keep one in `caustic_factor` direct and indirect photons
    pub caustic_factor: f64,
    /// Photons gathered per density estimate
    pub k_nearest: usize,
    /// Search radius for direct and indirect estimates
    pub max_radius: f64,
    /// Search radius for caustic estimates
    pub caustic_max_radius: f64,
    pub octree_leaf_capacity: usize,
    /// Radius for the "is this point in shadow" photon test
    pub shadow_radius: f64,
    /// Diffuse vertices farther than this from the previous vertex are primary
    pub min_bounce_distance: f64,
    pub use_shadow_photons: bool,
    /// Evaluate direct light and recurse at every diffuse vertex
    pub direct_visualization: bool,
}

impl Default for PhotonSettings {
    fn default() -> Self {
        Self {
            emissions: 1_000_000,
            batch_size: 100_000,
            threads: 0,
            caustic_factor: 1.0,
            k_nearest: 100,
            max_radius: 0.1,
            caustic_max_radius: 0.05,
            octree_leaf_capacity: 32,
            shadow_radius: 0.05,
            min_bounce_distance: 0.5,
            use_shadow_photons: true,
            direct_visualization: false,
        }
    }
}

/// All settings of a render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub render: RenderSettings,
    pub bvh: BvhSettings,
    pub photons: PhotonSettings,
    /// Refractive index of the medium cameras and lights sit in
    pub ior: f64,
}

fn positive(name: &'static str, value: f64) -> Result<(), SettingsError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { name, value })
    }
}

fn non_zero(name: &'static str, value: usize) -> Result<(), SettingsError> {
    if value == 0 {
        Err(SettingsError::Zero(name))
    } else {
        Ok(())
    }
}

impl Settings {
    /// Check every value the core relies on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let r = &self.render;
        if r.width == 0 || r.height == 0 {
            return Err(SettingsError::Resolution {
                width: r.width,
                height: r.height,
            });
        }
        non_zero("samples_per_pixel", r.samples_per_pixel as usize)?;
        non_zero("bucket_size", r.bucket_size as usize)?;
        non_zero("max_ray_depth", r.max_ray_depth as usize)?;

        non_zero("max_leaf_surfaces", self.bvh.max_leaf_surfaces)?;
        non_zero("sah_bins", self.bvh.sah_bins)?;

        let p = &self.photons;
        non_zero("emissions", p.emissions)?;
        non_zero("batch_size", p.batch_size)?;
        non_zero("k_nearest", p.k_nearest)?;
        non_zero("octree_leaf_capacity", p.octree_leaf_capacity)?;
        positive("caustic_factor", p.caustic_factor)?;
        positive("max_radius", p.max_radius)?;
        positive("caustic_max_radius", p.caustic_max_radius)?;
        positive("shadow_radius", p.shadow_radius)?;
        if !(p.min_bounce_distance >= 0.0) {
            return Err(SettingsError::NotPositive {
                name: "min_bounce_distance",
                value: p.min_bounce_distance,
            });
        }
        positive("ior", self.ior)
    }

    /// Worker count for rendering.
    pub fn render_threads(&self) -> usize {
        resolve_threads(self.render.threads, self.render.reserved_threads)
    }

    /// Worker count for photon emission.
    pub fn photon_threads(&self) -> usize {
        resolve_threads(self.photons.threads, 0)
    }
}

fn resolve_threads(requested: usize, reserved: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        num_cpus::get().saturating_sub(reserved).max(1)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            render: RenderSettings::default(),
            bvh: BvhSettings::default(),
            photons: PhotonSettings::default(),
            ior: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut s = Settings::default();
        s.render.width = 0;
        assert!(matches!(s.validate(), Err(SettingsError::Resolution { .. })));

        let mut s = Settings::default();
        s.photons.k_nearest = 0;
        assert_eq!(s.validate(), Err(SettingsError::Zero("k_nearest")));

        let mut s = Settings::default();
        s.photons.caustic_factor = 0.0;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::NotPositive { name: "caustic_factor", .. })
        ));

        let mut s = Settings::default();
        s.photons.max_radius = f64::NAN;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "render": { "width": 64, "height": 48 }, "bvh": { "strategy": "quaternary_sah" } }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.render.width, 64);
        assert_eq!(s.render.samples_per_pixel, RenderSettings::default().samples_per_pixel);
        assert_eq!(s.bvh.strategy, BvhStrategy::QuaternarySah);
        assert_eq!(s.photons, PhotonSettings::default());
        assert_eq!(s.ior, 1.0);
    }

    #[test]
    fn test_json_round_trip() {
        let s = Settings::default();
        let text = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_thread_resolution() {
        let mut s = Settings::default();
        s.render.threads = 3;
        assert_eq!(s.render_threads(), 3);
        s.render.threads = 0;
        assert!(s.render_threads() >= 1);
        assert!(s.photon_threads() >= 1);
    }
}
