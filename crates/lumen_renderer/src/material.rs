//! Surface materials.
//!
//! A material is an immutable record shared between surfaces through
//! `Arc`. The integrators only need a handful of capabilities from it:
//! emittance, the russian-roulette survival chance, the probability of a
//! specular event, and the diffuse/specular BRDF values.

use lumen_math::DVec3;
use std::f64::consts::FRAC_1_PI;

/// Color type alias (linear RGB radiance or reflectance)
pub type Color = DVec3;

/// Largest channel of a color.
#[inline]
pub fn max_channel(c: Color) -> f64 {
    c.x.max(c.y).max(c.z)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Diffuse albedo
    pub reflectance: Color,
    /// Tint of specular reflection; zero disables the specular coat
    pub specular_reflectance: Color,
    /// Emitted radiance
    pub emittance: Color,
    /// Index of refraction of the material's interior
    pub ior: f64,
    /// Chance that a non-reflected ray is transmitted instead of scattered diffusely
    pub transparency: f64,
    /// Always reflect specularly
    pub perfect_mirror: bool,
    /// Russian-roulette survival chance after the minimum depth
    pub reflect_probability: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            reflectance: Color::splat(0.8),
            specular_reflectance: Color::ZERO,
            emittance: Color::ZERO,
            ior: 1.5,
            transparency: 0.0,
            perfect_mirror: false,
            reflect_probability: 0.9,
        }
    }
}

impl Material {
    /// Lambertian material with the given albedo.
    pub fn diffuse(reflectance: Color) -> Self {
        Self {
            reflectance,
            ..Default::default()
        }
    }

    /// Perfect mirror tinted by `specular_reflectance`.
    pub fn mirror(specular_reflectance: Color) -> Self {
        Self {
            reflectance: Color::ZERO,
            specular_reflectance,
            perfect_mirror: true,
            ..Default::default()
        }
    }

    /// Clear dielectric with the given index of refraction.
    pub fn glass(ior: f64) -> Self {
        Self {
            reflectance: Color::ONE,
            specular_reflectance: Color::ONE,
            ior,
            transparency: 1.0,
            ..Default::default()
        }
    }

    /// Emitter of radiance `emittance` with a black diffuse response.
    pub fn emissive(emittance: Color) -> Self {
        Self {
            reflectance: Color::ZERO,
            emittance,
            ..Default::default()
        }
    }

    pub fn with_reflectance(mut self, reflectance: Color) -> Self {
        self.reflectance = reflectance;
        self
    }

    pub fn with_specular(mut self, specular_reflectance: Color) -> Self {
        self.specular_reflectance = specular_reflectance;
        self
    }

    pub fn with_emittance(mut self, emittance: Color) -> Self {
        self.emittance = emittance;
        self
    }

    pub fn with_reflect_probability(mut self, probability: f64) -> Self {
        self.reflect_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn is_emissive(&self) -> bool {
        max_channel(self.emittance) > 0.0
    }

    /// True when the material can produce specular (delta) events.
    pub fn is_specular(&self) -> bool {
        self.perfect_mirror || self.transparency > 0.0 || max_channel(self.specular_reflectance) > 0.0
    }

    /// Lambertian BRDF, independent of both directions.
    pub fn diffuse_brdf(&self, _wi: DVec3, _wo: DVec3) -> Color {
        self.reflectance * FRAC_1_PI
    }

    /// Weight of a sampled specular reflection or transmission.
    pub fn specular_brdf(&self) -> Color {
        self.specular_reflectance
    }

    /// Fraction of light reflected specularly (Schlick's approximation).
    ///
    /// `normal` faces against `dir`; `n1` is the index of the medium the ray
    /// travels in and `n2` the one it would enter.
    pub fn fresnel(&self, n1: f64, n2: f64, normal: DVec3, dir: DVec3) -> f64 {
        if self.perfect_mirror {
            return 1.0;
        }
        if !self.is_specular() {
            return 0.0;
        }
        let mut cos = (-dir.dot(normal)).clamp(0.0, 1.0);
        if n1 > n2 {
            let eta = n1 / n2;
            let sin2_t = eta * eta * (1.0 - cos * cos);
            if sin2_t > 1.0 {
                return 1.0;
            }
            cos = (1.0 - sin2_t).sqrt();
        }
        let r0 = ((n1 - n2) / (n1 + n2)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cos).powi(5)
    }
}
