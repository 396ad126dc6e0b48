//! Pinhole camera generating jittered primary rays.

use crate::sampling::gen_f64;
use lumen_math::{DVec3, Ray};
use rand::RngCore;

#[derive(Debug, Clone)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    look_from: DVec3,
    look_at: DVec3,
    vup: DVec3,

    /// Vertical field of view in degrees
    vfov: f64,
    /// Refractive index of the medium the camera sits in
    medium_ior: f64,

    // Cached computed values (set by initialize())
    center: DVec3,
    pixel00_loc: DVec3,
    pixel_delta_u: DVec3,
    pixel_delta_v: DVec3,
    w: DVec3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            image_width: 320,
            image_height: 240,
            look_from: DVec3::ZERO,
            look_at: DVec3::new(0.0, 0.0, -1.0),
            vup: DVec3::Y,
            vfov: 60.0,
            medium_ior: 1.0,
            center: DVec3::ZERO,
            pixel00_loc: DVec3::ZERO,
            pixel_delta_u: DVec3::ZERO,
            pixel_delta_v: DVec3::ZERO,
            w: DVec3::Z,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    pub fn with_position(mut self, look_from: DVec3, look_at: DVec3, vup: DVec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_fov(mut self, vfov: f64) -> Self {
        self.vfov = vfov;
        self
    }

    /// Set the refractive index primary rays start in.
    pub fn with_medium(mut self, ior: f64) -> Self {
        self.medium_ior = ior;
        self
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        self.center = self.look_from;

        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width =
            viewport_height * (self.image_width as f64 / self.image_height.max(1) as f64);

        self.w = (self.look_from - self.look_at).normalize();
        let u = self.vup.cross(self.w).normalize();
        let v = self.w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        self.pixel_delta_u = viewport_u / self.image_width.max(1) as f64;
        self.pixel_delta_v = viewport_v / self.image_height.max(1) as f64;

        let viewport_upper_left = self.center - self.w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
    }

    /// Ray through a uniformly jittered point of pixel (i, j).
    pub fn get_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let dx = gen_f64(rng) - 0.5;
        let dy = gen_f64(rng) - 0.5;
        let pixel_sample = self.pixel00_loc
            + (i as f64 + dx) * self.pixel_delta_u
            + (j as f64 + dy) * self.pixel_delta_v;

        Ray::new(self.center, pixel_sample - self.center).with_medium(self.medium_ior)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
