use crate::DVec3;

/// A ray with a normalized direction and the state light transport needs.
///
/// Besides origin and direction a ray remembers the refractive index of
/// the medium it travels through and whether it was spawned by a specular
/// (delta) bounce. The inverse direction is cached for slab tests.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    origin: DVec3,
    direction: DVec3,
    inv_direction: DVec3,
    medium_ior: f64,
    specular: bool,
}

impl Ray {
    /// Create a new ray travelling through vacuum.
    ///
    /// The direction is normalized here.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        let direction = direction.normalize();
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
            medium_ior: 1.0,
            specular: false,
        }
    }

    /// Set the refractive index of the medium the ray travels through.
    pub fn with_medium(mut self, ior: f64) -> Self {
        self.medium_ior = ior;
        self
    }

    /// Mark the ray as spawned by a specular bounce.
    pub fn with_specular(mut self, specular: bool) -> Self {
        self.specular = specular;
        self
    }

    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// Component-wise reciprocal of the direction (may hold infinities).
    #[inline]
    pub fn inv_direction(&self) -> DVec3 {
        self.inv_direction
    }

    #[inline]
    pub fn medium_ior(&self) -> f64 {
        self.medium_ior
    }

    #[inline]
    pub fn is_specular(&self) -> bool {
        self.specular
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::Z)
    }
}
