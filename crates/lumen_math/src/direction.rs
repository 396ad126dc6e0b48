use crate::DVec3;

/// Unit direction packed as two single-precision spherical angles.
///
/// `theta` is the polar angle from +Z and `phi` the azimuth from +X
/// towards +Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PackedDirection {
    pub theta: f32,
    pub phi: f32,
}

impl PackedDirection {
    pub fn encode(d: DVec3) -> Self {
        let d = d.normalize_or_zero();
        Self {
            theta: d.z.clamp(-1.0, 1.0).acos() as f32,
            phi: d.y.atan2(d.x) as f32,
        }
    }

    pub fn decode(&self) -> DVec3 {
        let (sin_theta, cos_theta) = (self.theta as f64).sin_cos();
        let (sin_phi, cos_phi) = (self.phi as f64).sin_cos();
        DVec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
    }
}

impl From<DVec3> for PackedDirection {
    fn from(d: DVec3) -> Self {
        Self::encode(d)
    }
}
