//! Random sampling helpers shared by the integrators.
//!
//! Generators are always passed in explicitly so every worker thread owns
//! its own stream.

use lumen_math::DVec3;
use rand::{Rng, RngCore};
use std::f64::consts::PI;

/// Stream for shuffling the photon batch order.
pub const SHUFFLE_STREAM: u64 = 1;
/// Stream for the photon emission workers.
pub const PHOTON_STREAM: u64 = 2;
/// Stream for the camera pass workers.
pub const RENDER_STREAM: u64 = 3;

/// Seed for `worker` on one `stream` derived from the user seed.
///
/// Mixes with a splitmix64 finalizer so no two streams or workers share
/// a generator state for the same user seed.
pub fn stream_seed(seed: u64, stream: u64, worker: usize) -> u64 {
    let mut z = seed
        ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (worker as u64).wrapping_mul(0xd1b5_4a32_d192_ed03);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Uniform sample in [0, 1).
#[inline]
pub fn gen_f64(rng: &mut dyn RngCore) -> f64 {
    rng.gen::<f64>()
}

/// Builds two tangents completing `n` to a right-handed orthonormal basis.
pub fn orthonormal_basis(n: DVec3) -> (DVec3, DVec3) {
    // Duff et al., "Building an Orthonormal Basis, Revisited"
    let sign = 1.0_f64.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = DVec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let s = DVec3::new(b, sign + n.y * n.y * a, -n.y);
    (t, s)
}

/// Cosine-weighted direction on the hemisphere around `normal`.
///
/// The pdf is `cos(theta) / pi`.
pub fn cosine_hemisphere(normal: DVec3, rng: &mut dyn RngCore) -> DVec3 {
    let u1 = gen_f64(rng);
    let u2 = gen_f64(rng);
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let (t, s) = orthonormal_basis(normal);
    let z = (1.0 - u1).max(0.0).sqrt();
    (t * (r * phi.cos()) + s * (r * phi.sin()) + normal * z).normalize()
}

/// Mirror `dir` about `normal`.
#[inline]
pub fn reflect(dir: DVec3, normal: DVec3) -> DVec3 {
    dir - 2.0 * dir.dot(normal) * normal
}

/// Refract `dir` through a surface whose `normal` faces against it.
///
/// Returns `None` on total internal reflection.
pub fn refract(dir: DVec3, normal: DVec3, n1: f64, n2: f64) -> Option<DVec3> {
    let eta = n1 / n2;
    let cos_i = -dir.dot(normal);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i);
    if sin2_t > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some((eta * dir + (eta * cos_i - cos_t) * normal).normalize())
}
