//! Radiance estimates from photon density.

use super::photon::Photon;
use crate::spatial::LinearOctree;
use crate::{Color, Interaction};
use lumen_math::DVec3;
use std::f64::consts::PI;

/// Reflected radiance estimated from a photon neighbourhood.
#[derive(Debug, Clone, Copy)]
pub(super) struct Estimate {
    pub radiance: Color,
    /// Photons the search returned, including ones facing away
    pub found: usize,
}

impl Estimate {
    const NONE: Estimate = Estimate {
        radiance: Color::ZERO,
        found: 0,
    };
}

/// BRDF-weighted flux of a photon arriving at the front of `hit`.
fn reflected(photon: &Photon, hit: &Interaction, wo: DVec3) -> Option<Color> {
    let dir = photon.direction();
    if dir.dot(hit.shading_normal) >= 0.0 {
        return None;
    }
    Some(photon.flux() * hit.material.diffuse_brdf(-dir, wo))
}

/// Uniform-disk estimate over the `k` nearest photons.
///
/// The disk radius is the distance to the farthest photon found.
pub(super) fn disk_estimate(
    map: &LinearOctree<Photon>,
    hit: &Interaction,
    wo: DVec3,
    k: usize,
    max_radius: f64,
) -> Estimate {
    let found = map.knn_search(hit.position, k, max_radius);
    let Some(&(_, r2)) = found.last() else {
        return Estimate::NONE;
    };
    if r2 <= 0.0 {
        return Estimate {
            radiance: Color::ZERO,
            found: found.len(),
        };
    }
    let sum: Color = found
        .iter()
        .filter_map(|(photon, _)| reflected(photon, hit, wo))
        .sum();
    Estimate {
        radiance: sum / (PI * r2),
        found: found.len(),
    }
}

/// Cone-filtered estimate: photons are weighted by `1 - d / r`.
///
/// The filter integrates to `pi r^2 / 3` over the disk, which is the
/// normalisation.
pub(super) fn cone_estimate(
    map: &LinearOctree<Photon>,
    hit: &Interaction,
    wo: DVec3,
    k: usize,
    max_radius: f64,
) -> Color {
    let found = map.knn_search(hit.position, k, max_radius);
    let Some(&(_, r2)) = found.last() else {
        return Color::ZERO;
    };
    if r2 <= 0.0 {
        return Color::ZERO;
    }
    let sum: Color = found
        .iter()
        .filter_map(|(photon, d2)| {
            let weight = (1.0 - (d2 / r2).sqrt()).max(0.0);
            reflected(photon, hit, wo).map(|c| c * weight)
        })
        .sum();
    sum / (PI * r2 / 3.0)
}
