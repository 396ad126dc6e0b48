use crate::spatial::{LinearOctree, Octree, Positioned};
use crate::Color;
use lumen_math::{BoundingBox, DVec3, PackedDirection, Vec3};

/// Light energy deposited on a diffuse surface.
///
/// Stored in single precision with the travel direction packed into two
/// angles; photon maps hold millions of these.
#[derive(Debug, Clone, Copy)]
pub struct Photon {
    position: Vec3,
    flux: Vec3,
    direction: PackedDirection,
}

impl Photon {
    pub fn new(position: DVec3, flux: Color, direction: DVec3) -> Self {
        Self {
            position: position.as_vec3(),
            flux: flux.as_vec3(),
            direction: PackedDirection::encode(direction),
        }
    }

    pub fn flux(&self) -> Color {
        self.flux.as_dvec3()
    }

    /// Direction the photon was travelling when it landed.
    pub fn direction(&self) -> DVec3 {
        self.direction.decode()
    }
}

impl Positioned for Photon {
    fn position(&self) -> DVec3 {
        self.position.as_dvec3()
    }
}

/// A point that light passing straight through an occluder would reach.
#[derive(Debug, Clone, Copy)]
pub struct ShadowPhoton {
    position: Vec3,
}

impl ShadowPhoton {
    pub fn new(position: DVec3) -> Self {
        Self {
            position: position.as_vec3(),
        }
    }
}

impl Positioned for ShadowPhoton {
    fn position(&self) -> DVec3 {
        self.position.as_dvec3()
    }
}

/// One worker's photons, merged into the maps after emission.
#[derive(Debug, Default)]
pub(super) struct PhotonBuffers {
    pub direct: Vec<Photon>,
    pub indirect: Vec<Photon>,
    pub caustic: Vec<Photon>,
    pub shadow: Vec<ShadowPhoton>,
}

/// The four query-time photon maps.
#[derive(Debug, Default)]
pub struct PhotonMaps {
    /// First diffuse hit after leaving a light
    pub direct: LinearOctree<Photon>,
    /// Later diffuse hits reached through a diffuse bounce
    pub indirect: LinearOctree<Photon>,
    /// Diffuse hits right after a specular bounce
    pub caustic: LinearOctree<Photon>,
    /// Points hidden from a light by the first surface along its photons
    pub shadow: LinearOctree<ShadowPhoton>,
}

impl PhotonMaps {
    pub(super) fn from_buffers(buffers: Vec<PhotonBuffers>, leaf_capacity: usize) -> Self {
        let mut direct = Vec::new();
        let mut indirect = Vec::new();
        let mut caustic = Vec::new();
        let mut shadow = Vec::new();
        for b in buffers {
            direct.extend(b.direct);
            indirect.extend(b.indirect);
            caustic.extend(b.caustic);
            shadow.extend(b.shadow);
        }
        Self {
            direct: build_map(direct, leaf_capacity),
            indirect: build_map(indirect, leaf_capacity),
            caustic: build_map(caustic, leaf_capacity),
            shadow: build_map(shadow, leaf_capacity),
        }
    }
}

/// Insert into an octree over the points' bounds, then compact it.
fn build_map<T: Positioned>(items: Vec<T>, leaf_capacity: usize) -> LinearOctree<T> {
    if items.is_empty() {
        return LinearOctree::default();
    }
    let mut bounds = BoundingBox::EMPTY;
    for item in &items {
        bounds.merge_point(item.position());
    }
    let mut octree = Octree::from_bounds(&bounds, leaf_capacity);
    for item in items {
        octree.insert(item);
    }
    LinearOctree::from(octree)
}
