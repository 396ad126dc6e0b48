//! Spatial indices over points and surfaces.
//!
//! Trees are built in an owned, pointer-linked form and then compacted
//! once into a depth-first array (`LinearTree`) that all queries run on.

mod linear_tree;
mod octree;

pub use linear_tree::{BuildNode, LinearNode, LinearOctree, LinearTree};
pub use octree::Octree;

use lumen_math::DVec3;

/// Anything stored in a point index.
pub trait Positioned {
    fn position(&self) -> DVec3;
}

impl Positioned for DVec3 {
    fn position(&self) -> DVec3 {
        *self
    }
}
