// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod bounding_box;
mod direction;
mod interval;
mod ray;

pub use bounding_box::BoundingBox;
pub use direction::PackedDirection;
pub use interval::Interval;
pub use ray::Ray;

/// Offset used to move secondary ray origins off the surface they leave.
pub const RAY_EPSILON: f64 = 1e-6;

/// Returns component `axis` (0=X, 1=Y, 2=Z) of a vector.
#[inline]
pub fn axis_value(v: DVec3, axis: usize) -> f64 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}
