//! Lumen renderer - CPU photon mapping and path tracing.
//!
//! Geometry sits behind a BVH, photons live in linear octrees, and both
//! integrators run as explicit loops on scoped worker threads.

mod bucket;
mod bvh;
mod camera;
mod interaction;
mod material;
mod progress;
mod renderer;
mod scene;
mod sphere;
mod surface;
mod triangle;
mod work_queue;

pub mod diagnostics;
pub mod error;
pub mod integrator;
pub mod sampling;
pub mod scenes;
pub mod settings;
pub mod spatial;

pub use bucket::{generate_buckets, render_bucket, render_pixel, Bucket, BucketResult};
pub use bvh::Bvh;
pub use camera::Camera;
pub use diagnostics::{BiasEvent, CapturingDiagnostics, Diagnostics, LogDiagnostics};
pub use error::{RenderError, RenderResult, SettingsError};
pub use integrator::{Integrator, PathTracer, PhotonMapper, PhotonMaps};
pub use interaction::Interaction;
pub use material::{max_channel, Color, Material};
pub use renderer::{color_to_rgba, linear_to_gamma, render, ImageBuffer};
pub use scene::Scene;
pub use settings::{BvhSettings, BvhStrategy, PhotonSettings, RenderSettings, Settings};
pub use sphere::Sphere;
pub use surface::Surface;
pub use triangle::Triangle;
pub use work_queue::WorkQueue;

/// Re-export the math crate's common types
pub use lumen_math::{BoundingBox, DVec3, Interval, Ray};
