//! Built-in demo scenes.

use crate::{Camera, Color, Material, Sphere, Surface, Triangle};
use lumen_math::DVec3;
use std::sync::Arc;

/// Geometry plus a camera framing it.
pub struct Demo {
    pub surfaces: Vec<Surface>,
    pub camera: Camera,
}

/// Parallelogram `origin + s*u + t*v` as two triangles facing along `u x v`.
pub fn quad(origin: DVec3, u: DVec3, v: DVec3, material: &Arc<Material>) -> [Surface; 2] {
    [
        Triangle::new(origin, origin + u, origin + u + v, Arc::clone(material)).into(),
        Triangle::new(origin, origin + u + v, origin + v, Arc::clone(material)).into(),
    ]
}

/// Closed box with a ceiling light, a glass sphere and a mirror sphere.
pub fn cornell_box() -> Demo {
    let white = Arc::new(Material::diffuse(Color::splat(0.73)));
    let red = Arc::new(Material::diffuse(Color::new(0.65, 0.05, 0.05)));
    let green = Arc::new(Material::diffuse(Color::new(0.12, 0.45, 0.15)));
    let light = Arc::new(Material::emissive(Color::splat(12.0)));
    let glass = Arc::new(Material::glass(1.5));
    let mirror = Arc::new(Material::mirror(Color::splat(0.95)));

    let mut surfaces = Vec::new();
    // floor, ceiling, back, left, right
    surfaces.extend(quad(DVec3::new(-1.0, -1.0, 1.0), DVec3::new(2.0, 0.0, 0.0), DVec3::new(0.0, 0.0, -2.0), &white));
    surfaces.extend(quad(DVec3::new(-1.0, 1.0, 1.0), DVec3::new(0.0, 0.0, -2.0), DVec3::new(2.0, 0.0, 0.0), &white));
    surfaces.extend(quad(DVec3::new(-1.0, -1.0, -1.0), DVec3::new(2.0, 0.0, 0.0), DVec3::new(0.0, 2.0, 0.0), &white));
    surfaces.extend(quad(DVec3::new(-1.0, -1.0, 1.0), DVec3::new(0.0, 0.0, -2.0), DVec3::new(0.0, 2.0, 0.0), &red));
    surfaces.extend(quad(DVec3::new(1.0, -1.0, -1.0), DVec3::new(0.0, 0.0, 2.0), DVec3::new(0.0, 2.0, 0.0), &green));
    surfaces.extend(quad(
        DVec3::new(-0.25, 0.999, 0.25),
        DVec3::new(0.0, 0.0, -0.5),
        DVec3::new(0.5, 0.0, 0.0),
        &light,
    ));
    surfaces.push(Sphere::new(DVec3::new(0.45, -0.6, 0.3), 0.4, glass).into());
    surfaces.push(Sphere::new(DVec3::new(-0.45, -0.6, -0.35), 0.4, mirror).into());

    let camera = Camera::new()
        .with_position(DVec3::new(0.0, 0.0, 3.4), DVec3::ZERO, DVec3::Y)
        .with_fov(40.0);
    Demo { surfaces, camera }
}

/// Unit matte sphere at the origin under one overhead triangle light.
pub fn lit_sphere() -> Demo {
    let matte = Arc::new(Material::diffuse(Color::splat(0.8)));
    let light = Arc::new(Material::emissive(Color::splat(5.0)));
    let o = DVec3::new(-1.0, 3.0, 1.0);
    let surfaces = vec![
        Sphere::new(DVec3::ZERO, 1.0, matte).into(),
        // Legs of length 2 facing down: area 2
        Triangle::new(o, o + DVec3::new(0.0, 0.0, -2.0), o + DVec3::new(2.0, 0.0, 0.0), light).into(),
    ];
    let camera = Camera::new()
        .with_position(DVec3::new(0.0, 0.0, -4.0), DVec3::ZERO, DVec3::Y)
        .with_fov(40.0);
    Demo { surfaces, camera }
}

/// Closed emissive enclosure seen from its center.
///
/// Every point of the inner wall emits `emittance` and reflects `albedo`,
/// so the radiance everywhere is `emittance / (1 - albedo)`.
pub fn furnace(emittance: f64, albedo: f64) -> Demo {
    let wall = Arc::new(
        Material::diffuse(Color::splat(albedo)).with_emittance(Color::splat(emittance)),
    );
    let surfaces = vec![Sphere::inward(DVec3::ZERO, 1.0, wall).into()];
    let camera = Camera::new()
        .with_position(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0), DVec3::Y)
        .with_fov(90.0);
    Demo { surfaces, camera }
}
