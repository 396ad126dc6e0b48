//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that workers render
//! independently, each with its own random stream.

use crate::integrator::Integrator;
use crate::{Camera, Color};
use rand::RngCore;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Buckets near the middle come first so the interesting part of the
/// image finishes early.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = size.min(width - x);
            let bh = size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += size;
        }
        y += size;
    }

    sort_spiral(&mut buckets, width, height);
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Sort buckets by distance of their centers from the image center.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let dist = |b: &Bucket| {
        let bx = b.x as f64 + b.width as f64 / 2.0;
        let by = b.y as f64 + b.height as f64 / 2.0;
        (bx - cx).powi(2) + (by - cy).powi(2)
    };
    buckets.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}

/// Average of `spp` radiance samples through pixel (x, y).
pub fn render_pixel(
    camera: &Camera,
    integrator: &dyn Integrator,
    x: u32,
    y: u32,
    spp: u32,
    rng: &mut dyn RngCore,
) -> Color {
    let mut pixel = Color::ZERO;
    for _ in 0..spp {
        let ray = camera.get_ray(x, y, rng);
        pixel += integrator.sample_ray(ray, rng);
    }
    pixel / spp.max(1) as f64
}

/// Render a single bucket. Pixels come back in row-major order.
pub fn render_bucket(
    bucket: &Bucket,
    camera: &Camera,
    integrator: &dyn Integrator,
    spp: u32,
    rng: &mut dyn RngCore,
) -> Vec<Color> {
    let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);
    for local_y in 0..bucket.height {
        for local_x in 0..bucket.width {
            pixels.push(render_pixel(
                camera,
                integrator,
                bucket.x + local_x,
                bucket.y + local_y,
                spp,
                rng,
            ));
        }
    }
    pixels
}

/// Result of rendering a bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    /// Pixel colors in row-major order
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Ray;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Constant(Color);

    impl Integrator for Constant {
        fn sample_ray(&self, _ray: Ray, _rng: &mut dyn RngCore) -> Color {
            self.0
        }
    }

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4);
        let total: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total, 128 * 128);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(100, 70, 32);
        assert_eq!(buckets.len(), 4 * 3);
        let total: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total, 100 * 70);
        for (i, b) in buckets.iter().enumerate() {
            assert_eq!(b.index, i);
            assert!(b.x + b.width <= 100 && b.y + b.height <= 70);
        }
    }

    #[test]
    fn test_spiral_order() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9);
        assert_eq!((buckets[0].x, buckets[0].y), (64, 64));
    }

    #[test]
    fn test_render_bucket_is_row_major() {
        let mut camera = Camera::new().with_resolution(8, 8);
        camera.initialize();
        let bucket = Bucket::new(2, 4, 3, 2, 0);
        let mut rng = StdRng::seed_from_u64(1);
        let pixels = render_bucket(&bucket, &camera, &Constant(Color::ONE), 4, &mut rng);
        assert_eq!(pixels.len(), 6);
        assert!(pixels.iter().all(|&p| (p - Color::ONE).length() < 1e-12));
    }
}
