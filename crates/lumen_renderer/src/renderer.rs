//! Multi-threaded bucket render driver and the output image.

use crate::bucket::{generate_buckets, render_bucket, Bucket, BucketResult};
use crate::error::{RenderError, RenderResult};
use crate::integrator::Integrator;
use crate::progress::Progress;
use crate::sampling::{stream_seed, RENDER_STREAM};
use crate::settings::Settings;
use crate::work_queue::WorkQueue;
use crate::{Camera, Color};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f64) -> f64 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let byte = |c: f64| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [byte(color.x), byte(color.y), byte(color.z), 255]
}

/// Pixels in a `width` x `height` image, widened before multiplying.
#[inline]
pub fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Linear RGB image, row-major from the top-left pixel.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; pixel_count(width, height)],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    /// Average pixel value.
    pub fn mean(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().sum::<Color>() / self.pixels.len() as f64
    }

    /// Copy a finished bucket into place.
    fn write_bucket(&mut self, result: &BucketResult) {
        let Bucket { x, y, width, .. } = result.bucket;
        for (i, &color) in result.pixels.iter().enumerate() {
            let i = i as u32;
            self.set(x + i % width, y + i / width, color);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for &color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(color));
        }
        bytes
    }
}

/// Render the image seen by `camera` with any integrator.
///
/// Camera rays start in the scene's global medium. Buckets are handed out
/// from a shared queue to scoped workers. Each worker owns its own
/// generator on the render stream, and finished buckets are stitched
/// together after every worker has joined.
pub fn render(camera: &Camera, integrator: &dyn Integrator, settings: &Settings) -> RenderResult<ImageBuffer> {
    settings.validate()?;
    let rs = &settings.render;

    let mut camera = camera
        .clone()
        .with_resolution(rs.width, rs.height)
        .with_medium(settings.ior);
    camera.initialize();

    let queue: WorkQueue<Bucket> = generate_buckets(rs.width, rs.height, rs.bucket_size)
        .into_iter()
        .collect();
    let threads = settings.render_threads();
    let pixels = pixel_count(rs.width, rs.height);
    log::info!(
        "Rendering {}x{} at {} spp: {} buckets on {} threads",
        rs.width,
        rs.height,
        rs.samples_per_pixel,
        queue.len(),
        threads
    );

    let start = Instant::now();
    let progress = Progress::new("Render", "pixels", pixels);
    let camera = &camera;

    let joined = crossbeam::scope(|scope| {
        scope.spawn(|_| progress.monitor());

        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let (queue, progress) = (&queue, &progress);
                scope.spawn(move |_| {
                    let mut rng = StdRng::seed_from_u64(stream_seed(rs.seed, RENDER_STREAM, worker));
                    let mut done = Vec::new();
                    while let Some(bucket) = queue.get_work() {
                        let pixels = render_bucket(&bucket, camera, integrator, rs.samples_per_pixel, &mut rng);
                        progress.add(pixels.len());
                        done.push(BucketResult::new(bucket, pixels));
                    }
                    done
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        progress.finish();
        results
    })
    .map_err(|_| RenderError::WorkerPanicked)?;

    let mut image = ImageBuffer::new(rs.width, rs.height);
    for results in joined {
        let results = results.map_err(|_| RenderError::WorkerPanicked)?;
        for result in &results {
            image.write_bucket(result);
        }
    }
    log::info!("Render finished in {:.2?}", start.elapsed());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CapturingDiagnostics;
    use crate::error::SettingsError;
    use crate::integrator::PathTracer;
    use crate::{scenes, Ray, Scene};
    use parking_lot::Mutex;
    use rand::RngCore;
    use std::sync::Arc;

    /// Records the medium of every camera ray and returns black.
    #[derive(Default)]
    struct MediumRecorder {
        media: Mutex<Vec<f64>>,
    }

    impl Integrator for MediumRecorder {
        fn sample_ray(&self, ray: Ray, _rng: &mut dyn RngCore) -> Color {
            self.media.lock().push(ray.medium_ior());
            Color::ZERO
        }
    }

    fn small_settings() -> Settings {
        let mut settings = Settings::default();
        settings.render.width = 32;
        settings.render.height = 24;
        settings.render.samples_per_pixel = 8;
        settings.render.bucket_size = 8;
        settings.render.threads = 2;
        settings
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 1e-12);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_color_to_rgba_clamps() {
        assert_eq!(color_to_rgba(Color::new(-1.0, 0.25, 4.0)), [0, 127, 255, 255]);
    }

    #[test]
    fn test_pixel_count_does_not_wrap() {
        assert_eq!(pixel_count(32, 24), 768);
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(pixel_count(u32::MAX, 2), 2 * u32::MAX as usize);
    }

    #[test]
    fn test_image_mean() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(1, 0, Color::splat(2.0));
        assert_eq!(image.get(1, 0), Color::splat(2.0));
        assert_eq!(image.mean(), Color::ONE);
        assert_eq!(image.to_rgba().len(), 8);
    }

    #[test]
    fn test_lit_sphere_render() {
        let _ = env_logger::builder().is_test(true).try_init();
        let settings = small_settings();
        let demo = scenes::lit_sphere();
        let scene = Arc::new(Scene::new(demo.surfaces, &settings));
        let light = scene.emissives()[0].material().emittance.x;
        let tracer = PathTracer::new(scene, &settings.render, Arc::new(CapturingDiagnostics::new()));

        let image = render(&demo.camera, &tracer, &settings).unwrap();
        assert_eq!((image.width, image.height), (32, 24));
        assert_eq!(image.pixels.len(), 32 * 24);

        // No pixel sees the lamp, so nothing may outshine it
        let mean = image.mean().x;
        assert!(mean > 0.0 && mean < light, "mean {}", mean);
        assert!(image.pixels.iter().all(|p| p.is_finite() && p.min_element() >= 0.0));

        let row_sum = |rows: std::ops::Range<u32>| -> f64 {
            rows.flat_map(|y| (0..32).map(move |x| (x, y)))
                .map(|(x, y)| image.get(x, y).x)
                .sum()
        };
        assert!(row_sum(0..12) > row_sum(12..24));
    }

    #[test]
    fn test_render_is_deterministic_per_seed() {
        // One worker pops buckets in a fixed order
        let mut settings = small_settings();
        settings.render.threads = 1;
        let demo = scenes::lit_sphere();
        let scene = Arc::new(Scene::new(demo.surfaces, &settings));
        let tracer = PathTracer::new(scene, &settings.render, Arc::new(CapturingDiagnostics::new()));

        let a = render(&demo.camera, &tracer, &settings).unwrap();
        let b = render(&demo.camera, &tracer, &settings).unwrap();
        assert_eq!(a.pixels, b.pixels);
    }

    #[test]
    fn test_render_rejects_empty_image() {
        let mut settings = small_settings();
        settings.render.width = 0;
        let demo = scenes::lit_sphere();
        let scene = Arc::new(Scene::new(demo.surfaces, &settings));
        let tracer = PathTracer::new(scene, &settings.render, Arc::new(CapturingDiagnostics::new()));
        let result = render(&demo.camera, &tracer, &settings);
        assert!(matches!(
            result,
            Err(RenderError::Settings(SettingsError::Resolution { width: 0, .. }))
        ));
    }

    #[test]
    fn test_camera_rays_start_in_scene_medium() {
        let mut settings = small_settings();
        settings.ior = 1.33;
        let recorder = MediumRecorder::default();
        render(&scenes::lit_sphere().camera, &recorder, &settings).unwrap();

        let media = recorder.media.lock();
        assert_eq!(media.len(), 32 * 24 * 8);
        assert!(media.iter().all(|&ior| ior == 1.33));
    }
}
