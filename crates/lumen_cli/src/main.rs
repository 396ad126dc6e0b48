use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lumen_renderer::{
    render, scenes, Diagnostics, ImageBuffer, Integrator, LogDiagnostics, PathTracer, PhotonMapper, Scene,
    Settings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DemoScene {
    /// Closed box with a ceiling light, a glass and a mirror sphere
    Cornell,
    /// Matte sphere under a triangle light
    Sphere,
    /// Emissive sphere seen from the inside
    Furnace,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntegratorKind {
    Path,
    Photon,
}

/// Render one of the built-in demo scenes to a PNG.
#[derive(Parser, Debug)]
#[command(name = "lumen", version)]
struct Cli {
    #[arg(long, value_enum, default_value = "cornell")]
    scene: DemoScene,

    #[arg(long, value_enum, default_value = "photon")]
    integrator: IntegratorKind,

    /// JSON settings file; missing fields keep their defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(short, long, default_value = "lumen.png")]
    output: PathBuf,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    spp: Option<u32>,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid settings in {}", path.display()))?
        }
        None => Settings::default(),
    };
    if let Some(width) = cli.width {
        settings.render.width = width;
    }
    if let Some(height) = cli.height {
        settings.render.height = height;
    }
    if let Some(spp) = cli.spp {
        settings.render.samples_per_pixel = spp;
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn save_png(image: &ImageBuffer, path: &Path) -> Result<()> {
    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .context("Image buffer does not match its dimensions")?;
    rgba.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let demo = match cli.scene {
        DemoScene::Cornell => scenes::cornell_box(),
        DemoScene::Sphere => scenes::lit_sphere(),
        DemoScene::Furnace => scenes::furnace(1.0, 0.5),
    };
    let scene = Arc::new(Scene::new(demo.surfaces, &settings));
    let diagnostics = Arc::new(LogDiagnostics::new());
    let sink: Arc<dyn Diagnostics> = diagnostics.clone();

    let integrator: Box<dyn Integrator> = match cli.integrator {
        IntegratorKind::Path => Box::new(PathTracer::new(scene, &settings.render, sink)),
        IntegratorKind::Photon => {
            Box::new(PhotonMapper::new(scene, &settings, sink).context("Photon pass failed")?)
        }
    };

    let image = render(&demo.camera, integrator.as_ref(), &settings).context("Render failed")?;
    diagnostics.summary();

    log::info!("Mean pixel value {:.4?}", image.mean());
    save_png(&image, &cli.output)?;
    log::info!("Wrote {}", cli.output.display());
    Ok(())
}
