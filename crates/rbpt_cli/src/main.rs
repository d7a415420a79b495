//! Command-line front end: load a JSON scene, run the progressive renderer
//! for a number of iterations and save the averaged image as PNG.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rbpt_core::RenderSettings;
use rbpt_renderer::{Camera, ImageBuffer, Renderer, Scene};

/// Progressive resampled bidirectional path tracer.
///
/// Options override the `settings` block of the scene file.
#[derive(Parser, Debug)]
#[command(name = "rbpt", version)]
struct Args {
    /// Scene description (JSON)
    scene: PathBuf,

    /// Output image (PNG)
    output: PathBuf,

    /// Iterations to average
    #[arg(short, long)]
    iterations: Option<u32>,

    /// Light sub-paths in the candidate pool (M)
    #[arg(short = 'm', long)]
    light_subpaths: Option<usize>,

    /// Nearest cache points per camera vertex (Nc)
    #[arg(short = 'n', long)]
    neighbor_caches: Option<usize>,

    /// Worker threads
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(short, long)]
    seed: Option<u64>,
}

impl Args {
    /// Command-line values override the scene file's settings.
    fn apply(&self, settings: &mut RenderSettings) {
        if let Some(n) = self.iterations {
            settings.iterations = n;
        }
        if let Some(m) = self.light_subpaths {
            settings.light_subpaths = m;
        }
        if let Some(nc) = self.neighbor_caches {
            settings.neighbor_caches = nc;
        }
        if let Some(t) = self.threads {
            settings.threads = t;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let desc = rbpt_core::load_scene(&args.scene)
        .with_context(|| format!("Failed to load {}", args.scene.display()))?;
    let mut settings = desc.settings.clone();
    args.apply(&mut settings);
    if settings.iterations == 0 {
        bail!("At least one iteration is required");
    }

    let scene = Scene::from_description(&desc)?;
    let camera = Camera::from_description(&desc.camera);
    let mut renderer = Renderer::new(&camera, &settings)?;

    let start = Instant::now();
    let mut accum = ImageBuffer::new(camera.res_x(), camera.res_y());
    for _ in 0..settings.iterations {
        let image = renderer.render(&scene, &camera)?;
        accum.accumulate(&image);
    }
    accum.scale(1.0 / settings.iterations as f32);
    log::info!(
        "Rendered {} iterations in {:.2?}",
        settings.iterations,
        start.elapsed()
    );

    image::save_buffer(
        &args.output,
        &accum.to_rgba(),
        accum.width,
        accum.height,
        image::ColorType::Rgba8,
    )
    .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Saved {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("rbpt").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_overrides() {
        let args = parse(&["scene.json", "--threads", "3", "out.png", "--seed", "9"]).unwrap();
        assert_eq!(args.scene, PathBuf::from("scene.json"));
        assert_eq!(args.output, PathBuf::from("out.png"));

        let mut settings = RenderSettings::default();
        let iterations = settings.iterations;
        args.apply(&mut settings);
        assert_eq!(settings.threads, 3);
        assert_eq!(settings.seed, 9);
        assert_eq!(settings.iterations, iterations);

        let args = parse(&["a.json", "b.png", "-m", "64", "--neighbor-caches", "0"]).unwrap();
        args.apply(&mut settings);
        assert_eq!(settings.light_subpaths, 64);
        assert_eq!(settings.neighbor_caches, 0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["scene.json"]).is_err());
        assert!(parse(&["a.json", "b.png", "c.png"]).is_err());
        assert!(parse(&["a.json", "b.png", "--iterations"]).is_err());
        assert!(parse(&["a.json", "b.png", "--iterations", "many"]).is_err());
        assert!(parse(&["a.json", "b.png", "--bogus", "1"]).is_err());
    }

    #[test]
    fn test_args_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
