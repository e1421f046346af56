use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use render::{Framing, MaskMode, ViewConfig, ViewRequest, ViewSet, render_views};
use scene::{Mask, PointCloud};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI for rendering highlighted views of a segmented point cloud.
#[derive(Parser, Debug)]
struct Args {
    /// Point cloud or mesh in PLY format
    #[arg(short, long)]
    input: PathBuf,

    /// Per-point labels as .npy
    #[arg(short, long)]
    mask: PathBuf,

    /// Directory the views and the exported scene are written to
    #[arg(short, long)]
    output: PathBuf,

    /// Object label to highlight
    #[arg(long, default_value_t = 1)]
    obj_id: u32,

    /// How the object is highlighted: outline or full
    #[arg(long, default_value_t = MaskMode::Outline)]
    mode: MaskMode,

    /// Look outward from the scene center instead of orbiting the object
    #[arg(long)]
    outward: bool,

    /// Overlap between neighbouring outward views
    #[arg(long, default_value_t = 0.2)]
    overlap: f32,

    /// Number of orbit views
    #[arg(long, default_value_t = 8)]
    count: usize,

    /// Orbit radius as a multiple of the object's bounding radius
    #[arg(long, default_value_t = 2.0)]
    distance_factor: f32,

    /// Camera height. Defaults to 1.5 above the lowest point
    #[arg(long)]
    height: Option<f32>,

    /// Vertical field of view of orbit views in degrees
    #[arg(long, default_value_t = 60.0)]
    view_angle: f32,
}

impl Args {
    fn request(&self) -> ViewRequest {
        let framing = if self.outward {
            Framing::Outward {
                overlap_ratio: self.overlap,
            }
        } else {
            Framing::Orbit {
                distance_factor: self.distance_factor,
                count: self.count,
            }
        };
        ViewRequest {
            obj_id: self.obj_id,
            mode: self.mode,
            framing,
            height: self.height,
            vertical_fov_deg: Some(self.view_angle),
            output_dir: self.output.clone(),
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ViewSet> {
    let cloud = PointCloud::load(&args.input).with_context(|| format!("failed to load {}", args.input.display()))?;
    let mask = Mask::load(&args.mask).with_context(|| format!("failed to load {}", args.mask.display()))?;
    info!("Loaded {} points and {} labels", cloud.len(), mask.len());

    let views = render_views(&cloud, &mask, &args.request(), &ViewConfig::default())?;
    Ok(views)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let views = run(&args)?;

    for path in &views.image_paths {
        println!("{}", path.display());
    }
    println!("{}", views.scene_path.display());
    Ok(())
}
