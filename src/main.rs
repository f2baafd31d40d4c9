//! expmap-skeleton CLI - run forward kinematics on channel files and export animations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use expmap_skeleton::parse::{load_channels_from_file, load_skeleton_from_file};
use expmap_skeleton::{export, forward_kinematics, MotionScene, Skeleton, ViewConfig};

#[derive(Parser, Debug)]
#[command(name = "expmap-skeleton", version, about = "Exponential-map forward kinematics and stick-figure export")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the joints of a skeleton (.json or .bvh)
    Inspect { skeleton: PathBuf },
    /// Write [T, J, 3] joint positions as JSON
    Positions {
        skeleton: PathBuf,
        channels: PathBuf,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a prediction (and optional ground truth) to .gif or .mp4
    Export {
        skeleton: PathBuf,
        prediction: PathBuf,
        output: PathBuf,
        #[arg(long)]
        ground_truth: Option<PathBuf>,
        /// View configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Play a prediction (and optional ground truth) in a window
    #[cfg(feature = "visualize")]
    View {
        skeleton: PathBuf,
        prediction: PathBuf,
        #[arg(long)]
        ground_truth: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default view configuration
    ExampleConfig,
}

fn load_config(path: Option<&Path>) -> Result<ViewConfig> {
    match path {
        Some(path) => ViewConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(ViewConfig::default()),
    }
}

fn load_scene(
    skeleton: &Path,
    prediction: &Path,
    ground_truth: Option<&Path>,
    config: &ViewConfig,
) -> Result<MotionScene> {
    let skeleton = load_skeleton_from_file(skeleton)?;
    let prediction = load_channels_from_file(prediction)?;
    let ground_truth = ground_truth.map(|p| load_channels_from_file(p)).transpose()?;
    Ok(MotionScene::new(&skeleton, &prediction, ground_truth.as_ref(), config)?)
}

fn inspect(skeleton: &Skeleton) {
    println!("{} joints, frame width >= {}", skeleton.num_joints(), skeleton.required_width());
    for joint in 0..skeleton.num_joints() {
        let offset = skeleton.offset(joint);
        let parent = skeleton
            .parent(joint)
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        let rotation = skeleton
            .rotation_indices(joint)
            .map_or_else(|| "none".to_string(), |r| format!("{r:?}"));
        println!(
            "{joint:>3} {:.<24} parent {parent:>3}  offset ({:8.3}, {:8.3}, {:8.3})  rotation {rotation}",
            format!("{}{} ", "  ".repeat(skeleton.depth(joint)), skeleton.name(joint)),
            offset.x,
            offset.y,
            offset.z,
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect { skeleton } => {
            let skeleton = load_skeleton_from_file(&skeleton)?;
            inspect(&skeleton);
        }
        Command::Positions {
            skeleton,
            channels,
            output,
        } => {
            let skeleton = load_skeleton_from_file(&skeleton)?;
            let channels = load_channels_from_file(&channels)?;
            let positions = forward_kinematics(&skeleton, &channels)?;
            let document = serde_json::json!({
                "frames": positions.num_frames(),
                "joints": positions.num_joints(),
                "bones": skeleton.bones(),
                "positions": positions.to_nested(),
            });
            let text = serde_json::to_string(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {} frames to {}", positions.num_frames(), path.display());
                }
                None => println!("{text}"),
            }
        }
        Command::Export {
            skeleton,
            prediction,
            output,
            ground_truth,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let scene = load_scene(&skeleton, &prediction, ground_truth.as_deref(), &config)?;
            let format = export::export(&scene, &config, &output)?;
            println!(
                "Wrote {} frames ({format:?}, {} fps) to {}",
                scene.num_frames(),
                config.fps(),
                output.display()
            );
        }
        #[cfg(feature = "visualize")]
        Command::View {
            skeleton,
            prediction,
            ground_truth,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let scene = load_scene(&skeleton, &prediction, ground_truth.as_deref(), &config)?;
            expmap_skeleton::visualize::visualize_scene(scene, &config);
        }
        Command::ExampleConfig => {
            println!("{}", serde_json::to_string_pretty(&ViewConfig::default())?);
        }
    }
    Ok(())
}
