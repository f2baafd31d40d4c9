//! Forward kinematics for skeletal motion stored as exponential maps.
//!
//! A [`Skeleton`](skeleton::Skeleton) fixes the kinematic tree: a parent per
//! joint, a rest offset per joint and the slice of the per-frame parameter
//! vector holding each joint's rotation. [`forward_kinematics`] turns a
//! `[T, D]` channel sequence into `[T, J, 3]` joint positions.
//! [`MotionScene`](scene::MotionScene) pairs a prediction with its ground
//! truth for drawing, and [`export`](export::export) writes it to a GIF or MP4.
//!
//! ```rust,no_run
//! use expmap_skeleton::parse::{load_channels_from_file, load_skeleton_from_file};
//! use expmap_skeleton::{export::export, MotionScene, ViewConfig};
//!
//! let skeleton = load_skeleton_from_file("assets/skeleton.json")?;
//! let prediction = load_channels_from_file("assets/prediction.txt")?;
//! let ground_truth = load_channels_from_file("assets/ground_truth.txt")?;
//!
//! let config = ViewConfig::default();
//! let scene = MotionScene::new(&skeleton, &prediction, Some(&ground_truth), &config)?;
//! export(&scene, &config, "comparison.gif")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod kinematics;
pub mod parse;
pub mod scene;
pub mod skeleton;
pub mod types;
pub mod utils;

#[cfg(feature = "visualize")]
pub mod visualize;

pub use config::ViewConfig;
pub use kinematics::{forward_kinematics, Pose};
pub use scene::MotionScene;
pub use skeleton::Skeleton;
pub use types::{Bone, Channels, PositionSequence};
pub use utils::expmap_to_rotmat;
