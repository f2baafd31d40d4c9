//! Error types for each stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Index, ParentIndex};

/// A skeleton definition that violates the tree invariants.
#[derive(Debug, Error, PartialEq)]
pub enum SkeletonError {
    #[error("skeleton has no joints")]
    Empty,
    #[error("joint 0 must be the root but has parent {0}")]
    RootHasParent(ParentIndex),
    #[error("joint {0} has no parent, only joint 0 may be the root")]
    ExtraRoot(Index),
    #[error("joint {joint} has parent {parent}, parents must precede their children")]
    ParentOrder { joint: Index, parent: ParentIndex },
    #[error("joint {joint} reads rotation parameter {index}, which no frame can hold")]
    RotationIndexOverflow { joint: Index, index: usize },
    #[error("{what} table has {found} entries, expected {expected} (one per joint)")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Failure to load a skeleton or a channel sequence.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line {line}: invalid number {token:?}")]
    Number { line: usize, token: String },
    #[error("line {line}: expected {expected} values, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: {message}")]
    Hierarchy { line: usize, message: String },
    #[error("invalid view config: {0}")]
    Config(String),
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
}

/// A frame that cannot be evaluated against the skeleton.
#[derive(Debug, Error, PartialEq)]
pub enum KinematicsError {
    #[error("frame {frame} has {width} parameters, the skeleton reads up to index {required}")]
    FrameTooShort {
        frame: usize,
        width: usize,
        required: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("{0} sequence has no frames")]
    EmptySequence(&'static str),
    #[error("center joint {joint} is out of range for a {num_joints}-joint skeleton")]
    CenterJoint { joint: Index, num_joints: usize },
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export extension for {} (expected .gif or .mp4)", .0.display())]
    UnsupportedExtension(PathBuf),
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("GIF encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("bundled font is unreadable: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
}
