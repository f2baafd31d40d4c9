//! Forward kinematics over a [`Skeleton`]: walks joints in index order,
//! composing each joint's local rotation with its parent's cumulative one.

use cgmath::{Matrix, SquareMatrix};

use crate::error::KinematicsError;
use crate::skeleton::Skeleton;
use crate::types::{Channels, Position, PositionSequence, Rotation};
use crate::utils::{expmap_at, expmap_to_rotmat};

/// Global joint positions and cumulative rotations for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub positions: Vec<Position>,
    pub rotations: Vec<Rotation>,
}

impl Pose {
    /// Evaluate one frame of exponential-map parameters.
    ///
    /// Rotations act on row vectors: a child sits at `offset * R_parent + p_parent`
    /// and accumulates `R_local * R_parent`.
    pub fn compute(skeleton: &Skeleton, frame: &[f64]) -> Result<Self, KinematicsError> {
        check_width(skeleton, frame.len(), 0)?;
        Ok(Self::compute_unchecked(skeleton, frame))
    }

    fn compute_unchecked(skeleton: &Skeleton, frame: &[f64]) -> Self {
        let n = skeleton.num_joints();
        let mut positions: Vec<Position> = Vec::with_capacity(n);
        let mut rotations: Vec<Rotation> = Vec::with_capacity(n);

        for joint in 0..n {
            let local = match skeleton.rotation_indices(joint) {
                Some(indices) => expmap_to_rotmat(expmap_at(frame, indices)),
                None => Rotation::identity(),
            };
            let offset = skeleton.offset(joint);

            //// parents always come first, so their entries are already filled in
            match skeleton.parent(joint) {
                None => {
                    positions.push(offset);
                    rotations.push(local);
                }
                Some(parent) => {
                    let parent_rotation = rotations[parent];
                    // row vector times matrix == transposed matrix times column vector
                    positions.push(parent_rotation.transpose() * offset + positions[parent]);
                    rotations.push(local * parent_rotation);
                }
            }
        }

        Pose {
            positions,
            rotations,
        }
    }
}

fn check_width(skeleton: &Skeleton, width: usize, frame: usize) -> Result<(), KinematicsError> {
    let required = skeleton.required_width();
    if width < required {
        return Err(KinematicsError::FrameTooShort {
            frame,
            width,
            required,
        });
    }
    Ok(())
}

/// Run forward kinematics on every frame, producing a `[T, J, 3]` sequence.
pub fn forward_kinematics(
    skeleton: &Skeleton,
    channels: &Channels,
) -> Result<PositionSequence, KinematicsError> {
    // every row has the same width, so one check covers the whole sequence
    if !channels.is_empty() {
        check_width(skeleton, channels.width(), 0)?;
    }

    let mut sequence = PositionSequence::with_capacity(skeleton.num_joints(), channels.num_frames());
    for frame in channels.frames() {
        let pose = Pose::compute_unchecked(skeleton, frame);
        sequence.push_frame(&pose.positions);
    }
    log::debug!(
        "forward kinematics: {} frames x {} joints",
        sequence.num_frames(),
        skeleton.num_joints()
    );
    Ok(sequence)
}
