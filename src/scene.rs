//! Everything a renderer needs to animate a prediction next to its ground truth:
//! position sequences of equal length, bones, head joint, equal-aspect bounds
//! and per-frame time labels.
//!
//! Data is y-up. Plot space swaps the last two axes so that plot `Z` is the
//! vertical: `(X, Y, Z) = (x, z, y)`.

use crate::config::ViewConfig;
use crate::error::SceneError;
use crate::kinematics::forward_kinematics;
use crate::skeleton::Skeleton;
use crate::types::{Bone, Channels, Index, Position, PositionSequence};

/// Map a data-space position to plot space.
pub fn to_plot(p: Position) -> [f64; 3] {
    [p.x, p.z, p.y]
}

/// An axis-aligned cube in plot space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl PlotBounds {
    /// A cube around `points` with equal extent on all three axes.
    ///
    /// The cube is centered on each axis' midpoint, with half-extent
    /// `max_range * (0.5 + margin)`. When every point coincides the range is taken as 1.
    pub fn equal_aspect(points: impl IntoIterator<Item = [f64; 3]>, margin: f64) -> Self {
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for point in points {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(point[axis]);
                hi[axis] = hi[axis].max(point[axis]);
            }
        }
        if lo[0] > hi[0] {
            // no points
            lo = [0.0; 3];
            hi = [0.0; 3];
        }

        let mut max_range = (0..3).map(|a| hi[a] - lo[a]).fold(0.0, f64::max);
        if max_range == 0.0 {
            max_range = 1.0;
        }
        let half = max_range * (0.5 + margin);

        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for axis in 0..3 {
            let mid = 0.5 * (hi[axis] + lo[axis]);
            min[axis] = mid - half;
            max[axis] = mid + half;
        }
        PlotBounds { min, max }
    }

    pub fn center(&self) -> [f64; 3] {
        [0, 1, 2].map(|a| 0.5 * (self.min[a] + self.max[a]))
    }

    /// Edge length of the cube.
    pub fn extent(&self) -> f64 {
        self.max[0] - self.min[0]
    }
}

/// One animated figure with its caption.
#[derive(Debug, Clone, Copy)]
pub struct Panel<'a> {
    pub title: &'static str,
    pub positions: &'a PositionSequence,
}

/// A prediction and optional ground truth, ready to be drawn frame by frame.
#[derive(Debug, Clone)]
pub struct MotionScene {
    prediction: PositionSequence,
    ground_truth: Option<PositionSequence>,
    bones: Vec<Bone>,
    head: Index,
    bounds: PlotBounds,
    frame_time_ms: u32,
}

impl MotionScene {
    pub fn new(
        skeleton: &Skeleton,
        prediction: &Channels,
        ground_truth: Option<&Channels>,
        config: &ViewConfig,
    ) -> Result<Self, SceneError> {
        let prediction = forward_kinematics(skeleton, prediction)?;
        let ground_truth = ground_truth
            .map(|gt| forward_kinematics(skeleton, gt))
            .transpose()?;
        Self::from_positions(skeleton, prediction, ground_truth, config)
    }

    /// Build from sequences already run through forward kinematics.
    pub fn from_positions(
        skeleton: &Skeleton,
        mut prediction: PositionSequence,
        mut ground_truth: Option<PositionSequence>,
        config: &ViewConfig,
    ) -> Result<Self, SceneError> {
        if prediction.num_frames() == 0 {
            return Err(SceneError::EmptySequence("prediction"));
        }
        if let Some(gt) = &mut ground_truth {
            if gt.num_frames() == 0 {
                return Err(SceneError::EmptySequence("ground truth"));
            }
            let frames = prediction.num_frames().min(gt.num_frames());
            if frames != prediction.num_frames() || frames != gt.num_frames() {
                log::debug!(
                    "truncating prediction ({}) and ground truth ({}) to {frames} frames",
                    prediction.num_frames(),
                    gt.num_frames()
                );
            }
            prediction.truncate(frames);
            gt.truncate(frames);
        }

        if let Some(joint) = config.center_joint {
            if joint >= skeleton.num_joints() {
                return Err(SceneError::CenterJoint {
                    joint,
                    num_joints: skeleton.num_joints(),
                });
            }
            prediction.center_on(joint);
            if let Some(gt) = &mut ground_truth {
                gt.center_on(joint);
            }
        }

        let reference = ground_truth.as_ref().unwrap_or(&prediction);
        let head = highest_joint(reference.frame(0));

        let all = prediction
            .iter()
            .chain(ground_truth.iter().flat_map(|gt| gt.iter()))
            .map(|&p| to_plot(p));
        let bounds = PlotBounds::equal_aspect(all, config.margin);

        log::debug!(
            "scene: {} frames, head joint {head}, bounds {:?}",
            prediction.num_frames(),
            bounds
        );

        Ok(MotionScene {
            prediction,
            ground_truth,
            bones: skeleton.bones(),
            head,
            bounds,
            frame_time_ms: config.frame_time_ms,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.prediction.num_frames()
    }

    pub fn prediction(&self) -> &PositionSequence {
        &self.prediction
    }

    pub fn ground_truth(&self) -> Option<&PositionSequence> {
        self.ground_truth.as_ref()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Joint marked as the head: highest in the first reference frame.
    pub fn head(&self) -> Index {
        self.head
    }

    pub fn bounds(&self) -> PlotBounds {
        self.bounds
    }

    /// Panels in display order: ground truth first when present.
    pub fn panels(&self) -> Vec<Panel<'_>> {
        let mut panels = Vec::with_capacity(2);
        if let Some(gt) = &self.ground_truth {
            panels.push(Panel {
                title: "Ground Truth",
                positions: gt,
            });
        }
        panels.push(Panel {
            title: "Prediction",
            positions: &self.prediction,
        });
        panels
    }

    pub fn time_ms(&self, frame: usize) -> u64 {
        frame as u64 * self.frame_time_ms as u64
    }

    pub fn time_label(&self, frame: usize) -> String {
        format!("t = {} ms", self.time_ms(frame))
    }
}

/// Index of the joint with the greatest vertical coordinate; ties go to the lowest index.
fn highest_joint(frame: &[Position]) -> Index {
    let mut best = 0;
    for (i, p) in frame.iter().enumerate() {
        if p.y > frame[best].y {
            best = i;
        }
    }
    best
}
