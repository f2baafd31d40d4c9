use cgmath::{Matrix3, Vector3};

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type ParentIndex = isize; // -1 marks the root in serialized definitions
pub type Position = Vector3<f64>;
pub type Rotation = Matrix3<f64>;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A bone of the stick figure, drawn from `child` to `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Bone {
    pub child: Index,
    pub parent: Index,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A `[T, D]` sequence of flat per-frame parameter vectors, stored row-major.
///
/// The frame count is kept alongside the data, so `D = 0` still has `T` frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Channels {
    width: usize,
    num_frames: usize,
    data: Vec<f64>,
}

impl Channels {
    /// Build from row-major data. `data.len()` must be a multiple of `width`.
    /// A zero width holds no frames here, use [`Channels::from_rows`] for `[T, 0]`.
    pub fn from_flat(width: usize, data: Vec<f64>) -> Option<Self> {
        if width == 0 {
            return data.is_empty().then_some(Channels {
                width,
                num_frames: 0,
                data,
            });
        }
        if data.len() % width != 0 {
            return None;
        }
        Some(Channels {
            width,
            num_frames: data.len() / width,
            data,
        })
    }

    /// Build from rows; returns `None` when the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        let num_frames = rows.len();
        let data = rows.into_iter().flatten().collect();
        Some(Channels {
            width,
            num_frames,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    pub fn frame(&self, t: usize) -> &[f64] {
        &self.data[t * self.width..(t + 1) * self.width]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.num_frames).map(move |t| self.frame(t))
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Joint positions for a whole motion, shape `[T, J, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSequence {
    num_joints: usize,
    positions: Vec<Position>,
}

impl PositionSequence {
    pub fn new(num_joints: usize) -> Self {
        PositionSequence {
            num_joints,
            positions: Vec::new(),
        }
    }

    pub fn with_capacity(num_joints: usize, num_frames: usize) -> Self {
        PositionSequence {
            num_joints,
            positions: Vec::with_capacity(num_joints * num_frames),
        }
    }

    /// Append one frame. Panics if `frame.len()` differs from the joint count.
    pub fn push_frame(&mut self, frame: &[Position]) {
        assert_eq!(frame.len(), self.num_joints, "frame joint count mismatch");
        self.positions.extend_from_slice(frame);
    }

    pub fn num_frames(&self) -> usize {
        if self.num_joints == 0 {
            0
        } else {
            self.positions.len() / self.num_joints
        }
    }

    pub fn num_joints(&self) -> usize {
        self.num_joints
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn frame(&self, t: usize) -> &[Position] {
        &self.positions[t * self.num_joints..(t + 1) * self.num_joints]
    }

    pub fn joint(&self, t: usize, joint: Index) -> Position {
        self.positions[t * self.num_joints + joint]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[Position]> {
        self.positions.chunks_exact(self.num_joints.max(1))
    }

    /// Every position of every frame, in frame-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    /// Keep only the first `num_frames` frames.
    pub fn truncate(&mut self, num_frames: usize) {
        self.positions.truncate(num_frames * self.num_joints);
    }

    /// Translate every frame so that `joint` sits at the origin.
    pub fn center_on(&mut self, joint: Index) {
        for frame in self.positions.chunks_exact_mut(self.num_joints.max(1)) {
            let anchor = frame[joint];
            for position in frame.iter_mut() {
                *position -= anchor;
            }
        }
    }

    /// Nested `[T][J][3]` arrays, the layout handed to external tools.
    pub fn to_nested(&self) -> Vec<Vec<[f64; 3]>> {
        self.frames()
            .map(|frame| frame.iter().map(|p| [p.x, p.y, p.z]).collect())
            .collect()
    }
}
