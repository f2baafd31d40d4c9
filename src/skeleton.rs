//! Static skeleton definition: parent table, rest offsets and the mapping from
//! the flat per-frame parameter vector to each joint's rotation.

use serde::{Deserialize, Serialize};

use crate::error::SkeletonError;
use crate::types::{Bone, Index, ParentIndex, Position};

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Serialized form of a single joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent joint index, `-1` for the root.
    pub parent: ParentIndex,
    /// Rest offset from the parent joint.
    pub offset: [f64; 3],
    /// Indices of the exponential-map triple in the frame vector. `None` means no rotation.
    #[serde(default)]
    pub rotation: Option<[usize; 3]>,
}

/// Serialized skeleton, the shape of a skeleton JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDefinition {
    pub joints: Vec<JointDefinition>,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A validated kinematic tree. Joint 0 is the root and every other joint's
/// parent has a smaller index, so index order is a topological order.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    names: Vec<String>,
    parents: Vec<Option<Index>>,
    offsets: Vec<Position>,
    rotations: Vec<Option<[usize; 3]>>,
}

impl Skeleton {
    /// Build from the three parallel tables, checking the tree invariants.
    pub fn new(
        parents: &[ParentIndex],
        offsets: Vec<Position>,
        rotations: Vec<Option<[usize; 3]>>,
    ) -> Result<Self, SkeletonError> {
        if parents.is_empty() {
            return Err(SkeletonError::Empty);
        }
        if offsets.len() != parents.len() {
            return Err(SkeletonError::LengthMismatch {
                what: "offset",
                expected: parents.len(),
                found: offsets.len(),
            });
        }
        if rotations.len() != parents.len() {
            return Err(SkeletonError::LengthMismatch {
                what: "rotation index",
                expected: parents.len(),
                found: rotations.len(),
            });
        }

        let mut checked = Vec::with_capacity(parents.len());
        for (joint, &parent) in parents.iter().enumerate() {
            checked.push(check_parent(joint, parent)?);
        }
        for (joint, indices) in rotations.iter().enumerate() {
            // a frame holding index i has at least i + 1 entries
            if let Some(&index) = indices.iter().flatten().find(|&&i| i.checked_add(1).is_none()) {
                return Err(SkeletonError::RotationIndexOverflow { joint, index });
            }
        }

        Ok(Skeleton {
            names: (0..parents.len()).map(|j| format!("joint_{j}")).collect(),
            parents: checked,
            offsets,
            rotations,
        })
    }

    /// Replace the default `joint_<i>` names.
    pub fn with_names(mut self, names: Vec<String>) -> Result<Self, SkeletonError> {
        if names.len() != self.parents.len() {
            return Err(SkeletonError::LengthMismatch {
                what: "name",
                expected: self.parents.len(),
                found: names.len(),
            });
        }
        self.names = names;
        Ok(self)
    }

    pub fn from_definition(definition: &SkeletonDefinition) -> Result<Self, SkeletonError> {
        let joints = &definition.joints;
        let parents: Vec<ParentIndex> = joints.iter().map(|j| j.parent).collect();
        let offsets = joints.iter().map(|j| Position::from(j.offset)).collect();
        let rotations = joints.iter().map(|j| j.rotation).collect();
        let skeleton = Skeleton::new(&parents, offsets, rotations)?;
        let names = joints
            .iter()
            .enumerate()
            .map(|(i, j)| j.name.clone().unwrap_or_else(|| format!("joint_{i}")))
            .collect();
        skeleton.with_names(names)
    }

    pub fn to_definition(&self) -> SkeletonDefinition {
        let joints = (0..self.num_joints())
            .map(|j| JointDefinition {
                name: Some(self.names[j].clone()),
                parent: self.parents[j].map_or(-1, |p| p as ParentIndex),
                offset: self.offsets[j].into(),
                rotation: self.rotations[j],
            })
            .collect();
        SkeletonDefinition { joints }
    }

    pub fn num_joints(&self) -> usize {
        self.parents.len()
    }

    pub fn parent(&self, joint: Index) -> Option<Index> {
        self.parents[joint]
    }

    pub fn offset(&self, joint: Index) -> Position {
        self.offsets[joint]
    }

    pub fn rotation_indices(&self, joint: Index) -> Option<[usize; 3]> {
        self.rotations[joint]
    }

    pub fn name(&self, joint: Index) -> &str {
        &self.names[joint]
    }

    pub fn find_joint_by_name(&self, name: &str) -> Option<Index> {
        self.names.iter().position(|n| n == name)
    }

    pub fn children(&self, joint: Index) -> Vec<Index> {
        (joint + 1..self.num_joints())
            .filter(|&c| self.parents[c] == Some(joint))
            .collect()
    }

    /// Number of edges between `joint` and the root.
    pub fn depth(&self, joint: Index) -> usize {
        let mut depth = 0;
        let mut current = joint;
        while let Some(parent) = self.parents[current] {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Child-to-parent pairs for every non-root joint, in joint order.
    pub fn bones(&self) -> Vec<Bone> {
        self.parents
            .iter()
            .enumerate()
            .filter_map(|(child, parent)| parent.map(|parent| Bone { child, parent }))
            .collect()
    }

    /// Minimum frame width the rotation index map can be evaluated against.
    pub fn required_width(&self) -> usize {
        self.rotations
            .iter()
            .flatten()
            .flat_map(|indices| indices.iter())
            .map(|&i| i + 1)
            .max()
            .unwrap_or(0)
    }
}

fn check_parent(joint: Index, parent: ParentIndex) -> Result<Option<Index>, SkeletonError> {
    match (joint, parent) {
        (0, p) if p < 0 => Ok(None),
        (0, p) => Err(SkeletonError::RootHasParent(p)),
        (j, p) if p < 0 => Err(SkeletonError::ExtraRoot(j)),
        (j, p) if p as usize >= j => Err(SkeletonError::ParentOrder { joint: j, parent: p }),
        (_, p) => Ok(Some(p as Index)),
    }
}

/// Rotation slices for `num_joints` joints laid out back to back from `first`,
/// i.e. joint `j` reads `first + 3j .. first + 3j + 3`.
pub fn contiguous_rotations(num_joints: usize, first: usize) -> Vec<Option<[usize; 3]>> {
    (0..num_joints)
        .map(|j| {
            let base = first + 3 * j;
            Some([base, base + 1, base + 2])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(parents: &[ParentIndex]) -> Result<Skeleton, SkeletonError> {
        let n = parents.len();
        Skeleton::new(parents, vec![Position::new(0.0, 1.0, 0.0); n], contiguous_rotations(n, 0))
    }

    #[test]
    fn test_valid_tree() {
        let skeleton = chain(&[-1, 0, 1, 0, 3]).unwrap();
        assert_eq!(skeleton.num_joints(), 5);
        assert_eq!(skeleton.parent(0), None);
        assert_eq!(skeleton.parent(4), Some(3));
        assert_eq!(skeleton.children(0), vec![1, 3]);
        assert_eq!(skeleton.depth(2), 2);
        assert_eq!(skeleton.required_width(), 15);
    }

    #[test]
    fn test_bones_exclude_root() {
        let skeleton = chain(&[-1, 0, 1, 0]).unwrap();
        let bones = skeleton.bones();
        assert_eq!(
            bones,
            vec![
                Bone { child: 1, parent: 0 },
                Bone { child: 2, parent: 1 },
                Bone { child: 3, parent: 0 },
            ]
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(chain(&[]), Err(SkeletonError::Empty));
    }

    #[test]
    fn test_root_with_parent_rejected() {
        assert_eq!(chain(&[0, 0]), Err(SkeletonError::RootHasParent(0)));
    }

    #[test]
    fn test_second_root_rejected() {
        assert_eq!(chain(&[-1, 0, -1]), Err(SkeletonError::ExtraRoot(2)));
    }

    #[test]
    fn test_cycle_rejected() {
        // 1 -> 2 -> 1 cannot satisfy parent < child
        assert_eq!(
            chain(&[-1, 2, 1]),
            Err(SkeletonError::ParentOrder { joint: 1, parent: 2 })
        );
        assert_eq!(
            chain(&[-1, 1]),
            Err(SkeletonError::ParentOrder { joint: 1, parent: 1 })
        );
    }

    #[test]
    fn test_index_map_length_mismatch() {
        let err = Skeleton::new(
            &[-1, 0, 1],
            vec![Position::new(0.0, 0.0, 0.0); 3],
            contiguous_rotations(2, 0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SkeletonError::LengthMismatch {
                what: "rotation index",
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_offset_length_mismatch() {
        let err = Skeleton::new(&[-1, 0], vec![], contiguous_rotations(2, 0)).unwrap_err();
        assert!(matches!(err, SkeletonError::LengthMismatch { what: "offset", .. }));
    }

    #[test]
    fn test_unrepresentable_rotation_index_rejected() {
        let json = r#"{"joints": [
            {"parent": -1, "offset": [0, 0, 0], "rotation": [18446744073709551615, 0, 0]}
        ]}"#;
        let definition: SkeletonDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(
            Skeleton::from_definition(&definition),
            Err(SkeletonError::RotationIndexOverflow {
                joint: 0,
                index: usize::MAX
            })
        );
    }

    #[test]
    fn test_huge_rotation_index_reports_required_width() {
        let index = usize::MAX - 1;
        let skeleton = Skeleton::new(&[-1], vec![Position::new(0.0, 0.0, 0.0)], vec![Some([index, 0, 1])]).unwrap();
        assert_eq!(skeleton.required_width(), usize::MAX);
    }

    #[test]
    fn test_definition_round_trip() {
        let json = r#"{
            "joints": [
                { "name": "hips", "parent": -1, "offset": [0, 0, 0], "rotation": [3, 4, 5] },
                { "name": "spine", "parent": 0, "offset": [0, 1, 0], "rotation": null },
                { "parent": 1, "offset": [0, 0.5, 0] }
            ]
        }"#;
        let definition: SkeletonDefinition = serde_json::from_str(json).unwrap();
        let skeleton = Skeleton::from_definition(&definition).unwrap();
        assert_eq!(skeleton.name(2), "joint_2");
        assert_eq!(skeleton.find_joint_by_name("spine"), Some(1));
        assert_eq!(skeleton.rotation_indices(1), None);
        assert_eq!(skeleton.required_width(), 6);

        let again = Skeleton::from_definition(&skeleton.to_definition()).unwrap();
        assert_eq!(again, skeleton);
    }
}
