//! Loaders for skeleton definitions (JSON or a BVH `HIERARCHY` section) and
//! channel sequences (numeric text or JSON).

use std::path::Path;
use std::str::Lines;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::skeleton::{Skeleton, SkeletonDefinition};
use crate::types::{Channels, ParentIndex, Position};

/////////////////////////////////////////////////////////////////////////////////////////////////

fn re_joint() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(ROOT|JOINT)\s+(\S+)").expect("static regex"))
}

fn re_offset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^OFFSET\s+(.+)$").expect("static regex"))
}

fn re_channels() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^CHANNELS\s+(\d+)\s*(.*)$").expect("static regex"))
}

fn re_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s,]+").expect("static regex"))
}

fn read(path: &Path) -> Result<String, ParseError> {
    std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/////////////////////////////////////////////////////////////////////////////////////////////////
//////////////////////////////////////////// SKELETON ///////////////////////////////////////////

/// Load a skeleton from a `.bvh` file (hierarchy only) or a JSON definition.
pub fn load_skeleton_from_file(path: impl AsRef<Path>) -> Result<Skeleton, ParseError> {
    let path = path.as_ref();
    let contents = read(path)?;
    let skeleton = if has_extension(path, "bvh") {
        load_skeleton_from_bvh_string(&contents)?
    } else {
        load_skeleton_from_json_string(&contents)?
    };
    log::info!(
        "loaded skeleton from {}: {} joints, frame width >= {}",
        path.display(),
        skeleton.num_joints(),
        skeleton.required_width()
    );
    Ok(skeleton)
}

pub fn load_skeleton_from_json_string(json: &str) -> Result<Skeleton, ParseError> {
    let definition: SkeletonDefinition = serde_json::from_str(json)?;
    Ok(Skeleton::from_definition(&definition)?)
}

/// Build a skeleton from the `HIERARCHY` section of a BVH document.
///
/// Every joint's `Xrotation`/`Yrotation`/`Zrotation` channels become its
/// exponential-map triple (in x, y, z order). Position channels take up indices
/// in the frame vector but are not read. `End Site` blocks become rotation-less
/// leaf joints named after their parent.
pub fn load_skeleton_from_bvh_string(bvh: &str) -> Result<Skeleton, ParseError> {
    parse_hierarchy(bvh.lines())
}

struct PendingJoint {
    name: String,
    parent: ParentIndex,
    depth: usize,
    offset: Option<Position>,
    rotation: [Option<usize>; 3],
    rotation_channels: usize,
}

/// Used during joint creation to find the parent: the closest earlier joint one level up.
fn find_parent_by_depth(depth: usize, joints: &[PendingJoint]) -> ParentIndex {
    if depth == 0 {
        return -1;
    }
    joints
        .iter()
        .rposition(|j| j.depth + 1 == depth)
        .map_or(-1, |i| i as ParentIndex)
}

fn hierarchy_error(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Hierarchy {
        line,
        message: message.into(),
    }
}

fn parse_hierarchy(lines: Lines) -> Result<Skeleton, ParseError> {
    let mut joints: Vec<PendingJoint> = Vec::new();
    let mut depth: usize = 0;
    let mut channel_index: usize = 0;
    // depth of the `End Site` block being parsed, if any
    let mut end_site: Option<usize> = None;

    //// PARSING LINE BY LINE
    for (i, line) in lines.enumerate() {
        let line_no = i + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with("HIERARCHY") {
            continue;
        } else if line.starts_with("MOTION") {
            break;
        } else if let Some(captures) = re_joint().captures(line) {
            if end_site.is_some() {
                return Err(hierarchy_error(line_no, "End Site cannot have child joints"));
            }
            let name = captures[2].to_string();
            let parent = find_parent_by_depth(depth, &joints);
            if depth > 0 && parent < 0 {
                return Err(hierarchy_error(line_no, format!("joint {name} has no enclosing joint")));
            }
            if depth == 0 && !joints.is_empty() {
                return Err(hierarchy_error(line_no, "more than one ROOT"));
            }
            joints.push(PendingJoint {
                name,
                parent,
                depth,
                offset: None,
                rotation: [None; 3],
                rotation_channels: 0,
            });
        } else if line.to_lowercase().starts_with("end") {
            let parent = find_parent_by_depth(depth, &joints);
            if parent < 0 || end_site.is_some() {
                return Err(hierarchy_error(line_no, "End Site outside of a joint"));
            }
            end_site = Some(depth);
            joints.push(PendingJoint {
                name: format!("{}_end", joints[parent as usize].name),
                parent,
                depth,
                offset: None,
                rotation: [None; 3],
                rotation_channels: 0,
            });
        } else if line == "{" {
            depth += 1;
        } else if line == "}" {
            depth = depth
                .checked_sub(1)
                .ok_or_else(|| hierarchy_error(line_no, "unbalanced '}'"))?;
            if end_site == Some(depth) {
                end_site = None;
            }
        } else if let Some(captures) = re_offset().captures(line) {
            let values = parse_numbers(&captures[1], line_no)?;
            let &[x, y, z] = values.as_slice() else {
                return Err(hierarchy_error(line_no, format!("OFFSET needs 3 values, found {}", values.len())));
            };
            let joint = joints
                .last_mut()
                .ok_or_else(|| hierarchy_error(line_no, "OFFSET before any joint"))?;
            joint.offset = Some(Position::new(x, y, z));
        } else if let Some(captures) = re_channels().captures(line) {
            if end_site.is_some() {
                return Err(hierarchy_error(line_no, "End Site cannot have channels"));
            }
            let declared: usize = captures[1]
                .parse()
                .map_err(|_| hierarchy_error(line_no, "invalid channel count"))?;
            let names: Vec<&str> = captures[2].split_whitespace().collect();
            if names.len() != declared {
                return Err(hierarchy_error(
                    line_no,
                    format!("CHANNELS declares {declared} but lists {}", names.len()),
                ));
            }
            let joint = joints
                .last_mut()
                .ok_or_else(|| hierarchy_error(line_no, "CHANNELS before any joint"))?;
            for name in names {
                let axis = match name {
                    "Xrotation" => Some(0),
                    "Yrotation" => Some(1),
                    "Zrotation" => Some(2),
                    "Xposition" | "Yposition" | "Zposition" => None,
                    other => return Err(hierarchy_error(line_no, format!("unknown channel {other}"))),
                };
                if let Some(axis) = axis {
                    joint.rotation[axis] = Some(channel_index);
                    joint.rotation_channels += 1;
                }
                channel_index += 1;
            }
        } else {
            return Err(hierarchy_error(line_no, format!("unexpected line {line:?}")));
        }
    }

    if depth != 0 {
        return Err(hierarchy_error(0, "unterminated block at end of hierarchy"));
    }
    finish_hierarchy(joints)
}

fn finish_hierarchy(joints: Vec<PendingJoint>) -> Result<Skeleton, ParseError> {
    let mut parents = Vec::with_capacity(joints.len());
    let mut offsets = Vec::with_capacity(joints.len());
    let mut rotations = Vec::with_capacity(joints.len());
    let mut names = Vec::with_capacity(joints.len());

    for (index, joint) in joints.into_iter().enumerate() {
        let rotation = match joint.rotation {
            [Some(x), Some(y), Some(z)] if joint.rotation_channels == 3 => Some([x, y, z]),
            [None, None, None] => None,
            _ => {
                return Err(hierarchy_error(
                    0,
                    format!("joint {} needs exactly one X, Y and Z rotation channel", joint.name),
                ))
            }
        };
        let offset = joint
            .offset
            .ok_or_else(|| hierarchy_error(0, format!("joint {} has no OFFSET", joint.name)))?;
        log::trace!("joint {index} {} parent {}", joint.name, joint.parent);
        parents.push(joint.parent);
        offsets.push(offset);
        rotations.push(rotation);
        names.push(joint.name);
    }

    Ok(Skeleton::new(&parents, offsets, rotations)?.with_names(names)?)
}

/////////////////////////////////////////////////////////////////////////////////////////////////
//////////////////////////////////////////// CHANNELS ///////////////////////////////////////////

fn parse_numbers(text: &str, line: usize) -> Result<Vec<f64>, ParseError> {
    re_separator()
        .split(text.trim())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<f64>().map_err(|_| ParseError::Number {
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Load a `[T, D]` channel sequence from `.json` (array of rows) or numeric text.
pub fn load_channels_from_file(path: impl AsRef<Path>) -> Result<Channels, ParseError> {
    let path = path.as_ref();
    let contents = read(path)?;
    let channels = if has_extension(path, "json") {
        load_channels_from_json_string(&contents)?
    } else {
        load_channels_from_string(&contents)?
    };
    log::info!(
        "loaded {} frames x {} channels from {}",
        channels.num_frames(),
        channels.width(),
        path.display()
    );
    Ok(channels)
}

/// One frame per line, values separated by whitespace and/or commas.
/// Blank lines and lines starting with `#` are skipped.
pub fn load_channels_from_string(text: &str) -> Result<Channels, ParseError> {
    let mut width: Option<usize> = None;
    let mut data = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = parse_numbers(line, line_no)?;
        match width {
            None => width = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(ParseError::RaggedRow {
                    line: line_no,
                    expected,
                    found: row.len(),
                })
            }
            Some(_) => {}
        }
        data.extend(row);
    }

    let width = width.unwrap_or(0);
    Channels::from_flat(width, data).ok_or(ParseError::RaggedRow {
        line: 0,
        expected: width,
        found: 0,
    })
}

pub fn load_channels_from_json_string(json: &str) -> Result<Channels, ParseError> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(json)?;
    let expected = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(ParseError::RaggedRow {
            line: i + 1,
            expected,
            found: row.len(),
        });
    }
    Channels::from_rows(rows).ok_or(ParseError::RaggedRow {
        line: 0,
        expected,
        found: 0,
    })
}

/////////////////////////////////////////////////////////////////////////////////////////////////
