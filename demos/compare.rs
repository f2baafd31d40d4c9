use expmap_skeleton::export::export;
use expmap_skeleton::parse::{load_channels_from_file, load_skeleton_from_file};
use expmap_skeleton::types::Bone;
use expmap_skeleton::{forward_kinematics, MotionScene, Pose, Skeleton, ViewConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    ////////////////////////////// loading a skeleton ///////////////////////////////////////////
    // from a JSON definition, or from the HIERARCHY section of a .bvh file
    let skeleton: Skeleton = load_skeleton_from_file("./assets/skeleton.json")?;
    let from_bvh: Skeleton = load_skeleton_from_file("./assets/skeleton.bvh")?;
    assert_eq!(skeleton.required_width(), from_bvh.required_width());

    {
        // joint 0 is the root, every other parent comes first
        assert_eq!(skeleton.parent(0), None);
        let knee = skeleton.find_joint_by_name("left_knee").unwrap();
        let hip = skeleton.parent(knee).unwrap();
        assert_eq!(skeleton.name(hip), "left_hip");
        assert!(hip < knee);

        // leaves carry no rotation slice
        let head = skeleton.find_joint_by_name("head").unwrap();
        assert_eq!(skeleton.rotation_indices(head), None);

        // one bone per non-root joint
        let bones: Vec<Bone> = skeleton.bones();
        assert_eq!(bones.len(), skeleton.num_joints() - 1);
    }

    ////////////////////////////// forward kinematics ////////////////
    let prediction = load_channels_from_file("./assets/prediction.txt")?;
    let ground_truth = load_channels_from_file("./assets/ground_truth.txt")?;

    {
        // a single frame, with cumulative rotations
        let pose = Pose::compute(&skeleton, prediction.frame(0))?;
        let head = skeleton.find_joint_by_name("head").unwrap();
        let cgmath::Vector3 { x, y, z } = pose.positions[head];
        println!("head at frame 0: ({x:.3}, {y:.3}, {z:.3})");

        // the whole sequence, [T, J, 3]
        let positions = forward_kinematics(&skeleton, &prediction)?;
        println!(
            "prediction: {} frames x {} joints",
            positions.num_frames(),
            positions.num_joints()
        );
    }

    ////////////////////////////// side-by-side animation ////////////////
    // the scene truncates both sequences to the shorter one and centers them on the root
    let config = ViewConfig::default();
    let scene = MotionScene::new(&skeleton, &prediction, Some(&ground_truth), &config)?;
    println!(
        "scene: {} frames, head joint {}, last frame {}",
        scene.num_frames(),
        skeleton.name(scene.head()),
        scene.time_label(scene.num_frames() - 1)
    );

    let out = std::env::temp_dir().join("expmap_skeleton_compare.gif");
    export(&scene, &config, &out)?;
    println!("wrote {}", out.display());
    Ok(())
}
