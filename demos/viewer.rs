use expmap_skeleton::parse::{load_channels_from_file, load_skeleton_from_file};
use expmap_skeleton::visualize::visualize_scene;
use expmap_skeleton::{MotionScene, ViewConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let skeleton = load_skeleton_from_file("./assets/skeleton.json")?;
    let prediction = load_channels_from_file("./assets/prediction.txt")?;
    let ground_truth = load_channels_from_file("./assets/ground_truth.txt")?;

    // with the "visualize" feature enabled the scene plays in a bevy window
    let config = ViewConfig {
        interval_ms: 40,
        ..ViewConfig::default()
    };
    let scene = MotionScene::new(&skeleton, &prediction, Some(&ground_truth), &config)?;
    visualize_scene(scene, &config);
    Ok(())
}
