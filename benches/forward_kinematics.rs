use criterion::{black_box, criterion_group, criterion_main, Criterion};
use expmap_skeleton::parse::{load_channels_from_file, load_skeleton_from_file};
use expmap_skeleton::{forward_kinematics, Channels, MotionScene, ViewConfig};

pub fn criterion_benchmark(c: &mut Criterion) {
    let skeleton = load_skeleton_from_file("./assets/skeleton.json").unwrap();
    let walk = load_channels_from_file("./assets/ground_truth.txt").unwrap();

    // repeat the walk cycle to get a longer sequence
    let long: Vec<Vec<f64>> = (0..40)
        .flat_map(|_| walk.frames().map(|f| f.to_vec()).collect::<Vec<_>>())
        .collect();
    let long = Channels::from_rows(long).unwrap();

    let mut group = c.benchmark_group("forward-kinematics");
    group.bench_function("walk 25 frames", |b| {
        b.iter(|| forward_kinematics(black_box(&skeleton), black_box(&walk)).unwrap())
    });
    group.bench_function("walk 1000 frames", |b| {
        b.iter(|| forward_kinematics(black_box(&skeleton), black_box(&long)).unwrap())
    });
    group.sample_size(20);
    group.bench_function("scene with ground truth", |b| {
        let config = ViewConfig::default();
        b.iter(|| MotionScene::new(&skeleton, black_box(&long), Some(&walk), &config).unwrap())
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
