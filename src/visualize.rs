use bevy::prelude::*;
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};

use crate::config::ViewConfig;
use crate::scene::MotionScene;
use crate::types::Position;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Resource)]
pub struct ViewerState {
    pub scene: MotionScene,
    pub playing: bool,
    pub frame: usize,
    pub real_frame: f64,
    /// Frames advanced per second of wall time.
    pub fps: f64,
    /// World units per data unit, so the figure is a few units tall whatever the data scale.
    pub scale: f32,
    /// Distance between panel centers, in world units.
    pub spacing: f32,
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Open a window playing `scene`, ground truth on the left and prediction on the right.
pub fn visualize_scene(scene: MotionScene, config: &ViewConfig) {
    let scale = 3.0 / scene.bounds().extent() as f32;
    App::new()
        .insert_resource(ClearColor(Color::WHITE))
        .insert_resource(ViewerState {
            scene,
            playing: true,
            frame: 0,
            real_frame: 0.0,
            fps: 1000.0 / config.interval_ms.max(1) as f64,
            scale,
            spacing: 3.6,
        })
        .add_plugins(DefaultPlugins)
        .add_plugins(PanOrbitCameraPlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, (draw_figures, update_main, update_time_text))
        .run();
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

// Marks the text showing the elapsed motion time
#[derive(Component)]
struct TimeText;

fn setup(mut commands: Commands, state: Res<ViewerState>) {
    //// Orbit camera
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_xyz(0., 0.5, 7.).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        PanOrbitCamera::default(),
    ));

    // panel titles
    let titles: Vec<&str> = state.scene.panels().iter().map(|p| p.title).collect();
    commands.spawn(
        TextBundle::from_section(
            titles.join("    |    "),
            TextStyle {
                font_size: 18.,
                color: Color::BLACK,
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        }),
    );

    // instructions
    commands.spawn(
        TextBundle::from_section(
            "Press 'Space' to toggle playback\n\
            Press 'Left' or 'Right' to step frames\n",
            TextStyle {
                font_size: 15.,
                color: Color::rgba(0.0, 0.0, 0.0, 0.6),
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        }),
    );

    commands.spawn((
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 15.,
                color: Color::BLUE,
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        }),
        TimeText,
    ));
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn to_world(position: Position, scale: f32, shift: f32) -> Vec3 {
    Vec3::new(position.x as f32, position.y as f32, position.z as f32) * scale + Vec3::X * shift
}

fn draw_figures(mut gizmos: Gizmos, state: Res<ViewerState>) {
    let frame = state.frame;
    let panels = state.scene.panels();
    let first_shift = -(panels.len() as f32 - 1.0) * state.spacing / 2.0;

    for (i, panel) in panels.iter().enumerate() {
        let shift = first_shift + i as f32 * state.spacing;
        let positions = panel.positions.frame(frame);

        //// Bones
        for bone in state.scene.bones() {
            gizmos.line(
                to_world(positions[bone.parent], state.scale, shift),
                to_world(positions[bone.child], state.scale, shift),
                Color::BLACK,
            );
        }

        //// Head marker
        let head = to_world(positions[state.scene.head()], state.scale, shift);
        gizmos.sphere(head, Quat::IDENTITY, 0.08, Color::BLACK);
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn update_main(keyboard: Res<ButtonInput<KeyCode>>, time: Res<Time>, mut state: ResMut<ViewerState>) {
    if keyboard.just_released(KeyCode::Space) {
        state.playing = !state.playing;
    }

    if state.playing {
        state.real_frame += time.delta_seconds_f64() * state.fps;
    }

    if keyboard.just_released(KeyCode::ArrowRight) {
        state.playing = false;
        state.real_frame += 1.0;
    }

    if keyboard.just_released(KeyCode::ArrowLeft) {
        state.playing = false;
        state.real_frame -= 1.0;
    }

    let num_frames = state.scene.num_frames() as f64;
    state.real_frame = state.real_frame.rem_euclid(num_frames);
    state.frame = state.real_frame.floor() as usize;
}

fn update_time_text(mut query: Query<&mut Text, With<TimeText>>, state: Res<ViewerState>) {
    let label = state.scene.time_label(state.frame);
    for mut text in &mut query {
        text.sections[0].value = label.clone();
    }
}
