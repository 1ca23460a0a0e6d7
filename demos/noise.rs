use bevy::prelude::*;
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use marching_surface::{
    Comparator, GenerationMode, GeneratorSettings, MarchingCubesPlugin, Point, SurfaceGenerator,
    Value,
};
use noiz::prelude::*;

type TerrainNoise = Noise<
    LayeredNoise<
        Normed<f32>,
        Persistence,
        Octave<MixCellGradients<OrthoGrid, Smoothstep, QuickGradients>>,
    >,
>;

const HALF_EXTENT: f32 = 32.;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            // Two slices per frame
            MarchingCubesPlugin { steps_per_frame: 2 },
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, debug)
        .run();
}

fn setup(
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
) -> Result {
    commands.spawn(InfiniteGridBundle {
        settings: InfiniteGridSettings {
            fadeout_distance: 1000.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Right,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(50., 60., 50.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    let mut noise = TerrainNoise::default();
    noise.set_frequency(0.06);

    // Ground that rises and falls with the noise, overhangs included
    let terrain = move |p: Point| -> Value {
        let density: f32 = noise.sample_for(Vec3::new(p.x, p.y, p.z));
        p.y / HALF_EXTENT - density
    };

    let settings = GeneratorSettings::default()
        .with_iso_value(0.)
        .with_bounds(-HALF_EXTENT, HALF_EXTENT)
        .with_step(1.)
        .with_mode(GenerationMode::IncrementalY)
        .with_comparator(Comparator::Less);

    commands.spawn((
        SurfaceGenerator::new(terrain, settings)?,
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(1., 0., 0.),
            double_sided: true,
            cull_mode: None,
            ..Default::default()
        })),
    ));

    Ok(())
}

/// Outlines the slice the generator will produce next.
fn debug(mut gizmos: Gizmos, query: Query<&SurfaceGenerator>) {
    for generator in query.iter() {
        let Some(y) = generator.0.cursor() else {
            continue;
        };
        let step = generator.0.domain().step();
        let size = 2. * HALF_EXTENT;
        gizmos.cube(
            Transform::from_translation(Vec3::new(0., y + step / 2., 0.))
                .with_scale(Vec3::new(size, step, size)),
            Color::WHITE,
        );
    }
}
