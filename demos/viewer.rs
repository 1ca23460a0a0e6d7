use bevy::{prelude::*, window::PrimaryWindow};
use bevy_infinite_grid::{InfiniteGridBundle, InfiniteGridPlugin, InfiniteGridSettings};
use bevy_panorbit_camera::{PanOrbitCamera, PanOrbitCameraPlugin};
use marching_surface::{
    GenerationMode, GeneratorSettings, MarchingCubesPlugin, Point, SurfaceGenerator, Value,
};

/// The surface being extracted.
fn surface(p: Point) -> Value {
    p.y - p.x.sin() * p.z.cos()
}

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            MarchingCubesPlugin::default(),
            PanOrbitCameraPlugin,
            InfiniteGridPlugin,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, (draw_domain, show_progress))
        .run();
}

fn setup(
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
) -> Result {
    let settings = GeneratorSettings::default().with_mode(GenerationMode::IncrementalZ);
    let generator = SurfaceGenerator::new(surface, settings)?;

    commands.spawn(InfiniteGridBundle {
        settings: InfiniteGridSettings {
            fadeout_distance: 100.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands.spawn((
        Camera3d::default(),
        PanOrbitCamera {
            button_orbit: MouseButton::Left,
            button_pan: MouseButton::Middle,
            ..default()
        },
        Transform::from_xyz(5., 5., 5.).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::OVERCAST_DAY,
            ..Default::default()
        },
        Transform::default().with_rotation(Quat::from_rotation_x(-45.0_f32.to_radians())),
    ));

    // The surface is open, so both sides must be lit and drawn
    commands.spawn((
        generator,
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.2, 0.6, 1.0),
            double_sided: true,
            cull_mode: None,
            ..Default::default()
        })),
    ));

    Ok(())
}

/// Draws the sampled domain and the coordinate axes from its minimum corner.
fn draw_domain(mut gizmos: Gizmos, query: Query<&SurfaceGenerator>) {
    for generator in query.iter() {
        let domain = generator.0.domain();
        let (min, max) = (domain.min(), domain.max());
        let extent = max - min;
        let origin = Vec3::splat(min);

        gizmos.cube(
            Transform::from_translation(Vec3::splat((min + max) / 2.)).with_scale(Vec3::splat(extent)),
            Color::WHITE,
        );
        gizmos.arrow(origin, origin + Vec3::X * extent, Color::srgb(1., 0., 0.));
        gizmos.arrow(origin, origin + Vec3::Y * extent, Color::srgb(0., 1., 0.));
        gizmos.arrow(origin, origin + Vec3::Z * extent, Color::srgb(0., 0., 1.));
    }
}

fn show_progress(
    query: Query<&SurfaceGenerator>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    let (Ok(generator), Ok(mut window)) = (query.single(), windows.single_mut()) else {
        return;
    };
    let cubes = &generator.0;
    window.title = format!(
        "marching cubes: {:.0}% ({} triangles)",
        cubes.progress() * 100.,
        cubes.triangle_count()
    );
}
