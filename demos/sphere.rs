use bevy::{
    pbr::wireframe::{Wireframe, WireframeConfig},
    prelude::*,
};
use marching_surface::{
    Comparator, GenerationMode, GeneratorSettings, MarchingCubesPlugin, Point, SurfaceGenerator,
};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            bevy::pbr::wireframe::WireframePlugin::default(),
            MarchingCubesPlugin::default(),
        ))
        .insert_resource(WireframeConfig {
            global: true,
            ..Default::default()
        })
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut commands: Commands) -> Result {
    const RADIUS: f32 = 4.;

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(RADIUS * 1.5, RADIUS * 1.2, RADIUS * 1.5).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let function = |p: Point| p.coords.norm() - RADIUS;

    // Full mode: the first frame stalls until the whole sphere is built
    let settings = GeneratorSettings::default()
        .with_iso_value(0.)
        .with_bounds(-RADIUS - 1., RADIUS + 1.)
        .with_step(0.25)
        .with_mode(GenerationMode::Full)
        .with_comparator(Comparator::LessEqual);

    commands.spawn((SurfaceGenerator::new(function, settings)?, Wireframe));

    Ok(())
}
