use bevy::{asset::RenderAssetUsages, mesh::PrimitiveTopology, prelude::*};
use tracing::error;

use crate::{
    error::{MarchingCubesError, Result},
    generator::{GeneratorSettings, MarchingCubes},
    mesh::GeneratedMesh,
    types::ScalarField,
};

/// System sets for the marching cubes pipeline.
///
/// Use these to order your own systems relative to mesh generation:
///
/// ```rust,ignore
/// // Run after the snapshot is taken but before it's uploaded:
/// app.add_systems(Update, inspect_snapshot.after(MarchingCubesSet::Generate)
///                                         .before(MarchingCubesSet::Upload));
/// ```
///
/// ```text
/// MarchingCubesSet::Generate  →  [your systems]  →  MarchingCubesSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarchingCubesSet {
    /// Steps every unfinished [`SurfaceGenerator`] and inserts a [`MeshSnapshot`].
    Generate,
    /// Uploads [`MeshSnapshot`] data into a Bevy [`Mesh3d`] and removes the snapshot.
    Upload,
}

/// A marching cubes engine attached to an entity.
///
/// Spawn it like any component; with the `auto_generate` feature the plugin steps it
/// every frame and keeps the entity's [`Mesh3d`] in sync with the vertices generated so
/// far:
///
/// ```rust,ignore
/// commands.spawn((
///     SurfaceGenerator::new(|p: Point| p.y - p.x.sin() * p.z.cos(), settings)?,
///     MeshMaterial3d(material),
/// ));
/// ```
#[derive(Component)]
#[require(Transform)]
pub struct SurfaceGenerator(pub MarchingCubes);

impl SurfaceGenerator {
    pub fn new(field: impl ScalarField + 'static, settings: GeneratorSettings) -> Result<Self> {
        MarchingCubes::new(field, settings).map(Self)
    }
}

/// Marker inserted once a [`SurfaceGenerator`] has generated its whole domain.
#[derive(Component)]
pub struct GenerationFinished;

/// Inserted when a [`SurfaceGenerator`]'s field fails. The generator is not stepped again.
#[derive(Component, Debug)]
pub struct GenerationFailed(pub MarchingCubesError);

/// Positions and normals captured after the generator's last step, awaiting upload.
#[derive(Component)]
pub struct MeshSnapshot(pub GeneratedMesh);

/// Runtime configuration for the marching cubes pipeline.
///
/// Inserted as a resource by [`MarchingCubesPlugin`]. Modify it at any time to change behaviour:
///
/// ```rust,ignore
/// app.add_plugins(MarchingCubesPlugin { steps_per_frame: 4 });
///
/// // Or change it at runtime:
/// fn my_system(mut config: ResMut<MarchingCubesConfig>) {
///     config.steps_per_frame = 1; // back to one slice per frame
/// }
/// ```
#[derive(Resource)]
pub struct MarchingCubesConfig {
    /// Calls to [`MarchingCubes::generate`] per generator per frame.
    ///
    /// In the incremental modes each call produces one slice; in full mode the first call
    /// already does all the work. Default: `1`.
    pub steps_per_frame: usize,
}

impl Default for MarchingCubesConfig {
    fn default() -> Self {
        Self { steps_per_frame: 1 }
    }
}

/// Bevy plugin that drives marching cubes mesh generation.
///
/// When the `auto_generate` feature is enabled, every [`SurfaceGenerator`] in the world is
/// stepped on the main thread each frame and its mesh refreshed:
///
/// ```text
/// SurfaceGenerator spawned
///   → generate() × steps_per_frame     (MarchingCubesSet::Generate)
///   → MeshSnapshot inserted
///   → [your systems here]
///   → Mesh3d replaced                  (MarchingCubesSet::Upload)
///   → MeshSnapshot removed
///   ... repeated every frame until GenerationFinished is inserted
/// ```
pub struct MarchingCubesPlugin {
    /// Initial value for [`MarchingCubesConfig::steps_per_frame`].
    pub steps_per_frame: usize,
}

impl Default for MarchingCubesPlugin {
    fn default() -> Self {
        Self {
            steps_per_frame: MarchingCubesConfig::default().steps_per_frame,
        }
    }
}

impl Plugin for MarchingCubesPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(MarchingCubesConfig {
            steps_per_frame: self.steps_per_frame,
        });

        #[cfg(feature = "auto_generate")]
        app.configure_sets(
            Update,
            (MarchingCubesSet::Generate, MarchingCubesSet::Upload).chain(),
        )
        .add_systems(
            Update,
            (
                step_generators.in_set(MarchingCubesSet::Generate),
                upload_mesh.in_set(MarchingCubesSet::Upload),
            ),
        );
    }
}

/// Steps each unfinished [`SurfaceGenerator`] and snapshots its vertex buffer.
///
/// The snapshot is taken even when a step fails, since a failed step leaves the buffer as
/// it was before the call.
pub fn step_generators(
    mut commands: Commands,
    config: Res<MarchingCubesConfig>,
    mut query: Query<
        (Entity, &mut SurfaceGenerator),
        (Without<GenerationFinished>, Without<GenerationFailed>),
    >,
) {
    for (entity, mut generator) in query.iter_mut() {
        let cubes = &mut generator.0;
        let mut entity_commands = commands.entity(entity);

        for _ in 0..config.steps_per_frame.max(1) {
            if let Err(err) = cubes.generate() {
                error!(?entity, %err, "surface generation failed");
                entity_commands.insert(GenerationFailed(err));
                break;
            }
            if cubes.is_finished() {
                entity_commands.insert(GenerationFinished);
                break;
            }
        }

        entity_commands.insert(MeshSnapshot(GeneratedMesh::from_vertices(cubes.vertices())));
    }
}

/// Uploads a [`MeshSnapshot`] into a Bevy [`Mesh3d`], then removes the snapshot.
///
/// The vertex data Vecs are moved into the Bevy mesh with no copies. The mesh is an
/// unindexed triangle list.
pub fn upload_mesh(
    mut commands: Commands,
    mut query: Query<(Entity, &mut MeshSnapshot)>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, mut snapshot) in query.iter_mut() {
        let generated = std::mem::take(&mut snapshot.0);

        let mut bevy_mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        );
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, generated.vertices);
        bevy_mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, generated.normals);

        commands
            .entity(entity)
            .insert(Mesh3d(meshes.add(bevy_mesh)))
            .remove::<MeshSnapshot>();
    }
}

#[cfg(all(test, feature = "auto_generate"))]
mod tests {
    use super::*;
    use core::result::Result;
    use crate::{
        error::FieldError,
        types::{Comparator, Fallible, GenerationMode, Point, Value},
    };

    fn settings(mode: GenerationMode) -> GeneratorSettings {
        GeneratorSettings::default()
            .with_iso_value(0.)
            .with_bounds(-1., 1.)
            .with_step(0.5)
            .with_mode(mode)
            .with_comparator(Comparator::GreaterEqual)
    }

    fn app(steps_per_frame: usize) -> App {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            AssetPlugin::default(),
            MarchingCubesPlugin { steps_per_frame },
        ))
        .init_asset::<Mesh>();
        app
    }

    fn uploaded_vertex_count(app: &App, entity: Entity) -> usize {
        let handle = &app.world().get::<Mesh3d>(entity).unwrap().0;
        let meshes = app.world().resource::<Assets<Mesh>>();
        meshes.get(handle).unwrap().count_vertices()
    }

    #[test]
    fn one_slice_is_uploaded_per_frame() {
        let mut app = app(1);
        let entity = app
            .world_mut()
            .spawn(
                SurfaceGenerator::new(|p: Point| p.y, settings(GenerationMode::IncrementalX))
                    .unwrap(),
            )
            .id();

        // Each X slice crosses the plane in 4 cubes, 2 triangles each
        for frame in 1..=4 {
            app.update();
            assert_eq!(uploaded_vertex_count(&app, entity), frame * 4 * 2 * 3);
        }
        assert!(app.world().get::<GenerationFinished>(entity).is_some());
        assert!(app.world().get::<MeshSnapshot>(entity).is_none());
    }

    #[test]
    fn steps_per_frame_batches_slices() {
        let mut app = app(4);
        let entity = app
            .world_mut()
            .spawn(
                SurfaceGenerator::new(|p: Point| p.y, settings(GenerationMode::IncrementalZ))
                    .unwrap(),
            )
            .id();

        app.update();
        assert!(app.world().get::<GenerationFinished>(entity).is_some());
        assert_eq!(uploaded_vertex_count(&app, entity), 32 * 3);
    }

    #[test]
    fn failing_field_marks_the_entity() {
        let mut app = app(1);
        let field = Fallible(|_: Point| -> Result<Value, FieldError> {
            Err(FieldError::new("no data"))
        });
        let entity = app
            .world_mut()
            .spawn(SurfaceGenerator::new(field, settings(GenerationMode::Full)).unwrap())
            .id();

        app.update();
        let failed = app.world().get::<GenerationFailed>(entity).unwrap();
        assert!(matches!(failed.0, MarchingCubesError::Evaluation { .. }));
        assert!(app.world().get::<GenerationFinished>(entity).is_none());
        assert_eq!(uploaded_vertex_count(&app, entity), 0);
    }
}
