use crate::tools::measure::MeasurementLog;
use crate::tools::pointer::PointerSurface;
use crate::tools::tool_manager::{InteractionMode, ToolManager};
use bevy::prelude::*;
use constants::render_settings::{
    DRAW_LINE_WIDTH, MEASURE_COMPLETED_COLOUR, MEASURE_PREVIEW_COLOUR,
    MOUSE_RAYCAST_INTERSECTION_SPHERE_SIZE,
};

#[derive(Component)]
pub struct MeasureVisual;

#[derive(Resource)]
pub struct MeasureVisualAssets {
    point: Handle<Mesh>,
    segment: Handle<Mesh>,
    preview: Handle<StandardMaterial>,
    completed: Handle<StandardMaterial>,
}

pub fn setup_measure_visuals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let glowing = |colour: Srgba| StandardMaterial {
        base_color: colour.into(),
        emissive: LinearRgba::from(colour),
        unlit: true,
        ..default()
    };
    commands.insert_resource(MeasureVisualAssets {
        point: meshes.add(Sphere::new(MOUSE_RAYCAST_INTERSECTION_SPHERE_SIZE)),
        segment: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
        preview: materials.add(glowing(MEASURE_PREVIEW_COLOUR)),
        completed: materials.add(glowing(MEASURE_COMPLETED_COLOUR)),
    });
}

/// Transform stretching a unit cube between two points, or `None` when they coincide.
pub fn segment_transform(start: Vec3, end: Vec3) -> Option<Transform> {
    let dir = end - start;
    let length = dir.length();
    if length <= 0.02 {
        return None;
    }
    Some(
        Transform::from_translation((start + end) * 0.5)
            .with_rotation(Quat::from_rotation_arc(Vec3::X, dir / length))
            .with_scale(Vec3::new(length, DRAW_LINE_WIDTH, DRAW_LINE_WIDTH)),
    )
}

/// Rebuild the measurement visuals: the live segment while measuring and the
/// last completed measurement otherwise.
pub fn update_measure_visuals(
    mut commands: Commands,
    tools: Res<ToolManager>,
    pointer: Res<PointerSurface>,
    measurements: Res<MeasurementLog>,
    assets: Option<Res<MeasureVisualAssets>>,
    existing: Query<Entity, With<MeasureVisual>>,
) {
    let Some(assets) = assets else {
        return;
    };
    if !tools.is_changed() && !pointer.is_changed() && !measurements.is_changed() {
        return;
    }
    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let spawn_point = |commands: &mut Commands, at: Vec3, material: &Handle<StandardMaterial>| {
        commands.spawn((
            Mesh3d(assets.point.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(at),
            MeasureVisual,
        ));
    };

    match tools.mode() {
        InteractionMode::Measuring(state) => {
            let Some(start) = state.first else {
                if let Some(hover) = pointer.0 {
                    spawn_point(&mut commands, hover, &assets.preview);
                }
                return;
            };
            spawn_point(&mut commands, start, &assets.preview);
            if let Some(hover) = pointer.0 {
                spawn_point(&mut commands, hover, &assets.preview);
                if let Some(transform) = segment_transform(start, hover) {
                    commands.spawn((
                        Mesh3d(assets.segment.clone()),
                        MeshMaterial3d(assets.preview.clone()),
                        transform,
                        MeasureVisual,
                    ));
                }
            }
        }
        _ => {
            let Some(profile) = measurements.last.as_ref() else {
                return;
            };
            spawn_point(&mut commands, profile.start, &assets.completed);
            spawn_point(&mut commands, profile.end, &assets.completed);
            if let Some(transform) = segment_transform(profile.start, profile.end) {
                commands.spawn((
                    Mesh3d(assets.segment.clone()),
                    MeshMaterial3d(assets.completed.clone()),
                    transform,
                    MeasureVisual,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_spans_both_points() {
        let start = Vec3::new(0.0, 1.0, 0.0);
        let end = Vec3::new(3.0, 1.0, 4.0);
        let transform = segment_transform(start, end).unwrap();

        assert!(transform.translation.distance(Vec3::new(1.5, 1.0, 2.0)) < 1e-5);
        assert!((transform.scale.x - 5.0).abs() < 1e-5);
        let tip = transform.transform_point(Vec3::new(0.5, 0.0, 0.0));
        assert!(tip.distance(end) < 1e-4);
    }

    #[test]
    fn degenerate_segment_is_skipped() {
        assert!(segment_transform(Vec3::ONE, Vec3::ONE).is_none());
    }
}
