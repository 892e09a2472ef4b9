use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use constants::scene::{GRID_DIVISIONS, GRID_SIZE};

#[derive(Component)]
pub struct GroundGrid;

/// Line list for a square grid on the `y = 0` plane, centred on the origin.
pub fn grid_mesh(size: f32, divisions: u32) -> Mesh {
    let half = size * 0.5;
    let step = size / divisions.max(1) as f32;
    let mut vertices = Vec::new();

    for i in 0..=divisions {
        let offset = -half + i as f32 * step;
        vertices.push([offset, 0.0, -half]);
        vertices.push([offset, 0.0, half]);
        vertices.push([-half, 0.0, offset]);
        vertices.push([half, 0.0, offset]);
    }
    let indices: Vec<u32> = (0..vertices.len() as u32).collect();

    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::RENDER_WORLD);
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vertices);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

pub fn spawn_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
        Name::new("Sun"),
    ));

    commands.spawn((
        Mesh3d(meshes.add(grid_mesh(GRID_SIZE, GRID_DIVISIONS))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 1.0, 1.0, 0.5),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        })),
        Transform::IDENTITY,
        GroundGrid,
        Name::new("Ground Grid"),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::mesh::VertexAttributeValues;

    #[test]
    fn grid_has_two_lines_per_division_edge() {
        let mesh = grid_mesh(10.0, 10);
        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("grid positions missing");
        };
        assert_eq!(positions.len(), 11 * 4);
        assert_eq!(positions[0], [-5.0, 0.0, -5.0]);
        assert_eq!(positions[positions.len() - 1], [5.0, 0.0, 5.0]);
    }
}
