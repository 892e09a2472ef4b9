use crate::tools::drag::MarkerTier;
use crate::tools::mission::AssetKind;
use crate::tools::registry::{AssetId, PlacedAssetRegistry};
use crate::tools::tool_manager::{InteractionMode, ToolManager};
use bevy::prelude::*;
use constants::mission::SolidShape;
use constants::render_settings::{PREVIEW_ALPHA, PREVIEW_COLOUR};
use std::collections::HashMap;

/// Scene entity standing for one placed asset, built for `kind`.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct AssetMarker {
    pub id: AssetId,
    pub kind: AssetKind,
}

/// Head sphere carried by troop markers.
#[derive(Component)]
pub struct MarkerHead;

/// Translucent marker following the pointer while deploying.
#[derive(Component)]
pub struct DeployPreview;

/// Shared meshes and materials for every kind and tier.
#[derive(Resource)]
pub struct MarkerAssets {
    bodies: [Handle<Mesh>; 4],
    head: Handle<Mesh>,
    /// Indexed by kind, then Normal, Hovered, Dragging.
    tiers: [[Handle<StandardMaterial>; 3]; 4],
}

impl MarkerAssets {
    pub fn body(&self, kind: AssetKind) -> Handle<Mesh> {
        self.bodies[kind.index()].clone()
    }

    pub fn material(&self, kind: AssetKind, tier: MarkerTier) -> Handle<StandardMaterial> {
        let slot = match tier {
            MarkerTier::Normal => 0,
            MarkerTier::Hovered => 1,
            MarkerTier::Dragging => 2,
        };
        self.tiers[kind.index()][slot].clone()
    }
}

fn body_mesh(shape: SolidShape) -> Mesh {
    match shape {
        SolidShape::Cylinder { radius, height } => Cylinder::new(radius, height).into(),
        SolidShape::Cuboid { size } => Cuboid::from_size(size).into(),
    }
}

/// Head sits on top of the body, which is centred on the asset position.
fn head_offset(kind: AssetKind) -> Option<Vec3> {
    let marker = kind.marker();
    marker
        .head_radius
        .map(|radius| Vec3::Y * (marker.marker.height() * 0.5 + radius))
}

pub fn setup_marker_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let bodies = AssetKind::ALL.map(|kind| meshes.add(body_mesh(kind.marker().marker)));
    let head_radius = AssetKind::Troops.marker().head_radius.unwrap_or(0.0);
    let head = meshes.add(Sphere::new(head_radius));

    let tiers = AssetKind::ALL.map(|kind| {
        [MarkerTier::Normal, MarkerTier::Hovered, MarkerTier::Dragging]
            .map(|tier| materials.add(StandardMaterial::from_color(tier.colour(kind))))
    });

    let preview = materials.add(StandardMaterial {
        base_color: PREVIEW_COLOUR.with_alpha(PREVIEW_ALPHA).into(),
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    commands.spawn((
        Mesh3d(bodies[AssetKind::Troops.index()].clone()),
        MeshMaterial3d(preview),
        Transform::default(),
        Visibility::Hidden,
        DeployPreview,
        Name::new("Deploy Preview"),
    ));

    commands.insert_resource(MarkerAssets {
        bodies,
        head,
        tiers,
    });
}

/// Position a marker is drawn at: the drag position while it is being dragged.
pub fn display_position(tools: &ToolManager, id: AssetId, stored: Vec3) -> Vec3 {
    match tools.dragging() {
        Some(drag) if drag.asset == id => drag.position,
        _ => stored,
    }
}

/// Mirror the registry into marker entities and apply hover tiers.
pub fn sync_asset_markers(
    mut commands: Commands,
    registry: Res<PlacedAssetRegistry>,
    tools: Res<ToolManager>,
    assets: Option<Res<MarkerAssets>>,
    mut markers: Query<
        (
            Entity,
            &AssetMarker,
            &mut Transform,
            &mut MeshMaterial3d<StandardMaterial>,
        ),
        Without<MarkerHead>,
    >,
    mut heads: Query<(&ChildOf, &mut MeshMaterial3d<StandardMaterial>), With<MarkerHead>>,
) {
    let Some(assets) = assets else {
        return;
    };
    if !registry.is_changed() && !tools.is_changed() {
        return;
    }

    let mut existing: HashMap<AssetId, Entity> = HashMap::new();
    let mut tier_by_entity: HashMap<Entity, Handle<StandardMaterial>> = HashMap::new();

    for (entity, marker, mut transform, mut material) in &mut markers {
        let Some((_, asset)) = registry.find(marker.id) else {
            commands.entity(entity).despawn();
            continue;
        };
        // Body mesh and head depend on the kind, so a changed kind is rebuilt.
        if asset.kind != marker.kind {
            debug!("Rebuilding marker {:?}: {} -> {}", asset.id, marker.kind, asset.kind);
            commands.entity(entity).despawn();
            continue;
        }
        transform.translation = display_position(&tools, asset.id, asset.position);

        let wanted = assets.material(asset.kind, tools.tier_for(asset.id));
        if material.0 != wanted {
            material.0 = wanted.clone();
        }
        tier_by_entity.insert(entity, wanted);
        existing.insert(marker.id, entity);
    }

    for (child_of, mut material) in &mut heads {
        if let Some(wanted) = tier_by_entity.get(&child_of.parent()) {
            if material.0 != *wanted {
                material.0 = wanted.clone();
            }
        }
    }

    for asset in registry.iter() {
        if existing.contains_key(&asset.id) {
            continue;
        }
        let material = assets.material(asset.kind, tools.tier_for(asset.id));
        let mut entity = commands.spawn((
            Mesh3d(assets.body(asset.kind)),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(display_position(&tools, asset.id, asset.position)),
            AssetMarker {
                id: asset.id,
                kind: asset.kind,
            },
            Name::new(format!("{} {}", asset.kind, asset.id.0)),
        ));
        if let Some(offset) = head_offset(asset.kind) {
            entity.with_children(|parent| {
                parent.spawn((
                    Mesh3d(assets.head.clone()),
                    MeshMaterial3d(material),
                    Transform::from_translation(offset),
                    MarkerHead,
                ));
            });
        }
    }
}

/// Show the translucent preview where the next asset would land.
pub fn update_deploy_preview(
    tools: Res<ToolManager>,
    assets: Option<Res<MarkerAssets>>,
    mut preview: Query<(&mut Transform, &mut Visibility, &mut Mesh3d), With<DeployPreview>>,
) {
    let Some(assets) = assets else {
        return;
    };
    let Ok((mut transform, mut visibility, mut mesh)) = preview.single_mut() else {
        return;
    };

    let target = match tools.mode() {
        InteractionMode::Deploying(state) => state.preview().map(|point| (state.kind(), point)),
        _ => None,
    };

    match target {
        Some((kind, point)) => {
            let body = assets.body(kind);
            if mesh.0 != body {
                mesh.0 = body;
            }
            transform.translation = point;
            *visibility = Visibility::Visible;
        }
        None => *visibility = Visibility::Hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_troops_carry_a_head() {
        let head = head_offset(AssetKind::Troops).unwrap();
        assert!((head.y - (0.1875 * 0.5 + 0.01875)).abs() < 1e-6);
        assert_eq!(head_offset(AssetKind::Tanks), None);
    }

    fn marker_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<PlacedAssetRegistry>()
            .init_resource::<ToolManager>()
            .add_systems(Startup, setup_marker_assets)
            .add_systems(Update, sync_asset_markers);
        app
    }

    fn markers(app: &mut App) -> Vec<AssetMarker> {
        let world = app.world_mut();
        world
            .query::<&AssetMarker>()
            .iter(world)
            .copied()
            .collect()
    }

    fn head_count(app: &mut App) -> usize {
        let world = app.world_mut();
        world
            .query_filtered::<(), With<MarkerHead>>()
            .iter(world)
            .count()
    }

    #[test]
    fn replacing_the_kind_rebuilds_the_marker() {
        let mut app = marker_app();
        let (_, id) = app
            .world_mut()
            .resource_mut::<PlacedAssetRegistry>()
            .append(AssetKind::Tanks, Vec3::new(1.0, 0.1, 1.0));
        app.update();
        assert_eq!(markers(&mut app), [AssetMarker { id, kind: AssetKind::Tanks }]);
        assert_eq!(head_count(&mut app), 0);

        app.world_mut()
            .resource_mut::<PlacedAssetRegistry>()
            .replace_at(0, AssetKind::Troops, Vec3::new(2.0, 0.09375, 2.0));
        app.update();
        let rebuilt = markers(&mut app);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].kind, AssetKind::Troops);
        assert_eq!(head_count(&mut app), 1);

        let troop_mesh = app.world().resource::<MarkerAssets>().body(AssetKind::Troops);
        let world = app.world_mut();
        let meshes: Vec<_> = world
            .query_filtered::<&Mesh3d, With<AssetMarker>>()
            .iter(world)
            .map(|mesh| mesh.0.clone())
            .collect();
        assert_eq!(meshes, [troop_mesh]);

        app.world_mut()
            .resource_mut::<PlacedAssetRegistry>()
            .replace_at(0, AssetKind::Arsenal, Vec3::ZERO);
        app.update();
        assert_eq!(markers(&mut app)[0].kind, AssetKind::Arsenal);
        assert_eq!(head_count(&mut app), 0);
    }

    #[test]
    fn cleared_registry_removes_markers() {
        let mut app = marker_app();
        app.world_mut()
            .resource_mut::<PlacedAssetRegistry>()
            .append(AssetKind::Troops, Vec3::ZERO);
        app.update();
        assert_eq!(head_count(&mut app), 1);

        app.world_mut().resource_mut::<PlacedAssetRegistry>().clear();
        app.update();
        assert!(markers(&mut app).is_empty());
        assert_eq!(head_count(&mut app), 0);
    }

    #[test]
    fn dragged_marker_follows_the_drag() {
        let mut registry = PlacedAssetRegistry::default();
        let (index, id) = registry.append(AssetKind::Arsenal, Vec3::ZERO);
        let (_, other) = registry.append(AssetKind::Arsenal, Vec3::X);

        let mut tools = ToolManager::default();
        assert!(tools.begin_drag(index, &registry));
        tools.pointer_moved(Some(Vec3::new(2.0, 0.05, 2.0)));

        assert_eq!(
            display_position(&tools, id, Vec3::ZERO),
            Vec3::new(2.0, 0.05, 2.0)
        );
        assert_eq!(display_position(&tools, other, Vec3::X), Vec3::X);
    }
}
