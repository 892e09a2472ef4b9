use super::StatusBanner;
use super::fps::FpsText;
use crate::terrain::layer::TerrainLayers;
use crate::tools::mission::{AssetKind, MissionCounts};
use crate::tools::pointer::PointerSurface;
use crate::tools::registry::PlacedAssetRegistry;
use crate::tools::tool_manager::{InteractionMode, ToolManager};
use bevy::prelude::*;
use constants::scene::COORDINATE_DISPLAY_SCALE;

#[derive(Component)]
pub struct ModeText;

#[derive(Component)]
pub struct ItemsText;

#[derive(Component)]
pub struct CoordinateText;

#[derive(Component)]
pub struct LoadingText;

#[derive(Component)]
pub struct BannerText;

fn label(font_size: f32, colour: Color) -> (Text, TextFont, TextColor) {
    (
        Text::new(""),
        TextFont {
            font_size,
            ..default()
        },
        TextColor(colour),
    )
}

pub fn spawn_overlay(mut commands: Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent
                .spawn(Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(4.0),
                    ..default()
                })
                .with_children(|column| {
                    column.spawn((label(16.0, Color::WHITE), ModeText));
                    column.spawn((label(14.0, Color::srgb(0.8, 0.8, 0.8)), ItemsText));
                    column.spawn((label(14.0, Color::srgb(1.0, 0.85, 0.3)), LoadingText));
                });

            parent.spawn((
                label(14.0, Color::srgb(0.7, 0.9, 1.0)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                CoordinateText,
            ));

            parent.spawn((
                label(16.0, Color::srgb(1.0, 0.35, 0.3)),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                BannerText,
            ));

            parent.spawn((
                label(12.0, Color::srgb(0.6, 1.0, 0.6)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

pub fn mode_summary(tools: &ToolManager, counts: &MissionCounts) -> String {
    let mode = match tools.mode() {
        InteractionMode::Idle => "Idle".to_string(),
        InteractionMode::Deploying(state) => format!("Deploying {}", state.kind()),
        InteractionMode::Dragging(drag) => format!("Moving {}", drag.kind),
        InteractionMode::Measuring(state) => match state.first {
            Some(_) => "Measuring: pick end point".to_string(),
            None => "Measuring: pick start point".to_string(),
        },
    };

    let remaining = AssetKind::ALL
        .iter()
        .map(|kind| format!("{} {}", kind, counts.remaining(*kind)))
        .collect::<Vec<_>>()
        .join("  ");

    format!("{mode} | {remaining}")
}

/// Pointer position in display metres, two decimals.
pub fn coordinate_readout(point: Option<Vec3>) -> String {
    match point {
        Some(p) => {
            let m = p * COORDINATE_DISPLAY_SCALE;
            format!("X: {:.2} m  Y: {:.2} m  Z: {:.2} m", m.x, m.y, m.z)
        }
        None => "X: -  Y: -  Z: -".to_string(),
    }
}

pub fn update_overlay(
    tools: Res<ToolManager>,
    counts: Res<MissionCounts>,
    registry: Res<PlacedAssetRegistry>,
    layers: Res<TerrainLayers>,
    pointer: Res<PointerSurface>,
    banner: Res<StatusBanner>,
    mut texts: ParamSet<(
        Query<&mut Text, With<ModeText>>,
        Query<&mut Text, With<ItemsText>>,
        Query<&mut Text, With<CoordinateText>>,
        Query<&mut Text, With<LoadingText>>,
        Query<&mut Text, With<BannerText>>,
    )>,
) {
    for mut text in &mut texts.p0() {
        text.0 = mode_summary(&tools, &counts);
    }
    for mut text in &mut texts.p1() {
        text.0 = format!(
            "Deployed: {} items | Terrain layers: {}",
            registry.len(),
            layers.len()
        );
    }
    for mut text in &mut texts.p2() {
        text.0 = coordinate_readout(pointer.0);
    }
    for mut text in &mut texts.p3() {
        text.0 = if layers.any_in_flight() {
            "Uploading terrain...".to_string()
        } else {
            String::new()
        };
    }
    for mut text in &mut texts.p4() {
        text.0 = banner
            .message()
            .map(|message| format!("{message}  [Backspace to dismiss]"))
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::mission::CountSheet;

    #[test]
    fn readout_scales_to_metres() {
        assert_eq!(
            coordinate_readout(Some(Vec3::new(0.1234, 0.0, -1.5))),
            "X: 12.34 m  Y: 0.00 m  Z: -150.00 m"
        );
        assert_eq!(coordinate_readout(None), "X: -  Y: -  Z: -");
    }

    #[test]
    fn summary_lists_remaining_counts() {
        let tools = ToolManager::default();
        let counts = MissionCounts::from_sheet(&CountSheet {
            troops: 5,
            arsenal: 2,
            vehicles: 3,
            tanks: 1,
        });
        assert_eq!(
            mode_summary(&tools, &counts),
            "Idle | troops 5  arsenal 2  vehicles 3  tanks 1"
        );
    }
}
