use bevy::color::Srgba;
use bevy::color::palettes::css;
use bevy::math::Vec3;

/// Simple solid used for markers and exported geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolidShape {
    Cylinder { radius: f32, height: f32 },
    Cuboid { size: Vec3 },
}

impl SolidShape {
    pub const fn height(&self) -> f32 {
        match self {
            Self::Cylinder { height, .. } => *height,
            Self::Cuboid { size } => size.y,
        }
    }
}

/// Marker colours for the three interaction tiers.
#[derive(Debug, Clone, Copy)]
pub struct MarkerColours {
    pub normal: Srgba,
    pub hovered: Srgba,
    pub dragging: Srgba,
}

pub struct AssetMarker {
    pub name: &'static str,
    /// Added to the raw surface hit so the marker's base sits on the surface.
    pub surface_offset: f32,
    pub marker: SolidShape,
    /// Troops carry a head sphere on top of the body.
    pub head_radius: Option<f32>,
    pub export: SolidShape,
    pub colours: MarkerColours,
}

/// Invisible pick volume around every marker, larger than the marker itself.
pub const HIT_BOX_SIZE: Vec3 = Vec3::new(0.12, 0.3, 0.12);

/// Sides of the prism that approximates cylinders in exported meshes.
pub const EXPORT_PRISM_SIDES: usize = 8;

/// Samples in a measured distance profile, endpoints included.
pub const PROFILE_SAMPLE_COUNT: usize = 20;

/// Ordered as troops, arsenal, vehicles, tanks.
pub const ASSET_MARKERS: &[AssetMarker] = &[
    AssetMarker {
        name: "troops",
        surface_offset: 0.09375,
        marker: SolidShape::Cylinder {
            radius: 0.025,
            height: 0.1875,
        },
        head_radius: Some(0.01875),
        export: SolidShape::Cylinder {
            radius: 0.025,
            height: 0.1875,
        },
        colours: MarkerColours {
            normal: css::GREEN,
            hovered: css::DARK_GREEN,
            dragging: css::LIGHT_GREEN,
        },
    },
    AssetMarker {
        name: "arsenal",
        surface_offset: 0.05,
        marker: SolidShape::Cuboid {
            size: Vec3::new(0.1, 0.1, 0.1),
        },
        head_radius: None,
        export: SolidShape::Cuboid {
            size: Vec3::new(0.1, 0.1, 0.1),
        },
        colours: MarkerColours {
            normal: css::BLUE,
            hovered: css::DARK_BLUE,
            dragging: css::LIGHT_BLUE,
        },
    },
    AssetMarker {
        name: "vehicles",
        surface_offset: 0.075,
        marker: SolidShape::Cuboid {
            size: Vec3::new(0.15, 0.15, 0.15),
        },
        head_radius: None,
        export: SolidShape::Cuboid {
            size: Vec3::new(0.15, 0.15, 0.15),
        },
        colours: MarkerColours {
            normal: css::ORANGE,
            hovered: css::GOLDENROD,
            dragging: css::YELLOW,
        },
    },
    AssetMarker {
        name: "tanks",
        surface_offset: 0.1,
        marker: SolidShape::Cylinder {
            radius: 0.05,
            height: 0.2,
        },
        head_radius: None,
        export: SolidShape::Cuboid {
            size: Vec3::new(0.1, 0.2, 0.1),
        },
        colours: MarkerColours {
            normal: css::RED,
            hovered: css::DARK_RED,
            dragging: css::SALMON,
        },
    },
];

