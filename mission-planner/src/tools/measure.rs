use bevy::prelude::*;
use serde::Serialize;

/// Elevation along a measured segment.
pub trait ElevationModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Elevation at parameter `t` of the segment `start..end`.
    fn elevation_at(&self, start: Vec3, end: Vec3, t: f32) -> f32;
}

/// Stand-in until profiles sample real terrain: the higher endpoint's elevation everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderElevationModel;

impl ElevationModel for PlaceholderElevationModel {
    fn name(&self) -> &'static str {
        "placeholder-max-endpoint"
    }

    fn elevation_at(&self, start: Vec3, end: Vec3, _t: f32) -> f32 {
        start.y.max(end.y)
    }
}

/// Elevation model used for new measurements.
#[derive(Resource)]
pub struct ElevationSource(pub Box<dyn ElevationModel>);

impl Default for ElevationSource {
    fn default() -> Self {
        Self(Box::new(PlaceholderElevationModel))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileSample {
    pub t: f32,
    pub position: Vec3,
    pub elevation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceProfile {
    pub start: Vec3,
    pub end: Vec3,
    pub distance: f32,
    pub model: &'static str,
    pub samples: Vec<ProfileSample>,
}

impl DistanceProfile {
    /// Straight-line distance plus `sample_count` uniformly spaced samples, endpoints included.
    pub fn compute(start: Vec3, end: Vec3, sample_count: usize, model: &dyn ElevationModel) -> Self {
        let samples = (0..sample_count)
            .map(|i| {
                let t = if sample_count > 1 {
                    i as f32 / (sample_count - 1) as f32
                } else {
                    0.0
                };
                ProfileSample {
                    t,
                    position: start.lerp(end, t),
                    elevation: model.elevation_at(start, end, t),
                }
            })
            .collect();

        Self {
            start,
            end,
            distance: start.distance(end),
            model: model.name(),
            samples,
        }
    }
}

/// Measurement in progress; holds the first captured point once clicked.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasureState {
    pub first: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeasureStep {
    /// First point captured; the tool stays active.
    Started(Vec3),
    /// Second point captured; the tool deactivates.
    Completed(DistanceProfile),
}

impl MeasureState {
    pub fn click(&mut self, point: Vec3, sample_count: usize, model: &dyn ElevationModel) -> MeasureStep {
        match self.first.take() {
            None => {
                self.first = Some(point);
                MeasureStep::Started(point)
            }
            Some(start) => MeasureStep::Completed(DistanceProfile::compute(
                start,
                point,
                sample_count,
                model,
            )),
        }
    }
}

/// Last completed measurement of the session, carried into export metadata.
#[derive(Resource, Debug, Default)]
pub struct MeasurementLog {
    pub last: Option<DistanceProfile>,
}
