use crate::agent::normalize_heading;
use crate::config::SimConfig;
use crate::constants::{HEADING_DEGREES, HEADING_ORIGIN_DEGREES};
use crate::field::TrailField;

/// Unit vector for a heading in degrees. Heading 0 faces negative y (up on
/// screen) and heading 90 faces negative x.
pub fn heading_vector(heading_degrees: f64) -> (f64, f64) {
    let alpha = (HEADING_ORIGIN_DEGREES - heading_degrees).to_radians();
    (alpha.cos(), alpha.sin())
}

/// Sensor placement with per-heading sample offsets precomputed.
///
/// `offsets[h][s]` is the rounded displacement from the agent to sensor `s`
/// (left, center, right) when the agent faces heading `h`.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorGeometry {
    pub distance: u32,
    pub size: u32,
    pub angle_span: u32,
    offsets: Vec<[(i32, i32); 3]>,
}

impl SensorGeometry {
    pub fn new(distance: u32, size: u32, angle_span: u32) -> Self {
        let d = distance as f64;
        let span = angle_span as f64;
        let offsets = (0..HEADING_DEGREES)
            .map(|heading| {
                let mut per_sensor = [(0, 0); 3];
                for (s, slot) in per_sensor.iter_mut().enumerate() {
                    let (cos, sin) = heading_vector(heading as f64 + span * (s as f64 - 1.0));
                    *slot = ((d * cos).round() as i32, (d * sin).round() as i32);
                }
                per_sensor
            })
            .collect();
        Self {
            distance,
            size,
            angle_span,
            offsets,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            config.sensor_distance,
            config.sensor_size,
            config.sensor_angle_span,
        )
    }

    /// Sample points for an agent at `(x, y)` facing `heading`, taken mod 360.
    pub fn sample_points(&self, x: i32, y: i32, heading: i32) -> [(i64, i64); 3] {
        let offsets = self.offsets[normalize_heading(heading) as usize];
        offsets.map(|(dx, dy)| (x as i64 + dx as i64, y as i64 + dy as i64))
    }
}

/// Trail sums at the left, center and right sensors of an agent.
///
/// Each sensor sums the `size x size` patch whose top-left corner is the sample
/// point minus `size / 2`. No clamping is applied; cells outside the field wrap.
pub fn sense(
    field: &TrailField,
    x: i32,
    y: i32,
    heading: i32,
    geometry: &SensorGeometry,
) -> [u32; 3] {
    let half = (geometry.size / 2) as i64;
    geometry
        .sample_points(x, y, heading)
        .map(|(sx, sy)| field.patch_sum(sx - half, sy - half, geometry.size))
}
