/// Saturated trail intensity written by deposition.
pub const TRAIL_MAX: u8 = u8::MAX;

/// Number of distinct integer headings; headings live in `[0, HEADING_DEGREES)`.
pub const HEADING_DEGREES: i32 = 360;

/// Sensing and movement use the direction `270 - heading`, so heading 0
/// points "up" (negative y).
pub const HEADING_ORIGIN_DEGREES: f64 = 270.0;

/// Largest accepted field width/height. Keeps `width * height` and the blur's
/// `u32` window sums comfortably in range.
pub const MAX_FIELD_DIMENSION: usize = 16_384;

/// Largest accepted sensor patch side. `patch_side^2 * 255` must fit in `u32`.
pub const MAX_SENSOR_SIZE: u32 = 256;
