//! Display formatting for derived sensor values.

use crate::types::Resolution;
use std::f64::consts::PI;

/// Format with at most one fractional digit, ties to even, dropping a trailing `.0`.
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let tenths = (value * 10.0).round_ties_even();
    if tenths == 0.0 {
        return "0".to_string();
    }
    if tenths % 10.0 == 0.0 {
        format!("{}", (tenths / 10.0) as i64)
    } else {
        format!("{:.1}", tenths / 10.0)
    }
}

/// Field of view in degrees from the shortest focal length and the sensor height,
/// both in millimetres. The frame is assumed to be 16:9.
pub fn field_of_view(focal_length: f32, sensor_height: f32) -> String {
    let frame_width = sensor_height as f64 * 16.0 / 9.0;
    let focal = focal_length as f64;
    format_decimal(2.0 * (frame_width / (focal * 2.0)).atan() * 180.0 / PI)
}

pub fn megapixels(resolution: Option<Resolution>) -> String {
    let pixels = resolution.map(|r| r.pixel_count()).unwrap_or(0);
    format_decimal(pixels as f64 / 1_000_000.0)
}
