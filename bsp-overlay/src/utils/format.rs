//! Formatting utilities

use glam::Vec3;
use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a position the way map entities store it
pub fn format_vec3(v: Vec3) -> String {
    format!("{} {} {}", v.x, v.y, v.z)
}

/// Format a brush volume in cubic units
pub fn format_volume(volume: f64) -> String {
    if volume >= 1.0e6 {
        format!("{:.2}M", volume / 1.0e6)
    } else {
        format!("{volume:.1}")
    }
}
