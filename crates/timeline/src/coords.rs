//! Frame / time / pixel conversions for the timeline view.
//!
//! Frames are the source of truth. Seconds and pixels are derived from them,
//! and pixel input is mapped back with `round` so repeated conversions do not
//! drift in one direction.
use serde::{Deserialize, Serialize};

use crate::Frame;

pub const DEFAULT_PIXELS_PER_SECOND: f64 = 100.0;

pub fn frame_to_seconds(frame: Frame, fps: u32) -> f64 {
    if fps == 0 {
        return 0.0;
    }
    frame as f64 / fps as f64
}

pub fn seconds_to_frame(seconds: f64, fps: u32) -> Frame {
    (seconds * fps as f64).round() as Frame
}

/// Playhead position in percent using frame counts only.
pub fn position_percent(current_frame: Frame, total_frames: Frame) -> f64 {
    if total_frames <= 0 {
        return 0.0;
    }
    (current_frame as f64 / total_frames as f64 * 100.0).clamp(0.0, 100.0)
}

/// Playhead position in percent through seconds; `None` unless both
/// `fps` and `total_duration_seconds` are positive.
pub fn precise_position_percent(
    current_frame: Frame,
    fps: u32,
    total_duration_seconds: f64,
) -> Option<f64> {
    if fps == 0 || !(total_duration_seconds > 0.0) {
        return None;
    }
    let seconds = current_frame as f64 / fps as f64;
    Some((seconds / total_duration_seconds * 100.0).clamp(0.0, 100.0))
}

/// Preferred playhead percentage: the seconds-based path when available.
pub fn playhead_percent(current_frame: Frame, total_frames: Frame, fps: u32) -> f64 {
    precise_position_percent(current_frame, fps, frame_to_seconds(total_frames, fps))
        .unwrap_or_else(|| position_percent(current_frame, total_frames))
}

/// Nearest frame for a playhead percentage, clamped to `[0, total_frames]`.
pub fn percent_to_frame(percent: f64, total_frames: Frame) -> Frame {
    if total_frames <= 0 || !percent.is_finite() {
        return 0;
    }
    let percent = percent.clamp(0.0, 100.0);
    ((percent / 100.0 * total_frames as f64).round() as Frame).clamp(0, total_frames)
}

/// `MM:SS.FF` label for a frame.
pub fn format_timestamp(frame: Frame, fps: u32) -> String {
    let fps = fps.max(1) as Frame;
    let frame = frame.max(0);
    let total_seconds = frame / fps;
    format!(
        "{:02}:{:02}.{:02}",
        total_seconds / 60,
        total_seconds % 60,
        frame % fps
    )
}

/// Horizontal zoom of the timeline: `pixels_per_second = base * zoom`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimelineScale {
    #[serde(default = "default_base_pixels_per_second")]
    pub base_pixels_per_second: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_base_pixels_per_second() -> f64 {
    DEFAULT_PIXELS_PER_SECOND
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for TimelineScale {
    fn default() -> Self {
        Self {
            base_pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
            zoom: 1.0,
        }
    }
}

impl TimelineScale {
    pub fn new(base_pixels_per_second: f64, zoom: f64) -> Self {
        Self {
            base_pixels_per_second,
            zoom,
        }
    }

    pub fn pixels_per_second(&self) -> f64 {
        (self.base_pixels_per_second * self.zoom).max(0.0)
    }

    pub fn pixels_per_frame(&self, fps: u32) -> f64 {
        if fps == 0 {
            return 0.0;
        }
        self.pixels_per_second() / fps as f64
    }

    pub fn track_width_px(&self, total_frames: Frame, fps: u32) -> f64 {
        (total_frames.max(0) as f64 * self.pixels_per_frame(fps)).max(0.0)
    }

    /// Left edge of `frame`, clamped to the track width.
    pub fn frame_to_px(&self, frame: Frame, total_frames: Frame, fps: u32) -> f64 {
        let width = self.track_width_px(total_frames, fps);
        (frame as f64 * self.pixels_per_frame(fps)).clamp(0.0, width)
    }

    /// Nearest frame for a pixel offset, clamped to `[0, total_frames]`.
    pub fn px_to_frame(&self, px: f64, total_frames: Frame, fps: u32) -> Frame {
        let ppf = self.pixels_per_frame(fps);
        if ppf <= 0.0 || !px.is_finite() {
            return 0;
        }
        ((px / ppf).round() as Frame).clamp(0, total_frames.max(0))
    }

    /// Signed frame delta for a pointer movement, unclamped.
    pub fn px_delta_to_frames(&self, dx: f64, fps: u32) -> Frame {
        let ppf = self.pixels_per_frame(fps);
        if ppf <= 0.0 || !dx.is_finite() {
            return 0;
        }
        (dx / ppf).round() as Frame
    }

    /// `(left, width)` in pixels for an item, both clamped to the track.
    pub fn item_rect(
        &self,
        start: Frame,
        duration: Frame,
        total_frames: Frame,
        fps: u32,
    ) -> (f64, f64) {
        let left = self.frame_to_px(start, total_frames, fps);
        let right = self.frame_to_px(start + duration, total_frames, fps);
        (left, (right - left).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_seconds() {
        assert_eq!(frame_to_seconds(90, 30), 3.0);
        assert_eq!(frame_to_seconds(45, 30), 1.5);
        assert_eq!(frame_to_seconds(10, 0), 0.0);
    }

    #[test]
    fn test_seconds_to_frame_rounds() {
        assert_eq!(seconds_to_frame(1.5, 30), 45);
        assert_eq!(seconds_to_frame(0.49, 30), 15);
        assert_eq!(seconds_to_frame(frame_to_seconds(137, 24), 24), 137);
        assert_eq!(seconds_to_frame(2.0, 0), 0);
    }

    #[test]
    fn test_position_percent_clamps() {
        assert_eq!(position_percent(45, 90), 50.0);
        assert_eq!(position_percent(200, 90), 100.0);
        assert_eq!(position_percent(-5, 90), 0.0);
        assert_eq!(position_percent(10, 0), 0.0);
    }

    #[test]
    fn test_precise_path_requires_known_rate() {
        assert_eq!(precise_position_percent(15, 30, 1.0), Some(50.0));
        assert_eq!(precise_position_percent(15, 0, 1.0), None);
        assert_eq!(precise_position_percent(15, 30, 0.0), None);
        assert_eq!(playhead_percent(15, 0, 30), 0.0);
        assert_eq!(playhead_percent(150, 300, 30), 50.0);
    }

    #[test]
    fn test_percent_round_trip_within_one_frame() {
        let total = 317;
        let one_frame = 100.0 / total as f64;
        for step in 0..=1000 {
            let p = step as f64 / 10.0;
            let back = position_percent(percent_to_frame(p, total), total);
            assert!((back - p).abs() <= one_frame, "p={p} back={back}");
        }
    }

    #[test]
    fn test_pixel_conversion_uses_round() {
        let scale = TimelineScale::new(100.0, 1.5);
        assert_eq!(scale.pixels_per_second(), 150.0);
        assert_eq!(scale.pixels_per_frame(30), 5.0);
        // 12.4px is 2.48 frames, 12.6px is 2.52 frames
        assert_eq!(scale.px_to_frame(12.4, 300, 30), 2);
        assert_eq!(scale.px_to_frame(12.6, 300, 30), 3);
        for frame in 0..=300 {
            let px = scale.frame_to_px(frame, 300, 30);
            assert_eq!(scale.px_to_frame(px, 300, 30), frame);
        }
    }

    #[test]
    fn test_pixels_clamped_to_track_width() {
        let scale = TimelineScale::default();
        assert_eq!(scale.track_width_px(300, 25), 1200.0);
        assert_eq!(scale.frame_to_px(-10, 300, 25), 0.0);
        assert_eq!(scale.frame_to_px(400, 300, 25), 1200.0);
        assert_eq!(scale.px_to_frame(-50.0, 300, 25), 0);
        assert_eq!(scale.px_to_frame(5000.0, 300, 25), 300);
        assert_eq!(scale.item_rect(270, 60, 300, 25), (1080.0, 120.0));
    }

    #[test]
    fn test_degenerate_timeline_stays_in_range() {
        let scale = TimelineScale::default();
        assert_eq!(scale.track_width_px(0, 30), 0.0);
        assert_eq!(scale.frame_to_px(10, 0, 30), 0.0);
        assert_eq!(scale.px_to_frame(10.0, 0, 30), 0);
        assert_eq!(percent_to_frame(50.0, 0), 0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0, 30), "00:00.00");
        assert_eq!(format_timestamp(95, 30), "00:03.05");
        assert_eq!(format_timestamp(30 * 75 + 2, 30), "01:15.02");
    }
}
