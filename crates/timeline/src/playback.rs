use std::time::Instant;

use crate::{percent_to_frame, playhead_percent, Frame};

/// Playhead state: the current frame is authoritative, except while a scrub
/// is in progress, when the pointer's percentage is shown as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayheadSync {
    current_frame: Frame,
    total_frames: Frame,
    fps: u32,
    scrub_override: Option<f64>,
}

impl PlayheadSync {
    pub fn new(total_frames: Frame, fps: u32) -> Self {
        Self {
            current_frame: 0,
            total_frames: total_frames.max(0),
            fps,
            scrub_override: None,
        }
    }

    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub_override.is_some()
    }

    /// Frame update from playback or a seek; clamped to the timeline.
    pub fn set_frame(&mut self, frame: Frame) {
        self.current_frame = frame.clamp(0, self.total_frames);
    }

    /// Timeline length changed (edits grew or shrank the project).
    pub fn set_total_frames(&mut self, total_frames: Frame) {
        self.total_frames = total_frames.max(0);
        self.current_frame = self.current_frame.clamp(0, self.total_frames);
    }

    pub fn begin_scrub(&mut self, percent: f64) {
        self.scrub_override = Some(percent.clamp(0.0, 100.0));
    }

    /// Pointer moved during a scrub. Returns the frame the pointer is over so
    /// callers can preview it; the displayed position stays the raw pointer.
    pub fn scrub_to(&mut self, percent: f64) -> Frame {
        let percent = percent.clamp(0.0, 100.0);
        self.scrub_override = Some(percent);
        percent_to_frame(percent, self.total_frames)
    }

    /// Ends the scrub, snapping to the nearest frame. Afterwards
    /// `display_percent` is derived from that frame again.
    pub fn end_scrub(&mut self) -> Frame {
        if let Some(percent) = self.scrub_override.take() {
            self.current_frame = percent_to_frame(percent, self.total_frames);
        }
        self.current_frame
    }

    pub fn display_percent(&self) -> f64 {
        self.scrub_override
            .unwrap_or_else(|| playhead_percent(self.current_frame, self.total_frames, self.fps))
    }
}

/// Wall-clock anchored playback position, in timeline seconds.
#[derive(Default, Debug, Clone)]
pub struct PlaybackClock {
    pub playing: bool,
    pub rate: f64, // 1.0 = normal
    anchor_instant: Option<Instant>,
    anchor_timeline_sec: f64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            rate: 1.0,
            ..Self::default()
        }
    }

    pub fn play(&mut self, current_timeline_sec: f64, now: Instant) {
        self.playing = true;
        self.anchor_timeline_sec = current_timeline_sec;
        self.anchor_instant = Some(now);
    }

    pub fn pause(&mut self, now: Instant) {
        self.anchor_timeline_sec = self.position(now);
        self.playing = false;
        self.anchor_instant = None;
    }

    pub fn set_rate(&mut self, rate: f64, now: Instant) {
        // re-anchor so the position does not jump
        self.anchor_timeline_sec = self.position(now);
        if self.playing {
            self.anchor_instant = Some(now);
        }
        self.rate = rate;
    }

    pub fn seek_to(&mut self, timeline_sec: f64, now: Instant) {
        self.anchor_timeline_sec = timeline_sec.max(0.0);
        if self.playing {
            self.anchor_instant = Some(now);
        }
    }

    pub fn position(&self, now: Instant) -> f64 {
        match (self.playing, self.anchor_instant) {
            (true, Some(anchor)) => {
                let dt = now.saturating_duration_since(anchor).as_secs_f64();
                self.anchor_timeline_sec + dt * self.rate
            }
            _ => self.anchor_timeline_sec,
        }
    }

    /// Frame under the playhead, floored so a frame shows for its full span.
    pub fn frame(&self, fps: u32, now: Instant) -> Frame {
        (self.position(now) * fps as f64).floor().max(0.0) as Frame
    }
}
