use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};
use uuid::Uuid;

use crate::{Frame, Result, TimelineError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OverlayId(pub Uuid);

impl OverlayId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open interval `[start, start + duration)` on the timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameRange {
    pub start: Frame,
    pub duration: Frame,
}

impl FrameRange {
    pub fn new(start: Frame, duration: Frame) -> Self {
        Self { start, duration }
    }

    pub fn end(&self) -> Frame {
        self.start + self.duration
    }

    /// `None` when the end does not fit in a frame index.
    pub fn checked_end(&self) -> Option<Frame> {
        self.start.checked_add(self.duration)
    }

    pub fn overlaps(&self, other: &FrameRange) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.start && frame < self.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    #[serde(default = "default_text_color")]
    pub color: String,
}

fn default_font_family() -> String {
    "Inter".to_string()
}

fn default_font_size() -> f32 {
    48.0
}

fn default_font_weight() -> u16 {
    400
}

fn default_text_color() -> String {
    "#ffffff".to_string()
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
            color: default_text_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioStyle {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub fade_in_seconds: f64,
    #[serde(default)]
    pub fade_out_seconds: f64,
}

fn default_volume() -> f32 {
    1.0
}

impl Default for AudioStyle {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
        }
    }
}

/// One caption word, timed in milliseconds relative to the overlay start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionWord {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayKind {
    Text {
        content: String,
        #[serde(default)]
        style: TextStyle,
    },
    Caption {
        words: Vec<CaptionWord>,
        #[serde(default)]
        style: TextStyle,
    },
    Sound {
        src: String,
        #[serde(default)]
        start_from_source: Frame,
        #[serde(default)]
        audio: AudioStyle,
    },
    Video {
        src: String,
        #[serde(default)]
        start_from_source: Frame,
        #[serde(default)]
        audio: AudioStyle,
    },
    Image {
        src: String,
    },
}

impl OverlayKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Caption { .. } => "caption",
            Self::Sound { .. } => "sound",
            Self::Video { .. } => "video",
            Self::Image { .. } => "image",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Overlay {
    pub id: OverlayId,
    pub track_id: TrackId,
    pub start: Frame,
    pub duration_in_frames: Frame,
    #[serde(flatten)]
    pub kind: OverlayKind,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Overlay {
    pub fn new(track_id: TrackId, start: Frame, duration_in_frames: Frame, kind: OverlayKind) -> Self {
        Self {
            id: OverlayId::new(),
            track_id,
            start,
            duration_in_frames,
            kind,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn end(&self) -> Frame {
        self.start + self.duration_in_frames
    }

    pub fn range(&self) -> FrameRange {
        FrameRange::new(self.start, self.duration_in_frames)
    }

    /// Offset into the source media, for kinds backed by timed media.
    pub fn start_from_source(&self) -> Option<Frame> {
        match &self.kind {
            OverlayKind::Sound {
                start_from_source, ..
            }
            | OverlayKind::Video {
                start_from_source, ..
            } => Some(*start_from_source),
            _ => None,
        }
    }

    pub(crate) fn shift_source(&mut self, delta: Frame) {
        if let OverlayKind::Sound {
            start_from_source, ..
        }
        | OverlayKind::Video {
            start_from_source, ..
        } = &mut self.kind
        {
            *start_from_source = start_from_source.saturating_add(delta);
        }
    }

    pub fn font_family(&self) -> Option<&str> {
        match &self.kind {
            OverlayKind::Text { style, .. } | OverlayKind::Caption { style, .. } => {
                Some(style.font_family.as_str())
            }
            _ => None,
        }
    }

    pub fn audio_style(&self) -> Option<&AudioStyle> {
        match &self.kind {
            OverlayKind::Sound { audio, .. } | OverlayKind::Video { audio, .. } => Some(audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Kept sorted by `start`.
    #[serde(default)]
    pub overlays: Vec<Overlay>,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            overlays: Vec::new(),
        }
    }

    /// First overlay (other than those in `ignore`) intersecting `range`.
    pub fn conflict(&self, range: &FrameRange, ignore: &[OverlayId]) -> Option<&Overlay> {
        self.overlays
            .iter()
            .filter(|o| !ignore.contains(&o.id))
            .find(|o| o.range().overlaps(range))
    }

    pub fn furthest_end(&self) -> Frame {
        self.overlays.iter().map(Overlay::end).max().unwrap_or(0)
    }

    /// Earliest start at or after `from` where `duration` frames fit without
    /// touching another overlay.
    pub fn find_free_slot(&self, from: Frame, duration: Frame, ignore: &[OverlayId]) -> Frame {
        let mut candidate = from.max(0);
        loop {
            let range = FrameRange::new(candidate, duration);
            match self.conflict(&range, ignore) {
                Some(other) => candidate = other.end(),
                None => return candidate,
            }
        }
    }

    pub(crate) fn insert_sorted(&mut self, overlay: Overlay) {
        let idx = self
            .overlays
            .partition_point(|o| o.start <= overlay.start);
        self.overlays.insert(idx, overlay);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    pub fps: u32,
    pub duration_in_frames: Frame,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Project {
    pub fn new(name: impl Into<String>, fps: u32, duration_in_frames: Frame) -> Self {
        Self {
            name: name.into(),
            fps,
            duration_in_frames,
            tracks: Vec::new(),
        }
    }

    pub fn add_track(&mut self, name: impl Into<String>) -> TrackId {
        let track = Track::new(name);
        let id = track.id;
        self.tracks.push(track);
        id
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub(crate) fn track_index(&self, id: TrackId) -> Result<usize> {
        self.tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TimelineError::TrackNotFound(id))
    }

    /// (track index, overlay index) of an overlay.
    pub(crate) fn locate(&self, id: OverlayId) -> Result<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(ti, t)| t.overlays.iter().position(|o| o.id == id).map(|oi| (ti, oi)))
            .ok_or(TimelineError::OverlayNotFound(id))
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        let (ti, oi) = self.locate(id).ok()?;
        Some(&self.tracks[ti].overlays[oi])
    }

    /// All overlays in track order, then start order.
    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.tracks.iter().flat_map(|t| t.overlays.iter())
    }

    pub fn duration_seconds(&self) -> f64 {
        crate::frame_to_seconds(self.duration_in_frames, self.fps)
    }

    /// Checks every data-model invariant; loaded snapshots go through this.
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(TimelineError::InvalidProject("fps must be positive".into()));
        }
        if self.duration_in_frames < 0 {
            return Err(TimelineError::InvalidProject(format!(
                "negative duration {}",
                self.duration_in_frames
            )));
        }

        let mut track_ids = HashSet::new();
        let mut overlay_ids = HashSet::new();
        for track in &self.tracks {
            if !track_ids.insert(track.id) {
                return Err(TimelineError::InvalidProject(format!(
                    "duplicate track id {}",
                    track.id
                )));
            }
            for (i, overlay) in track.overlays.iter().enumerate() {
                if !overlay_ids.insert(overlay.id) {
                    return Err(TimelineError::InvalidProject(format!(
                        "duplicate overlay id {}",
                        overlay.id
                    )));
                }
                if overlay.track_id != track.id {
                    return Err(TimelineError::InvalidProject(format!(
                        "overlay {} claims track {} but sits on {}",
                        overlay.id, overlay.track_id, track.id
                    )));
                }
                let end = overlay.range().checked_end().ok_or_else(|| {
                    TimelineError::InvalidProject(format!(
                        "overlay {} ends past the last representable frame",
                        overlay.id
                    ))
                })?;
                if overlay.start < 0 || overlay.duration_in_frames < 1 || end > self.duration_in_frames {
                    return Err(TimelineError::InvalidProject(format!(
                        "overlay {} spans [{}, {}) outside [0, {})",
                        overlay.id, overlay.start, end, self.duration_in_frames
                    )));
                }
                if let Some(next) = track.overlays.get(i + 1) {
                    if next.start < overlay.start {
                        return Err(TimelineError::InvalidProject(format!(
                            "track {} is not sorted by start",
                            track.id
                        )));
                    }
                    if next.start < end {
                        return Err(TimelineError::InvalidProject(format!(
                            "overlays {} and {} overlap on track {}",
                            overlay.id, next.id, track.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let project: Project = serde_json::from_str(json)?;
        project.validate()?;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(track: TrackId, start: Frame, duration: Frame) -> Overlay {
        Overlay::new(
            track,
            start,
            duration,
            OverlayKind::Text {
                content: "Hello".into(),
                style: TextStyle::default(),
            },
        )
    }

    #[test]
    fn test_frame_range_overlap_is_half_open() {
        let a = FrameRange::new(0, 90);
        let b = FrameRange::new(90, 90);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&FrameRange::new(89, 1)));
        assert!(a.contains(0));
        assert!(!a.contains(90));
    }

    #[test]
    fn test_find_free_slot_skips_occupied_runs() {
        let mut track = Track::new("V1");
        track.insert_sorted(text(track.id, 0, 30));
        track.insert_sorted(text(track.id, 30, 30));
        track.insert_sorted(text(track.id, 100, 10));

        assert_eq!(track.find_free_slot(10, 20, &[]), 60);
        assert_eq!(track.find_free_slot(10, 50, &[]), 110);
        assert_eq!(track.furthest_end(), 110);
    }

    #[test]
    fn test_insert_sorted_keeps_start_order() {
        let mut track = Track::new("V1");
        track.insert_sorted(text(track.id, 50, 10));
        track.insert_sorted(text(track.id, 0, 10));
        track.insert_sorted(text(track.id, 20, 10));
        let starts: Vec<Frame> = track.overlays.iter().map(|o| o.start).collect();
        assert_eq!(starts, vec![0, 20, 50]);
    }

    #[test]
    fn test_json_round_trip_keeps_kind_fields() {
        let mut project = Project::new("Promo", 30, 300);
        let track_id = project.add_track("Audio");
        let sound = Overlay::new(
            track_id,
            0,
            150,
            OverlayKind::Sound {
                src: "music.mp3".into(),
                start_from_source: 12,
                audio: AudioStyle {
                    volume: 0.8,
                    fade_in_seconds: 1.0,
                    fade_out_seconds: 1.0,
                },
            },
        );
        project.tracks[0].overlays.push(sound);

        let json = project.to_json().unwrap();
        assert!(json.contains("\"type\": \"sound\""));
        let back = Project::from_json(&json).unwrap();
        assert_eq!(back, project);
        assert_eq!(back.overlays().next().unwrap().start_from_source(), Some(12));
    }

    #[test]
    fn test_from_json_rejects_overlapping_overlays() {
        let mut project = Project::new("Broken", 30, 300);
        let track_id = project.add_track("V1");
        project.tracks[0].overlays.push(text(track_id, 0, 60));
        project.tracks[0].overlays.push(text(track_id, 30, 60));
        let json = serde_json::to_string(&project).unwrap();

        let err = Project::from_json(&json).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidProject(_)));
    }

    #[test]
    fn test_duration_seconds_follows_fps() {
        assert_eq!(Project::new("Promo", 30, 450).duration_seconds(), 15.0);
        assert_eq!(Project::new("Film", 24, 36).duration_seconds(), 1.5);
    }

    #[test]
    fn test_validate_rejects_overlay_past_duration() {
        let mut project = Project::new("Short", 30, 60);
        let track_id = project.add_track("V1");
        project.tracks[0].overlays.push(text(track_id, 30, 31));
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_from_json_rejects_end_past_frame_range() {
        let mut project = Project::new("Huge", 30, i64::MAX);
        let track_id = project.add_track("V1");
        project.tracks[0].overlays.push(text(track_id, i64::MAX - 5, 90));
        let json = serde_json::to_string(&project).unwrap();

        let err = Project::from_json(&json).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidProject(_)));
        assert_eq!(FrameRange::new(i64::MAX - 5, 90).checked_end(), None);
        assert_eq!(FrameRange::new(i64::MAX - 5, 5).checked_end(), Some(i64::MAX));
    }

    #[test]
    fn test_text_defaults_fill_missing_style() {
        let track_id = TrackId::new();
        let json = format!(
            r#"{{"id":"{}","track_id":"{}","start":0,"duration_in_frames":10,"type":"text","content":"Hi"}}"#,
            OverlayId::new(),
            track_id
        );
        let overlay: Overlay = serde_json::from_str(&json).unwrap();
        assert_eq!(overlay.font_family(), Some("Inter"));
        assert_eq!(overlay.start_from_source(), None);
    }
}
