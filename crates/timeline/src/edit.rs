//! Timeline edit engine: move, resize, split, duplicate, delete and add.
//!
//! Every operation reads a project snapshot and returns a new one. Checks run
//! before the snapshot is cloned, so a failed edit never leaves a partial
//! mutation behind.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    CaptionWord, EditPolicy, Frame, FrameRange, Overlay, OverlayId, OverlayKind, Project, Result,
    TimelineError, Track, TrackId,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditCommand {
    Move {
        overlay_id: OverlayId,
        start: Frame,
        track_id: TrackId,
    },
    Resize {
        overlay_id: OverlayId,
        start: Frame,
        end: Frame,
    },
    Split {
        overlay_id: OverlayId,
        frame: Frame,
    },
    Duplicate {
        overlay_ids: Vec<OverlayId>,
    },
    Delete {
        overlay_ids: Vec<OverlayId>,
    },
    Add {
        overlay: Overlay,
    },
    AddTrack {
        name: String,
    },
}

impl EditCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Resize { .. } => "resize",
            Self::Split { .. } => "split",
            Self::Duplicate { .. } => "duplicate",
            Self::Delete { .. } => "delete",
            Self::Add { .. } => "add",
            Self::AddTrack { .. } => "add_track",
        }
    }
}

/// New snapshot produced by a successful edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub project: Project,
    /// Overlays created by the edit (split tail, duplicates, added item).
    pub created: Vec<OverlayId>,
    pub added_tracks: Vec<TrackId>,
    pub removed_tracks: Vec<TrackId>,
}

impl EditOutcome {
    fn new(project: Project) -> Self {
        Self {
            project,
            created: Vec::new(),
            added_tracks: Vec::new(),
            removed_tracks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Editor {
    pub policy: EditPolicy,
}

impl Editor {
    pub fn new(policy: EditPolicy) -> Self {
        Self { policy }
    }

    pub fn apply(&self, project: &Project, command: EditCommand) -> Result<EditOutcome> {
        let name = command.name();
        let result = match command {
            EditCommand::Move {
                overlay_id,
                start,
                track_id,
            } => self.move_overlay(project, overlay_id, start, track_id),
            EditCommand::Resize {
                overlay_id,
                start,
                end,
            } => self.resize_overlay(project, overlay_id, start, end),
            EditCommand::Split { overlay_id, frame } => {
                self.split_overlay(project, overlay_id, frame)
            }
            EditCommand::Duplicate { overlay_ids } => self.duplicate_overlays(project, &overlay_ids),
            EditCommand::Delete { overlay_ids } => self.delete_overlays(project, &overlay_ids),
            EditCommand::Add { overlay } => self.add_overlay(project, overlay),
            EditCommand::AddTrack { name } => Ok(self.add_track(project, name)),
        };
        match &result {
            Ok(outcome) => debug!(
                command = name,
                created = outcome.created.len(),
                removed_tracks = outcome.removed_tracks.len(),
                "edit applied"
            ),
            Err(err) => debug!(command = name, error = %err, "edit rejected"),
        }
        result
    }

    pub fn move_overlay(
        &self,
        project: &Project,
        overlay_id: OverlayId,
        new_start: Frame,
        new_track: TrackId,
    ) -> Result<EditOutcome> {
        let (ti, oi) = project.locate(overlay_id)?;
        let target = project.track_index(new_track)?;
        let source_track = project.tracks[ti].id;
        let range = FrameRange::new(new_start, project.tracks[ti].overlays[oi].duration_in_frames);
        self.check_bounds(project, overlay_id, range)?;
        check_free(&project.tracks[target], overlay_id, range, &[overlay_id])?;

        let mut next = project.clone();
        let mut overlay = next.tracks[ti].overlays.remove(oi);
        overlay.start = new_start;
        overlay.track_id = new_track;
        next.tracks[target].insert_sorted(overlay);
        self.fit_duration(&mut next, range.end());

        let mut outcome = EditOutcome::new(next);
        if source_track != new_track {
            outcome.removed_tracks = self.prune_empty_tracks(&mut outcome.project, &[source_track]);
        }
        Ok(outcome)
    }

    /// Moves either edge. Sound and video keep their content anchored: moving
    /// the left edge by `n` frames moves `start_from_source` by `n` too.
    pub fn resize_overlay(
        &self,
        project: &Project,
        overlay_id: OverlayId,
        new_start: Frame,
        new_end: Frame,
    ) -> Result<EditOutcome> {
        if new_end <= new_start {
            return Err(TimelineError::InvalidRange(format!(
                "resize of {} to [{}, {}) is empty",
                overlay_id, new_start, new_end
            )));
        }
        let duration = new_end.checked_sub(new_start).ok_or_else(|| {
            TimelineError::InvalidRange(format!(
                "resize of {} to [{}, {}) is too long",
                overlay_id, new_start, new_end
            ))
        })?;
        let (ti, oi) = project.locate(overlay_id)?;
        let current = &project.tracks[ti].overlays[oi];
        let range = FrameRange::new(new_start, duration);
        self.check_bounds(project, overlay_id, range)?;
        check_free(&project.tracks[ti], overlay_id, range, &[overlay_id])?;

        let delta = new_start - current.start;
        if let Some(source) = current.start_from_source() {
            match source.checked_add(delta) {
                Some(shifted) if shifted < 0 => {
                    return Err(TimelineError::InvalidRange(format!(
                        "resize of {} would start {} frames before its source media",
                        overlay_id, -shifted
                    )));
                }
                Some(_) => {}
                None => {
                    return Err(TimelineError::InvalidRange(format!(
                        "resize of {} moves its source offset out of range",
                        overlay_id
                    )));
                }
            }
        }

        let mut next = project.clone();
        let mut overlay = next.tracks[ti].overlays.remove(oi);
        overlay.start = new_start;
        overlay.duration_in_frames = range.duration;
        overlay.shift_source(delta);
        if let OverlayKind::Caption { words, .. } = &mut overlay.kind {
            *words = shift_captions(&words[..], frames_to_ms(delta, project.fps).saturating_neg());
        }
        next.tracks[ti].insert_sorted(overlay);
        self.fit_duration(&mut next, range.end());
        Ok(EditOutcome::new(next))
    }

    /// Cuts an overlay at `frame` into `[start, frame)` and a new overlay
    /// `[frame, end)`. Both pieces must keep at least one frame.
    pub fn split_overlay(
        &self,
        project: &Project,
        overlay_id: OverlayId,
        frame: Frame,
    ) -> Result<EditOutcome> {
        let (ti, oi) = project.locate(overlay_id)?;
        let original = &project.tracks[ti].overlays[oi];
        if frame <= original.start || frame >= original.end() {
            return Err(TimelineError::InvalidRange(format!(
                "split frame {} must fall strictly inside [{}, {})",
                frame,
                original.start,
                original.end()
            )));
        }

        let offset = frame - original.start;
        let mut head = original.clone();
        head.duration_in_frames = offset;
        let mut tail = original.clone();
        tail.id = OverlayId::new();
        tail.start = frame;
        tail.duration_in_frames = original.end() - frame;
        tail.shift_source(offset);

        if let OverlayKind::Caption { words, .. } = &original.kind {
            let (first, second) = partition_captions(words, frames_to_ms(offset, project.fps));
            if let OverlayKind::Caption { words, .. } = &mut head.kind {
                *words = first;
            }
            if let OverlayKind::Caption { words, .. } = &mut tail.kind {
                *words = second;
            }
        }

        let tail_id = tail.id;
        let mut next = project.clone();
        next.tracks[ti].overlays[oi] = head;
        next.tracks[ti].insert_sorted(tail);

        let mut outcome = EditOutcome::new(next);
        outcome.created.push(tail_id);
        Ok(outcome)
    }

    /// Copies the overlays as one group, shifted by a single offset so their
    /// relative positions survive. The offset starts at "right after the
    /// group" and scans forward to the first one where every copy fits on
    /// its own track.
    pub fn duplicate_overlays(
        &self,
        project: &Project,
        overlay_ids: &[OverlayId],
    ) -> Result<EditOutcome> {
        let mut sources: Vec<&Overlay> = Vec::new();
        for id in overlay_ids {
            let (ti, oi) = project.locate(*id)?;
            if !sources.iter().any(|s| s.id == *id) {
                sources.push(&project.tracks[ti].overlays[oi]);
            }
        }
        if sources.is_empty() {
            return Ok(EditOutcome::new(project.clone()));
        }

        let group_start = sources.iter().map(|s| s.start).min().unwrap_or(0);
        let group_end = sources.iter().map(|s| s.end()).max().unwrap_or(0);
        let base = group_end - group_start;

        let track_of = |overlay: &Overlay| project.track(overlay.track_id);
        let mut candidates = vec![base];
        let mut fallback = base;
        for source in &sources {
            if let Some(track) = track_of(*source) {
                fallback = fallback.max(track.furthest_end() - source.start);
                candidates.extend(
                    track
                        .overlays
                        .iter()
                        .map(|o| o.end() - source.start)
                        .filter(|d| *d > base),
                );
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let fits = |delta: Frame| {
            sources.iter().all(|s| {
                let range = FrameRange::new(s.start + delta, s.duration_in_frames);
                track_of(*s).map_or(false, |t| t.conflict(&range, &[]).is_none())
            })
        };
        let delta = candidates.into_iter().find(|d| fits(*d)).unwrap_or(fallback);

        let mut copies = Vec::with_capacity(sources.len());
        for source in &sources {
            let mut copy = (*source).clone();
            copy.id = OverlayId::new();
            copy.start = source.start.checked_add(delta).ok_or_else(|| {
                TimelineError::InvalidRange(format!(
                    "copy of {} would start past the last representable frame",
                    source.id
                ))
            })?;
            self.check_bounds(project, copy.id, copy.range())?;
            copies.push(copy);
        }

        let mut next = project.clone();
        let mut outcome_created = Vec::with_capacity(copies.len());
        let mut furthest = 0;
        for copy in copies {
            let ti = next.track_index(copy.track_id)?;
            furthest = furthest.max(copy.end());
            outcome_created.push(copy.id);
            next.tracks[ti].insert_sorted(copy);
        }
        self.fit_duration(&mut next, furthest);

        let mut outcome = EditOutcome::new(next);
        outcome.created = outcome_created;
        Ok(outcome)
    }

    /// Removes the overlays; all ids must exist. Track ids never change, only
    /// emptied tracks may disappear (per policy).
    pub fn delete_overlays(
        &self,
        project: &Project,
        overlay_ids: &[OverlayId],
    ) -> Result<EditOutcome> {
        let mut touched = Vec::new();
        for id in overlay_ids {
            let (ti, _) = project.locate(*id)?;
            let track_id = project.tracks[ti].id;
            if !touched.contains(&track_id) {
                touched.push(track_id);
            }
        }

        let mut next = project.clone();
        for track in next.tracks.iter_mut() {
            track.overlays.retain(|o| !overlay_ids.contains(&o.id));
        }
        let mut outcome = EditOutcome::new(next);
        outcome.removed_tracks = self.prune_empty_tracks(&mut outcome.project, &touched);
        Ok(outcome)
    }

    pub fn add_overlay(&self, project: &Project, overlay: Overlay) -> Result<EditOutcome> {
        if project.locate(overlay.id).is_ok() {
            return Err(TimelineError::OverlayExists(overlay.id));
        }
        let ti = project.track_index(overlay.track_id)?;
        let range = overlay.range();
        self.check_bounds(project, overlay.id, range)?;
        check_free(&project.tracks[ti], overlay.id, range, &[])?;

        let id = overlay.id;
        let mut next = project.clone();
        next.tracks[ti].insert_sorted(overlay);
        self.fit_duration(&mut next, range.end());

        let mut outcome = EditOutcome::new(next);
        outcome.created.push(id);
        Ok(outcome)
    }

    pub fn add_track(&self, project: &Project, name: String) -> EditOutcome {
        let mut next = project.clone();
        let id = next.add_track(name);
        let mut outcome = EditOutcome::new(next);
        outcome.added_tracks.push(id);
        outcome
    }

    fn check_bounds(&self, project: &Project, overlay: OverlayId, range: FrameRange) -> Result<()> {
        if range.start < 0 {
            return Err(TimelineError::InvalidRange(format!(
                "overlay {} cannot start at negative frame {}",
                overlay, range.start
            )));
        }
        if range.duration < 1 {
            return Err(TimelineError::InvalidRange(format!(
                "overlay {} needs at least one frame, got {}",
                overlay, range.duration
            )));
        }
        let end = range.checked_end().ok_or_else(|| {
            TimelineError::InvalidRange(format!(
                "overlay {} starting at {} ends past the last representable frame",
                overlay, range.start
            ))
        })?;
        if !self.policy.grow_duration && end > project.duration_in_frames {
            return Err(TimelineError::InvalidRange(format!(
                "overlay {} would end at {} past project end {}",
                overlay, end, project.duration_in_frames
            )));
        }
        Ok(())
    }

    fn fit_duration(&self, project: &mut Project, end: Frame) {
        if self.policy.grow_duration && end > project.duration_in_frames {
            project.duration_in_frames = end;
        }
    }

    fn prune_empty_tracks(&self, project: &mut Project, candidates: &[TrackId]) -> Vec<TrackId> {
        if !self.policy.remove_empty_tracks {
            return Vec::new();
        }
        let removed: Vec<TrackId> = project
            .tracks
            .iter()
            .filter(|t| t.overlays.is_empty() && candidates.contains(&t.id))
            .map(|t| t.id)
            .collect();
        project.tracks.retain(|t| !removed.contains(&t.id));
        removed
    }
}

fn check_free(track: &Track, overlay: OverlayId, range: FrameRange, ignore: &[OverlayId]) -> Result<()> {
    match track.conflict(&range, ignore) {
        Some(other) => {
            warn!(
                overlay = %overlay,
                conflicting = %other.id,
                track = %track.id,
                start = range.start,
                end = range.end(),
                "placement conflict"
            );
            Err(TimelineError::PlacementConflict {
                overlay,
                track: track.id,
                conflicting: other.id,
            })
        }
        None => Ok(()),
    }
}

fn frames_to_ms(frames: Frame, fps: u32) -> i64 {
    (crate::frame_to_seconds(frames, fps) * 1000.0).round() as i64
}

/// Splits caption words at `cut_ms`; a word spanning the cut lands in both
/// halves, clipped to each side.
fn partition_captions(words: &[CaptionWord], cut_ms: i64) -> (Vec<CaptionWord>, Vec<CaptionWord>) {
    let cut = cut_ms.max(0) as u64;
    let head = words
        .iter()
        .filter(|w| w.start_ms < cut)
        .map(|w| CaptionWord {
            text: w.text.clone(),
            start_ms: w.start_ms,
            end_ms: w.end_ms.min(cut),
        })
        .collect();
    (head, shift_captions(words, -(cut as i64)))
}

/// Re-times words by `delta_ms`, dropping those that end up entirely before 0.
fn shift_captions(words: &[CaptionWord], delta_ms: i64) -> Vec<CaptionWord> {
    words
        .iter()
        .filter(|w| (w.end_ms as i64).saturating_add(delta_ms) > 0)
        .map(|w| CaptionWord {
            text: w.text.clone(),
            start_ms: (w.start_ms as i64).saturating_add(delta_ms).max(0) as u64,
            end_ms: (w.end_ms as i64).saturating_add(delta_ms) as u64,
        })
        .collect()
}

/// Snapshot-based undo/redo over applied edit commands.
#[derive(Debug, Default, Clone)]
pub struct EditHistory {
    undo_stack: Vec<Project>,
    redo_stack: Vec<Project>,
}

impl EditHistory {
    pub fn apply(
        &mut self,
        editor: &Editor,
        project: &Project,
        command: EditCommand,
    ) -> Result<EditOutcome> {
        let outcome = editor.apply(project, command)?;
        self.undo_stack.push(project.clone());
        self.redo_stack.clear();
        Ok(outcome)
    }

    pub fn undo(&mut self, current: &Project) -> Result<Project> {
        let previous = self
            .undo_stack
            .pop()
            .ok_or(TimelineError::HistoryEmpty("undo stack"))?;
        self.redo_stack.push(current.clone());
        Ok(previous)
    }

    pub fn redo(&mut self, current: &Project) -> Result<Project> {
        let next = self
            .redo_stack
            .pop()
            .ok_or(TimelineError::HistoryEmpty("redo stack"))?;
        self.undo_stack.push(current.clone());
        Ok(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
